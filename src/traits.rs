use crate::{Pattern, Topology};
use anyhow::Result;
use num_bigint::BigInt;

/// Game engine for Game of Life
pub trait GoLEngine {
    /// Creates an engine holding a blank pattern.
    fn new() -> Self
    where
        Self: Sized;

    /// Replaces the state of the engine with `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine does not support the pattern's size or
    /// the topology.
    fn load_pattern(&mut self, pattern: &Pattern, topology: Topology) -> Result<()>;

    /// Returns the current state of the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field has grown beyond the largest [`Pattern`].
    fn current_state(&self) -> Result<Pattern>;

    /// Advances the field by `2^generations_log2` generations.
    ///
    /// Returns `[dx, dy]`: a cell at `(x, y)` of the field before the update is
    /// at `(x + dx, y + dy)` of the field after it. The field only moves under
    /// [`Topology::Unbounded`]; with [`Topology::Torus`] the result is `[0, 0]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot simulate that many generations at
    /// once. The state is left unchanged in this case.
    fn update(&mut self, generations_log2: u32) -> Result<[BigInt; 2]>;

    /// Frees memory that is not needed to represent the current state.
    ///
    /// The default implementation does nothing.
    fn run_gc(&mut self) {}

    /// Returns the approximate heap memory usage of the engine in bytes.
    fn bytes_total(&self) -> usize;
}
