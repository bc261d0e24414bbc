/// How the engine treats the bounds of the loaded pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// The pattern is one period of a periodic plane: leaving through one
    /// side means entering through the opposite one.
    Torus,
    /// The pattern sits in an infinite blank plane and the field grows as needed.
    Unbounded,
}
