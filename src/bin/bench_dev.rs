use gosper_life::*;

fn main() {
    // random soups of growing size, evolved on a torus
    let mut engine = DefaultEngine::new();
    for size_log2 in 7..=12 {
        let pattern = Pattern::random(size_log2, Some(42)).unwrap();
        println!("size=2^{size_log2}\tpopulation={}", pattern.population());

        for gens_log2 in [4, 8, 12] {
            engine.load_pattern(&pattern, Topology::Torus).unwrap();

            let timer = std::time::Instant::now();
            engine.update(gens_log2).unwrap();
            let elapsed_update = timer.elapsed();
            println!(
                "{} -> {:?}\tnodes={}\tpopulation={}",
                gens_log2,
                elapsed_update.as_secs_f64(),
                engine.universe().len(),
                engine.population()
            );

            let timer = std::time::Instant::now();
            engine.run_gc();
            println!(
                "gc -> {:?}\tnodes per level={:?}",
                timer.elapsed().as_secs_f64(),
                engine.universe().lens()
            );
            if elapsed_update.as_secs_f64() > 60.0 {
                break;
            }
        }
    }

    // a glider travelling far away on an unbounded plane
    let glider = Pattern::from_rows(".o.\n..o\nooo").unwrap();
    engine.load_pattern(&glider, Topology::Unbounded).unwrap();
    let timer = std::time::Instant::now();
    engine.update(100).unwrap();
    println!(
        "glider 2^100 ({:?}) -> {:?}\tlevel={}\torigin={:?}",
        engine.topology(),
        timer.elapsed().as_secs_f64(),
        engine.root().level(),
        engine.origin()
    );
}
