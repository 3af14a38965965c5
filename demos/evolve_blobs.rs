use gann::{Crossover, Dataset, EvolutionConfig, Mutation, Selection};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn main() -> gann::Result<()> {
    tracing_subscriber::fmt().init();

    let mut rng = StdRng::seed_from_u64(0);
    let noise = Normal::new(0.0, 0.4).unwrap();
    let centers = [(-2.0, 0.0), (2.0, 0.0), (0.0, 2.5)];

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..150 {
        let class = i % centers.len();
        let (cx, cy) = centers[class];
        xs.push(vec![cx + noise.sample(&mut rng), cy + noise.sample(&mut rng)]);
        let mut y = vec![0.0; centers.len()];
        y[class] = 1.0;
        ys.push(y);
    }
    let data = Dataset::from_rows(&xs, &ys)?;

    let cfg = EvolutionConfig {
        population_size: 40,
        generations: 60,
        selection: Selection::Rank,
        crossover: Crossover::Arithmetic,
        mutation: Mutation::Adaptive,
        mutation_rate: 0.3,
        ..EvolutionConfig::new(&[2, 6, 3])
    };
    let outcome = gann::evolve(&cfg, &data, None, &mut rng)?;

    println!(
        "evolved for {} generations, accuracy {:.2}",
        outcome.report.generations_run,
        gann::evaluate(&outcome.network, &data)?
    );
    Ok(())
}
