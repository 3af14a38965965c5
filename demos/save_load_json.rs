#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> gann::Result<()> {
    use gann::{Activation, FitConfig, NetworkBuilder, Optimizer};

    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
    ];
    let train = gann::Dataset::from_rows(&xs, &ys)?;

    let mut net = NetworkBuilder::new(2)?
        .layer(8)?
        .layer(2)?
        .hidden_activation(Activation::ReLU)
        .output_activation(Activation::Sigmoid)
        .build_with_seed(0)?;

    net.fit(
        &train,
        None,
        &FitConfig {
            epochs: 200,
            learning_rate: 0.05,
            batch_size: 4,
            optimizer: Optimizer::ADAM,
            ..FitConfig::default()
        },
    )?;

    let path = "target/tmp_network.json";
    net.save_json(path)?;

    let loaded = gann::Network::load_json(path)?;
    println!(
        "saved and loaded model: {path} (accuracy {:.2})",
        gann::evaluate(&loaded, &train)?
    );
    Ok(())
}
