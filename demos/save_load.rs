use gann::{Activation, Network};

fn main() -> gann::Result<()> {
    let net = Network::new_with_seed(&[4, 8, 3], Activation::ReLU, Activation::Sigmoid, 7)?;

    let path = std::env::temp_dir().join("gann_demo_model.bin");
    net.save(&path)?;
    let loaded = Network::load(&path)?;

    let input = [0.5, -1.0, 0.25, 2.0];
    println!("architecture: {:?}", loaded.architecture());
    println!(
        "in-memory model predicts {}, loaded model predicts {}",
        net.predict(&input)?,
        loaded.predict(&input)?
    );
    Ok(())
}
