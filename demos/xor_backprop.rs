use gann::{Activation, Dataset, EarlyStopping, FitConfig, NetworkBuilder, Optimizer};

fn main() -> gann::Result<()> {
    tracing_subscriber::fmt().init();

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
    let data = Dataset::from_rows(&xs, &ys)?;

    for optimizer in [Optimizer::Sgd, Optimizer::RMSPROP, Optimizer::ADAM] {
        let mut net = NetworkBuilder::new(2)?
            .layer(8)?
            .layer(2)?
            .hidden_activation(Activation::ReLU)
            .output_activation(Activation::Sigmoid)
            .build_with_seed(0)?;

        let cfg = FitConfig {
            epochs: 500,
            learning_rate: if optimizer == Optimizer::Sgd { 0.1 } else { 0.01 },
            batch_size: 1,
            optimizer,
            early_stopping: Some(EarlyStopping::new(50, 0.001)),
            logging: false,
        };
        let report = net.fit(&data, Some(&data), &cfg)?;

        println!(
            "{optimizer:?}: {} epochs, accuracy {:.2}",
            report.epochs_run,
            gann::evaluate(&net, &data)?
        );
    }
    Ok(())
}
