use neuragraph_core::nn::{Dense, Transfer};
use neuragraph_core::optim::Solver;
use neuragraph_core::{Network, Op};
use neuragraph_data::persist::save;
use neuragraph_data::CsvReader;
use std::path::PathBuf;
use std::rc::Rc;

// Learns XOR from two CSV files read line by line, then saves the trained
// network as JSON in the system temp directory.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("Training a 2-4-1 network on XOR...");

    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let inputs = Rc::new(CsvReader::shuffled("xor_in", data_dir.join("xor_inputs.csv"), 11)?);
    let targets = Rc::new(CsvReader::shuffled("xor_target", data_dir.join("xor_targets.csv"), 11)?);
    let hidden = Rc::new(Dense::new("hidden", Transfer::Tanh, inputs.output(), [1, 1, 4])?);
    let output = Rc::new(Dense::new("out", Transfer::Sigmoid, hidden.output(), [1, 1, 1])?);

    let net = Rc::new(Network::new("xor"));
    net.add(inputs.clone())?;
    net.add(targets.clone())?;
    net.add(hidden)?;
    net.add(output.clone())?;
    println!("Execution order: {:?}", net.ordering()?);

    let mut solver = Solver::new(net.clone(), output.output(), targets.output())?;
    solver.set_method("nesterov")?;
    solver.set_learning_rate(0.5)?;
    solver.set_learning_rate_decay(0.5, 8000)?;

    let num_epochs = 5000;
    for epoch in 0..num_epochs {
        let mut epoch_loss = 0.0;
        for _ in 0..inputs.line_count() {
            epoch_loss += solver.train(1)?;
        }
        if epoch % 500 == 0 || epoch == num_epochs - 1 {
            println!(
                "Epoch {:>4}: loss = {:.5}, lr = {:.4}",
                epoch,
                epoch_loss / inputs.line_count() as f32,
                solver.learning_rate()
            );
        }
    }

    println!("\nPredictions:");
    for _ in 0..inputs.line_count() {
        net.forward()?;
        let x = inputs.output().value().as_slice().to_vec();
        println!(
            "  {} XOR {} = {:.3} (expected {})",
            x[0],
            x[1],
            output.output().value()[(0, 0, 0)],
            targets.output().value()[(0, 0, 0)]
        );
    }

    let path = std::env::temp_dir().join("neuragraph_xor.json");
    save(&net, &path)?;
    println!("Saved trained network to {}", path.display());
    Ok(())
}
