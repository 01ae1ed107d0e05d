use neuragraph_core::nn::{Neuron, Transfer};
use neuragraph_core::optim::Solver;
use neuragraph_core::{NeuraGraphError, Network, Op, TensorBlock};
use std::rc::Rc;

// Teaches a single sigmoid neuron the logical AND of two inputs.
fn main() -> Result<(), NeuraGraphError> {
    env_logger::init();
    println!("Training a perceptron on logical AND...");

    let a = TensorBlock::new("a", 1, 1, 1);
    let b = TensorBlock::new("b", 1, 1, 1);
    let and = Rc::new(Neuron::new("and", Transfer::Sigmoid, &[a.clone(), b.clone()])?);

    let net = Rc::new(Network::new("perceptron"));
    net.add(and.clone())?;

    let desired = TensorBlock::new("desired", 1, 1, 1);
    let mut solver = Solver::new(net.clone(), and.output(), &desired)?;
    solver.set_learning_rate(0.5)?;
    solver.set_learning_rate_decay(0.5, 2000)?;

    let table = [(0.0, 0.0, 0.0), (0.0, 1.0, 0.0), (1.0, 0.0, 0.0), (1.0, 1.0, 1.0)];
    let num_epochs = 2000;
    for epoch in 0..num_epochs {
        let mut epoch_loss = 0.0;
        for &(x, y, want) in table.iter() {
            a.value_mut()[(0, 0, 0)] = x;
            b.value_mut()[(0, 0, 0)] = y;
            desired.value_mut()[(0, 0, 0)] = want;
            epoch_loss += solver.train(1)?;
        }
        if epoch % 200 == 0 || epoch == num_epochs - 1 {
            println!(
                "Epoch {:>4}: loss = {:.5}, lr = {:.4}",
                epoch,
                epoch_loss / table.len() as f32,
                solver.learning_rate()
            );
        }
    }

    println!("\nTruth table:");
    for &(x, y, want) in table.iter() {
        a.value_mut()[(0, 0, 0)] = x;
        b.value_mut()[(0, 0, 0)] = y;
        net.forward()?;
        let out = and.output().value()[(0, 0, 0)];
        println!("  {} AND {} = {:.3} (expected {})", x, y, out, want);
    }
    for input in ["a", "b"] {
        if let Some(w) = and.weight(input) {
            println!("weight[{}] = {:.3}", input, w.value()[(0, 0, 0)]);
        }
    }
    println!("threshold = {:.3}", and.threshold().value()[(0, 0, 0)]);
    Ok(())
}
