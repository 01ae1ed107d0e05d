use neuragraph_core::nn::{Conv, ConvConfig, Dense, MaxPool, Softmax, Transfer};
use neuragraph_core::optim::Solver;
use neuragraph_core::{NeuraGraphError, Network, Op, TensorBlock, Volume};
use std::rc::Rc;

/// Builds a 5x5 single-channel image with a bright horizontal or vertical bar.
fn bar_image(vertical: bool, offset: usize) -> Result<Volume, NeuraGraphError> {
    let mut data = vec![0.0f32; 25];
    for i in 0..5 {
        let (w, h) = if vertical { (offset, i) } else { (i, offset) };
        data[w * 5 + h] = 1.0;
    }
    Volume::from_vec([1, 5, 5], data)
}

// A convolutional feature extractor nested inside a classifier network.
fn main() -> Result<(), NeuraGraphError> {
    env_logger::init();
    println!("Training a nested network to tell horizontal bars from vertical ones...");

    let image = TensorBlock::new("image", 1, 5, 5);
    let conv = Rc::new(Conv::new(
        "conv",
        Transfer::Relu,
        &image,
        ConvConfig {
            output_depth: 4,
            window: 3,
            padding: 1,
            stride: 1,
        },
    )?);
    let pool = Rc::new(MaxPool::new("pool", conv.output(), 3, 0)?);

    let features = Rc::new(Network::new("features"));
    features.add(conv.clone())?;
    features.add(pool.clone())?;

    let fc = Rc::new(Dense::new("fc", Transfer::Linear, pool.output(), [1, 1, 2])?);
    let softmax = Rc::new(Softmax::new("class", fc.output())?);

    let model = Rc::new(Network::new("classifier"));
    model.add(softmax.clone())?;
    model.add(fc)?;
    model.add(features)?;
    println!("Execution order: {:?}", model.ordering()?);
    println!("Trainable blocks: {}", model.trainable_blocks().len());

    let desired = TensorBlock::new("label", 1, 1, 2);
    let mut solver = Solver::new(model.clone(), softmax.output(), &desired)?;
    solver.set_method("nesterov")?;
    solver.set_learning_rate(0.05)?;

    let mut samples = Vec::new();
    for offset in 0..5 {
        samples.push((bar_image(false, offset)?, [1.0, 0.0]));
        samples.push((bar_image(true, offset)?, [0.0, 1.0]));
    }

    for epoch in 0..300 {
        let mut epoch_loss = 0.0;
        for (img, label) in samples.iter() {
            image.set_value(img)?;
            desired.set_value(&Volume::from_vec([1, 1, 2], label.to_vec())?)?;
            epoch_loss += solver.train(1)?;
        }
        if epoch % 50 == 0 {
            println!("Epoch {:>3}: loss = {:.5}", epoch, epoch_loss / samples.len() as f32);
        }
    }

    let mut correct = 0;
    for (img, label) in samples.iter() {
        image.set_value(img)?;
        model.forward()?;
        let probs = softmax.output().value();
        let predicted_vertical = probs[(0, 0, 1)] > probs[(0, 0, 0)];
        if predicted_vertical == (label[1] > 0.5) {
            correct += 1;
        }
    }
    println!("Accuracy: {}/{}", correct, samples.len());
    Ok(())
}
