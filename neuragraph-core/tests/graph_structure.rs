use approx::assert_relative_eq;
use neuragraph_core::autograd::{check_op_gradients, GradCheckError};
use neuragraph_core::nn::{Dense, Neuron, Softmax, Transfer};
use neuragraph_core::optim::Solver;
use neuragraph_core::utils::testing::seeded_rng;
use neuragraph_core::{DependencyGraph, NeuraGraphError, Network, Op, TensorBlock, Volume};
use std::collections::BTreeMap;
use std::rc::Rc;

mod common;
use common::{init_logger, scalar};

#[test]
fn test_dependency_graph_public_api() -> Result<(), NeuraGraphError> {
    init_logger();
    let mut g = DependencyGraph::new();
    assert!(g.add_vertex("load"));
    assert!(g.add_edge("load", "parse"));
    assert!(g.add_edge("parse", "emit"));
    assert!(!g.add_edge("emit", "emit"));
    assert_eq!(g.get_ordering()?, vec!["load", "parse", "emit"]);
    g.add_edge("emit", "load");
    assert!(matches!(
        g.get_ordering(),
        Err(NeuraGraphError::Topological { .. })
    ));
    Ok(())
}

#[test]
fn test_network_cannot_contain_itself() -> Result<(), NeuraGraphError> {
    let outer = Rc::new(Network::new("outer"));
    let middle = Rc::new(Network::new("middle"));
    let inner = Rc::new(Network::new("inner"));
    outer.add(middle.clone())?;
    middle.add(inner.clone())?;

    assert!(matches!(outer.add(outer.clone()), Err(NeuraGraphError::Input(_))));
    assert!(matches!(inner.add(outer.clone()), Err(NeuraGraphError::Input(_))));
    assert!(inner.is_empty());
    Ok(())
}

#[test]
fn test_nested_network_forward_backward() -> Result<(), GradCheckError> {
    init_logger();
    let x = scalar("x", 0.5);
    let y = scalar("y", -0.25);
    let a = Rc::new(Neuron::with_rng("a", Transfer::Tanh, &[x.clone(), y.clone()], &mut seeded_rng(4))?);
    let b = Rc::new(Neuron::with_rng("b", Transfer::Sigmoid, &[x.clone()], &mut seeded_rng(5))?);
    let inner = Rc::new(Network::new("features"));
    inner.add(a.clone())?;
    inner.add(b.clone())?;

    let head = Rc::new(Neuron::with_rng(
        "head",
        Transfer::Linear,
        &[a.output().clone(), b.output().clone()],
        &mut seeded_rng(6),
    )?);
    let outer = Network::new("model");
    outer.add(head.clone())?;
    outer.add(inner.clone())?;
    assert_eq!(outer.ordering()?, vec!["features", "head"]);
    assert_eq!(outer.len(), 2);
    assert!(outer.contains(a.as_ref()));

    let outputs: Vec<String> = outer.outputs().into_keys().collect();
    assert_eq!(outputs, vec!["head_out"]);
    assert!(outer.inputs().contains_key("x"));
    assert!(outer.inputs().contains_key("a_thr"));
    assert!(!outer.inputs().contains_key("a_out"));

    check_op_gradients(&outer, &BTreeMap::new(), 1e-2, 1e-2)
}

#[test]
fn test_shared_block_receives_every_contribution() -> Result<(), GradCheckError> {
    // x feeds a dense layer and a softmax; the network gradient must be the
    // sum of both paths
    let x = TensorBlock::from_volume("x", Volume::from_vec([1, 1, 3], vec![0.2, -0.6, 0.9])?);
    let dense = Rc::new(Dense::with_rng("fc", Transfer::Tanh, &x, [1, 1, 2], &mut seeded_rng(8))?);
    let soft = Rc::new(Softmax::new("sm", &x)?);
    let net = Network::new("fanout");
    net.add(dense)?;
    net.add(soft)?;

    let mut seeds = BTreeMap::new();
    seeds.insert("sm_out".to_string(), Volume::from_vec([1, 1, 3], vec![1.0, 0.0, -1.0])?);
    check_op_gradients(&net, &seeds, 1e-2, 1e-2)
}

#[test]
fn test_reset_gradient_is_idempotent() -> Result<(), NeuraGraphError> {
    let x = scalar("x", 1.0);
    let a = Rc::new(Neuron::with_rng("a", Transfer::Sigmoid, &[x.clone()], &mut seeded_rng(9))?);
    let b = Rc::new(Neuron::with_rng(
        "b",
        Transfer::Relu,
        &[a.output().clone()],
        &mut seeded_rng(10),
    )?);
    let net = Network::new("net");
    net.add(a)?;
    net.add(b.clone())?;
    net.forward()?;
    b.output().gradient_mut().fill(1.0);
    net.backward()?;

    net.reset_gradient();
    for _ in 0..3 {
        net.backward()?;
        net.reset_gradient();
    }
    net.backward()?;
    for block in net.blocks().values() {
        assert!(
            block.gradient().iter().all(|&g| g == 0.0),
            "gradient of '{}' is not zero",
            block.name()
        );
    }
    Ok(())
}

#[test]
fn test_duplicate_names_are_rejected() -> Result<(), NeuraGraphError> {
    let x = scalar("x", 1.0);
    let first = Rc::new(Neuron::new("n", Transfer::Linear, &[x.clone()])?);
    let second = Rc::new(Neuron::new("n", Transfer::Linear, &[x.clone()])?);
    let net = Network::new("net");
    net.add(first.clone())?;
    net.add(first)?;
    assert!(matches!(
        net.add(second),
        Err(NeuraGraphError::Duplicity { .. })
    ));
    assert_eq!(net.len(), 1);
    Ok(())
}

/// Two chained tanh neurons `a -> b`, registered directly in the returned
/// network or through an inner network.
fn chain(nested: bool) -> Result<(Rc<Network>, Rc<Neuron>, Rc<Neuron>), NeuraGraphError> {
    let x = scalar("x", 0.8);
    let a = Rc::new(Neuron::with_rng("a", Transfer::Tanh, &[x], &mut seeded_rng(7))?);
    let b = Rc::new(Neuron::with_rng(
        "b",
        Transfer::Tanh,
        &[a.output().clone()],
        &mut seeded_rng(8),
    )?);
    let outer = Rc::new(Network::new("outer"));
    if nested {
        let inner = Rc::new(Network::new("inner"));
        inner.add(a.clone())?;
        inner.add(b.clone())?;
        outer.add(inner)?;
    } else {
        outer.add(a.clone())?;
        outer.add(b.clone())?;
    }
    Ok((outer, a, b))
}

#[test]
fn test_nested_training_matches_flat_training() -> Result<(), NeuraGraphError> {
    init_logger();
    let mut trained = Vec::new();
    for nested in [false, true] {
        let (net, a, b) = chain(nested)?;
        let desired = scalar("desired", -0.5);
        let mut solver = Solver::new(net, b.output(), &desired)?;
        solver.train(5)?;
        trained.push((a, b));
    }
    let (flat_a, flat_b) = &trained[0];
    let (nested_a, nested_b) = &trained[1];
    let value = |block: &neuragraph_core::BlockRef| block.value()[(0, 0, 0)];
    let grad = |block: &neuragraph_core::BlockRef| block.gradient()[(0, 0, 0)];

    assert_relative_eq!(value(flat_a.threshold()), value(nested_a.threshold()), epsilon = 1e-6);
    assert_relative_eq!(value(flat_b.threshold()), value(nested_b.threshold()), epsilon = 1e-6);
    if let (Some(fw), Some(nw)) = (flat_b.weight("a_out"), nested_b.weight("a_out")) {
        assert_relative_eq!(value(fw), value(nw), epsilon = 1e-6);
    } else {
        panic!("missing weight of 'b' for input 'a_out'");
    }
    // the block internal to the inner network is zeroed every cycle
    assert_relative_eq!(grad(flat_a.output()), grad(nested_a.output()), epsilon = 1e-6);
    Ok(())
}
