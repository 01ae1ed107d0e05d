use super::{load, restore, save, snapshot, NetworkSnapshot, PersistError, SNAPSHOT_VERSION};
use neuragraph_core::nn::{Neuron, Transfer};
use neuragraph_core::{NeuraGraphError, Network, TensorBlock};
use std::rc::Rc;

fn build(seed_value: f32) -> Result<(Network, Rc<Neuron>), NeuraGraphError> {
    let x = TensorBlock::new("x", 1, 1, 1);
    x.value_mut()[(0, 0, 0)] = seed_value;
    let unit = Rc::new(Neuron::new("n", Transfer::Tanh, &[x])?);
    let net = Network::new("net");
    net.add(unit.clone())?;
    Ok((net, unit))
}

#[test]
fn test_snapshot_records_blocks_and_nodes() -> Result<(), NeuraGraphError> {
    let (net, unit) = build(0.25)?;
    unit.threshold().value_mut()[(0, 0, 0)] = 0.5;
    unit.threshold().gradient_mut()[(0, 0, 0)] = -2.0;
    let snap = snapshot(&net);

    assert_eq!(snap.version, SNAPSHOT_VERSION);
    let names: Vec<&str> = snap.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["n_out", "n_thr", "n_x_w", "x"]);
    let thr = &snap.blocks[1];
    assert_eq!(thr.shape, [1, 1, 1]);
    assert!(thr.trainable);
    assert_eq!(thr.value, vec![0.5]);
    assert_eq!(thr.gradient, vec![-2.0]);
    assert!(!snap.blocks[3].trainable);

    assert_eq!(snap.nodes.len(), 1);
    assert_eq!(snap.nodes[0].name, "n");
    assert_eq!(snap.nodes[0].inputs, vec!["n_thr", "n_x_w", "x"]);
    assert_eq!(snap.nodes[0].outputs, vec!["n_out"]);
    Ok(())
}

#[test]
fn test_restore_into_fresh_network() -> Result<(), PersistError> {
    let (net, unit) = build(0.25)?;
    unit.threshold().value_mut()[(0, 0, 0)] = 0.75;
    let snap = snapshot(&net);

    let (other, other_unit) = build(0.0)?;
    restore(&other, &snap)?;
    assert_eq!(other_unit.threshold().value()[(0, 0, 0)], 0.75);
    assert_eq!(
        other_unit.weight("x").map(|w| w.value()[(0, 0, 0)]),
        unit.weight("x").map(|w| w.value()[(0, 0, 0)])
    );
    assert_eq!(other.block("x").map(|x| x.value()[(0, 0, 0)]), Some(0.25));
    assert_eq!(snapshot(&other), snap);
    Ok(())
}

#[test]
fn test_save_and_load_file() -> Result<(), PersistError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("net.json");
    let (net, unit) = build(1.0)?;
    unit.threshold().value_mut()[(0, 0, 0)] = -0.125;
    save(&net, &path)?;

    let (other, other_unit) = build(0.0)?;
    let loaded = load(&other, &path)?;
    assert_eq!(loaded, snapshot(&net));
    assert_eq!(other_unit.threshold().value()[(0, 0, 0)], -0.125);
    Ok(())
}

#[test]
fn test_unknown_version_is_rejected() -> Result<(), PersistError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("net.json");
    let (net, _) = build(1.0)?;
    let mut snap = snapshot(&net);
    snap.version = SNAPSHOT_VERSION + 1;
    snap.write_to(&path)?;

    assert!(matches!(
        NetworkSnapshot::read_from(&path),
        Err(PersistError::UnsupportedVersion { found: 2, expected: 1 })
    ));
    assert!(matches!(
        restore(&net, &snap),
        Err(PersistError::UnsupportedVersion { .. })
    ));
    Ok(())
}

#[test]
fn test_mismatches_leave_network_untouched() -> Result<(), NeuraGraphError> {
    let (net, unit) = build(1.0)?;
    unit.threshold().value_mut()[(0, 0, 0)] = 3.0;
    let good = snapshot(&net);
    let (target, target_unit) = build(1.0)?;
    target_unit.threshold().value_mut()[(0, 0, 0)] = 9.0;

    // changed shape on the last block
    let mut bad_shape = good.clone();
    if let Some(last) = bad_shape.blocks.last_mut() {
        last.shape = [1, 1, 2];
        last.value = vec![0.0, 0.0];
        last.gradient = vec![0.0, 0.0];
    }
    assert!(matches!(
        restore(&target, &bad_shape),
        Err(PersistError::Network(NeuraGraphError::Dimension { .. }))
    ));

    // value of the wrong length
    let mut bad_len = good.clone();
    bad_len.blocks[3].value = vec![0.0, 1.0];
    assert!(matches!(
        restore(&target, &bad_len),
        Err(PersistError::Network(NeuraGraphError::Dimension { .. }))
    ));

    let mut missing_block = good.clone();
    missing_block.blocks[3].name = "y".to_string();
    assert!(matches!(
        restore(&target, &missing_block),
        Err(PersistError::Network(NeuraGraphError::Input(_)))
    ));

    let mut missing_node = good;
    missing_node.nodes[0].name = "m".to_string();
    assert!(matches!(
        restore(&target, &missing_node),
        Err(PersistError::Network(NeuraGraphError::Input(_)))
    ));

    assert_eq!(target_unit.threshold().value()[(0, 0, 0)], 9.0);
    Ok(())
}

#[test]
fn test_malformed_json() -> Result<(), PersistError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"version\": 1, \"blocks\": [")?;
    assert!(matches!(
        NetworkSnapshot::read_from(&path),
        Err(PersistError::Json(_))
    ));
    Ok(())
}

/// `x -> a -> b` with both neurons inside an inner network.
fn build_nested() -> Result<(Network, Rc<Neuron>), NeuraGraphError> {
    let x = TensorBlock::new("x", 1, 1, 1);
    let a = Rc::new(Neuron::new("a", Transfer::Tanh, &[x])?);
    let b = Rc::new(Neuron::new("b", Transfer::Tanh, &[a.output().clone()])?);
    let inner = Rc::new(Network::new("inner"));
    inner.add(a.clone())?;
    inner.add(b)?;
    let outer = Network::new("outer");
    outer.add(inner)?;
    Ok((outer, a))
}

#[test]
fn test_nested_network_internals_round_trip() -> Result<(), PersistError> {
    let (net, a) = build_nested()?;
    a.output().value_mut()[(0, 0, 0)] = 0.375;
    a.output().gradient_mut()[(0, 0, 0)] = 1.5;
    let snap = snapshot(&net);

    let names: Vec<&str> = snap.blocks.iter().map(|b| b.name.as_str()).collect();
    assert!(names.contains(&"a_out"));
    let nodes: Vec<&str> = snap.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(nodes, vec!["a", "b", "inner"]);

    let (other, other_a) = build_nested()?;
    restore(&other, &snap)?;
    assert_eq!(other_a.output().value()[(0, 0, 0)], 0.375);
    assert_eq!(other_a.output().gradient()[(0, 0, 0)], 1.5);
    assert_eq!(snapshot(&other), snap);
    Ok(())
}
