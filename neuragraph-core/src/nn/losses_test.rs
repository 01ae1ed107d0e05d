use super::Loss;
use crate::block::TensorBlock;
use crate::error::NeuraGraphError;
use crate::volume::Volume;
use approx::assert_relative_eq;

fn block(name: &str, values: Vec<f32>) -> Result<crate::block::BlockRef, NeuraGraphError> {
    let len = values.len();
    Ok(TensorBlock::from_volume(name, Volume::from_vec([1, 1, len], values)?))
}

#[test]
fn test_l2_value_and_gradient() -> Result<(), NeuraGraphError> {
    let out = block("out", vec![1.0, 2.0, 3.0])?;
    let want = block("want", vec![1.0, 0.0, -1.0])?;
    // diff = [0, 2, 4], squared sum = 20
    let value = Loss::L2.value(&[out.clone()], &[want.clone()])?;
    assert_relative_eq!(value, 0.5 * 20.0f32.sqrt());

    let grads = Loss::L2.gradients(&[out], &[want])?;
    assert_eq!(grads.len(), 1);
    assert_eq!(grads[0].as_slice(), &[0.0, 2.0, 4.0]);
    Ok(())
}

#[test]
fn test_l2_sums_over_pairs_before_root() -> Result<(), NeuraGraphError> {
    let a = block("a", vec![3.0])?;
    let b = block("b", vec![4.0])?;
    let zero_a = block("za", vec![0.0])?;
    let zero_b = block("zb", vec![0.0])?;
    let value = Loss::L2.value(&[a, b], &[zero_a, zero_b])?;
    assert_relative_eq!(value, 2.5);
    Ok(())
}

#[test]
fn test_l1_value_and_gradient() -> Result<(), NeuraGraphError> {
    let out = block("out", vec![1.0, 2.0, -3.0])?;
    let want = block("want", vec![1.0, 0.0, 1.0])?;
    // |diff| = [0, 2, 4]
    let value = Loss::L1.value(&[out.clone()], &[want.clone()])?;
    assert_relative_eq!(value, 0.5 * 6.0f32.sqrt());

    let grads = Loss::L1.gradients(&[out], &[want])?;
    assert_eq!(grads[0].as_slice(), &[0.0, 1.0, -1.0]);
    Ok(())
}

#[test]
fn test_pair_count_mismatch() -> Result<(), NeuraGraphError> {
    let out = block("out", vec![1.0])?;
    let result = Loss::L2.value(&[out], &[]);
    assert!(matches!(result, Err(NeuraGraphError::Input(_))));
    Ok(())
}

#[test]
fn test_shape_mismatch() -> Result<(), NeuraGraphError> {
    let out = block("out", vec![1.0, 2.0])?;
    let want = block("want", vec![1.0])?;
    let result = Loss::L1.gradients(&[out], &[want]);
    assert_eq!(
        result,
        Err(NeuraGraphError::dimension("loss", &[1, 1, 2], &[1, 1, 1]))
    );
    Ok(())
}

#[test]
fn test_parse() -> Result<(), NeuraGraphError> {
    assert_eq!("l1".parse::<Loss>()?, Loss::L1);
    assert_eq!("l2".parse::<Loss>()?, Loss::L2);
    assert_eq!(Loss::default(), Loss::L2);
    assert!(matches!(
        "huber".parse::<Loss>(),
        Err(NeuraGraphError::UnknownOption { .. })
    ));
    Ok(())
}
