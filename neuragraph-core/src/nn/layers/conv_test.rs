use super::{Conv, ConvConfig};
use crate::autograd::{check_op_gradients, GradCheckError};
use crate::block::{BlockRef, TensorBlock};
use crate::error::NeuraGraphError;
use crate::nn::transfer::Transfer;
use crate::op::Op;
use crate::utils::testing::{check_volume_near, seeded_rng};
use crate::volume::Volume;
use std::collections::BTreeMap;

fn input_3x3() -> Result<BlockRef, NeuraGraphError> {
    Ok(TensorBlock::from_volume(
        "x",
        Volume::from_vec([1, 3, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])?,
    ))
}

fn config(output_depth: usize, window: usize, padding: usize, stride: usize) -> ConvConfig {
    ConvConfig {
        output_depth,
        window,
        padding,
        stride,
    }
}

#[test]
fn test_block_names_and_shapes() -> Result<(), NeuraGraphError> {
    let x = TensorBlock::new("x", 3, 5, 5);
    let conv = Conv::new("c", Transfer::Relu, &x, config(2, 3, 1, 2))?;
    assert_eq!(conv.output().shape(), [2, 3, 3]);
    let inputs: Vec<String> = conv.inputs().into_keys().collect();
    assert_eq!(inputs, vec!["c_thr0", "c_thr1", "c_w0", "c_w1", "x"]);
    assert!(conv.kernels().iter().all(|k| k.shape() == [3, 3, 3] && k.is_trainable()));
    assert!(conv.thresholds().iter().all(|t| t.is_trainable()));
    Ok(())
}

#[test]
fn test_forward_sum_kernel() -> Result<(), NeuraGraphError> {
    let x = input_3x3()?;
    let conv = Conv::new("c", Transfer::Linear, &x, config(1, 2, 0, 1))?;
    conv.kernels()[0].value_mut().fill(1.0);
    conv.thresholds()[0].value_mut().fill(0.5);
    conv.forward()?;
    // sums of the four 2x2 windows, plus threshold
    check_volume_near(&conv.output().value(), [1, 2, 2], &[12.5, 16.5, 24.5, 28.5], 1e-5);
    Ok(())
}

#[test]
fn test_forward_padding_and_stride() -> Result<(), NeuraGraphError> {
    let x = input_3x3()?;
    let conv = Conv::new("c", Transfer::Linear, &x, config(1, 3, 1, 2))?;
    conv.kernels()[0].value_mut().fill(1.0);
    conv.forward()?;
    // windows centred on the four corners
    check_volume_near(&conv.output().value(), [1, 2, 2], &[12.0, 16.0, 24.0, 28.0], 1e-5);
    Ok(())
}

#[test]
fn test_backward_accumulates() -> Result<(), NeuraGraphError> {
    let x = input_3x3()?;
    let conv = Conv::new("c", Transfer::Linear, &x, config(1, 3, 0, 1))?;
    conv.kernels()[0].value_mut().fill(2.0);
    conv.forward()?;
    conv.output().gradient_mut().fill(1.0);
    conv.backward()?;
    conv.backward()?;
    check_volume_near(&x.gradient(), [1, 3, 3], &[4.0; 9], 1e-6);
    check_volume_near(&conv.thresholds()[0].gradient(), [1, 1, 1], &[2.0], 1e-6);
    let expected: Vec<f32> = (1..=9).map(|v| 2.0 * v as f32).collect();
    check_volume_near(&conv.kernels()[0].gradient(), [1, 3, 3], &expected, 1e-6);
    Ok(())
}

#[test]
fn test_rejects_bad_geometry() {
    let x = TensorBlock::new("x", 1, 4, 4);
    let cases = [
        config(1, 2, 2, 1), // padding not smaller than window
        config(1, 5, 0, 1), // window larger than input
        config(1, 3, 0, 2), // stride does not tile 4 - 3
        config(0, 3, 0, 1),
        config(1, 3, 0, 0),
    ];
    for case in cases {
        assert!(
            matches!(Conv::new("c", Transfer::Tanh, &x, case), Err(NeuraGraphError::Input(_))),
            "{:?} accepted",
            case
        );
    }
}

#[test]
fn test_gradients_match_finite_differences() -> Result<(), GradCheckError> {
    let values: Vec<f32> = (0..18).map(|i| ((i * 7 % 11) as f32 - 5.0) / 10.0).collect();
    let x = TensorBlock::from_volume("x", Volume::from_vec([2, 3, 3], values)?);
    for transfer in [Transfer::Tanh, Transfer::Sigmoid, Transfer::Linear] {
        let conv = Conv::with_rng("c", transfer, &x, config(2, 3, 1, 2), &mut seeded_rng(9))?;
        check_op_gradients(&conv, &BTreeMap::new(), 1e-2, 1e-2)?;
    }
    Ok(())
}
