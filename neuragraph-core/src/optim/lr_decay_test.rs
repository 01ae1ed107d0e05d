use super::StepDecay;
use crate::error::NeuraGraphError;
use approx::assert_relative_eq;

#[test]
fn test_decays_every_period() -> Result<(), NeuraGraphError> {
    let mut decay = StepDecay::new(0.5, 3)?;
    let mut lr = 1.0;
    let mut seen = Vec::new();
    for _ in 0..8 {
        lr = decay.step(lr);
        seen.push(lr);
    }
    // steps 0..2 keep 1.0, step 3 decays, steps 4..5 keep, step 6 decays
    let expected = [1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.25, 0.25];
    for (a, e) in seen.iter().zip(expected.iter()) {
        assert_relative_eq!(*a, *e);
    }
    Ok(())
}

#[test]
fn test_zero_period_disables_decay() -> Result<(), NeuraGraphError> {
    let mut decay = StepDecay::new(0.1, 0)?;
    let mut lr = 0.3;
    for _ in 0..100 {
        lr = decay.step(lr);
    }
    assert_relative_eq!(lr, 0.3);
    Ok(())
}

#[test]
fn test_reset_restarts_count() -> Result<(), NeuraGraphError> {
    let mut decay = StepDecay::new(0.5, 2)?;
    let mut lr = decay.step(1.0);
    lr = decay.step(lr);
    decay.reset();
    lr = decay.step(lr);
    lr = decay.step(lr);
    assert_relative_eq!(lr, 1.0);
    assert_relative_eq!(decay.step(lr), 0.5);
    Ok(())
}

#[test]
fn test_defaults_and_validation() {
    let decay = StepDecay::default();
    assert_relative_eq!(decay.factor(), 0.1);
    assert_eq!(decay.period(), 1000);
    assert!(matches!(StepDecay::new(0.0, 10), Err(NeuraGraphError::Input(_))));
    assert!(matches!(StepDecay::new(f32::NAN, 10), Err(NeuraGraphError::Input(_))));
}
