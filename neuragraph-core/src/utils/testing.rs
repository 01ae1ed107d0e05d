use crate::volume::Volume;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Checks if a volume has the expected shape and data within tolerance.
/// Panics if shapes differ or data differs significantly.
pub fn check_volume_near(
    actual: &Volume,
    expected_shape: [usize; 3],
    expected_data: &[f32],
    tolerance: f32,
) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    assert_eq!(actual.len(), expected_data.len(), "Data length mismatch");

    for (i, (a, e)) in actual.iter().zip(expected_data.iter()).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}

/// Deterministic random source for reproducible initialisation in tests and demos.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
