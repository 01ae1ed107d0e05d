use neuragraph_core::{BlockRef, TensorBlock};

// Added allow(dead_code) because usage across different test crates isn't detected easily.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a 1x1x1 block holding `value`.
#[allow(dead_code)]
pub fn scalar(name: &str, value: f32) -> BlockRef {
    let block = TensorBlock::new(name, 1, 1, 1);
    block.value_mut()[(0, 0, 0)] = value;
    block
}

/// Sets the single cell of a 1x1x1 block.
#[allow(dead_code)]
pub fn set_scalar(block: &BlockRef, value: f32) {
    block.value_mut()[(0, 0, 0)] = value;
}

#[allow(dead_code)]
pub fn get_scalar(block: &BlockRef) -> f32 {
    block.value()[(0, 0, 0)]
}
