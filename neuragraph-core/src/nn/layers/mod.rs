//! Concrete computation nodes.
//!
//! Every layer validates its configuration in its constructor, before any
//! block is allocated, and names the blocks it creates `"<node>_<role>"`.

pub mod conv;
pub mod dense;
pub mod maxpool;
pub mod neuron;
pub mod softmax;

pub use conv::{Conv, ConvConfig};
pub use dense::Dense;
pub use maxpool::MaxPool;
pub use neuron::Neuron;
pub use softmax::Softmax;
