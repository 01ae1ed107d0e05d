// src/nn/mod.rs
// Layers, transfer functions, losses and parameter initialisation.

pub mod init;
pub mod layers;
pub mod losses;
pub mod transfer;

// Re-export common items
pub use layers::{Conv, ConvConfig, Dense, MaxPool, Neuron, Softmax};
pub use losses::Loss;
pub use transfer::Transfer;
