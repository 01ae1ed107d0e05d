//! Versioned JSON schema for the state of a [`Network`].
//!
//! A snapshot stores, for every block known to the network, its name, shape,
//! trainable flag and the raw contents of its value and gradient, plus the
//! name and block references of every node. Nested networks are walked, so
//! their internal blocks and nodes are recorded too. Restoring
//! matches blocks by name, so a snapshot can be loaded into a freshly built
//! network of the same architecture.

use neuragraph_core::{BlockMap, NeuraGraphError, Network, Op, OpRef, TensorBlock, Volume};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Schema version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error(transparent)]
    Network(#[from] NeuraGraphError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub name: String,
    /// `[depth, width, height]`
    pub shape: [usize; 3],
    pub trainable: bool,
    pub value: Vec<f32>,
    pub gradient: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub version: u32,
    pub blocks: Vec<BlockRecord>,
    pub nodes: Vec<NodeRecord>,
}

impl NetworkSnapshot {
    /// Writes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    /// `PersistError::Io` or `PersistError::Json` on failure.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a snapshot written by [`NetworkSnapshot::write_to`].
    ///
    /// # Errors
    /// * `PersistError::Io` / `PersistError::Json` if the file cannot be read or parsed.
    /// * `PersistError::UnsupportedVersion` if it was written with another schema version.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let json = fs::read_to_string(path)?;
        let snapshot: NetworkSnapshot = serde_json::from_str(&json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<(), PersistError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

fn block_record(block: &TensorBlock) -> BlockRecord {
    BlockRecord {
        name: block.name().to_string(),
        shape: block.shape(),
        trainable: block.is_trainable(),
        value: block.value().as_slice().to_vec(),
        gradient: block.gradient().as_slice().to_vec(),
    }
}

/// Blocks and nodes of `net` and of every network nested in it.
fn collect(net: &Network, blocks: &mut BlockMap, nodes: &mut Vec<OpRef>) {
    blocks.extend(net.blocks());
    for op in net.nodes() {
        if let Some(inner) = op.as_network() {
            collect(inner, blocks, nodes);
        }
        nodes.push(op);
    }
}

/// Captures the current state of every block and node of `net`, descending
/// into nested networks.
pub fn snapshot(net: &Network) -> NetworkSnapshot {
    let mut blocks = BlockMap::new();
    let mut nodes = Vec::new();
    collect(net, &mut blocks, &mut nodes);
    let blocks = blocks.values().map(|b| block_record(b)).collect();
    let nodes = nodes
        .iter()
        .map(|op| NodeRecord {
            name: op.name().to_string(),
            inputs: op.inputs().into_keys().collect(),
            outputs: op.outputs().into_keys().collect(),
        })
        .collect();
    NetworkSnapshot {
        version: SNAPSHOT_VERSION,
        blocks,
        nodes,
    }
}

/// Copies the values, gradients and trainable flags of `snapshot` into the
/// blocks of `net` (or of a network nested in it) with the same names.
///
/// Nothing is modified unless the whole snapshot fits the network.
///
/// # Errors
/// * `PersistError::UnsupportedVersion` for a snapshot of another schema version.
/// * `PersistError::Network` wrapping `NeuraGraphError::Input` if a recorded
///   block or node is missing from `net`, or `NeuraGraphError::Dimension` if
///   a recorded shape or content length does not match.
pub fn restore(net: &Network, snapshot: &NetworkSnapshot) -> Result<(), PersistError> {
    snapshot.check_version()?;
    let mut blocks = BlockMap::new();
    let mut nodes = Vec::new();
    collect(net, &mut blocks, &mut nodes);
    let node_names: HashSet<&str> = nodes.iter().map(|op| op.name()).collect();
    for node in snapshot.nodes.iter() {
        if !node_names.contains(node.name.as_str()) {
            return Err(NeuraGraphError::Input(format!(
                "network '{}' has no node '{}'",
                net.name(),
                node.name
            ))
            .into());
        }
    }

    let mut updates = Vec::with_capacity(snapshot.blocks.len());
    for record in snapshot.blocks.iter() {
        let block = blocks.get(&record.name).cloned().ok_or_else(|| {
            NeuraGraphError::Input(format!(
                "network '{}' has no block '{}'",
                net.name(),
                record.name
            ))
        })?;
        if block.shape() != record.shape {
            return Err(NeuraGraphError::dimension(
                &format!("restore block '{}'", record.name),
                &block.shape(),
                &record.shape,
            )
            .into());
        }
        let value = Volume::from_vec(record.shape, record.value.clone())?;
        let gradient = Volume::from_vec(record.shape, record.gradient.clone())?;
        updates.push((block, record.trainable, value, gradient));
    }

    for (block, trainable, value, gradient) in updates {
        block.set_value(&value)?;
        block.set_gradient(&gradient)?;
        block.set_trainable(trainable);
    }
    log::debug!(
        "Restored {} blocks into network '{}'",
        snapshot.blocks.len(),
        net.name()
    );
    Ok(())
}

/// Saves a snapshot of `net` to `path` as JSON.
///
/// # Errors
/// See [`NetworkSnapshot::write_to`].
pub fn save(net: &Network, path: impl AsRef<Path>) -> Result<(), PersistError> {
    snapshot(net).write_to(path)
}

/// Reads the snapshot at `path` and restores it into `net`.
///
/// # Errors
/// See [`NetworkSnapshot::read_from`] and [`restore`].
pub fn load(net: &Network, path: impl AsRef<Path>) -> Result<NetworkSnapshot, PersistError> {
    let snapshot = NetworkSnapshot::read_from(path)?;
    restore(net, &snapshot)?;
    Ok(snapshot)
}

#[cfg(test)]
#[path = "persist_test.rs"]
mod tests;
