//! F5 BIG-IP tmsh configuration parser
//!
//! Only `ltm node`, `ltm pool` and `ltm virtual` blocks are read; every
//! other stanza is skipped by brace counting.

mod mapping;
mod parser;

pub use mapping::map_f5_to_model;
pub use parser::F5Parser;

use crate::ir::SourceLocation;

/// Partition prefix stripped from object names
pub const COMMON_PARTITION: &str = "/Common/";

/// Extracted F5 objects, in declaration order
#[derive(Debug, Clone, Default)]
pub struct F5Config {
    pub nodes: Vec<F5Node>,
    pub pools: Vec<F5Pool>,
    pub virtuals: Vec<F5Virtual>,
}

impl F5Config {
    /// Find a pool by reference, with or without the partition prefix
    pub fn pool(&self, reference: &str) -> Option<&F5Pool> {
        let name = strip_partition(reference);
        self.pools.iter().find(|p| p.name == name)
    }
}

/// `ltm node /Common/<name> { address <ip> }`
#[derive(Debug, Clone)]
pub struct F5Node {
    pub name: String,
    pub address: String,
    pub location: SourceLocation,
}

/// `ltm pool /Common/<name> { members { ... } }`
#[derive(Debug, Clone)]
pub struct F5Pool {
    pub name: String,
    pub description: String,
    pub load_balancing_mode: String,
    pub monitor: String,
    pub members: Vec<F5PoolMember>,
    pub location: SourceLocation,
}

/// A `<node-or-ip>:<port> { ... }` entry inside a pool's `members` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F5PoolMember {
    /// Node name or IP address, partition stripped
    pub name: String,
    pub port: String,
    /// `address` line from the member block, if any
    pub address: String,
    /// `session user-disabled` or `state user-down`
    pub disabled: bool,
    pub ratio: Option<u32>,
}

/// `ltm virtual /Common/<name> { destination ... pool ... }`
#[derive(Debug, Clone)]
pub struct F5Virtual {
    pub name: String,
    pub description: String,
    /// `(address, port)` from `destination /Common/<ip>:<port>`
    pub destination: Option<(String, String)>,
    /// Pool reference, partition stripped
    pub pool: String,
    pub location: SourceLocation,
}

/// Remove a leading `/Common/` partition
pub fn strip_partition(name: &str) -> &str {
    name.strip_prefix(COMMON_PARTITION).unwrap_or(name)
}
