//! Derivation-graph exploration: rooted trees, ego networks and connected
//! component clusters over a Nix dependency graph, laid out by a force
//! simulation or a rank layout.

pub mod config;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod layout;
pub mod util;

pub use error::{GraphError, Result};
