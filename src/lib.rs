//! Static call-graph explorer for Python code bases.
//!
//! Parses every file with tree-sitter, links call sites to definitions by
//! name, and ranks functions by betweenness and fan-in so the hotspots of a
//! project stand out without reading all of it.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use crate::config::Config;
pub use crate::error::{CallheatError, Result};
