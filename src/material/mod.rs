//! Material compiler: turns a node tree into a flat expression list.
//!
//! This module is organized into several submodules:
//! - `types`: expressions, shader aggregates and the material record
//! - `utils`: name sanitization and literal formatting
//! - `context`: per-material compile state and the export-run session
//! - `defaults`: disconnected-socket defaults and texture-coordinate mapping
//! - `resolver`: socket resolution, memoization and type coercion
//! - `node_compiler`: one translator per node type
//! - `group_inline`: node-group substitution under a private scope
//! - `shader_aggregate`: shader add/mix
//! - `curve_atlas`: baked color ramps and RGB curves
//! - `texture_registry`: export-run texture table
//!
//! The entry point is [`export::collect_all_materials`].

pub mod context;
pub mod curve_atlas;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod group_inline;
pub mod node_compiler;
pub mod resolver;
pub mod shader_aggregate;
pub mod texture_registry;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod test_utils;
