//! # Config Crate
//!
//! Centralized configuration constants for the plane sectionalizer pipeline.
//! All magic numbers and engine-facing contract values (vertex budget,
//! material fallbacks, naming suffixes) are defined here so the geometry
//! toolkit, the pipeline and the CLI agree on them.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{VERTEX_BUDGET, FLOATS_PER_VERTEX, format_id};
//!
//! // A tile with 1365 triangles fits the budget exactly.
//! let floats = 1365 * 3 * FLOATS_PER_VERTEX;
//! assert!(floats / FLOATS_PER_VERTEX <= VERTEX_BUDGET);
//!
//! assert_eq!(format_id(7, 3), "007");
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **Engine Compatible**: Budget and naming match what the engine loader expects
//! - **Well-Documented**: Every constant has clear documentation

pub mod constants;
