//! snapped library - image-search client core.
//!
//! This library exposes the core functionality of the `snapped` CLI for use
//! in tests and other front ends.
//!
//! # Modules
//!
//! - `acquire`: Permission, pick, and crop of the image to search with
//! - `api`: Remote image-search client and its in-memory mock
//! - `ledger`: Persisted, capped upload history
//! - `pipeline`: Upload → search → record
//! - `state`: Flow state machine observed by the presentation layer
//! - `results`: Read-side views of searches and uploads
//! - `output`: Output mode abstraction (robot/human)
//! - `config`: Settings file, environment overrides, and paths
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod acquire;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod image_ops;
pub mod ledger;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod results;
pub mod state;
pub mod theme;
