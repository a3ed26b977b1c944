// logtrim - core/mod.rs
//
// Core business logic layer.
// Dependencies: chrono, regex, serde; walkdir/glob for discovery only.
// Must NOT depend on: platform or app.

pub mod discovery;
pub mod format;
pub mod model;
pub mod parser;
pub mod render;
pub mod retention;
