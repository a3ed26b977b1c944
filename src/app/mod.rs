// logtrim - app/mod.rs
//
// Application layer: orchestration of a cleanup run.
// Dependencies: core, platform, util.

pub mod cleanup;
