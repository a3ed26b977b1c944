// logtrim - lib.rs
//
// Library entry point, exposing all modules for integration testing and
// for callers that want to run a cleanup programmatically.
//
// The command-line front end lives in `main.rs` and is not part of the
// library surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
