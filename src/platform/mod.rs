// logtrim - platform/mod.rs
//
// Platform abstraction layer: filesystem, locking, configuration.
// Dependencies: standard library, directories, toml.
// May depend on: core (for config value types), util.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
pub mod lock;
