//! Console logging using env_logger
//!
//! Progress and status lines go to stdout. The level defaults to `info` and
//! can be changed with `RUST_LOG` (e.g. `RUST_LOG=debug` or
//! `RUST_LOG=gh_client=debug`).

use env_logger::{Builder, Env, Target};

/// Initialize stdout logging
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format_target(false)
        .init();
}
