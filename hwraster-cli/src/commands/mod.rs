//! Subcommand implementations
//!
//! Each module owns its clap arguments and a `run` entry point.

pub mod export;
pub mod init_mem;
pub mod mvp;
pub mod spin;
pub mod texture;
pub mod verify;
pub mod view;
