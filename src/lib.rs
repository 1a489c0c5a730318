#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod decode;
pub mod filter;
pub mod logging;
pub mod media;
pub mod post;
pub mod render;
pub mod scheduler;
pub mod tags;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
