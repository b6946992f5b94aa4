//! `mix-budget` library crate.
//!
//! The binary (`mmb`) is a thin wrapper around this library so that:
//!
//! - the allocation core is testable without spawning processes
//! - front-ends (CLI, TUI, or anything embedding the crate) share one pipeline
//! - the core stays free of I/O

pub mod alloc;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
