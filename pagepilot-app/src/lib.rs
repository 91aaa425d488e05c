//! PagePilot command-line front-end.

pub mod bootstrap;
pub mod cli;
pub mod logging;
pub mod render;
pub mod repl;
