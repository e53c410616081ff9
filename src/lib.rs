pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod report;
pub mod retrieve;
pub mod submit;
pub mod transfer;
pub mod util;
pub mod wire;
