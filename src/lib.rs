pub mod cli;
pub mod config;
pub mod console;
pub mod pipeline;
pub mod runner;
