//! Side-effecting operations: model backends, child processes, config and files.

pub mod codex;
pub mod config;
pub mod diagram;
pub mod gateway;
pub mod openai;
pub mod process;
pub mod prompt;
