pub mod cli;
pub mod domain;
pub mod infra;
pub mod llm;
pub mod logs;
pub mod prompts;
