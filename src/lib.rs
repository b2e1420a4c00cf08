pub mod assembler;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod resolver;
pub mod table;
pub mod transcoder;
