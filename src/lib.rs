pub mod config;
pub mod engine;
pub mod execution;
pub mod meli;
pub mod pipeline;
pub mod portal;
pub mod report;
