pub mod cache;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod render;
