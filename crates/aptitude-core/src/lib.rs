//! aptitude-core: question allocation, grading, and ranking engine.
//!
//! This crate defines the data model, the storage trait, and the pure
//! allocation and scoring logic that the aptitude test system builds on.

pub mod assignment;
pub mod bucket;
pub mod config;
pub mod engine;
pub mod error;
pub mod grader;
pub mod model;
pub mod parser;
pub mod quota;
pub mod ranking;
pub mod report;
pub mod sampler;
pub mod scoring;
pub mod store;

pub use engine::ExamEngine;
pub use error::{EngineError, EngineResult};
