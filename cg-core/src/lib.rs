#![deny(
    clippy::nursery,
    clippy::pedantic,
    missing_docs,
    clippy::missing_docs_in_private_items,
)]

//! # cg-core – shared plumbing for `CaseGen`
//!
//! Configuration, error types and logging setup used by the generation engine and its
//! command-line front end.

pub mod config;
pub mod errors;
pub mod logging;

pub use config::GenerationConfig;
pub use errors::{
    CaseGenError,
    Result,
};
