//! Polybuild - polyglot build orchestrator
//!
//! Detects the languages and build tools in a repository, runs their builds
//! in dependency order, and skips units whose inputs have not changed since
//! their last successful build.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod history;
pub mod runner;
pub mod strategy;
pub mod ui;

pub use error::{PolybuildError, PolybuildResult};
