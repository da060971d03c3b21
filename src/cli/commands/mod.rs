//! CLI command implementations

pub mod build;
pub mod cache;
pub mod completions;
pub mod config;
pub mod info;
pub mod init;
pub mod order;
pub mod project;
pub mod signature;
pub mod stats;

pub use build::execute as build;
pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use info::execute as info;
pub use init::execute as init;
pub use order::execute as order;
pub use signature::execute as signature;
pub use stats::execute as stats;
