pub mod cache;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod dlq;
pub mod fanout;
pub mod oracle;
pub mod persistence;
pub mod pipeline;
pub mod resolver;

pub use context::RunContext;
pub use dag::{Dag, DagSummary};
