//! Pipeline stages of the probability engine
//!
//! # Stages
//!
//! - **classifier**: open/close → [`Direction`](crate::Direction)
//! - **compiler**: [`PatternSpec`] → [`CompiledPattern`]
//! - **matcher**: direction series + pattern → boolean match series
//! - **aggregator**: match series → [`AggregateStats`] / [`Outcome`]
//! - **report**: aggregation → display-ready [`Report`]

pub mod helpers;

pub mod aggregator;
pub mod classifier;
pub mod compiler;
pub mod matcher;
pub mod report;

pub use aggregator::*;
pub use classifier::*;
pub use compiler::*;
pub use helpers::*;
pub use matcher::*;
pub use report::*;
