#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! lookout-core
//!
//! Shared vocabulary of the instant-search client: query and response types,
//! the gateway seam, configuration loading and the dataset splitter.

pub mod config;
pub mod dataset;
pub mod error;
pub mod traits;
pub mod types;
