// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sample Sources
//!
//! Adapters that turn external data into [`Sample`](crate::core::event::Sample)
//! sequences for the pipeline: delimited log files and a seeded synthetic
//! generator.

pub mod log_reader;
pub mod synthetic;

pub use log_reader::{LogReader, LogReaderConfig, LogStream};
pub use synthetic::{SyntheticSourceConfig, SyntheticTraceSource};
