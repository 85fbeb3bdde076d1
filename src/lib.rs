// SPDX-License-Identifier: MIT OR Apache-2.0

//! # tfgen_rust
//!
//! Streaming transition-frequency features over process event logs.
//!
//! The crate turns a raw event stream (one row per event, grouped by case
//! identifier) into a stream of fixed-dimension transition matrices: each
//! output describes how often every event class followed every other event
//! class within a sliding window of recent transitions. Downstream consumers
//! use the matrices as online feature vectors, typically for drift or anomaly
//! detection over business processes.
//!
//! ```text
//!  rows ──► TransitionPipeline ──► TransitionEngine ──► snapshots
//!            │  bounded input        │ classify (EventClassifier / EventClassIndex)
//!            │  channel              │ pair per case (TraceStateTracker)
//!            │                       │ count in window (SlidingWindowCounter)
//!            └── bounded output ◄────┘ dense or sparse snapshot per event
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tfgen_rust::core::{PipelineConfig, Sample, TransitionPipeline};
//! use tfgen_rust::core::discover_event_classes;
//! use tfgen_rust::core::{EventClassifier, ReservedTokens};
//!
//! # fn main() -> tfgen_rust::core::TfgenResult<()> {
//! let rows = vec![
//!     Sample::with_attribute("order-1", "created"),
//!     Sample::with_attribute("order-1", "paid"),
//!     Sample::with_attribute("order-2", "created"),
//!     Sample::with_attribute("order-1", "shipped"),
//! ];
//!
//! let config = PipelineConfig {
//!     window_size: 2,
//!     ..PipelineConfig::default()
//! };
//! let reserved = ReservedTokens::default();
//! let classifier = EventClassifier::new(&reserved, "-", "EOT");
//! let attribute_rows: Vec<_> = rows.iter().map(|s| s.attributes.clone()).collect();
//! let classes = discover_event_classes(&attribute_rows, &classifier);
//!
//! let mut pipeline = TransitionPipeline::new(&classes, config)?;
//! pipeline.load_bulk(rows, "order log")?;
//! for snapshot in pipeline.pull_all()? {
//!     println!("{} -> {} live transitions", snapshot.case_id, snapshot.matrix.nonzero_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key properties
//!
//! - **Fixed dimensions**: the event-class vocabulary is closed at
//!   construction; three reserved tokens (start-of-trace, end-of-trace,
//!   default) extend it, and unseen classes map onto the default token
//!   instead of growing the matrix.
//! - **Per-case pairing**: transitions are formed within a case even when
//!   cases interleave arbitrarily on the wire.
//! - **Bounded memory**: the window holds at most `window_size` transitions;
//!   totals are conserved at `1.0` once warm, regardless of stream length.
//! - **Bounded channels**: small input/output channels (default capacity 10)
//!   are the only coupling between producer, engine worker and consumer.

pub mod core;

pub use crate::core::{
    discover_event_classes, discover_top_event_classes, CompletionPolicy, EventClass,
    EventClassIndex, EventClassifier, FeatureSnapshot, IngestionMode, LogReader, LogReaderConfig,
    MatrixSnapshot, MatrixVariant, PipelineConfig, ReservedTokens, Sample, SparseCell,
    StreamOutput, SyntheticSourceConfig, SyntheticTraceSource, TfgenError, TfgenResult,
    TransitionPipeline,
};
