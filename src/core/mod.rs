// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod classify;
pub mod engine;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod source;
pub mod trace;
pub mod window;

pub use self::classify::{
    discover_event_classes, discover_top_event_classes, EventClass, EventClassIndex,
    EventClassifier, ReservedTokens,
};
pub use self::engine::{
    EngineMetrics, EngineMetricsSnapshot, FeatureSnapshot, MatrixVariant, TransitionEngine,
};
pub use self::error::{TfgenError, TfgenResult};
pub use self::event::Sample;
pub use self::pipeline::{
    CompletionPolicy, IngestionMode, PipelineConfig, SnapshotIter, StreamOutput,
    TransitionPipeline,
};
pub use self::source::{
    LogReader, LogReaderConfig, LogStream, SyntheticSourceConfig, SyntheticTraceSource,
};
pub use self::trace::TraceStateTracker;
pub use self::window::{MatrixSnapshot, SlidingWindowCounter, SparseCell, TransitionMatrix};
