// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Transition Pipeline Controller
//!
//! Owns the bounded input/output channels, runs the processing engine as a
//! dedicated worker thread and exposes the ingestion and retrieval surface.
//!
//! ```text
//!  caller ──► ingestion API ──► input channel ──► engine worker ──► output channel ──► retrieval API
//!             (bulk feeds via a background thread; direct pushes inline)
//! ```
//!
//! ## Ingestion modes
//!
//! The first ingestion call fixes the pipeline's mode; mixing modes afterwards
//! is a usage error:
//!
//! - **bulk** ([`TransitionPipeline::load_bulk`]): a background feeder pushes a
//!   finite row set and appends the termination signal itself.
//! - **streaming** ([`TransitionPipeline::load_stream`]): a background feeder
//!   drains a caller-supplied iterator; the caller terminates explicitly.
//! - **direct** ([`TransitionPipeline::push_one`]): the caller's thread
//!   enqueues one sample at a time.
//!
//! Both feeder-backed modes run through the same sample-sequence adapter; they
//! differ only in whether the termination signal is appended.
//!
//! ## Retrieval and completion
//!
//! Retrieval returns [`StreamOutput`] values; consumers must match the
//! explicit [`StreamOutput::EndOfStream`] sentinel. Observing the sentinel
//! applies the configured [`CompletionPolicy`]: `Reset` (default) starts a
//! fresh engine generation so a new data set can be loaded immediately,
//! `Halt` freezes the pipeline until [`TransitionPipeline::reset`] is called.
//!
//! ```rust,ignore
//! let mut pipeline = TransitionPipeline::new(&classes, PipelineConfig::default())?;
//! pipeline.load_bulk(rows, "january audit log")?;
//! for snapshot in pipeline.pull_all()? {
//!     push_to_detector(snapshot);
//! }
//! ```
//!
//! Channels are bounded (default capacity 10), which is the only backpressure
//! mechanism: a fast producer blocks on the input channel, a slow consumer
//! blocks the engine on the output channel.

use crate::core::classify::{EventClass, EventClassIndex, EventClassifier, ReservedTokens};
use crate::core::engine::{
    EngineMetrics, EngineMetricsSnapshot, FeatureSnapshot, InputMessage, MatrixVariant,
    OutputMessage, TransitionEngine,
};
use crate::core::error::{TfgenError, TfgenResult};
use crate::core::event::Sample;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pipeline construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Name used in logs and worker thread names.
    pub name: String,
    /// Transitions held in the sliding window.
    pub window_size: usize,
    /// Snapshot representation.
    pub variant: MatrixVariant,
    /// Capacity of both the input and output channel.
    pub channel_capacity: usize,
    /// Exact matrix recount every this many transitions; `None` disables it.
    pub resync_interval: Option<u64>,
    /// What happens when the end-of-stream sentinel is observed on retrieval.
    pub completion: CompletionPolicy,
    /// Control tokens appended to the vocabulary.
    pub reserved: ReservedTokens,
    /// Separator joining attribute tuples into class tokens.
    pub attribute_separator: String,
    /// Attribute value that, repeated across a whole row, closes a trace.
    pub end_of_trace_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "tfgen".to_string(),
            window_size: 500,
            variant: MatrixVariant::Dense,
            channel_capacity: 10,
            resync_interval: None,
            completion: CompletionPolicy::Reset,
            reserved: ReservedTokens::default(),
            attribute_separator: "-".to_string(),
            end_of_trace_marker: "EOT".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Validate construction-time parameters. Fatal; nothing starts on error.
    pub fn validate(&self) -> TfgenResult<()> {
        if self.window_size < 1 {
            return Err(TfgenError::configuration_with_parameter(
                "window size must be at least 1",
                "window-size",
            ));
        }
        if self.channel_capacity < 1 {
            return Err(TfgenError::configuration_with_parameter(
                "channel capacity must be at least 1",
                "channel-capacity",
            ));
        }
        if self.resync_interval == Some(0) {
            return Err(TfgenError::configuration_with_parameter(
                "resync interval must be at least 1 when set",
                "resync-interval",
            ));
        }
        if self.end_of_trace_marker.is_empty() {
            return Err(TfgenError::configuration_with_parameter(
                "end-of-trace marker must not be empty",
                "end-of-trace-marker",
            ));
        }
        Ok(())
    }
}

/// Policy applied when the end-of-stream sentinel is observed on retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionPolicy {
    /// Start a fresh engine generation (new tracker, window and channels).
    #[default]
    Reset,
    /// Freeze the pipeline; every call fails until `reset()` is invoked.
    Halt,
}

/// How samples enter the pipeline. Fixed by the first ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionMode {
    Bulk,
    Streaming,
    Direct,
}

impl fmt::Display for IngestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IngestionMode::Bulk => "bulk",
            IngestionMode::Streaming => "streaming",
            IngestionMode::Direct => "direct",
        })
    }
}

/// One retrieval result: a snapshot, or the explicit end-of-stream sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutput {
    Snapshot(FeatureSnapshot),
    EndOfStream,
}

/// The public face of the system: configures and owns one engine worker and
/// the channels around it.
#[derive(Debug)]
pub struct TransitionPipeline {
    config: PipelineConfig,
    index: Arc<EventClassIndex>,
    input: Sender<InputMessage>,
    output: Receiver<OutputMessage>,
    worker: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    metrics: Arc<EngineMetrics>,
    mode: Option<IngestionMode>,
    halted: bool,
    generation: u64,
}

/// Channels, worker, shutdown flag and counters of one engine run.
struct EngineGeneration {
    input: Sender<InputMessage>,
    output: Receiver<OutputMessage>,
    worker: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    metrics: Arc<EngineMetrics>,
}

fn start_generation(
    generation: u64,
    index: &Arc<EventClassIndex>,
    config: &PipelineConfig,
) -> TfgenResult<EngineGeneration> {
    let (input_tx, input_rx) = bounded(config.channel_capacity);
    let (output_tx, output_rx) = bounded(config.channel_capacity);
    let metrics = Arc::new(EngineMetrics::default());

    let classifier = EventClassifier::new(
        &config.reserved,
        config.attribute_separator.as_str(),
        config.end_of_trace_marker.as_str(),
    );
    let engine = TransitionEngine::new(
        config.name.clone(),
        Arc::clone(index),
        classifier,
        config.variant,
        config.window_size,
        config.resync_interval,
        input_rx,
        output_tx,
        Arc::clone(&metrics),
    );

    let shutdown = engine.shutdown_handle();
    let worker = thread::Builder::new()
        .name(format!("{}-engine-{generation}", config.name))
        .spawn(move || engine.run())?;

    Ok(EngineGeneration {
        input: input_tx,
        output: output_rx,
        worker,
        shutdown,
        metrics,
    })
}

/// Push a sample sequence into the engine; the single adapter behind both
/// feeder-backed ingestion modes.
fn feed_samples<I>(name: &str, input: &Sender<InputMessage>, samples: I, terminate_after: bool)
where
    I: Iterator<Item = Sample>,
{
    let mut delivered = 0u64;
    for sample in samples {
        if input.send(InputMessage::Sample(sample)).is_err() {
            log::warn!("[{name}] engine stopped mid-feed after {delivered} samples");
            return;
        }
        delivered += 1;
    }

    if terminate_after && input.send(InputMessage::Terminate).is_err() {
        log::warn!("[{name}] engine stopped before the termination signal was delivered");
        return;
    }
    log::debug!("[{name}] feeder finished after {delivered} samples");
}

impl TransitionPipeline {
    /// Build the class index, start the engine worker and return the ready
    /// pipeline.
    ///
    /// Fails on invalid configuration (zero window size, reserved-token
    /// collision, duplicate observed class); nothing is spawned on error.
    pub fn new(observed: &[EventClass], config: PipelineConfig) -> TfgenResult<Self> {
        config.validate()?;
        let index = Arc::new(EventClassIndex::build(observed, &config.reserved)?);
        let generation = start_generation(0, &index, &config)?;

        log::info!(
            "[{}] pipeline started (window: {}, classes: {}, variant: {:?})",
            config.name,
            config.window_size,
            index.len(),
            config.variant
        );

        Ok(Self {
            config,
            index,
            input: generation.input,
            output: generation.output,
            worker: Some(generation.worker),
            shutdown: generation.shutdown,
            metrics: generation.metrics,
            mode: None,
            halted: false,
            generation: 0,
        })
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Feed a finite row set from a background thread (bulk mode).
    ///
    /// The feeder appends the termination signal after the last row, so a
    /// subsequent [`pull_all`](Self::pull_all) drains the complete run.
    /// `source` only describes the data origin in logs.
    pub fn load_bulk(&mut self, rows: Vec<Sample>, source: &str) -> TfgenResult<()> {
        self.activate_mode(IngestionMode::Bulk, "load_bulk")?;
        log::debug!(
            "[{}] bulk loading {} samples from {source}",
            self.config.name,
            rows.len()
        );
        self.spawn_feeder(rows.into_iter(), true)
    }

    /// Feed a lazy, possibly unbounded sample sequence from a background
    /// thread (streaming mode). No termination signal is appended; call
    /// [`terminate`](Self::terminate) when the stream ends.
    pub fn load_stream<I>(&mut self, samples: I) -> TfgenResult<()>
    where
        I: Iterator<Item = Sample> + Send + 'static,
    {
        self.activate_mode(IngestionMode::Streaming, "load_stream")?;
        self.spawn_feeder(samples, false)
    }

    /// Enqueue one sample from the caller's thread (direct mode). Blocks when
    /// the input channel is full.
    pub fn push_one(&mut self, case_id: impl Into<String>, attributes: Vec<String>) -> TfgenResult<()> {
        self.activate_mode(IngestionMode::Direct, "push_one")?;
        self.input
            .send(InputMessage::Sample(Sample::new(case_id, attributes)))
            .map_err(|_| TfgenError::send_error("engine worker is no longer accepting samples"))
    }

    /// Inject the termination signal. The engine forwards the end-of-stream
    /// sentinel to the output and finishes.
    pub fn terminate(&mut self) -> TfgenResult<()> {
        self.ensure_not_halted()?;
        self.input
            .send(InputMessage::Terminate)
            .map_err(|_| TfgenError::send_error("engine worker already terminated"))
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Non-blocking retrieval of the next output.
    ///
    /// Returns a not-ready error while no output exists yet, which is distinct
    /// from stream completion: completion arrives as
    /// [`StreamOutput::EndOfStream`].
    pub fn pull_next(&mut self) -> TfgenResult<StreamOutput> {
        self.ensure_not_halted()?;
        match self.output.try_recv() {
            Ok(message) => self.handle_output(message),
            Err(TryRecvError::Empty) => Err(TfgenError::not_ready(
                "no output yet; the window is still filling or samples are still queued",
            )),
            Err(TryRecvError::Disconnected) => Err(TfgenError::engine_stopped(
                "engine worker terminated unexpectedly",
            )),
        }
    }

    /// Blocking retrieval with a timeout escape.
    pub fn pull_next_timeout(&mut self, timeout: Duration) -> TfgenResult<StreamOutput> {
        self.ensure_not_halted()?;
        match self.output.recv_timeout(timeout) {
            Ok(message) => self.handle_output(message),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(TfgenError::not_ready(
                format!("no output arrived within {timeout:?}"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(
                TfgenError::engine_stopped("engine worker terminated unexpectedly"),
            ),
        }
    }

    /// Drain the whole run into a vector (bulk mode only).
    ///
    /// Blocks until the end-of-stream sentinel, then applies the completion
    /// policy and returns the ordered snapshots. A run terminated during
    /// warm-up yields an empty vector.
    pub fn pull_all(&mut self) -> TfgenResult<Vec<FeatureSnapshot>> {
        self.ensure_not_halted()?;
        if self.mode != Some(IngestionMode::Bulk) {
            return Err(TfgenError::incompatible_mode(
                "pull_all",
                self.active_mode_label(),
            ));
        }

        let mut snapshots = Vec::new();
        loop {
            match self.output.recv() {
                Ok(OutputMessage::Snapshot(snapshot)) => snapshots.push(snapshot),
                Ok(OutputMessage::EndOfStream) => {
                    self.complete()?;
                    return Ok(snapshots);
                }
                Err(_) => {
                    return Err(TfgenError::engine_stopped(
                        "engine worker terminated before the end of stream",
                    ))
                }
            }
        }
    }

    /// Blocking iterator over snapshots until the end-of-stream sentinel
    /// (bulk and streaming modes).
    ///
    /// The iterator consumes the sentinel itself and applies the completion
    /// policy when it ends.
    pub fn snapshots(&mut self) -> TfgenResult<SnapshotIter<'_>> {
        self.ensure_not_halted()?;
        if self.mode == Some(IngestionMode::Direct) {
            return Err(TfgenError::incompatible_mode("snapshots", "direct"));
        }
        Ok(SnapshotIter {
            pipeline: self,
            done: false,
        })
    }

    // ========================================================================
    // Lifecycle and introspection
    // ========================================================================

    /// Discard the current engine generation and start a fresh one: new
    /// tracker, window, channels and counters, ingestion mode cleared.
    ///
    /// Invoked automatically on end of stream under the `Reset` completion
    /// policy; call it manually to leave the `Halt` state or to abandon an
    /// active stream. Waits for the old worker to stop; a feeder blocked in
    /// its source cannot delay that beyond one shutdown poll interval.
    pub fn reset(&mut self) -> TfgenResult<()> {
        let next_generation = self.generation + 1;
        let next = start_generation(next_generation, &self.index, &self.config)?;

        // A feeder may still hold a clone of the old input sender, so closing
        // our channel ends alone cannot wake the old worker. The shutdown
        // flag stops it between messages; the abandoned feeder exits on its
        // own once its next send fails.
        self.shutdown.store(true, Ordering::Release);
        let old_input = std::mem::replace(&mut self.input, next.input);
        let old_output = std::mem::replace(&mut self.output, next.output);
        drop(old_input);
        drop(old_output);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("[{}] previous engine worker panicked", self.config.name);
            }
        }

        self.worker = Some(next.worker);
        self.shutdown = next.shutdown;
        self.metrics = next.metrics;
        self.mode = None;
        self.halted = false;
        self.generation = next_generation;
        log::debug!(
            "[{}] pipeline reset (generation {})",
            self.config.name,
            next_generation
        );
        Ok(())
    }

    /// Counters of the current engine generation.
    pub fn metrics(&self) -> EngineMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The class index shared with the engine (for labels and dimensions).
    pub fn index(&self) -> &EventClassIndex {
        &self.index
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mode fixed by the first ingestion call, if any yet.
    pub fn active_mode(&self) -> Option<IngestionMode> {
        self.mode
    }

    /// Engine generation counter; incremented by every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn activate_mode(&mut self, requested: IngestionMode, operation: &str) -> TfgenResult<()> {
        self.ensure_not_halted()?;
        match self.mode {
            None => {
                self.mode = Some(requested);
                log::debug!("[{}] ingestion mode set to {requested}", self.config.name);
                Ok(())
            }
            Some(active) if active == requested => Ok(()),
            Some(active) => Err(TfgenError::incompatible_mode(operation, active.to_string())),
        }
    }

    fn spawn_feeder<I>(&self, samples: I, terminate_after: bool) -> TfgenResult<()>
    where
        I: Iterator<Item = Sample> + Send + 'static,
    {
        let name = self.config.name.clone();
        let input = self.input.clone();
        thread::Builder::new()
            .name(format!("{}-feeder", self.config.name))
            .spawn(move || feed_samples(&name, &input, samples, terminate_after))?;
        Ok(())
    }

    fn handle_output(&mut self, message: OutputMessage) -> TfgenResult<StreamOutput> {
        match message {
            OutputMessage::Snapshot(snapshot) => Ok(StreamOutput::Snapshot(snapshot)),
            OutputMessage::EndOfStream => {
                self.complete()?;
                Ok(StreamOutput::EndOfStream)
            }
        }
    }

    /// Apply the completion policy after the sentinel was observed.
    fn complete(&mut self) -> TfgenResult<()> {
        match self.config.completion {
            CompletionPolicy::Reset => {
                log::debug!("[{}] end of stream observed, resetting", self.config.name);
                self.reset()
            }
            CompletionPolicy::Halt => {
                log::debug!("[{}] end of stream observed, halting", self.config.name);
                self.halted = true;
                Ok(())
            }
        }
    }

    fn ensure_not_halted(&self) -> TfgenResult<()> {
        if self.halted {
            return Err(TfgenError::engine_stopped(
                "pipeline halted after end of stream; call reset() to start a new run",
            ));
        }
        Ok(())
    }

    fn active_mode_label(&self) -> String {
        match self.mode {
            Some(mode) => mode.to_string(),
            None => "idle".to_string(),
        }
    }
}

impl Drop for TransitionPipeline {
    fn drop(&mut self) {
        // A feeder clone can keep the input channel connected after both our
        // channel ends are gone; the flag lets the worker stop regardless.
        // No join here, the worker exits on its own.
        self.shutdown.store(true, Ordering::Release);
    }
}

/// Blocking snapshot iterator returned by [`TransitionPipeline::snapshots`].
#[derive(Debug)]
pub struct SnapshotIter<'a> {
    pipeline: &'a mut TransitionPipeline,
    done: bool,
}

impl Iterator for SnapshotIter<'_> {
    type Item = FeatureSnapshot;

    fn next(&mut self) -> Option<FeatureSnapshot> {
        if self.done {
            return None;
        }
        match self.pipeline.output.recv() {
            Ok(OutputMessage::Snapshot(snapshot)) => Some(snapshot),
            Ok(OutputMessage::EndOfStream) => {
                self.done = true;
                if let Err(e) = self.pipeline.complete() {
                    log::warn!(
                        "[{}] completion after end of stream failed: {e}",
                        self.pipeline.config.name
                    );
                }
                None
            }
            Err(_) => {
                log::warn!(
                    "[{}] engine worker terminated before the end of stream",
                    self.pipeline.config.name
                );
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(tokens: &[&str]) -> Vec<EventClass> {
        tokens.iter().map(|t| EventClass::new(*t)).collect()
    }

    fn sample(case: &str, attr: &str) -> Sample {
        Sample::with_attribute(case, attr)
    }

    fn config(window_size: usize) -> PipelineConfig {
        PipelineConfig {
            window_size,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_invalid_window_size_is_rejected() {
        let result = TransitionPipeline::new(&classes(&["a"]), config(0));
        assert!(matches!(result, Err(TfgenError::Configuration { .. })));
    }

    #[test]
    fn test_bulk_load_and_pull_all() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(2)).unwrap();
        let rows = vec![
            sample("c1", "a"),
            sample("c1", "b"),
            sample("c1", "a"),
            sample("c1", "b"),
        ];

        pipeline.load_bulk(rows, "test rows").unwrap();
        let snapshots = pipeline.pull_all().unwrap();

        // Warm-up covers the first two transitions, then one snapshot per event.
        assert_eq!(snapshots.len(), 3);
        for snapshot in &snapshots {
            assert!((snapshot.matrix.total_weight() - 1.0).abs() < 1e-5);
        }

        // Reset policy started a fresh generation and cleared the mode.
        assert_eq!(pipeline.generation(), 1);
        assert_eq!(pipeline.active_mode(), None);
    }

    #[test]
    fn test_bulk_terminated_during_warm_up_yields_nothing() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(8)).unwrap();
        pipeline
            .load_bulk(vec![sample("c1", "a"), sample("c1", "b")], "short run")
            .unwrap();

        let snapshots = pipeline.pull_all().unwrap();
        assert!(snapshots.is_empty());
        assert_eq!(pipeline.generation(), 1);
    }

    #[test]
    fn test_direct_mode_flow() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(2)).unwrap();
        pipeline.push_one("c1", vec!["a".to_string()]).unwrap();
        pipeline.push_one("c1", vec!["b".to_string()]).unwrap();

        match pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap() {
            StreamOutput::Snapshot(snapshot) => assert_eq!(snapshot.case_id, "c1"),
            other => panic!("unexpected output: {other:?}"),
        }

        pipeline.terminate().unwrap();
        assert_eq!(
            pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap(),
            StreamOutput::EndOfStream
        );
        assert_eq!(pipeline.generation(), 1);
    }

    #[test]
    fn test_pull_next_is_not_ready_before_first_snapshot() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(2)).unwrap();
        pipeline.push_one("c1", vec!["a".to_string()]).unwrap();

        // One event can never fill a two-transition window.
        assert!(matches!(
            pipeline.pull_next(),
            Err(TfgenError::NotReady { .. })
        ));
    }

    #[test]
    fn test_mixing_ingestion_modes_is_rejected() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a"]), config(2)).unwrap();
        pipeline.push_one("c1", vec!["a".to_string()]).unwrap();

        let result = pipeline.load_bulk(vec![sample("c2", "a")], "late bulk");
        assert!(matches!(result, Err(TfgenError::IncompatibleMode { .. })));
    }

    #[test]
    fn test_pull_all_requires_bulk_mode() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a"]), config(2)).unwrap();
        pipeline.push_one("c1", vec!["a".to_string()]).unwrap();

        assert!(matches!(
            pipeline.pull_all(),
            Err(TfgenError::IncompatibleMode { .. })
        ));
    }

    #[test]
    fn test_snapshots_iterator_rejected_in_direct_mode() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a"]), config(2)).unwrap();
        pipeline.push_one("c1", vec!["a".to_string()]).unwrap();

        assert!(matches!(
            pipeline.snapshots(),
            Err(TfgenError::IncompatibleMode { .. })
        ));
    }

    #[test]
    fn test_snapshots_iterator_drains_bulk_run() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(2)).unwrap();
        pipeline
            .load_bulk(
                vec![sample("c1", "a"), sample("c1", "b"), sample("c1", "a")],
                "test rows",
            )
            .unwrap();

        let collected: Vec<_> = pipeline.snapshots().unwrap().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(pipeline.active_mode(), None);
    }

    #[test]
    fn test_streaming_mode_with_explicit_termination() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(2)).unwrap();
        let rows = vec![sample("c1", "a"), sample("c1", "b"), sample("c1", "a")];
        pipeline.load_stream(rows.into_iter()).unwrap();

        match pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap() {
            StreamOutput::Snapshot(_) => {}
            other => panic!("unexpected output: {other:?}"),
        }
        match pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap() {
            StreamOutput::Snapshot(_) => {}
            other => panic!("unexpected output: {other:?}"),
        }

        pipeline.terminate().unwrap();
        assert_eq!(
            pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap(),
            StreamOutput::EndOfStream
        );
    }

    #[test]
    fn test_halt_policy_freezes_pipeline_until_reset() {
        let halt_config = PipelineConfig {
            window_size: 1,
            completion: CompletionPolicy::Halt,
            ..PipelineConfig::default()
        };
        let mut pipeline = TransitionPipeline::new(&classes(&["a"]), halt_config).unwrap();

        pipeline.push_one("c1", vec!["a".to_string()]).unwrap();
        pipeline.terminate().unwrap();

        match pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap() {
            StreamOutput::Snapshot(_) => {}
            other => panic!("unexpected output: {other:?}"),
        }
        assert_eq!(
            pipeline.pull_next_timeout(Duration::from_secs(5)).unwrap(),
            StreamOutput::EndOfStream
        );

        // Frozen: same generation, everything errors until reset.
        assert_eq!(pipeline.generation(), 0);
        assert!(matches!(
            pipeline.pull_next(),
            Err(TfgenError::EngineStopped { .. })
        ));
        assert!(matches!(
            pipeline.push_one("c2", vec!["a".to_string()]),
            Err(TfgenError::EngineStopped { .. })
        ));

        pipeline.reset().unwrap();
        assert_eq!(pipeline.generation(), 1);
        pipeline.push_one("c2", vec!["a".to_string()]).unwrap();
    }

    #[test]
    fn test_reload_after_auto_reset() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(2)).unwrap();
        pipeline
            .load_bulk(
                vec![sample("c1", "a"), sample("c1", "b"), sample("c1", "a")],
                "first run",
            )
            .unwrap();
        assert_eq!(pipeline.pull_all().unwrap().len(), 2);

        // The fresh generation accepts a different mode and starts cold.
        pipeline.push_one("c9", vec!["b".to_string()]).unwrap();
        assert_eq!(pipeline.active_mode(), Some(IngestionMode::Direct));
        assert!(matches!(
            pipeline.pull_next(),
            Err(TfgenError::NotReady { .. })
        ));
    }

    #[test]
    fn test_reset_returns_while_stream_feeder_is_stalled() {
        let mut pipeline = TransitionPipeline::new(&classes(&["a", "b"]), config(4)).unwrap();

        // One delivered sample, then the source blocks inside next() while
        // the feeder still holds a clone of the input sender.
        let stalled = std::iter::once(sample("c1", "a")).chain(std::iter::from_fn(|| {
            thread::sleep(Duration::from_secs(3600));
            None
        }));
        pipeline.load_stream(stalled).unwrap();

        let (done_tx, done_rx) = bounded(1);
        thread::spawn(move || {
            pipeline.reset().unwrap();
            let _ = done_tx.send(pipeline);
        });

        let mut pipeline = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("reset should finish while the feeder is stalled");
        assert_eq!(pipeline.generation(), 1);
        pipeline.push_one("c2", vec!["b".to_string()]).unwrap();
    }
}
