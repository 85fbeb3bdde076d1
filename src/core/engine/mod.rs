// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Transition Processing Engine
//!
//! The single worker that drains the input channel and turns samples into
//! windowed transition-matrix snapshots.
//!
//! ```text
//!  input channel ──► classify ──► trace tracker ──► window counter ──► output channel
//!   Sample | Terminate   │              │                  │          Snapshot | EndOfStream
//!                        ▼              ▼                  ▼
//!                  class index    prev class per case   +1/W, -1/W
//! ```
//!
//! Event processing is strictly sequential: transitions depend on per-case
//! history, so there is exactly one engine worker and no parallel event path.
//! The engine starts warming up, emits its first snapshot with the event that
//! fills the window, then emits one snapshot per event until the termination
//! message arrives. Termination is forwarded to the output channel as an
//! explicit end-of-stream value; a termination that arrives before the window
//! has filled discards the partial window and emits nothing else, so consumers
//! never see a snapshot whose weights do not sum to one.
//!
//! The worker also polls a shutdown flag between messages, so a discarded
//! generation stops even while producers still hold the input channel open.

use crate::core::classify::{EventClassIndex, EventClassifier};
use crate::core::error::{TfgenError, TfgenResult};
use crate::core::event::Sample;
use crate::core::trace::TraceStateTracker;
use crate::core::window::{MatrixSnapshot, SlidingWindowCounter};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use crossbeam_utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked worker waits between shutdown-flag checks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Snapshot representation emitted by the engine.
///
/// `Dense` copies the full matrix; `CompressedSparse` keeps only non-zero
/// cells, which stays small when the class space is large and the window is
/// short. The variant is fixed at construction and dispatched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixVariant {
    #[default]
    Dense,
    CompressedSparse,
}

/// Engine lifecycle. Strictly linear; `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    WarmingUp,
    SteadyState,
    Finished,
}

/// Messages accepted on the engine's input channel.
///
/// Termination is a dedicated variant rather than an event-class token, so it
/// can never collide with observed vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum InputMessage {
    Sample(Sample),
    Terminate,
}

/// Messages produced on the engine's output channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMessage {
    Snapshot(FeatureSnapshot),
    EndOfStream,
}

/// One emitted feature: the case of the event that produced it plus the
/// detached matrix copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub case_id: String,
    pub matrix: MatrixSnapshot,
}

/// Shared engine counters, readable while the worker runs.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    events_processed: CachePadded<AtomicU64>,
    snapshots_emitted: CachePadded<AtomicU64>,
    unknown_classes: CachePadded<AtomicU64>,
    open_cases: CachePadded<AtomicU64>,
}

impl EngineMetrics {
    pub fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self) {
        self.snapshots_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_class(&self) {
        self.unknown_classes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_open_cases(&self, open: u64) {
        self.open_cases.store(open, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            snapshots_emitted: self.snapshots_emitted.load(Ordering::Relaxed),
            unknown_classes: self.unknown_classes.load(Ordering::Relaxed),
            open_cases: self.open_cases.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMetricsSnapshot {
    pub events_processed: u64,
    pub snapshots_emitted: u64,
    pub unknown_classes: u64,
    pub open_cases: u64,
}

/// The stream worker. Owns the tracker, window and matrix exclusively; the
/// channels and the shutdown flag are its only connections to the rest of the
/// pipeline.
pub struct TransitionEngine {
    name: String,
    index: Arc<EventClassIndex>,
    classifier: EventClassifier,
    tracker: TraceStateTracker,
    counter: SlidingWindowCounter,
    variant: MatrixVariant,
    state: EngineState,
    current_case: Option<String>,
    input: Receiver<InputMessage>,
    output: Sender<OutputMessage>,
    metrics: Arc<EngineMetrics>,
    shutdown: Arc<AtomicBool>,
}

impl TransitionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        index: Arc<EventClassIndex>,
        classifier: EventClassifier,
        variant: MatrixVariant,
        window_size: usize,
        resync_interval: Option<u64>,
        input: Receiver<InputMessage>,
        output: Sender<OutputMessage>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let tracker = TraceStateTracker::new(index.start_of_trace(), index.end_of_trace());
        let counter = SlidingWindowCounter::new(index.len(), window_size, resync_interval);
        Self {
            name,
            index,
            classifier,
            tracker,
            counter,
            variant,
            state: EngineState::WarmingUp,
            current_case: None,
            input,
            output,
            metrics,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Flag checked between messages; setting it stops the worker within one
    /// poll interval even while producers still hold input senders.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Worker loop: drain the input channel until termination, disconnect or
    /// an external shutdown request.
    pub fn run(mut self) {
        log::debug!(
            "[{}] engine worker started (variant: {:?}, window: {}, classes: {})",
            self.name,
            self.variant,
            self.counter.window_size(),
            self.index.len()
        );

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                log::debug!("[{}] engine worker stopping on shutdown request", self.name);
                self.state = EngineState::Finished;
                return;
            }
            match self.input.recv_timeout(SHUTDOWN_POLL) {
                Ok(InputMessage::Sample(sample)) => {
                    if let Err(e) = self.process_sample(sample) {
                        if self.shutdown.load(Ordering::Acquire) {
                            log::debug!("[{}] {e} during shutdown", self.name);
                        } else {
                            log::error!("[{}] {e}; stopping engine worker", self.name);
                        }
                        self.state = EngineState::Finished;
                        return;
                    }
                }
                Ok(InputMessage::Terminate) => {
                    self.finish();
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // All producers dropped their senders without an explicit terminate.
        log::debug!(
            "[{}] input channel closed without a termination signal",
            self.name
        );
        self.state = EngineState::Finished;
    }

    fn process_sample(&mut self, sample: Sample) -> TfgenResult<()> {
        let class = self.classifier.classify(&sample.attributes);
        let curr = match self.index.position(&class) {
            Some(position) => position,
            None => {
                self.metrics.record_unknown_class();
                log::debug!(
                    "[{}] unknown event class '{}' absorbed by default",
                    self.name,
                    class
                );
                self.index.default_class()
            }
        };

        let prev = self.tracker.update(&sample.case_id, curr);
        self.counter.apply(prev, curr);
        self.current_case = Some(sample.case_id);
        self.metrics.record_event();
        self.metrics.set_open_cases(self.tracker.open_cases() as u64);

        match self.state {
            EngineState::WarmingUp => {
                if self.counter.is_warm() {
                    self.state = EngineState::SteadyState;
                    log::debug!(
                        "[{}] window filled after {} transitions, entering steady state",
                        self.name,
                        self.counter.applied()
                    );
                    self.emit_snapshot()?;
                }
            }
            EngineState::SteadyState => self.emit_snapshot()?,
            EngineState::Finished => {}
        }
        Ok(())
    }

    fn emit_snapshot(&mut self) -> TfgenResult<()> {
        let matrix = match self.variant {
            MatrixVariant::Dense => self.counter.matrix().to_dense_snapshot(),
            MatrixVariant::CompressedSparse => self.counter.matrix().to_sparse_snapshot(),
        };
        let snapshot = FeatureSnapshot {
            case_id: self.current_case.clone().unwrap_or_default(),
            matrix,
        };

        self.output
            .send(OutputMessage::Snapshot(snapshot))
            .map_err(|_| TfgenError::engine_stopped("snapshot consumer disconnected"))?;
        self.metrics.record_snapshot();
        Ok(())
    }

    fn finish(&mut self) {
        if self.state == EngineState::WarmingUp {
            log::debug!(
                "[{}] terminated during warm-up, discarding partial window ({} of {} transitions)",
                self.name,
                self.counter.occupancy(),
                self.counter.window_size()
            );
        }
        self.state = EngineState::Finished;
        if self.output.send(OutputMessage::EndOfStream).is_err() {
            log::warn!(
                "[{}] consumer disconnected before end of stream was delivered",
                self.name
            );
        }
        log::debug!(
            "[{}] end of stream after {} events",
            self.name,
            self.metrics.snapshot().events_processed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::ReservedTokens;
    use crossbeam_channel::bounded;

    fn build_engine(
        observed: &[&str],
        window_size: usize,
        variant: MatrixVariant,
    ) -> (
        TransitionEngine,
        Sender<InputMessage>,
        Receiver<OutputMessage>,
        Arc<EngineMetrics>,
    ) {
        let reserved = ReservedTokens::default();
        let classes: Vec<_> = observed
            .iter()
            .map(|t| crate::core::classify::EventClass::new(*t))
            .collect();
        let index = Arc::new(EventClassIndex::build(&classes, &reserved).unwrap());
        let classifier = EventClassifier::new(&reserved, "-", "EOT");
        let (input_tx, input_rx) = bounded(10);
        let (output_tx, output_rx) = bounded(10);
        let metrics = Arc::new(EngineMetrics::default());
        let engine = TransitionEngine::new(
            "test".to_string(),
            index,
            classifier,
            variant,
            window_size,
            None,
            input_rx,
            output_tx,
            Arc::clone(&metrics),
        );
        (engine, input_tx, output_rx, metrics)
    }

    fn sample(case: &str, attr: &str) -> Sample {
        Sample::with_attribute(case, attr)
    }

    #[test]
    fn test_no_snapshot_until_window_fills() {
        let (mut engine, _tx, output, _metrics) =
            build_engine(&["a", "b"], 2, MatrixVariant::Dense);

        engine.process_sample(sample("c1", "a")).unwrap();
        assert!(output.is_empty());
        assert_eq!(engine.state(), EngineState::WarmingUp);

        engine.process_sample(sample("c1", "b")).unwrap();
        assert_eq!(engine.state(), EngineState::SteadyState);
        let message = output.try_recv().unwrap();
        assert!(matches!(message, OutputMessage::Snapshot(_)));
    }

    #[test]
    fn test_steady_state_emits_one_snapshot_per_event() {
        let (mut engine, _tx, output, metrics) =
            build_engine(&["a", "b"], 2, MatrixVariant::Dense);

        for attr in ["a", "b", "a", "b"] {
            engine.process_sample(sample("c1", attr)).unwrap();
        }

        let mut snapshots = 0;
        while output.try_recv().is_ok() {
            snapshots += 1;
        }
        assert_eq!(snapshots, 3);
        assert_eq!(metrics.snapshot().snapshots_emitted, 3);
        assert_eq!(metrics.snapshot().events_processed, 4);
    }

    #[test]
    fn test_snapshot_carries_case_of_triggering_event() {
        let (mut engine, _tx, output, _metrics) =
            build_engine(&["a", "b"], 2, MatrixVariant::Dense);

        engine.process_sample(sample("c1", "a")).unwrap();
        engine.process_sample(sample("c2", "b")).unwrap();

        match output.try_recv().unwrap() {
            OutputMessage::Snapshot(snapshot) => assert_eq!(snapshot.case_id, "c2"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_class_counts_and_maps_to_default() {
        let (mut engine, _tx, output, metrics) =
            build_engine(&["a"], 1, MatrixVariant::Dense);

        engine.process_sample(sample("c1", "mystery")).unwrap();
        assert_eq!(metrics.snapshot().unknown_classes, 1);

        let index = Arc::clone(&engine.index);
        match output.try_recv().unwrap() {
            OutputMessage::Snapshot(snapshot) => {
                let weight =
                    snapshot.matrix.weight_at(index.start_of_trace(), index.default_class());
                assert_eq!(weight, 1.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_sparse_variant_emits_sparse_snapshots() {
        let (mut engine, _tx, output, _metrics) =
            build_engine(&["a", "b"], 2, MatrixVariant::CompressedSparse);

        engine.process_sample(sample("c1", "a")).unwrap();
        engine.process_sample(sample("c1", "b")).unwrap();

        match output.try_recv().unwrap() {
            OutputMessage::Snapshot(snapshot) => {
                assert!(matches!(snapshot.matrix, MatrixSnapshot::Sparse { .. }));
                assert_eq!(snapshot.matrix.nonzero_count(), 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_termination_during_warm_up_emits_only_end_of_stream() {
        let (engine, tx, output, _metrics) = build_engine(&["a", "b"], 8, MatrixVariant::Dense);

        let worker = std::thread::spawn(move || engine.run());
        tx.send(InputMessage::Sample(sample("c1", "a"))).unwrap();
        tx.send(InputMessage::Terminate).unwrap();
        worker.join().unwrap();

        assert_eq!(output.recv().unwrap(), OutputMessage::EndOfStream);
        assert!(output.try_recv().is_err());
    }

    #[test]
    fn test_run_forwards_end_of_stream_after_snapshots() {
        let (engine, tx, output, _metrics) = build_engine(&["a", "b"], 2, MatrixVariant::Dense);

        let worker = std::thread::spawn(move || engine.run());
        for attr in ["a", "b", "a"] {
            tx.send(InputMessage::Sample(sample("c1", attr))).unwrap();
        }
        tx.send(InputMessage::Terminate).unwrap();
        worker.join().unwrap();

        let mut messages = Vec::new();
        while let Ok(message) = output.try_recv() {
            messages.push(message);
        }
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], OutputMessage::Snapshot(_)));
        assert!(matches!(messages[1], OutputMessage::Snapshot(_)));
        assert_eq!(messages[2], OutputMessage::EndOfStream);
    }

    #[test]
    fn test_worker_exits_when_input_disconnects() {
        let (engine, tx, output, _metrics) = build_engine(&["a"], 2, MatrixVariant::Dense);

        let worker = std::thread::spawn(move || engine.run());
        drop(tx);
        worker.join().unwrap();

        // No termination message was sent, so nothing reaches the consumer.
        assert!(output.try_recv().is_err());
    }

    #[test]
    fn test_shutdown_flag_stops_worker_while_sender_is_held() {
        let (engine, tx, output, _metrics) = build_engine(&["a"], 2, MatrixVariant::Dense);
        let shutdown = engine.shutdown_handle();

        let worker = std::thread::spawn(move || engine.run());
        shutdown.store(true, Ordering::Release);
        // The sender is alive across the join, so the channel never
        // disconnects; only the flag can stop the worker here.
        worker.join().unwrap();

        assert!(output.try_recv().is_err());
        drop(tx);
    }
}
