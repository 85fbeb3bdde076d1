// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Synthetic Trace Source
//!
//! Seeded random process-log generator for demos, tests and benchmarks.
//! Interleaves a fixed set of concurrently open cases, draws activities from
//! a closed vocabulary (`act-0` .. `act-N`) and occasionally closes a trace
//! by emitting an end-marker row. The same seed always yields the same
//! sample sequence.

use crate::core::classify::EventClass;
use crate::core::error::{TfgenError, TfgenResult};
use crate::core::event::Sample;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shape of the generated log.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSourceConfig {
    /// Concurrently interleaved case identifiers (`case-0` ..).
    pub cases: usize,
    /// Activity vocabulary size (`act-0` ..).
    pub classes: usize,
    /// Total samples to emit.
    pub events: usize,
    /// Chance that a sample closes its trace instead of an activity.
    pub end_probability: f64,
    pub seed: u64,
    /// Attribute value emitted on trace-closing rows.
    pub end_marker: String,
}

impl Default for SyntheticSourceConfig {
    fn default() -> Self {
        Self {
            cases: 5,
            classes: 8,
            events: 1000,
            end_probability: 0.05,
            seed: 7,
            end_marker: "EOT".to_string(),
        }
    }
}

/// Deterministic sample iterator over the configured log shape.
#[derive(Debug)]
pub struct SyntheticTraceSource {
    config: SyntheticSourceConfig,
    rng: StdRng,
    emitted: usize,
}

impl SyntheticTraceSource {
    pub fn new(config: SyntheticSourceConfig) -> TfgenResult<Self> {
        if config.cases < 1 {
            return Err(TfgenError::configuration_with_parameter(
                "at least one case is required",
                "cases",
            ));
        }
        if config.classes < 1 {
            return Err(TfgenError::configuration_with_parameter(
                "at least one event class is required",
                "classes",
            ));
        }
        if !(0.0..=1.0).contains(&config.end_probability) {
            return Err(TfgenError::configuration_with_parameter(
                "end probability must lie in [0, 1]",
                "end-probability",
            ));
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            rng,
            emitted: 0,
        })
    }

    /// The closed activity vocabulary this source draws from, for building
    /// the class index up front.
    pub fn vocabulary(&self) -> Vec<EventClass> {
        (0..self.config.classes)
            .map(|i| EventClass::new(format!("act-{i}")))
            .collect()
    }

    pub fn config(&self) -> &SyntheticSourceConfig {
        &self.config
    }
}

impl Iterator for SyntheticTraceSource {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.emitted >= self.config.events {
            return None;
        }
        self.emitted += 1;

        let case_id = format!("case-{}", self.rng.gen_range(0..self.config.cases));
        let attribute = if self.rng.gen::<f64>() < self.config.end_probability {
            self.config.end_marker.clone()
        } else {
            format!("act-{}", self.rng.gen_range(0..self.config.classes))
        };
        Some(Sample::with_attribute(case_id, attribute))
    }
}
