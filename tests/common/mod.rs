// SPDX-License-Identifier: MIT OR Apache-2.0

// Shared builders for the integration suites.

#![allow(dead_code)]

use tfgen_rust::core::{
    EventClass, FeatureSnapshot, PipelineConfig, Sample, TransitionPipeline,
};

/// Observed vocabulary from plain tokens.
pub fn classes(tokens: &[&str]) -> Vec<EventClass> {
    tokens.iter().map(|t| EventClass::new(*t)).collect()
}

/// Single-attribute sample.
pub fn sample(case: &str, attribute: &str) -> Sample {
    Sample::with_attribute(case, attribute)
}

/// Default configuration with the given window size.
pub fn config(window_size: usize) -> PipelineConfig {
    PipelineConfig {
        window_size,
        ..PipelineConfig::default()
    }
}

/// Weight of the `from -> to` transition in a snapshot, with tokens resolved
/// through the pipeline's class index (reserved tokens included).
pub fn weight_between(
    pipeline: &TransitionPipeline,
    snapshot: &FeatureSnapshot,
    from: &str,
    to: &str,
) -> f32 {
    let index = pipeline.index();
    let row = index.lookup(&EventClass::new(from));
    let col = index.lookup(&EventClass::new(to));
    snapshot.matrix.weight_at(row, col)
}
