// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input event record flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// One observed event: the case (trace) it belongs to plus its raw attribute tuple.
///
/// Attributes are opaque strings; the classifier turns the tuple into a single
/// event-class token. A row whose every attribute equals the configured end
/// marker closes its trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub case_id: String,
    pub attributes: Vec<String>,
}

impl Sample {
    pub fn new(case_id: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            case_id: case_id.into(),
            attributes,
        }
    }

    /// Convenience constructor for single-attribute event logs.
    pub fn with_attribute(case_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            attributes: vec![attribute.into()],
        }
    }
}
