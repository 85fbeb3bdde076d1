// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event Class Index
//!
//! Static mapping from event-class tokens to dense matrix indices. Built once
//! per pipeline and immutable afterwards; runtime lookups never fail because
//! unknown tokens fall back to the default class.

use super::{EventClass, ReservedTokens};
use crate::core::error::{TfgenError, TfgenResult};
use std::collections::HashMap;

/// Reserved control tokens appended after the observed vocabulary.
const RESERVED_CLASS_COUNT: usize = 3;

/// Token -> dense index mapping over the observed vocabulary plus the three
/// reserved tokens.
///
/// Layout: observed classes keep their given order at indices `0..K`, followed
/// by start-of-trace (`K`), end-of-trace (`K+1`) and the default class (`K+2`).
/// The matrix dimension is therefore `K + 3`.
#[derive(Debug, Clone)]
pub struct EventClassIndex {
    positions: HashMap<EventClass, usize>,
    labels: Vec<EventClass>,
    start_of_trace: usize,
    end_of_trace: usize,
    default_class: usize,
}

impl EventClassIndex {
    /// Build the index from an ordered observed vocabulary.
    ///
    /// Fails with a configuration error when an observed class duplicates
    /// another, collides with a reserved token, or the reserved tokens are not
    /// pairwise distinct.
    pub fn build(observed: &[EventClass], reserved: &ReservedTokens) -> TfgenResult<Self> {
        if reserved.start_of_trace == reserved.end_of_trace
            || reserved.start_of_trace == reserved.default_class
            || reserved.end_of_trace == reserved.default_class
        {
            return Err(TfgenError::configuration_with_parameter(
                "reserved tokens must be pairwise distinct",
                "reserved",
            ));
        }

        let reserved_tokens = [
            &reserved.start_of_trace,
            &reserved.end_of_trace,
            &reserved.default_class,
        ];

        let mut positions =
            HashMap::with_capacity(observed.len() + RESERVED_CLASS_COUNT);
        let mut labels: Vec<EventClass> =
            Vec::with_capacity(observed.len() + RESERVED_CLASS_COUNT);

        for class in observed {
            if reserved_tokens.contains(&class) {
                return Err(TfgenError::configuration_with_parameter(
                    format!("observed event class '{class}' collides with a reserved token"),
                    "observed_classes",
                ));
            }
            if positions.insert(class.clone(), labels.len()).is_some() {
                return Err(TfgenError::configuration_with_parameter(
                    format!("duplicate observed event class '{class}'"),
                    "observed_classes",
                ));
            }
            labels.push(class.clone());
        }

        let mut append_reserved = |token: &EventClass| {
            let index = labels.len();
            positions.insert(token.clone(), index);
            labels.push(token.clone());
            index
        };

        let start_of_trace = append_reserved(&reserved.start_of_trace);
        let end_of_trace = append_reserved(&reserved.end_of_trace);
        let default_class = append_reserved(&reserved.default_class);

        Ok(Self {
            positions,
            labels,
            start_of_trace,
            end_of_trace,
            default_class,
        })
    }

    /// Exact position of a token, or `None` when it is not in the vocabulary.
    pub fn position(&self, class: &EventClass) -> Option<usize> {
        self.positions.get(class).copied()
    }

    /// Position of a token with unknown tokens absorbed by the default class.
    pub fn lookup(&self, class: &EventClass) -> usize {
        self.position(class).unwrap_or(self.default_class)
    }

    /// Token at a given index, for presentation.
    pub fn label(&self, index: usize) -> Option<&EventClass> {
        self.labels.get(index)
    }

    /// All tokens in index order.
    pub fn labels(&self) -> &[EventClass] {
        &self.labels
    }

    /// Total class count (observed + reserved), i.e. the matrix dimension.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of observed (non-reserved) classes.
    pub fn observed_count(&self) -> usize {
        self.labels.len() - RESERVED_CLASS_COUNT
    }

    pub fn start_of_trace(&self) -> usize {
        self.start_of_trace
    }

    pub fn end_of_trace(&self) -> usize {
        self.end_of_trace
    }

    pub fn default_class(&self) -> usize {
        self.default_class
    }
}
