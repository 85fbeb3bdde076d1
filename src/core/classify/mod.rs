// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Event Classification
//!
//! Turns raw attribute tuples into discrete event-class tokens and provides the
//! offline helpers that discover a class vocabulary from a finite log.
//!
//! ## Classification
//!
//! An event class is a deterministic function of the attribute tuple: the
//! attributes are joined with a configurable separator into a single token.
//! A row whose every attribute equals the configured end marker (default
//! `"EOT"`) classifies as the reserved end-of-trace token and closes its case.
//!
//! ```text
//! ["submit", "web"]   -> "submit-web"
//! ["EOT", "EOT"]      -> end-of-trace token
//! ```
//!
//! ## Reserved tokens
//!
//! Three control tokens are appended to every vocabulary and carried as an
//! explicit [`ReservedTokens`] value rather than ambient constants:
//! start-of-trace (synthetic predecessor of a case's first event),
//! end-of-trace (closes a case) and the default class that absorbs tokens
//! unknown to the index.

pub mod index;

pub use index::EventClassIndex;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque event-class token.
///
/// Equality-comparable and hashable; the engine never inspects its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventClass(String);

impl EventClass {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventClass {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for EventClass {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// The three control tokens appended to every class vocabulary.
///
/// Passed into [`EventClassIndex::build`]; the spellings only need to stay out
/// of the observed vocabulary, which index construction validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedTokens {
    pub start_of_trace: EventClass,
    pub end_of_trace: EventClass,
    pub default_class: EventClass,
}

impl Default for ReservedTokens {
    fn default() -> Self {
        Self {
            start_of_trace: EventClass::new("<start-of-trace>"),
            end_of_trace: EventClass::new("<end-of-trace>"),
            default_class: EventClass::new("<default>"),
        }
    }
}

/// Attribute tuple to event-class converter.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    separator: String,
    end_marker: String,
    end_of_trace: EventClass,
}

impl EventClassifier {
    pub fn new(
        reserved: &ReservedTokens,
        separator: impl Into<String>,
        end_marker: impl Into<String>,
    ) -> Self {
        Self {
            separator: separator.into(),
            end_marker: end_marker.into(),
            end_of_trace: reserved.end_of_trace.clone(),
        }
    }

    /// Classify one attribute tuple.
    ///
    /// An all-end-marker row maps to the end-of-trace token; everything else is
    /// the separator-joined tuple. An empty tuple is never an end marker.
    pub fn classify(&self, attributes: &[String]) -> EventClass {
        if !attributes.is_empty() && attributes.iter().all(|attr| attr == &self.end_marker) {
            return self.end_of_trace.clone();
        }
        EventClass::new(attributes.join(&self.separator))
    }

    pub fn end_of_trace(&self) -> &EventClass {
        &self.end_of_trace
    }

    pub fn end_marker(&self) -> &str {
        &self.end_marker
    }
}

/// Find all observable event classes in a finite set of attribute rows.
///
/// Returns the sorted, de-duplicated vocabulary with the end-of-trace class
/// removed (trace terminators are control flow, not vocabulary).
pub fn discover_event_classes(rows: &[Vec<String>], classifier: &EventClassifier) -> Vec<EventClass> {
    let classes: BTreeSet<EventClass> = rows
        .iter()
        .map(|row| classifier.classify(row))
        .filter(|class| class != classifier.end_of_trace())
        .collect();
    classes.into_iter().collect()
}

/// Find the `n` most frequent observable event classes in a finite set of rows.
///
/// Ties are broken by ascending token order so the result is deterministic.
pub fn discover_top_event_classes(
    rows: &[Vec<String>],
    classifier: &EventClassifier,
    n: usize,
) -> Vec<EventClass> {
    let mut counts: BTreeMap<EventClass, usize> = BTreeMap::new();
    for row in rows {
        let class = classifier.classify(row);
        if &class == classifier.end_of_trace() {
            continue;
        }
        *counts.entry(class).or_insert(0) += 1;
    }

    // Stable sort keeps the map's ascending token order on equal counts.
    let mut ranked: Vec<(EventClass, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(n).map(|(class, _)| class).collect()
}
