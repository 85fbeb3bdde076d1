// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-case memory of the last event class seen.
//!
//! The tracker turns a flat event stream into transitions: for every incoming
//! event it reports the class that preceded it within the same case. A case's
//! first event is preceded by the synthetic start-of-trace class, and an
//! end-of-trace event removes the case entry so the id can be reused for a
//! fresh trace later.

use std::collections::HashMap;

/// Case id -> last seen class index.
///
/// Memory is bounded by the number of currently open cases, not by stream
/// length.
#[derive(Debug)]
pub struct TraceStateTracker {
    table: HashMap<String, usize>,
    start_of_trace: usize,
    end_of_trace: usize,
}

impl TraceStateTracker {
    pub fn new(start_of_trace: usize, end_of_trace: usize) -> Self {
        Self {
            table: HashMap::new(),
            start_of_trace,
            end_of_trace,
        }
    }

    /// Record one event and return the class index that preceded it.
    ///
    /// - first event of a case: the entry is created and start-of-trace is
    ///   the predecessor (this also holds when that first event is an
    ///   end-of-trace marker, matching trace-start reporting for one-event
    ///   traces);
    /// - end-of-trace for an open case: the entry is removed and the stored
    ///   last class is the predecessor;
    /// - anything else: the stored class is returned and replaced.
    pub fn update(&mut self, case_id: &str, class_index: usize) -> usize {
        if class_index == self.end_of_trace {
            if let Some(last) = self.table.remove(case_id) {
                return last;
            }
            self.table.insert(case_id.to_string(), class_index);
            return self.start_of_trace;
        }

        match self.table.get_mut(case_id) {
            Some(slot) => std::mem::replace(slot, class_index),
            None => {
                self.table.insert(case_id.to_string(), class_index);
                self.start_of_trace
            }
        }
    }

    /// Number of cases with an open trace.
    pub fn open_cases(&self) -> usize {
        self.table.len()
    }

    /// Whether a case currently has an open trace.
    pub fn is_open(&self, case_id: &str) -> bool {
        self.table.contains_key(case_id)
    }
}
