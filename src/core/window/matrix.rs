// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transition matrix storage and detached snapshot representations.

use serde::{Deserialize, Serialize};

/// Square row-major matrix of non-negative transition weights.
///
/// Indexed by (previous class, current class); `f32` keeps large class spaces
/// compact and matches the precision downstream feature consumers expect.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    size: usize,
    weights: Vec<f32>,
}

impl TransitionMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            weights: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.size && col < self.size);
        self.weights[row * self.size + col]
    }

    /// Add weight to one cell.
    pub fn increment(&mut self, row: usize, col: usize, step: f32) {
        debug_assert!(row < self.size && col < self.size);
        self.weights[row * self.size + col] += step;
    }

    /// Remove weight from one cell, clamping at zero.
    ///
    /// Repeated float addition and subtraction can leave a cell a few ulps
    /// below zero after its last transition leaves the window; the clamp keeps
    /// the non-negativity invariant.
    pub fn decrement(&mut self, row: usize, col: usize, step: f32) {
        debug_assert!(row < self.size && col < self.size);
        let cell = &mut self.weights[row * self.size + col];
        *cell = (*cell - step).max(0.0);
    }

    /// Reset every cell to zero.
    pub fn zero(&mut self) {
        self.weights.fill(0.0);
    }

    /// Sum of all cells.
    pub fn total(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Detached full copy of the matrix.
    pub fn to_dense_snapshot(&self) -> MatrixSnapshot {
        MatrixSnapshot::Dense {
            size: self.size,
            weights: self.weights.clone(),
        }
    }

    /// Detached copy holding only the non-zero cells.
    pub fn to_sparse_snapshot(&self) -> MatrixSnapshot {
        let mut cells = Vec::new();
        for row in 0..self.size {
            for col in 0..self.size {
                let weight = self.weights[row * self.size + col];
                if weight != 0.0 {
                    cells.push(SparseCell {
                        row: row as u32,
                        col: col as u32,
                        weight,
                    });
                }
            }
        }
        MatrixSnapshot::Sparse {
            size: self.size,
            cells,
        }
    }
}

/// One non-zero cell of a sparse snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseCell {
    pub row: u32,
    pub col: u32,
    pub weight: f32,
}

/// Detached matrix copy emitted with every snapshot.
///
/// `Dense` carries the full row-major weight vector; `Sparse` carries only the
/// non-zero cells in row-major order. Both describe the same matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum MatrixSnapshot {
    Dense { size: usize, weights: Vec<f32> },
    Sparse { size: usize, cells: Vec<SparseCell> },
}

impl MatrixSnapshot {
    /// Matrix dimension.
    pub fn size(&self) -> usize {
        match self {
            MatrixSnapshot::Dense { size, .. } => *size,
            MatrixSnapshot::Sparse { size, .. } => *size,
        }
    }

    /// Weight of one cell regardless of layout.
    pub fn weight_at(&self, row: usize, col: usize) -> f32 {
        match self {
            MatrixSnapshot::Dense { size, weights } => weights[row * size + col],
            MatrixSnapshot::Sparse { cells, .. } => cells
                .iter()
                .find(|cell| cell.row as usize == row && cell.col as usize == col)
                .map(|cell| cell.weight)
                .unwrap_or(0.0),
        }
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f32 {
        match self {
            MatrixSnapshot::Dense { weights, .. } => weights.iter().sum(),
            MatrixSnapshot::Sparse { cells, .. } => cells.iter().map(|cell| cell.weight).sum(),
        }
    }

    /// Number of non-zero cells.
    pub fn nonzero_count(&self) -> usize {
        match self {
            MatrixSnapshot::Dense { weights, .. } => {
                weights.iter().filter(|w| **w != 0.0).count()
            }
            MatrixSnapshot::Sparse { cells, .. } => cells.len(),
        }
    }
}
