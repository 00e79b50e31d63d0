//! Degree-2 interaction feature expansion.

use serde::{Deserialize, Serialize};

use super::{EncodeError, EncodeResult};

/// Appends every pairwise product `x_i * x_j` (`i < j`) after the inputs.
///
/// No bias column and no squared terms. Products follow lexicographic
/// `(i, j)` order, so the output layout is fixed by `n_input` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionExpansion {
    n_input: usize,
}

impl InteractionExpansion {
    pub fn new(n_input: usize) -> Self {
        Self { n_input }
    }

    pub fn n_input(&self) -> usize {
        self.n_input
    }

    pub fn n_output(&self) -> usize {
        self.n_input + self.n_input * self.n_input.saturating_sub(1) / 2
    }

    /// Expand one input row.
    pub fn transform(&self, input: &[f64]) -> EncodeResult<Vec<f64>> {
        if input.len() != self.n_input {
            return Err(EncodeError::schema(
                "features",
                format!("expected {} inputs, got {}", self.n_input, input.len()),
            ));
        }

        let mut out = Vec::with_capacity(self.n_output());
        out.extend_from_slice(input);
        for i in 0..self.n_input {
            for j in (i + 1)..self.n_input {
                out.push(input[i] * input[j]);
            }
        }
        Ok(out)
    }

    /// Output column names built from the input names (`"a"`, ..., `"a b"`).
    pub fn feature_names(&self, input_names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = input_names.iter().map(|n| n.to_string()).collect();
        for i in 0..input_names.len() {
            for j in (i + 1)..input_names.len() {
                names.push(format!("{} {}", input_names[i], input_names[j]));
            }
        }
        names
    }
}
