//! Per-context Simple-Good-Turing smoothing.

use rayon::prelude::*;
use tracing::debug;

use super::sgt::simple_good_turing;
use super::{LanguageModel, Misses, Transition};
use crate::corpus::Corpus;
use crate::error::{ModelError, Result};
use crate::matrix::CsrMatrix;
use crate::table::TransitionTable;

/// Order-k Markov model smoothed with Simple Good-Turing, one context at a
/// time.
///
/// Each row of the count table is treated as its own frequency sample. The
/// fitted probability matrix has one more column than the vocabulary; the
/// last column of each row holds `p0`, the mass reserved for words never
/// seen after that context.
///
/// `p0` is the share of singletons in the row, so a context whose every
/// transition was seen at least twice reserves nothing. Unseen words after
/// such a context score probability 0 and drive the sequence log-likelihood
/// to `-inf`; the miss flags still report what happened.
#[derive(Debug, Clone)]
pub struct GoodTuringModel {
    table: TransitionTable,
    probs: CsrMatrix<f64>,
}

impl GoodTuringModel {
    pub fn train<C: Corpus + ?Sized>(order: usize, corpus: &C) -> Result<Self> {
        Ok(Self::fit(TransitionTable::build(order, corpus)?))
    }

    /// Reestimate every context row.
    ///
    /// Rows are independent: each one reads only its own counts and produces
    /// only its own output row, so they are processed in parallel.
    pub fn fit(table: TransitionTable) -> Self {
        let (rows, words) = table.shape();
        let reserved = words as u32;
        let estimated: Vec<Vec<(u32, f64)>> = (0..rows)
            .into_par_iter()
            .map(|r| {
                let cells: Vec<(u32, u32)> = table.counts().row(r).collect();
                let counts: Vec<u32> = cells.iter().map(|&(_, c)| c).collect();
                let estimate = simple_good_turing(&counts);
                let mut row: Vec<(u32, f64)> = cells
                    .iter()
                    .zip(estimate.probs)
                    .map(|(&(col, _), p)| (col, p))
                    .collect();
                row.push((reserved, estimate.p0));
                row
            })
            .collect();

        let probs = CsrMatrix::from_rows(words + 1, estimated);
        debug!(rows, words, "fitted good-turing probabilities");
        Self { table, probs }
    }

    /// Rebuild a fitted model from stored parts.
    pub fn from_parts(table: TransitionTable, probs: CsrMatrix<f64>) -> Result<Self> {
        let (rows, words) = table.shape();
        let expected = (rows, words + 1);
        if probs.shape() != expected {
            return Err(ModelError::ShapeMismatch {
                what: "probability matrix",
                expected,
                actual: probs.shape(),
            });
        }
        Ok(Self { table, probs })
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn probs(&self) -> &CsrMatrix<f64> {
        &self.probs
    }

    /// Mass reserved for unseen words after context `row`.
    pub fn reserved_mass(&self, row: u32) -> f64 {
        self.probs.get(row as usize, self.table.vocabulary().len())
    }
}

impl LanguageModel for GoodTuringModel {
    fn order(&self) -> usize {
        self.table.order()
    }

    fn transition_prob<S: AsRef<str>>(&self, context: &[S], word: &str) -> Transition {
        let col = self.table.word_id(word);

        // No sample exists for an unseen context; fall back to uniform over
        // the vocabulary plus one unknown-word unit.
        let Some(row) = self.table.context_id(context) else {
            let vocabulary = self.table.vocabulary().len() as f64;
            return Transition {
                prob: 1.0 / (vocabulary + 1.0),
                misses: Misses {
                    row: true,
                    col: col.is_none(),
                    transition: false,
                },
            };
        };

        let Some(col) = col else {
            return Transition {
                prob: self.reserved_mass(row),
                misses: Misses {
                    col: true,
                    ..Misses::default()
                },
            };
        };

        let prob = self.probs.get(row as usize, col as usize);
        if prob == 0.0 {
            return Transition {
                prob: self.reserved_mass(row),
                misses: Misses {
                    transition: true,
                    ..Misses::default()
                },
            };
        }
        Transition {
            prob,
            misses: Misses::default(),
        }
    }
}
