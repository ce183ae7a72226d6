//! Additive (add-one) smoothing.

use super::{LanguageModel, Misses, Transition};
use crate::corpus::Corpus;
use crate::error::Result;
use crate::table::TransitionTable;

/// Order-k Markov model with add-one smoothing.
///
/// Every vocabulary word gets one pseudo-count per context, and one extra
/// unit is reserved for words outside the vocabulary:
///
/// ```text
/// P(w | c) = (count(c, w) + 1) / (rowSum(c) + |V| + 1)
/// ```
///
/// An unseen context falls back to the uniform `1 / (|V| + 1)`.
#[derive(Debug, Clone)]
pub struct LaplaceModel {
    table: TransitionTable,
}

impl LaplaceModel {
    pub fn train<C: Corpus + ?Sized>(order: usize, corpus: &C) -> Result<Self> {
        Ok(Self::fit(TransitionTable::build(order, corpus)?))
    }

    /// Row sums are precomputed by the table, so there is nothing else to fit.
    pub fn fit(table: TransitionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }
}

impl LanguageModel for LaplaceModel {
    fn order(&self) -> usize {
        self.table.order()
    }

    fn transition_prob<S: AsRef<str>>(&self, context: &[S], word: &str) -> Transition {
        let vocabulary = self.table.vocabulary().len() as f64;
        let col = self.table.word_id(word);

        let Some(row) = self.table.context_id(context) else {
            return Transition {
                prob: 1.0 / (vocabulary + 1.0),
                misses: Misses {
                    row: true,
                    col: col.is_none(),
                    transition: false,
                },
            };
        };

        let denominator = self.table.row_sum(row) as f64 + vocabulary + 1.0;
        match col {
            None => Transition {
                prob: 1.0 / denominator,
                misses: Misses {
                    col: true,
                    ..Misses::default()
                },
            },
            Some(col) => {
                let count = self.table.count(row, col);
                Transition {
                    prob: (count as f64 + 1.0) / denominator,
                    misses: Misses {
                        transition: count == 0,
                        ..Misses::default()
                    },
                }
            }
        }
    }
}
