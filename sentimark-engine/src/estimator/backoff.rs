//! Stupid backoff over an ensemble of Laplace models.

use tracing::debug;

use super::{LanguageModel, LaplaceModel, Misses, Transition};
use crate::corpus::Corpus;
use crate::error::{ModelError, Result};

/// Ensemble of independently trained Laplace models of orders `0..=k`.
///
/// A query starts at the highest order. Whenever the model at the current
/// order reports any miss, the leftmost context token is dropped, the
/// running factor is multiplied by the discount, and the next lower order
/// is asked. Order 0 always answers, so the result is never zero:
/// `P >= discount^k * P_0 > 0`.
#[derive(Debug, Clone)]
pub struct BackoffModel {
    discount: f64,
    /// `levels[j]` has order `j`
    levels: Vec<LaplaceModel>,
}

impl BackoffModel {
    pub fn train<C: Corpus + ?Sized>(order: usize, discount: f64, corpus: &C) -> Result<Self> {
        let levels = (0..=order)
            .map(|k| LaplaceModel::train(k, corpus))
            .collect::<Result<Vec<_>>>()?;
        debug!(order, discount, "trained backoff ensemble");
        Self::from_levels(discount, levels)
    }

    /// Assemble an ensemble from already fitted models, lowest order first.
    pub fn from_levels(discount: f64, levels: Vec<LaplaceModel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(ModelError::Format(
                "backoff ensemble needs at least an order-0 model".to_string(),
            ));
        }
        if let Some((j, model)) = levels.iter().enumerate().find(|(j, m)| m.order() != *j) {
            return Err(ModelError::Format(format!(
                "backoff level {j} has order {}",
                model.order()
            )));
        }
        if !(discount > 0.0 && discount <= 1.0) {
            return Err(ModelError::InvalidDiscount(discount));
        }
        Ok(Self { discount, levels })
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn levels(&self) -> &[LaplaceModel] {
        &self.levels
    }
}

impl LanguageModel for BackoffModel {
    fn order(&self) -> usize {
        self.levels.len() - 1
    }

    /// Only the order-0 miss flags are reported; higher orders are expected
    /// to miss and just trigger the next step down.
    fn transition_prob<S: AsRef<str>>(&self, context: &[S], word: &str) -> Transition {
        let mut alpha = 1.0;
        for level in (1..self.levels.len()).rev() {
            let truncated = &context[context.len().saturating_sub(level)..];
            let t = self.levels[level].transition_prob(truncated, word);
            if !t.misses.any() {
                return Transition {
                    prob: alpha * t.prob,
                    misses: Misses::default(),
                };
            }
            alpha *= self.discount;
        }

        let base = self.levels[0].transition_prob(&context[context.len()..], word);
        Transition {
            prob: alpha * base.prob,
            misses: base.misses,
        }
    }
}
