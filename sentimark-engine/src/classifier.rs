//! Two-model sentiment classifier.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::corpus::Corpus;
use crate::error::{ModelError, Result};
use crate::estimator::{Estimator, LanguageModel, ModelConfig, SequenceScore, Smoothing};
use crate::table::TransitionTable;

/// Ternary classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict plus the scores it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub sentiment: Sentiment,
    pub positive: SequenceScore,
    pub negative: SequenceScore,
}

/// Dimensions of one stored count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub order: usize,
    pub contexts: usize,
    pub words: usize,
    pub transitions: usize,
}

impl From<&TransitionTable> for TableSummary {
    fn from(table: &TransitionTable) -> Self {
        let (contexts, words) = table.shape();
        Self {
            order: table.order(),
            contexts,
            words,
            transitions: table.counts().nnz(),
        }
    }
}

/// Hyperparameters and table dimensions of a classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub order: usize,
    pub smoothing: Smoothing,
    pub backoff_discount: f64,
    pub positive: Vec<TableSummary>,
    pub negative: Vec<TableSummary>,
}

/// Sentiment classifier comparing a positive and a negative language model.
///
/// Both models share one [`ModelConfig`]. The classifier is immutable once
/// trained or loaded and can be shared across threads without locking.
#[derive(Debug, Clone)]
pub struct MarkovClassifier {
    config: ModelConfig,
    positive: Estimator,
    negative: Estimator,
}

impl MarkovClassifier {
    /// Fit one model per class.
    ///
    /// The configuration is validated before either corpus is read.
    pub fn train<P, N>(config: ModelConfig, positive: &P, negative: &N) -> Result<Self>
    where
        P: Corpus + ?Sized,
        N: Corpus + ?Sized,
    {
        config.validate()?;
        info!(
            order = config.order,
            smoothing = %config.smoothing,
            "training positive model"
        );
        let positive = Estimator::train(&config, positive)?;
        info!(
            order = config.order,
            smoothing = %config.smoothing,
            "training negative model"
        );
        let negative = Estimator::train(&config, negative)?;

        let classifier = Self {
            config,
            positive,
            negative,
        };
        let summary = classifier.summary();
        info!(
            positive_contexts = summary.positive.last().map_or(0, |t| t.contexts),
            positive_words = summary.positive.last().map_or(0, |t| t.words),
            negative_contexts = summary.negative.last().map_or(0, |t| t.contexts),
            negative_words = summary.negative.last().map_or(0, |t| t.words),
            "training finished"
        );
        Ok(classifier)
    }

    /// Assemble a classifier from already fitted models.
    pub fn from_parts(config: ModelConfig, positive: Estimator, negative: Estimator) -> Result<Self> {
        config.validate()?;
        for (class, model) in [("positive", &positive), ("negative", &negative)] {
            if model.smoothing() != config.smoothing {
                return Err(ModelError::Format(format!(
                    "{class} model uses {} smoothing, expected {}",
                    model.smoothing(),
                    config.smoothing
                )));
            }
            if model.order() != config.order {
                return Err(ModelError::Format(format!(
                    "{class} model has order {}, expected {}",
                    model.order(),
                    config.order
                )));
            }
        }
        Ok(Self {
            config,
            positive,
            negative,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn positive(&self) -> &Estimator {
        &self.positive
    }

    pub fn negative(&self) -> &Estimator {
        &self.negative
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        self.evaluate(text).sentiment
    }

    /// Score `text` under both models and compare the log-likelihoods.
    ///
    /// Only a strictly greater likelihood wins; equal scores, including two
    /// zero likelihoods, are neutral.
    pub fn evaluate(&self, text: &str) -> Verdict {
        let positive = self.positive.score(text);
        let negative = self.negative.score(text);
        let sentiment = if positive.log_prob > negative.log_prob {
            Sentiment::Positive
        } else if negative.log_prob > positive.log_prob {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };
        Verdict {
            sentiment,
            positive,
            negative,
        }
    }

    pub fn summary(&self) -> ModelSummary {
        let tables = |model: &Estimator| {
            model
                .tables()
                .into_iter()
                .map(TableSummary::from)
                .collect::<Vec<_>>()
        };
        ModelSummary {
            order: self.config.order,
            smoothing: self.config.smoothing,
            backoff_discount: self.config.backoff_discount,
            positive: tables(&self.positive),
            negative: tables(&self.negative),
        }
    }
}
