//! Smoothed transition probability estimators
//!
//! Three smoothing strategies share the [`LanguageModel`] interface:
//! additive ([`LaplaceModel`]), stupid backoff over a Laplace ensemble
//! ([`BackoffModel`]) and per-context Simple-Good-Turing
//! ([`GoodTuringModel`]). [`Estimator`] is the closed set of the three.
//!
//! Queries never fail. A context, word or transition that was not seen in
//! training gets a deterministic fallback probability and is reported
//! through [`Misses`].

mod backoff;
mod good_turing;
mod laplace;
pub mod sgt;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::{ModelError, Result};
use crate::table::TransitionTable;
use crate::tokenize::Tokenizer;

pub use backoff::BackoffModel;
pub use good_turing::GoodTuringModel;
pub use laplace::LaplaceModel;

/// Highest supported model order.
pub const MAX_ORDER: usize = 16;

/// Default factor applied per backoff step.
pub const DEFAULT_BACKOFF_DISCOUNT: f64 = 0.1;

/// Which fallback paths a transition query took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Misses {
    /// The context was never seen in training
    pub row: bool,
    /// The word was never seen in training
    pub col: bool,
    /// Context and word are known, but never together
    pub transition: bool,
}

impl Misses {
    pub fn any(&self) -> bool {
        self.row || self.col || self.transition
    }
}

/// Result of a single transition query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub prob: f64,
    pub misses: Misses,
}

/// Likelihood of a whole token sequence, accumulated in log space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SequenceScore {
    /// Natural log of the sequence probability (`-inf` for probability 0)
    pub log_prob: f64,
    /// Number of scored transitions
    pub transitions: usize,
    pub row_misses: usize,
    pub col_misses: usize,
    pub transition_misses: usize,
}

impl Default for SequenceScore {
    fn default() -> Self {
        Self {
            log_prob: 0.0,
            transitions: 0,
            row_misses: 0,
            col_misses: 0,
            transition_misses: 0,
        }
    }
}

impl SequenceScore {
    /// Sequence probability; underflows to 0 for long inputs, compare
    /// `log_prob` instead.
    pub fn probability(&self) -> f64 {
        self.log_prob.exp()
    }

    fn add(&mut self, transition: Transition) {
        self.log_prob += transition.prob.ln();
        self.transitions += 1;
        self.row_misses += transition.misses.row as usize;
        self.col_misses += transition.misses.col as usize;
        self.transition_misses += transition.misses.transition as usize;
    }
}

/// Capability shared by every smoothing strategy.
pub trait LanguageModel {
    /// Number of preceding tokens a transition is conditioned on.
    fn order(&self) -> usize;

    /// Probability that `word` follows `context`.
    ///
    /// Only the last [`order`](Self::order) tokens of `context` are used.
    fn transition_prob<S: AsRef<str>>(&self, context: &[S], word: &str) -> Transition;

    /// Score an already tokenized and padded sequence.
    fn score_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> SequenceScore {
        let tokenizer = Tokenizer::new(self.order());
        let mut score = SequenceScore::default();
        for (context, word) in tokenizer.transitions(tokens) {
            score.add(self.transition_prob(context, word));
        }
        score
    }

    /// Tokenize `text` and score it.
    fn score(&self, text: &str) -> SequenceScore {
        let tokens = Tokenizer::new(self.order()).tokenize(text);
        self.score_tokens(&tokens)
    }
}

/// Smoothing strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Smoothing {
    #[serde(rename = "laplace")]
    Laplace,
    #[serde(rename = "backoff")]
    Backoff,
    #[serde(rename = "sgts", alias = "good-turing")]
    GoodTuring,
}

impl Smoothing {
    pub const ALL: [Smoothing; 3] = [Smoothing::Laplace, Smoothing::Backoff, Smoothing::GoodTuring];

    pub fn name(self) -> &'static str {
        match self {
            Smoothing::Laplace => "laplace",
            Smoothing::Backoff => "backoff",
            Smoothing::GoodTuring => "sgts",
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            Smoothing::Laplace => 0,
            Smoothing::Backoff => 1,
            Smoothing::GoodTuring => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Smoothing::Laplace),
            1 => Some(Smoothing::Backoff),
            2 => Some(Smoothing::GoodTuring),
            _ => None,
        }
    }
}

impl fmt::Display for Smoothing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Smoothing {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "laplace" | "additive" => Ok(Smoothing::Laplace),
            "backoff" => Ok(Smoothing::Backoff),
            "sgts" | "good-turing" | "goodturing" => Ok(Smoothing::GoodTuring),
            _ => Err(ModelError::UnsupportedSmoothing(s.to_string())),
        }
    }
}

/// Hyperparameters shared by both class models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    pub order: usize,
    pub smoothing: Smoothing,
    /// Per-step discount of the backoff ensemble (ignored by other kinds)
    pub backoff_discount: f64,
}

impl ModelConfig {
    pub fn new(order: usize, smoothing: Smoothing) -> Self {
        Self {
            order,
            smoothing,
            backoff_discount: DEFAULT_BACKOFF_DISCOUNT,
        }
    }

    pub fn with_backoff_discount(mut self, discount: f64) -> Self {
        self.backoff_discount = discount;
        self
    }

    /// Reject configurations that cannot be trained.
    pub fn validate(&self) -> Result<()> {
        if self.order > MAX_ORDER {
            return Err(ModelError::OrderTooLarge {
                order: self.order,
                max: MAX_ORDER,
            });
        }
        if !(self.backoff_discount > 0.0 && self.backoff_discount <= 1.0) {
            return Err(ModelError::InvalidDiscount(self.backoff_discount));
        }
        Ok(())
    }
}

/// One fitted model of any smoothing kind.
#[derive(Debug, Clone)]
pub enum Estimator {
    Laplace(LaplaceModel),
    Backoff(BackoffModel),
    GoodTuring(GoodTuringModel),
}

impl Estimator {
    /// Fit a model of the configured kind on `corpus`.
    pub fn train<C: Corpus + ?Sized>(config: &ModelConfig, corpus: &C) -> Result<Self> {
        config.validate()?;
        Ok(match config.smoothing {
            Smoothing::Laplace => Estimator::Laplace(LaplaceModel::train(config.order, corpus)?),
            Smoothing::Backoff => Estimator::Backoff(BackoffModel::train(
                config.order,
                config.backoff_discount,
                corpus,
            )?),
            Smoothing::GoodTuring => {
                Estimator::GoodTuring(GoodTuringModel::train(config.order, corpus)?)
            }
        })
    }

    pub fn smoothing(&self) -> Smoothing {
        match self {
            Estimator::Laplace(_) => Smoothing::Laplace,
            Estimator::Backoff(_) => Smoothing::Backoff,
            Estimator::GoodTuring(_) => Smoothing::GoodTuring,
        }
    }

    /// Count tables backing this model, lowest order first.
    pub fn tables(&self) -> Vec<&TransitionTable> {
        match self {
            Estimator::Laplace(m) => vec![m.table()],
            Estimator::Backoff(m) => m.levels().iter().map(LaplaceModel::table).collect(),
            Estimator::GoodTuring(m) => vec![m.table()],
        }
    }
}

impl LanguageModel for Estimator {
    fn order(&self) -> usize {
        match self {
            Estimator::Laplace(m) => m.order(),
            Estimator::Backoff(m) => m.order(),
            Estimator::GoodTuring(m) => m.order(),
        }
    }

    fn transition_prob<S: AsRef<str>>(&self, context: &[S], word: &str) -> Transition {
        match self {
            Estimator::Laplace(m) => m.transition_prob(context, word),
            Estimator::Backoff(m) => m.transition_prob(context, word),
            Estimator::GoodTuring(m) => m.transition_prob(context, word),
        }
    }
}
