pub mod classifier;
pub mod corpus;
pub mod error;
pub mod estimator;
pub mod evaluation;
pub mod index;
pub mod logging;
pub mod matrix;
pub mod settings;
mod snapshot;
pub mod table;
pub mod tokenize;

pub use classifier::{MarkovClassifier, ModelSummary, Sentiment, TableSummary, Verdict};
pub use corpus::{Corpus, LineCorpus};
pub use error::{ModelError, Result};
pub use estimator::{
    BackoffModel, Estimator, GoodTuringModel, LanguageModel, LaplaceModel, ModelConfig, Misses,
    SequenceScore, Smoothing, Transition,
};
pub use evaluation::{ConfusionMatrix, Polarity};
pub use settings::Settings;
pub use table::{CountStats, TransitionCount, TransitionTable};
pub use tokenize::Tokenizer;
