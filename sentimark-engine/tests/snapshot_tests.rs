use sentimark_engine::{
    LanguageModel, MarkovClassifier, ModelConfig, ModelError, Smoothing, TransitionTable,
};
use tempfile::TempDir;

const POSITIVE: [&str; 4] = [
    "a wonderful film with a great cast",
    "great acting and a wonderful story",
    "I loved it , truly great",
    "a great , great movie",
];

const NEGATIVE: [&str; 4] = [
    "a boring film with a terrible cast",
    "terrible acting and a boring story",
    "I hated it , truly awful",
    "a bad , bad movie",
];

const REGRESSION_SET: [&str; 8] = [
    "a wonderful story",
    "a boring story",
    "truly great acting",
    "truly awful acting",
    "",
    "completely unseen words here",
    "a great , bad movie",
    "Ｉ loved it",
];

fn assert_same_tables(a: &TransitionTable, b: &TransitionTable) {
    assert_eq!(a.order(), b.order());
    assert_eq!(a.vocabulary().items(), b.vocabulary().items());
    assert_eq!(a.contexts().items(), b.contexts().items());
    assert_eq!(a.counts(), b.counts());
    for row in 0..a.shape().0 as u32 {
        assert_eq!(a.row_sum(row), b.row_sum(row));
    }
}

#[test]
fn test_round_trip_preserves_classification() {
    let dir = TempDir::new().unwrap();
    for smoothing in Smoothing::ALL {
        for order in [0, 1, 3] {
            let config = ModelConfig::new(order, smoothing).with_backoff_discount(0.3);
            let model = MarkovClassifier::train(config, &POSITIVE, &NEGATIVE).unwrap();

            let path = dir.path().join(format!("{smoothing}-{order}.bin"));
            model.save(&path).unwrap();
            let loaded = MarkovClassifier::load(&path).unwrap();

            assert_eq!(loaded.config(), model.config());
            assert_eq!(loaded.summary(), model.summary());
            for text in REGRESSION_SET {
                assert_eq!(
                    loaded.evaluate(text),
                    model.evaluate(text),
                    "{smoothing} {order}: {text:?}"
                );
            }
        }
    }
}

#[test]
fn test_round_trip_preserves_tables() {
    let config = ModelConfig::new(2, Smoothing::Backoff);
    let model = MarkovClassifier::train(config, &POSITIVE, &NEGATIVE).unwrap();
    let loaded = MarkovClassifier::from_bytes(&model.to_bytes().unwrap()).unwrap();

    for (original, restored) in [
        (model.positive(), loaded.positive()),
        (model.negative(), loaded.negative()),
    ] {
        let (a, b) = (original.tables(), restored.tables());
        assert_eq!(a.len(), 3);
        assert_eq!(a.len(), b.len());
        for (a, b) in a.into_iter().zip(b) {
            assert_same_tables(a, b);
        }
        assert_eq!(original.order(), restored.order());
    }
}

#[test]
fn test_good_turing_probabilities_survive_exactly() {
    let config = ModelConfig::new(1, Smoothing::GoodTuring);
    let model = MarkovClassifier::train(config, &POSITIVE, &NEGATIVE).unwrap();
    let loaded = MarkovClassifier::from_bytes(&model.to_bytes().unwrap()).unwrap();

    let tokens = ["_", "a", "great", "movie", "_"];
    for (context, word) in tokens.windows(2).map(|w| (&w[..1], w[1])) {
        assert_eq!(
            loaded.positive().transition_prob(context, word),
            model.positive().transition_prob(context, word)
        );
    }
}

#[test]
fn test_save_is_deterministic() {
    let config = ModelConfig::new(2, Smoothing::GoodTuring);
    let first = MarkovClassifier::train(config, &POSITIVE, &NEGATIVE)
        .unwrap()
        .to_bytes()
        .unwrap();
    let second = MarkovClassifier::train(config, &POSITIVE, &NEGATIVE)
        .unwrap()
        .to_bytes()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = MarkovClassifier::load(dir.path().join("missing.bin")).unwrap_err();
    assert!(matches!(err, ModelError::Io(_)));
}

#[test]
fn test_load_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.bin");
    std::fs::write(&path, b"definitely not a model snapshot").unwrap();
    let err = MarkovClassifier::load(&path).unwrap_err();
    assert!(matches!(err, ModelError::Format(_)));
}

#[test]
fn test_every_truncation_is_rejected() {
    let config = ModelConfig::new(1, Smoothing::GoodTuring);
    let bytes = MarkovClassifier::train(config, &["good movie"], &["bad movie"])
        .unwrap()
        .to_bytes()
        .unwrap();
    for len in 0..bytes.len() {
        assert!(
            MarkovClassifier::from_bytes(&bytes[..len]).is_err(),
            "prefix of {len} bytes was accepted"
        );
    }
    assert!(MarkovClassifier::from_bytes(&bytes).is_ok());
}
