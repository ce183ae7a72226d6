//! Context → word transition counts.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use tracing::debug;

use crate::corpus::Corpus;
use crate::error::{ModelError, Result};
use crate::index::Interner;
use crate::matrix::CsrMatrix;
use crate::tokenize::{BOUNDARY_TOKEN, Tokenizer};

/// Sparse transition count table of an order-k Markov model.
///
/// Rows are contexts (the k tokens preceding a word), columns are
/// vocabulary words. Contexts are stored as tuples of vocabulary ids, since
/// every context token is itself a vocabulary word. An order-0 table always
/// has exactly one row, keyed by the empty context.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    order: usize,
    vocabulary: Interner<String>,
    contexts: Interner<Vec<u32>>,
    counts: CsrMatrix<u32>,
    row_sums: Vec<u64>,
}

/// Summary of how transition counts are distributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountStats {
    /// Distinct transitions seen exactly once
    pub singletons: usize,
    /// Distinct transitions seen exactly twice
    pub doubletons: usize,
    /// Sum of all counts
    pub total: u64,
    /// Number of distinct (context, word) transitions
    pub distinct: usize,
}

/// A single (context, word, count) cell, resolved back to tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionCount {
    pub context: Vec<String>,
    pub word: String,
    pub count: u32,
}

impl TransitionTable {
    /// Count transitions over a corpus in two passes.
    ///
    /// The first pass assigns vocabulary and context ids, the second fills
    /// the counts once the table dimensions are known.
    pub fn build<C: Corpus + ?Sized>(order: usize, corpus: &C) -> Result<Self> {
        let tokenizer = Tokenizer::new(order);
        let mut vocabulary: Interner<String> = Interner::new();
        let mut contexts: Interner<Vec<u32>> = Interner::new();
        if order == 0 {
            let root: &[u32] = &[];
            contexts.resolve(root);
        }

        let mut reviews = 0usize;
        for review in corpus.reviews()? {
            let tokens = tokenizer.tokenize(&review?);
            let ids: Vec<u32> = tokens.iter().map(|t| vocabulary.resolve(t.as_str())).collect();
            if order > 0 {
                for window in ids.windows(order) {
                    contexts.resolve(window);
                }
            }
            reviews += 1;
        }

        let mut rows: Vec<BTreeMap<u32, u32>> = vec![BTreeMap::new(); contexts.len()];
        for review in corpus.reviews()? {
            let tokens = tokenizer.tokenize(&review?);
            let ids = tokens
                .iter()
                .map(|t| {
                    vocabulary
                        .get(t.as_str())
                        .ok_or_else(|| ModelError::CorpusChanged(format!("unknown word '{t}'")))
                })
                .collect::<Result<Vec<u32>>>()?;
            for i in order..ids.len() {
                let row = contexts.get(&ids[i - order..i]).ok_or_else(|| {
                    ModelError::CorpusChanged(format!(
                        "unknown context '{}'",
                        tokens[i - order..i].join(" ")
                    ))
                })?;
                *rows[row as usize].entry(ids[i]).or_insert(0) += 1;
            }
        }

        let counts = CsrMatrix::from_rows(
            vocabulary.len(),
            rows.into_iter()
                .map(|row| row.into_iter().collect::<Vec<(u32, u32)>>()),
        );
        debug!(
            order,
            reviews,
            contexts = contexts.len(),
            words = vocabulary.len(),
            transitions = counts.nnz(),
            "built transition table"
        );
        Ok(Self::assemble(order, vocabulary, contexts, counts))
    }

    /// Rebuild a table from its stored parts, checking that they agree.
    pub fn from_parts(
        order: usize,
        vocabulary: Interner<String>,
        contexts: Interner<Vec<u32>>,
        counts: CsrMatrix<u32>,
    ) -> Result<Self> {
        let expected = (contexts.len(), vocabulary.len());
        if counts.shape() != expected {
            return Err(ModelError::ShapeMismatch {
                what: "count matrix",
                expected,
                actual: counts.shape(),
            });
        }
        if order == 0 && contexts.len() != 1 {
            return Err(ModelError::Format(format!(
                "order-0 table must have exactly one context, found {}",
                contexts.len()
            )));
        }
        for context in contexts.items() {
            if context.len() != order {
                return Err(ModelError::Format(format!(
                    "context of length {} in an order-{order} table",
                    context.len()
                )));
            }
            if context.iter().any(|&id| id as usize >= vocabulary.len()) {
                return Err(ModelError::Format(
                    "context refers to a word id outside the vocabulary".to_string(),
                ));
            }
        }
        Ok(Self::assemble(order, vocabulary, contexts, counts))
    }

    fn assemble(
        order: usize,
        vocabulary: Interner<String>,
        contexts: Interner<Vec<u32>>,
        counts: CsrMatrix<u32>,
    ) -> Self {
        let row_sums = (0..counts.shape().0)
            .map(|r| counts.row(r).map(|(_, c)| c as u64).sum::<u64>())
            .collect();
        Self {
            order,
            vocabulary,
            contexts,
            counts,
            row_sums,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn vocabulary(&self) -> &Interner<String> {
        &self.vocabulary
    }

    pub fn contexts(&self) -> &Interner<Vec<u32>> {
        &self.contexts
    }

    pub fn counts(&self) -> &CsrMatrix<u32> {
        &self.counts
    }

    /// `(contexts, vocabulary words)`
    pub fn shape(&self) -> (usize, usize) {
        self.counts.shape()
    }

    pub fn word_id(&self, word: &str) -> Option<u32> {
        self.vocabulary.get(word)
    }

    /// Row id of a context given as tokens. Only the last `order` tokens are
    /// used; a context with an unknown token has no row.
    pub fn context_id<S: AsRef<str>>(&self, context: &[S]) -> Option<u32> {
        if context.len() < self.order {
            return None;
        }
        let context = &context[context.len() - self.order..];
        let ids = context
            .iter()
            .map(|t| self.vocabulary.get(t.as_ref()))
            .collect::<Option<Vec<u32>>>()?;
        self.contexts.get(&ids[..])
    }

    pub fn count(&self, row: u32, col: u32) -> u32 {
        self.counts.get(row as usize, col as usize)
    }

    pub fn row_sum(&self, row: u32) -> u64 {
        self.row_sums.get(row as usize).copied().unwrap_or(0)
    }

    /// Tokens of a context row (empty for order 0).
    pub fn context_tokens(&self, row: u32) -> Vec<&str> {
        self.contexts
            .item(row)
            .map(|ids| {
                ids.iter()
                    .map(|&id| self.vocabulary.item(id).map_or(BOUNDARY_TOKEN, String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stats(&self) -> CountStats {
        let mut stats = CountStats::default();
        for &count in self.counts.values() {
            match count {
                1 => stats.singletons += 1,
                2 => stats.doubletons += 1,
                _ => {}
            }
            stats.total += count as u64;
            stats.distinct += 1;
        }
        stats
    }

    /// The `n` most frequent transitions, highest count first.
    ///
    /// Ties keep row-major order so the listing is stable for a given table.
    pub fn top_transitions(&self, n: usize) -> Vec<TransitionCount> {
        let mut cells: Vec<(usize, u32, u32)> = self.counts.iter().collect();
        cells.sort_by(|a, b| b.2.cmp(&a.2));
        cells
            .into_iter()
            .take(n)
            .map(|(row, col, count)| self.resolve_cell(row as u32, col, count))
            .collect()
    }

    fn resolve_cell(&self, row: u32, col: u32, count: u32) -> TransitionCount {
        TransitionCount {
            context: self
                .context_tokens(row)
                .into_iter()
                .map(str::to_string)
                .collect(),
            word: self
                .vocabulary
                .item(col)
                .cloned()
                .unwrap_or_default(),
            count,
        }
    }

    /// Write every nonzero cell to `writer` (for inspection/debugging).
    ///
    /// Each line is tab-separated: `context\tword\tcount`, with context
    /// tokens joined by spaces. Returns the number of lines written.
    pub fn dump(&self, writer: &mut dyn Write) -> std::io::Result<usize> {
        let mut lines = 0;
        for (row, col, count) in self.counts.iter() {
            let cell = self.resolve_cell(row as u32, col, count);
            writeln!(writer, "{}\t{}\t{}", cell.context.join(" "), cell.word, cell.count)?;
            lines += 1;
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Reviews;
    use std::cell::Cell;
    use std::io;

    #[test]
    fn test_build_order_one() {
        let table = TransitionTable::build(1, &["good movie", "great film"]).unwrap();

        let words: Vec<&str> = table.vocabulary().items().iter().map(String::as_str).collect();
        assert_eq!(words, vec!["_", "good", "movie", "great", "film"]);
        assert_eq!(table.shape(), (5, 5));

        // Context rows in first-seen order: (_), (good), (movie), (great), (film)
        assert_eq!(table.context_id(&["_"]), Some(0));
        assert_eq!(table.context_id(&["good"]), Some(1));
        assert_eq!(table.context_id(&["movie"]), Some(2));
        assert_eq!(table.context_id(&["great"]), Some(3));
        assert_eq!(table.context_id(&["film"]), Some(4));

        let good = table.word_id("good").unwrap();
        let great = table.word_id("great").unwrap();
        assert_eq!(table.count(0, good), 1);
        assert_eq!(table.count(0, great), 1);
        assert_eq!(table.row_sum(0), 2);
        assert_eq!(table.row_sum(1), 1);
    }

    #[test]
    fn test_underscored_word_is_not_a_review_edge() {
        let table = TransitionTable::build(1, &["snake_case rocks"]).unwrap();
        let start = table.context_id(&["_"]).unwrap();
        assert_eq!(table.row_sum(start), 1);
        assert_eq!(table.word_id("case"), None);
        let word = table.word_id("snake_case").unwrap();
        assert_eq!(table.count(start, word), 1);
    }

    /// Yields `first` on the first pass and `second` on every later one.
    struct Shifting {
        first: &'static str,
        second: &'static str,
        passes: Cell<usize>,
    }

    impl Shifting {
        fn new(first: &'static str, second: &'static str) -> Self {
            Self {
                first,
                second,
                passes: Cell::new(0),
            }
        }
    }

    impl Corpus for Shifting {
        fn reviews(&self) -> io::Result<Reviews<'_>> {
            let pass = self.passes.get();
            self.passes.set(pass + 1);
            let review = if pass == 0 { self.first } else { self.second };
            Ok(Box::new(std::iter::once(Ok(review.to_string()))))
        }
    }

    #[test]
    fn test_new_word_in_second_pass_is_rejected() {
        let corpus = Shifting::new("good movie", "good film");
        let err = TransitionTable::build(1, &corpus).unwrap_err();
        match err {
            ModelError::CorpusChanged(msg) => assert!(msg.contains("film"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_new_context_in_second_pass_is_rejected() {
        // Same words, different order: (_, movie) was never a context.
        let corpus = Shifting::new("good movie", "movie good");
        let err = TransitionTable::build(2, &corpus).unwrap_err();
        match err {
            ModelError::CorpusChanged(msg) => assert!(msg.contains("movie"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_order_zero_has_single_row() {
        let table = TransitionTable::build(0, &["good movie", "bad movie"]).unwrap();
        assert_eq!(table.shape().0, 1);
        assert_eq!(table.context_id::<&str>(&[]), Some(0));
        let movie = table.word_id("movie").unwrap();
        assert_eq!(table.count(0, movie), 2);
        // 2 words + 1 boundary per review
        assert_eq!(table.row_sum(0), 6);
    }

    #[test]
    fn test_order_zero_empty_corpus() {
        let empty: [&str; 0] = [];
        let table = TransitionTable::build(0, &empty).unwrap();
        assert_eq!(table.shape(), (1, 0));
        assert_eq!(table.row_sum(0), 0);
    }

    #[test]
    fn test_shape_matches_maps() {
        let corpus = ["the plot is thin", "the acting is great", "thin and great"];
        for order in 0..4 {
            let table = TransitionTable::build(order, &corpus).unwrap();
            assert_eq!(
                table.shape(),
                (table.contexts().len(), table.vocabulary().len())
            );
            for (row, col, _) in table.counts().iter() {
                assert!(table.contexts().item(row as u32).is_some());
                assert!(table.vocabulary().item(col).is_some());
            }
        }
    }

    #[test]
    fn test_context_id_uses_trailing_tokens() {
        let table = TransitionTable::build(1, &["good movie"]).unwrap();
        assert_eq!(table.context_id(&["whatever", "good"]), Some(1));
        assert_eq!(table.context_id(&["unknown"]), None);
        assert_eq!(table.context_id::<&str>(&[]), None);
    }

    #[test]
    fn test_stats_and_top_transitions() {
        let table = TransitionTable::build(1, &["a b", "a b", "a c"]).unwrap();
        let stats = table.stats();
        // (_→a)=3, (a→b)=2, (a→c)=1, (b→_)=2, (c→_)=1
        assert_eq!(stats.distinct, 5);
        assert_eq!(stats.total, 9);
        assert_eq!(stats.singletons, 2);
        assert_eq!(stats.doubletons, 2);

        let top = table.top_transitions(1);
        assert_eq!(
            top,
            vec![TransitionCount {
                context: vec!["_".to_string()],
                word: "a".to_string(),
                count: 3,
            }]
        );
    }

    #[test]
    fn test_dump_writes_every_cell() {
        let table = TransitionTable::build(1, &["good movie"]).unwrap();
        let mut out = Vec::new();
        let lines = table.dump(&mut out).unwrap();
        assert_eq!(lines, 3);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("_\tgood\t1\n"));
        assert!(text.contains("good\tmovie\t1\n"));
        assert!(text.contains("movie\t_\t1\n"));
    }

    #[test]
    fn test_from_parts_rejects_shape_mismatch() {
        let table = TransitionTable::build(1, &["good movie"]).unwrap();
        let wrong = CsrMatrix::from_rows(2, vec![vec![(0, 1u32)]]);
        let err = TransitionTable::from_parts(
            1,
            table.vocabulary().clone(),
            table.contexts().clone(),
            wrong,
        )
        .unwrap_err();
        match err {
            ModelError::ShapeMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, (3, 3));
                assert_eq!(actual, (1, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
