//! Restartable review sources for training.
//!
//! Building a transition table walks the corpus twice (once to size the
//! tables, once to count), and the backoff ensemble walks it once per
//! order, so every [`Corpus`] must be able to start over from the first
//! review on each call to [`Corpus::reviews`].

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Boxed iterator over the reviews of a corpus.
pub type Reviews<'a> = Box<dyn Iterator<Item = io::Result<String>> + 'a>;

/// A source of raw review strings, in stable order.
pub trait Corpus {
    /// Start a fresh pass over the corpus.
    fn reviews(&self) -> io::Result<Reviews<'_>>;
}

/// One review per line of a text file.
///
/// Line terminators are stripped; blank lines are kept as empty reviews.
#[derive(Debug, Clone)]
pub struct LineCorpus {
    path: PathBuf,
}

impl LineCorpus {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Corpus for LineCorpus {
    fn reviews(&self) -> io::Result<Reviews<'_>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        Ok(Box::new(reader.lines().map(|line| {
            line.map(|mut l| {
                if l.ends_with('\r') {
                    l.pop();
                }
                l
            })
        })))
    }
}

impl<S: AsRef<str>> Corpus for [S] {
    fn reviews(&self) -> io::Result<Reviews<'_>> {
        Ok(Box::new(self.iter().map(|s| Ok(s.as_ref().to_string()))))
    }
}

impl<S: AsRef<str>, const N: usize> Corpus for [S; N] {
    fn reviews(&self) -> io::Result<Reviews<'_>> {
        self.as_slice().reviews()
    }
}

impl<S: AsRef<str>> Corpus for Vec<S> {
    fn reviews(&self) -> io::Result<Reviews<'_>> {
        self.as_slice().reviews()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn collect(corpus: &dyn Corpus) -> Vec<String> {
        corpus
            .reviews()
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_line_corpus_restarts() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "good movie\n\ngreat film\r\n").unwrap();

        let corpus = LineCorpus::new(file.path());
        let first = collect(&corpus);
        let second = collect(&corpus);
        assert_eq!(first, vec!["good movie", "", "great film"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_line_corpus_missing_file() {
        let corpus = LineCorpus::new("/nonexistent/reviews.txt");
        assert!(corpus.reviews().is_err());
    }

    #[test]
    fn test_in_memory_corpora() {
        let array = ["a", "b"];
        assert_eq!(collect(&array), vec!["a", "b"]);

        let owned = vec!["c".to_string()];
        assert_eq!(collect(&owned), vec!["c"]);
    }
}
