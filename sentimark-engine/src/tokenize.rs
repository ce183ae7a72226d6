//! Review tokenization and boundary padding.
//!
//! The same [`Tokenizer`] is used when counting transitions and when scoring
//! text, so a given review always yields the same token sequence.

use unicode_normalization::UnicodeNormalization;

/// Reserved token marking the start and end of a review.
pub const BOUNDARY_TOKEN: &str = "_";

/// Split raw text into word tokens.
///
/// The text is NFKC-normalized first so full-width and compatibility forms
/// (`ｇｏｏｄ`, `！`) land on the same vocabulary entries as their plain
/// counterparts. Whitespace separates tokens, and ASCII punctuation becomes a
/// token of its own, except `'`, `-` and `_` which stay inside words
/// (`don't`, `jean-claude`, `snake_case`). Keeping `_` attached means review
/// text never produces a stray [`BOUNDARY_TOKEN`]. Case is preserved.
pub fn word_tokens(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in normalized.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else if is_separator(ch) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_separator(c: char) -> bool {
    c.is_ascii_punctuation() && c != '\'' && c != '-' && c != '_'
}

/// Tokenizer for a Markov model of a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    order: usize,
}

impl Tokenizer {
    pub fn new(order: usize) -> Self {
        Self { order }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Tokenize and pad a review.
    ///
    /// Order k > 0 adds k boundary tokens on both sides. Order 0 only appends
    /// a single trailing boundary token so the end of the review is modelled.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let words = word_tokens(text);
        if self.order == 0 {
            let mut tokens = words;
            tokens.push(BOUNDARY_TOKEN.to_string());
            return tokens;
        }

        let mut tokens = Vec::with_capacity(words.len() + 2 * self.order);
        tokens.extend(std::iter::repeat_n(BOUNDARY_TOKEN.to_string(), self.order));
        tokens.extend(words);
        tokens.extend(std::iter::repeat_n(BOUNDARY_TOKEN.to_string(), self.order));
        tokens
    }

    /// Iterate the `(context, word)` pairs of a padded token sequence.
    ///
    /// The context of `tokens[i]` is the `order` tokens directly before it;
    /// the first `order` tokens are padding and are never targets.
    pub fn transitions<'a, S: AsRef<str>>(
        &self,
        tokens: &'a [S],
    ) -> impl Iterator<Item = (&'a [S], &'a str)> + 'a {
        let order = self.order;
        (order..tokens.len()).map(move |i| (&tokens[i - order..i], tokens[i].as_ref()))
    }
}
