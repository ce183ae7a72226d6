//! Confusion matrix for labelled test sets.

use std::io::{self, Write};

use serde::Serialize;

use crate::classifier::Sentiment;

/// Label of a test review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// The verdict that counts as correct for this label.
    pub fn expected(self) -> Sentiment {
        match self {
            Polarity::Positive => Sentiment::Positive,
            Polarity::Negative => Sentiment::Negative,
        }
    }
}

/// Predictions for reviews of one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PredictionCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl PredictionCounts {
    fn get(&self, predicted: Sentiment) -> usize {
        match predicted {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    fn slot(&mut self, predicted: Sentiment) -> &mut usize {
        match predicted {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Neutral => &mut self.neutral,
            Sentiment::Negative => &mut self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

/// Actual label × predicted sentiment counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub positive: PredictionCounts,
    pub negative: PredictionCounts,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, actual: Polarity, predicted: Sentiment) {
        *self.row_mut(actual).slot(predicted) += 1;
    }

    pub fn count(&self, actual: Polarity, predicted: Sentiment) -> usize {
        self.row(actual).get(predicted)
    }

    pub fn row(&self, actual: Polarity) -> &PredictionCounts {
        match actual {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    fn row_mut(&mut self, actual: Polarity) -> &mut PredictionCounts {
        match actual {
            Polarity::Positive => &mut self.positive,
            Polarity::Negative => &mut self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive.total() + self.negative.total()
    }

    /// Share of reviews classified with their own label; 0 when empty.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.positive.positive + self.negative.negative) as f64 / total as f64
    }

    /// Print the matrix twice: absolute counts, then fractions of the total.
    ///
    /// Columns are the actual labels, rows the predicted sentiment, with
    /// row totals on the right.
    pub fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        let rows = [
            ("POS", Sentiment::Positive),
            ("  -", Sentiment::Neutral),
            ("NEG", Sentiment::Negative),
        ];

        writeln!(w, "reviews:    |  POS  |  NEG  |")?;
        writeln!(w, "classified: +-------+-------+")?;
        for (label, predicted) in rows {
            let pos = self.count(Polarity::Positive, predicted);
            let neg = self.count(Polarity::Negative, predicted);
            writeln!(w, "      {label}   | {pos:>4}  | {neg:>4}  | {:>4}", pos + neg)?;
        }
        writeln!(w, "            +-------+-------+--------")?;
        writeln!(
            w,
            "      total | {:>4}  | {:>4}  | {:>4}",
            self.positive.total(),
            self.negative.total(),
            self.total()
        )?;
        writeln!(w)?;

        let total = self.total().max(1) as f64;
        let frac = |n: usize| n as f64 / total;
        writeln!(w, "reviews:    |  POS | NEG  |")?;
        writeln!(w, "classified: +------+------+")?;
        for (label, predicted) in rows {
            let pos = self.count(Polarity::Positive, predicted);
            let neg = self.count(Polarity::Negative, predicted);
            writeln!(
                w,
                "      {label}   | {:.2} | {:.2} | {:.2}",
                frac(pos),
                frac(neg),
                frac(pos + neg)
            )?;
        }
        writeln!(w, "            +------+------+--------")?;
        writeln!(
            w,
            "            | {:.2} | {:.2} | {:.2}",
            frac(self.positive.total()),
            frac(self.negative.total()),
            frac(self.total())
        )?;
        writeln!(w)?;
        writeln!(w, "accuracy: {:.4}", self.accuracy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfusionMatrix {
        let mut matrix = ConfusionMatrix::new();
        for predicted in [
            Sentiment::Positive,
            Sentiment::Positive,
            Sentiment::Positive,
            Sentiment::Neutral,
        ] {
            matrix.record(Polarity::Positive, predicted);
        }
        for predicted in [Sentiment::Negative, Sentiment::Negative, Sentiment::Positive] {
            matrix.record(Polarity::Negative, predicted);
        }
        matrix
    }

    #[test]
    fn test_counts_and_accuracy() {
        let matrix = sample();
        assert_eq!(matrix.count(Polarity::Positive, Sentiment::Positive), 3);
        assert_eq!(matrix.count(Polarity::Positive, Sentiment::Neutral), 1);
        assert_eq!(matrix.count(Polarity::Negative, Sentiment::Positive), 1);
        assert_eq!(matrix.total(), 7);
        assert!((matrix.accuracy() - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = ConfusionMatrix::new();
        assert_eq!(matrix.total(), 0);
        assert_eq!(matrix.accuracy(), 0.0);
        let mut out = Vec::new();
        matrix.render(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("0.00"));
    }

    #[test]
    fn test_render_layout() {
        let mut out = Vec::new();
        sample().render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "      POS   |    3  |    1  |    4");
        assert_eq!(lines[3], "        -   |    1  |    0  |    1");
        assert_eq!(lines[4], "      NEG   |    0  |    2  |    2");
        assert_eq!(lines[6], "      total |    4  |    3  |    7");
        assert_eq!(lines[10], "      POS   | 0.43 | 0.14 | 0.57");
        assert!(text.ends_with("accuracy: 0.7143\n"));
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["positive"]["neutral"], 1);
        assert_eq!(value["negative"]["negative"], 2);
        assert_eq!(Polarity::Negative.expected(), Sentiment::Negative);
    }
}
