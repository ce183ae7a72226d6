//! Binary snapshot of a trained classifier.
//!
//! All integers are little-endian. Layout:
//!
//! ```text
//! [4B] magic "MKSC"
//! [4B] version (u32)
//! [1B] smoothing tag (0 laplace, 1 backoff, 2 sgts)
//! [4B] order (u32)
//! [8B] backoff discount (f64)
//! positive estimator, then negative estimator:
//!   [4B] table count (1, or order + 1 for backoff)
//!   per table, lowest order first:
//!     [4B] order
//!     [4B] word count; per word: [2B] byte length, UTF-8 bytes
//!     [4B] context count; per context: order × [4B] word id
//!     count matrix (CSR, u32 values)
//!   sgts only: probability matrix (CSR, f64 values)
//!
//! CSR: [4B] rows [4B] cols [8B] nnz
//!      (rows + 1) × [8B] row pointer, nnz × [4B] column, nnz × value
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::classifier::MarkovClassifier;
use crate::error::{ModelError, Result};
use crate::estimator::{
    BackoffModel, Estimator, GoodTuringModel, LaplaceModel, MAX_ORDER, ModelConfig, Smoothing,
};
use crate::index::Interner;
use crate::matrix::CsrMatrix;
use crate::table::TransitionTable;

const MAGIC: &[u8; 4] = b"MKSC";
const VERSION: u32 = 1;

const MAX_WORDS: usize = 10_000_000;
const MAX_CONTEXTS: usize = 100_000_000;
const MAX_CELLS: u64 = 1_000_000_000;

impl MarkovClassifier {
    /// Write the classifier to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        let bytes = w.get_ref().metadata()?.len();
        info!(path = %path.display(), bytes, "saved model snapshot");
        Ok(())
    }

    /// Read a classifier previously written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let bytes = file.metadata()?.len();
        let classifier = Self::read_from(&mut BufReader::new(file))?;
        info!(path = %path.display(), bytes, "loaded model snapshot");
        Ok(classifier)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decode a snapshot held in memory. The buffer must contain exactly one
    /// snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut rest = bytes;
        let classifier = Self::read_from(&mut rest)?;
        if !rest.is_empty() {
            return Err(ModelError::Format(format!(
                "{} trailing bytes after snapshot",
                rest.len()
            )));
        }
        Ok(classifier)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let config = self.config();
        w.write_all(MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;
        w.write_all(&[config.smoothing.tag()])?;
        w.write_all(&(config.order as u32).to_le_bytes())?;
        w.write_all(&config.backoff_discount.to_le_bytes())?;

        write_estimator(w, self.positive())?;
        write_estimator(w, self.negative())?;
        Ok(())
    }

    /// Decode a snapshot from a stream, validating every section.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        read_classifier(r).map_err(|e| match e {
            ModelError::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                ModelError::Format("unexpected end of snapshot".to_string())
            }
            other => other,
        })
    }
}

fn read_classifier<R: Read>(r: &mut R) -> Result<MarkovClassifier> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ModelError::Format("invalid magic: expected MKSC".to_string()));
    }
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(ModelError::Format(format!("unsupported version: {version}")));
    }

    let tag = read_u8(r)?;
    let smoothing = Smoothing::from_tag(tag)
        .ok_or_else(|| ModelError::Format(format!("unknown smoothing tag: {tag}")))?;
    let order = read_u32(r)? as usize;
    let backoff_discount = read_f64(r)?;
    let config = ModelConfig::new(order, smoothing).with_backoff_discount(backoff_discount);
    config.validate()?;
    debug!(order, %smoothing, backoff_discount, "reading snapshot");

    let positive = read_estimator(r, &config)?;
    let negative = read_estimator(r, &config)?;
    MarkovClassifier::from_parts(config, positive, negative)
}

fn write_estimator<W: Write>(w: &mut W, estimator: &Estimator) -> Result<()> {
    let tables = estimator.tables();
    w.write_all(&(tables.len() as u32).to_le_bytes())?;
    for table in tables {
        write_table(w, table)?;
    }
    if let Estimator::GoodTuring(model) = estimator {
        write_csr(w, model.probs(), |w, p| w.write_all(&p.to_le_bytes()))?;
    }
    Ok(())
}

fn read_estimator<R: Read>(r: &mut R, config: &ModelConfig) -> Result<Estimator> {
    let expected_tables = match config.smoothing {
        Smoothing::Backoff => config.order + 1,
        Smoothing::Laplace | Smoothing::GoodTuring => 1,
    };
    let n_tables = read_u32(r)? as usize;
    if n_tables != expected_tables {
        return Err(ModelError::Format(format!(
            "expected {expected_tables} tables for {} order {}, found {n_tables}",
            config.smoothing, config.order
        )));
    }

    let mut tables = Vec::with_capacity(n_tables);
    for j in 0..n_tables {
        let table = read_table(r)?;
        let expected_order = match config.smoothing {
            Smoothing::Backoff => j,
            Smoothing::Laplace | Smoothing::GoodTuring => config.order,
        };
        if table.order() != expected_order {
            return Err(ModelError::Format(format!(
                "table {j} has order {}, expected {expected_order}",
                table.order()
            )));
        }
        tables.push(table);
    }

    Ok(match config.smoothing {
        Smoothing::Laplace => {
            let table = tables.pop().ok_or_else(missing_table)?;
            Estimator::Laplace(LaplaceModel::fit(table))
        }
        Smoothing::Backoff => {
            let levels = tables.into_iter().map(LaplaceModel::fit).collect();
            Estimator::Backoff(BackoffModel::from_levels(config.backoff_discount, levels)?)
        }
        Smoothing::GoodTuring => {
            let table = tables.pop().ok_or_else(missing_table)?;
            let probs = read_csr(r, read_f64)?;
            Estimator::GoodTuring(GoodTuringModel::from_parts(table, probs)?)
        }
    })
}

fn missing_table() -> ModelError {
    ModelError::Format("estimator has no count table".to_string())
}

fn write_table<W: Write>(w: &mut W, table: &TransitionTable) -> Result<()> {
    w.write_all(&(table.order() as u32).to_le_bytes())?;

    let words = table.vocabulary().items();
    w.write_all(&(words.len() as u32).to_le_bytes())?;
    for word in words {
        let bytes = word.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            ModelError::Format(format!("word of {} bytes is too long to store", bytes.len()))
        })?;
        w.write_all(&len.to_le_bytes())?;
        w.write_all(bytes)?;
    }

    let contexts = table.contexts().items();
    w.write_all(&(contexts.len() as u32).to_le_bytes())?;
    for context in contexts {
        for id in context {
            w.write_all(&id.to_le_bytes())?;
        }
    }

    write_csr(w, table.counts(), |w, c| w.write_all(&c.to_le_bytes()))
}

fn read_table<R: Read>(r: &mut R) -> Result<TransitionTable> {
    let order = read_u32(r)? as usize;
    if order > MAX_ORDER {
        return Err(ModelError::Format(format!(
            "table order too large: {order} (max {MAX_ORDER})"
        )));
    }

    let n_words = read_u32(r)? as usize;
    if n_words > MAX_WORDS {
        return Err(ModelError::Format(format!(
            "word count too large: {n_words} (max {MAX_WORDS})"
        )));
    }
    let mut words = Vec::with_capacity(n_words);
    for _ in 0..n_words {
        let len = read_u16(r)? as usize;
        let mut bytes = vec![0u8; len];
        r.read_exact(&mut bytes)?;
        let word = String::from_utf8(bytes)
            .map_err(|e| ModelError::Format(format!("invalid UTF-8 in word: {e}")))?;
        words.push(word);
    }
    let vocabulary = Interner::from_items(words)
        .map_err(|word| ModelError::Format(format!("duplicate word '{word}'")))?;

    let n_contexts = read_u32(r)? as usize;
    if n_contexts > MAX_CONTEXTS {
        return Err(ModelError::Format(format!(
            "context count too large: {n_contexts} (max {MAX_CONTEXTS})"
        )));
    }
    let mut contexts = Vec::with_capacity(n_contexts);
    for _ in 0..n_contexts {
        let ids = (0..order)
            .map(|_| read_u32(r))
            .collect::<io::Result<Vec<u32>>>()?;
        contexts.push(ids);
    }
    let contexts = Interner::from_items(contexts)
        .map_err(|ids| ModelError::Format(format!("duplicate context {ids:?}")))?;

    let counts = read_csr(r, read_u32)?;
    TransitionTable::from_parts(order, vocabulary, contexts, counts)
}

fn write_csr<W, T, F>(w: &mut W, matrix: &CsrMatrix<T>, mut write_value: F) -> Result<()>
where
    W: Write,
    T: Copy + Default + PartialEq,
    F: FnMut(&mut W, T) -> io::Result<()>,
{
    let (rows, cols) = matrix.shape();
    w.write_all(&(rows as u32).to_le_bytes())?;
    w.write_all(&(cols as u32).to_le_bytes())?;
    w.write_all(&(matrix.nnz() as u64).to_le_bytes())?;
    for &ptr in matrix.row_ptr() {
        w.write_all(&(ptr as u64).to_le_bytes())?;
    }
    for &col in matrix.col_indices() {
        w.write_all(&col.to_le_bytes())?;
    }
    for &value in matrix.values() {
        write_value(w, value)?;
    }
    Ok(())
}

fn read_csr<R, T, F>(r: &mut R, mut read_value: F) -> Result<CsrMatrix<T>>
where
    R: Read,
    T: Copy + Default + PartialEq,
    F: FnMut(&mut R) -> io::Result<T>,
{
    let rows = read_u32(r)? as usize;
    let cols = read_u32(r)? as usize;
    let nnz = read_u64(r)?;
    if rows > MAX_CONTEXTS {
        return Err(ModelError::Format(format!(
            "matrix row count too large: {rows} (max {MAX_CONTEXTS})"
        )));
    }
    if nnz > MAX_CELLS {
        return Err(ModelError::Format(format!(
            "matrix cell count too large: {nnz} (max {MAX_CELLS})"
        )));
    }
    let nnz = nnz as usize;

    let mut row_ptr = Vec::with_capacity(rows + 1);
    for _ in 0..=rows {
        let ptr = read_u64(r)?;
        row_ptr.push(usize::try_from(ptr).map_err(|_| {
            ModelError::Format(format!("row pointer out of range: {ptr}"))
        })?);
    }
    let col_idx = (0..nnz)
        .map(|_| read_u32(r))
        .collect::<io::Result<Vec<u32>>>()?;
    let values = (0..nnz)
        .map(|_| read_value(r))
        .collect::<io::Result<Vec<T>>>()?;

    CsrMatrix::from_raw_parts(rows, cols, row_ptr, col_idx, values).map_err(ModelError::Format)
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Header length: magic, version, tag, order, discount.
    const HEADER_LEN: usize = 4 + 4 + 1 + 4 + 8;

    fn tiny_model() -> MarkovClassifier {
        MarkovClassifier::train(ModelConfig::new(0, Smoothing::Laplace), &["a"], &["b"]).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let model = MarkovClassifier::train(
            ModelConfig::new(3, Smoothing::GoodTuring),
            &["a b"],
            &["c d"],
        )
        .unwrap();
        let bytes = model.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"MKSC");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), VERSION);
        assert_eq!(bytes[8], 2);
        assert_eq!(u32::from_le_bytes(bytes[9..13].try_into().unwrap()), 3);
        assert_eq!(f64::from_le_bytes(bytes[13..21].try_into().unwrap()), 0.1);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = tiny_model().to_bytes().unwrap();
        bytes[0] = b'X';
        let err = MarkovClassifier::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::Format(msg) if msg.contains("magic")));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = tiny_model().to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = MarkovClassifier::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::Format(msg) if msg.contains("version")));
    }

    #[test]
    fn test_unknown_smoothing_tag() {
        let mut bytes = tiny_model().to_bytes().unwrap();
        bytes[8] = 9;
        let err = MarkovClassifier::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ModelError::Format(msg) if msg.contains("smoothing tag")));
    }

    #[test]
    fn test_truncated_snapshot() {
        let bytes = tiny_model().to_bytes().unwrap();
        for len in [0, 3, HEADER_LEN, bytes.len() - 1] {
            let err = MarkovClassifier::from_bytes(&bytes[..len]).unwrap_err();
            assert!(matches!(err, ModelError::Format(_)), "length {len}: {err}");
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = tiny_model().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            MarkovClassifier::from_bytes(&bytes),
            Err(ModelError::Format(msg)) if msg.contains("trailing")
        ));
    }

    #[test]
    fn test_count_matrix_shape_mismatch() {
        // Positive table of the tiny model: order 0, words "a" and "_", one
        // empty context, then the count CSR whose column field follows the
        // row field.
        let mut bytes = tiny_model().to_bytes().unwrap();
        let tables = HEADER_LEN;
        let words = tables + 4 + 4;
        let contexts = words + 4 + (2 + 1) * 2;
        let csr_rows = contexts + 4;
        let csr_cols = csr_rows + 4;
        assert_eq!(&bytes[csr_rows..csr_cols], &1u32.to_le_bytes());
        assert_eq!(&bytes[csr_cols..csr_cols + 4], &2u32.to_le_bytes());

        bytes[csr_cols..csr_cols + 4].copy_from_slice(&3u32.to_le_bytes());
        let err = MarkovClassifier::from_bytes(&bytes).unwrap_err();
        match err {
            ModelError::ShapeMismatch {
                what,
                expected,
                actual,
            } => {
                assert_eq!(what, "count matrix");
                assert_eq!(expected, (1, 2));
                assert_eq!(actual, (1, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_word_rejected() {
        let mut bytes = tiny_model().to_bytes().unwrap();
        // Rename "a" to "_" so the vocabulary holds "_" twice
        let first_word = HEADER_LEN + 4 + 4 + 4 + 2;
        assert_eq!(bytes[first_word], b'a');
        bytes[first_word] = b'_';
        assert!(matches!(
            MarkovClassifier::from_bytes(&bytes),
            Err(ModelError::Format(msg)) if msg.contains("duplicate word")
        ));
    }

    #[test]
    fn test_table_count_must_match_smoothing() {
        let mut bytes = tiny_model().to_bytes().unwrap();
        bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            MarkovClassifier::from_bytes(&bytes),
            Err(ModelError::Format(msg)) if msg.contains("tables")
        ));
    }
}
