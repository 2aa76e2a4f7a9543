//! Word vectors loaded from a GloVe-style text file.
//!
//! One entry per line: the word followed by its components separated by
//! spaces. A word2vec header line (`<count> <dimension>`) is skipped.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::error::{DigestError, Result};
use crate::traits::models::WordEmbeddings;

/// In-memory embedding table.
///
/// Lookups try the token as written, then its lowercase form.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    /// Build from `(word, vector)` pairs. All vectors must share a length.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut dimension = None;
        let mut vectors = HashMap::new();

        for (word, vector) in entries {
            let word = word.into();
            match dimension {
                None => dimension = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(DigestError::Config(format!(
                        "embedding for {word:?} has {} components, expected {d}",
                        vector.len()
                    )));
                }
                Some(_) => {}
            }
            vectors.insert(word, vector);
        }

        let dimension = dimension
            .filter(|d| *d > 0)
            .ok_or_else(|| DigestError::Config("embedding table is empty".into()))?;
        Ok(Self { dimension, vectors })
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DigestError::Config(format!("reading embeddings: {e}")))?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: std::result::Result<Vec<f32>, _> = parts.map(str::parse::<f32>).collect();
            let values = values.map_err(|e| {
                DigestError::Config(format!("embeddings line {}: {e}", index + 1))
            })?;

            if index == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            entries.push((word.to_string(), values));
        }

        Self::from_entries(entries)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DigestError::Config(format!("opening {}: {e}", path.display())))?;
        let table = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            words = table.len(),
            dimension = table.dimension,
            "loaded word embeddings"
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl WordEmbeddings for EmbeddingTable {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vector(&self, token: &str) -> Option<Cow<'_, [f32]>> {
        self.vectors
            .get(token)
            .or_else(|| self.vectors.get(&token.to_lowercase()))
            .map(|v| Cow::Borrowed(v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_glove_lines() {
        let text = "the 0.1 0.2 0.3\ncat -1 0 1.5\n\n";
        let table = EmbeddingTable::from_reader(text.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.dimension(), 3);
        assert_eq!(&*table.vector("cat").unwrap(), &[-1.0, 0.0, 1.5]);
    }

    #[test]
    fn test_skips_word2vec_header() {
        let text = "2 2\na 1 0\nb 0 1\n";
        let table = EmbeddingTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.vector("2").is_none());
    }

    #[test]
    fn test_lowercase_fallback() {
        let table = EmbeddingTable::from_entries([("paris", vec![1.0, 2.0])]).unwrap();
        assert!(table.vector("Paris").is_some());
        assert!(table.vector("London").is_none());
    }

    #[test]
    fn test_rejects_ragged_and_empty_tables() {
        assert!(matches!(
            EmbeddingTable::from_reader("a 1 2\nb 1\n".as_bytes()),
            Err(DigestError::Config(_))
        ));
        assert!(matches!(
            EmbeddingTable::from_reader("".as_bytes()),
            Err(DigestError::Config(_))
        ));
        assert!(matches!(
            EmbeddingTable::from_reader("a 1 x\n".as_bytes()),
            Err(DigestError::Config(_))
        ));
    }
}
