//! WordPiece tokenizer over a BERT-style `vocab.txt`.
//!
//! Token ids are line numbers. Words are split on whitespace and punctuation,
//! then greedily matched longest-prefix first with `##` continuation pieces.
//! A word with no full match becomes `[UNK]`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::error::{DigestError, Result};
use crate::traits::tokenizer::Tokenizer;

const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";
const UNK: &str = "[UNK]";
const CONTINUATION: &str = "##";

/// Words longer than this are mapped straight to `[UNK]`.
const MAX_WORD_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct VocabTokenizer {
    ids: HashMap<String, u32>,
    tokens: Vec<String>,
    lowercase: bool,
    cls_id: u32,
    sep_id: u32,
    unk_id: u32,
}

impl VocabTokenizer {
    /// Build from tokens in id order. `[CLS]`, `[SEP]` and `[UNK]` must be
    /// present.
    pub fn from_tokens<I, S>(tokens: I, lowercase: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut ids = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            ids.entry(token.clone()).or_insert(id as u32);
        }

        let special = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| DigestError::Config(format!("vocabulary is missing {name}")))
        };
        let cls_id = special(CLS)?;
        let sep_id = special(SEP)?;
        let unk_id = special(UNK)?;

        Ok(Self {
            ids,
            tokens,
            lowercase,
            cls_id,
            sep_id,
            unk_id,
        })
    }

    pub fn from_reader<R: BufRead>(reader: R, lowercase: bool) -> Result<Self> {
        let tokens = reader
            .lines()
            .map(|line| {
                line.map(|l| l.trim_end_matches(['\r', '\n']).to_string())
                    .map_err(|e| DigestError::Config(format!("reading vocabulary: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_tokens(tokens, lowercase)
    }

    pub fn from_path(path: impl AsRef<Path>, lowercase: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DigestError::Config(format!("opening {}: {e}", path.display())))?;
        let tokenizer = Self::from_reader(BufReader::new(file), lowercase)?;
        info!(path = %path.display(), tokens = tokenizer.len(), "loaded vocabulary");
        Ok(tokenizer)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn is_special(&self, id: u32) -> bool {
        self.tokens
            .get(id as usize)
            .is_some_and(|t| t.starts_with('[') && t.ends_with(']'))
    }

    fn word_pieces(&self, word: &str, out: &mut Vec<u32>) {
        if word.chars().count() > MAX_WORD_CHARS {
            out.push(self.unk_id);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < word.len() {
            let mut end = word.len();
            let mut matched = None;
            while end > start {
                if !word.is_char_boundary(end) {
                    end -= 1;
                    continue;
                }
                let piece = if start == 0 {
                    word[start..end].to_string()
                } else {
                    format!("{CONTINUATION}{}", &word[start..end])
                };
                if let Some(&id) = self.ids.get(&piece) {
                    matched = Some(id);
                    break;
                }
                end -= 1;
            }

            match matched {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    out.push(self.unk_id);
                    return;
                }
            }
        }
        out.extend(pieces);
    }
}

/// Split on whitespace, and make every punctuation character its own word.
fn basic_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for chunk in text.split_whitespace() {
        let mut start = 0;
        for (i, c) in chunk.char_indices() {
            if c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace()) {
                if start < i {
                    words.push(&chunk[start..i]);
                }
                words.push(&chunk[i..i + c.len_utf8()]);
                start = i + c.len_utf8();
            }
        }
        if start < chunk.len() {
            words.push(&chunk[start..]);
        }
    }
    words
}

impl Tokenizer for VocabTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let mut ids = Vec::new();
        for word in basic_words(&text) {
            self.word_pieces(word, &mut ids);
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let mut text = String::new();
        for &id in ids {
            if self.is_special(id) {
                continue;
            }
            let token = self
                .tokens
                .get(id as usize)
                .ok_or_else(|| DigestError::inference(format!("token id {id} out of range")))?;
            match token.strip_prefix(CONTINUATION) {
                Some(rest) => text.push_str(rest),
                None => {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(token);
                }
            }
        }
        Ok(text)
    }

    fn begin_id(&self) -> u32 {
        self.cls_id
    }

    fn end_id(&self) -> u32 {
        self.sep_id
    }
}
