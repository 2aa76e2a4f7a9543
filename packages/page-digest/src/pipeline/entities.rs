//! Entity ranking: recognize, drop numeric spans, count, keep the top K.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::traits::language::LanguageModel;
use crate::types::document::Rmc;
use crate::types::entity::{Entity, EntitySpan};

/// Ranks named entities by frequency.
#[derive(Clone)]
pub struct EntityRanker {
    model: Arc<dyn LanguageModel>,
}

impl EntityRanker {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Recognize entities in `rmc` and return at most `limit` of them.
    pub async fn rank(&self, rmc: &Rmc, limit: usize) -> Result<Vec<Entity>> {
        let analyzed = self.model.analyze(rmc).await?;
        let ranked = rank_entities(&analyzed.entities, limit);
        debug!(
            spans = analyzed.entities.len(),
            returned = ranked.len(),
            "ranked entities"
        );
        Ok(ranked)
    }
}

/// Aggregate spans by exact text and sort by count.
///
/// The label of a text is the label of its first occurrence. Ties in count
/// keep first-occurrence order.
pub fn rank_entities(spans: &[EntitySpan], limit: usize) -> Vec<Entity> {
    let mut counts: IndexMap<&str, Entity> = IndexMap::new();

    for span in spans {
        if span.text.trim().is_empty() || is_numeric_only(&span.text) {
            continue;
        }
        counts
            .entry(span.text.as_str())
            .and_modify(|entity| entity.count += 1)
            .or_insert_with(|| Entity::new(span.text.clone(), span.label.clone()));
    }

    let mut ranked: Vec<Entity> = counts.into_values().collect();
    // stable: equal counts stay in first-seen order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Whether every character of `text` is numeric (bare quantities like "2024").
pub fn is_numeric_only(text: &str) -> bool {
    text.chars().all(char::is_numeric)
}
