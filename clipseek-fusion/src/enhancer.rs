//! Query expansion into weighted variants.
//!
//! A query is expanded into at most `max_variants` variants, in this order:
//!
//! 1. the original query;
//! 2. the curated expansion of a single-token query, when the table has one;
//! 3. `"a <query>"` for a single-token query that does not start with an
//!    article.
//!
//! The variant at output position `i` gets weight `1.0 - i * weight_decay`,
//! so a missing expansion shifts the article form to position 1.

use std::collections::HashMap;

use crate::config::FusionConfig;
use crate::types::QueryVariant;

/// Single-word nouns mapped to longer descriptive phrases.
const DEFAULT_EXPANSIONS: &[(&str, &str)] = &[
    ("horse", "a horse animal standing in field or stable"),
    ("person", "a person standing or walking"),
    ("car", "a car vehicle on road or street"),
    ("cat", "a cat animal sitting or lying down"),
    ("dog", "a dog animal playing or sitting"),
    ("building", "a tall building architecture structure"),
    ("food", "delicious food meal on plate or table"),
    ("tree", "green tree in nature park or forest"),
    ("flower", "beautiful colorful flower in garden"),
    ("sunset", "beautiful sunset sky with orange and pink colors"),
];

const ARTICLES: &[&str] = &["a ", "an ", "the "];

/// Expands a query into weighted variants. Pure and deterministic.
#[derive(Debug, Clone)]
pub struct QueryEnhancer {
    expansions: HashMap<String, String>,
    weight_decay: f64,
    max_variants: usize,
}

impl Default for QueryEnhancer {
    fn default() -> Self {
        Self::new(&FusionConfig::default())
    }
}

impl QueryEnhancer {
    /// Enhancer with the built-in expansion table.
    pub fn new(config: &FusionConfig) -> Self {
        let expansions = DEFAULT_EXPANSIONS
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Self {
            expansions,
            weight_decay: config.weight_decay,
            max_variants: config.max_variants,
        }
    }

    /// Enhancer with a caller-supplied expansion table.
    ///
    /// Keys are matched against the lower-cased, trimmed query.
    pub fn with_expansions<I, K, V>(config: &FusionConfig, expansions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            expansions: expansions
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
            weight_decay: config.weight_decay,
            max_variants: config.max_variants,
        }
    }

    /// Look up the curated expansion for a single-token query.
    pub fn expansion_for(&self, query: &str) -> Option<&str> {
        let key = query.trim().to_lowercase();
        if key.contains(char::is_whitespace) {
            return None;
        }
        self.expansions.get(&key).map(String::as_str)
    }

    /// Expand `query` into ordered, weighted variants.
    ///
    /// With `enabled == false` the result is exactly the original query at
    /// weight 1.0.
    pub fn enhance(&self, query: &str, enabled: bool) -> Vec<QueryVariant> {
        let mut texts = vec![query.to_owned()];

        if enabled {
            if let Some(expansion) = self.expansion_for(query) {
                texts.push(expansion.to_owned());
            }

            // The article is prefixed to the query exactly as submitted.
            let lower = query.trim().to_lowercase();
            let single_token = lower.split_whitespace().count() == 1;
            if single_token && !ARTICLES.iter().any(|a| lower.starts_with(a)) {
                texts.push(format!("a {query}"));
            }
        }

        texts.truncate(self.max_variants.max(1));
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| QueryVariant {
                text,
                weight: 1.0 - i as f64 * self.weight_decay,
            })
            .collect()
    }
}
