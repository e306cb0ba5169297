//! Composer resolution: canonical-directory lookup with a
//! transliteration-aware fuzzy fallback.
//!
//! Scraped artist fields spell composers every which way - initials,
//! honorifics, other-language forms, non-Latin alphabets. Resolution maps
//! them onto the catalog's canonical composer directory.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::scoring;

/// Variant-name groups for one canonical composer, as stored in the
/// transliteration table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ComposerVariants {
    #[serde(default)]
    pub transliterations: Vec<String>,
    /// Other-language forms keyed by language code.
    #[serde(default)]
    pub other_languages: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ComposerVariants {
    fn names(&self) -> impl Iterator<Item = &str> {
        self.transliterations
            .iter()
            .map(String::as_str)
            .chain(self.other_languages.values().map(String::as_str))
            .chain(self.aliases.iter().map(String::as_str))
    }
}

/// Canonical composer name -> variant-name groups. A composer absent from
/// the table uses only its canonical name as its variant set.
pub type TransliterationTable = FxHashMap<String, ComposerVariants>;

/// Maps raw composer strings onto the catalog's canonical composer
/// directory. Read-only after construction.
pub struct ComposerResolver {
    /// Canonical names in catalog first-seen order; this order breaks
    /// score ties.
    directory: Vec<String>,
    known: FxHashSet<String>,
    table: TransliterationTable,
}

impl ComposerResolver {
    pub fn new(directory: Vec<String>, table: TransliterationTable) -> Self {
        let known = directory.iter().cloned().collect();
        Self {
            directory,
            known,
            table,
        }
    }

    pub fn directory(&self) -> &[String] {
        &self.directory
    }

    /// Resolve a raw composer string to a canonical name.
    ///
    /// An exact directory hit (byte equality, no case folding) returns
    /// unchanged. Otherwise every composer is scored by the maximum
    /// partial-ratio similarity across its variant set - the canonical
    /// name plus any transliteration-table entries - and the global
    /// maximum wins, ties going to the first maximum in directory order.
    /// `None` means nothing scored above zero; the caller widens to a
    /// catalog-wide search instead of failing.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        if self.known.contains(raw) {
            return self
                .directory
                .iter()
                .map(String::as_str)
                .find(|name| *name == raw);
        }

        let mut best: Option<(&str, i32)> = None;
        for name in &self.directory {
            let score = self.variant_score(name, raw);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        best.filter(|(_, score)| *score > 0).map(|(name, _)| name)
    }

    /// Best similarity between a raw string and one composer's known names.
    fn variant_score(&self, canonical: &str, raw: &str) -> i32 {
        let mut score = scoring::partial_similarity(raw, canonical);
        if let Some(variants) = self.table.get(canonical) {
            for name in variants.names() {
                score = score.max(scoring::partial_similarity(raw, name));
            }
        }
        score
    }
}
