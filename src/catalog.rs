//! Reference catalog loading.
//!
//! The catalog is a CSV export with one row per known composition:
//! `composer, title, alternate_titles, aliases, catalogue_number, key,
//! movements`. List-valued cells hold JSON arrays; the movements cell
//! holds the corpus's `[header, [names...]]` pair. Missing cells are
//! normalized to the "N/A" sentinel at load time, and malformed movement
//! encodings degrade to an empty movement list rather than aborting.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::composer::TransliterationTable;
use crate::models::{Composition, Movements, NOT_AVAILABLE};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to parse transliteration table {path}: {source}")]
    Transliterations {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw catalog CSV row, before sentinel normalization and cell decoding.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    composer: String,
    title: String,
    #[serde(default)]
    alternate_titles: String,
    #[serde(default)]
    aliases: String,
    #[serde(default)]
    catalogue_number: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    movements: String,
}

impl CatalogRow {
    fn into_composition(self) -> Composition {
        Composition {
            composer: self.composer,
            title: self.title,
            alternate_titles: parse_name_list(&self.alternate_titles),
            aliases: parse_name_list(&self.aliases),
            catalogue_number: or_na(self.catalogue_number),
            key: or_na(self.key),
            movements: parse_movements(&self.movements),
        }
    }
}

fn or_na(value: String) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value
    }
}

/// Decode a JSON-array cell (`["name", ...]`) into a list of names.
/// Absent, "N/A" or malformed cells decay to an empty list.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(names) => names,
        Err(err) => {
            warn!(%err, cell = raw, "unparseable name-list cell, treating as empty");
            Vec::new()
        }
    }
}

/// Decode a movements cell: a JSON `[header, [names...]]` pair.
///
/// The header's leading digit run is the declared movement count, kept as
/// a diagnostic hint; a mismatch with the actual list length is tolerated
/// and logged. A null header, an absent cell or a malformed encoding all
/// decay to an empty movement list.
pub fn parse_movements(raw: &str) -> Movements {
    let raw = raw.trim();
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return Movements::default();
    }
    let (header, names): (Option<String>, Vec<String>) = match serde_json::from_str(raw) {
        Ok(pair) => pair,
        Err(err) => {
            warn!(%err, cell = raw, "unparseable movements cell, treating as empty");
            return Movements::default();
        }
    };
    let Some(header) = header else {
        return Movements::default();
    };

    let digits: String = header.chars().take_while(|c| c.is_ascii_digit()).collect();
    let declared_count = digits.parse().unwrap_or(0);
    if declared_count != names.len() {
        debug!(
            declared_count,
            actual = names.len(),
            %header,
            "declared movement count disagrees with list length"
        );
    }
    Movements {
        declared_count,
        names,
    }
}

/// The reference catalog plus the composer index derived from it. Built
/// once at startup and read-only for the rest of the process lifetime.
pub struct Catalog {
    rows: Vec<Composition>,
    by_composer: FxHashMap<String, Vec<usize>>,
    composers: Vec<String>,
}

impl Catalog {
    pub fn new(rows: Vec<Composition>) -> Self {
        let mut by_composer: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut composers = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            by_composer
                .entry(row.composer.clone())
                .or_insert_with(|| {
                    composers.push(row.composer.clone());
                    Vec::new()
                })
                .push(idx);
        }
        Self {
            rows,
            by_composer,
            composers,
        }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|source| CatalogError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

        let mut rows = Vec::new();
        for record in reader.deserialize::<CatalogRow>() {
            let row = record.map_err(|source| CatalogError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(row.into_composition());
        }
        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[Composition] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unique canonical composer names, in catalog first-seen order.
    pub fn composers(&self) -> &[String] {
        &self.composers
    }

    /// Rows for one canonical composer, in catalog order.
    pub fn composer_scope(&self, composer: &str) -> Vec<&Composition> {
        self.by_composer
            .get(composer)
            .map(|ids| ids.iter().map(|&idx| &self.rows[idx]).collect())
            .unwrap_or_default()
    }
}

/// Load the transliteration table: a JSON object mapping canonical
/// composer names to variant-name groups.
pub fn load_transliteration_table(path: &Path) -> Result<TransliterationTable, CatalogError> {
    let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| CatalogError::Transliterations {
        path: path.to_path_buf(),
        source,
    })
}
