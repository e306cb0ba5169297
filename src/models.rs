//! Core data models for catalog linking.
//!
//! This module contains the struct definitions and enums shared across the
//! resolution pipeline: catalog rows, query records, match results and
//! batch statistics.

use serde::Serialize;

/// Sentinel for absent catalog fields. The reference corpus uses "N/A" for
/// every missing cell, so loaded rows carry it verbatim.
pub const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Reference Catalog Models
// ============================================================================

/// Movement list of a composition, decoded from the catalog's
/// `[header, [names...]]` pair encoding.
///
/// `declared_count` is the leading digit run of the header ("3 movements"
/// -> 3) and is a diagnostic hint only; `names` is authoritative and is
/// empty (never null) when the source cell was absent or malformed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Movements {
    pub declared_count: usize,
    pub names: Vec<String>,
}

impl Movements {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One reference catalog row: a known composition with its authoritative
/// metadata. Immutable after load.
#[derive(Clone, Debug)]
pub struct Composition {
    /// Canonical composer name, shared across many compositions.
    pub composer: String,
    /// Primary display title.
    pub title: String,
    /// Translated or alternate display titles, possibly empty.
    pub alternate_titles: Vec<String>,
    /// Short or colloquial names, possibly empty.
    pub aliases: Vec<String>,
    /// Free-text catalogue designations (opus, Köchel, BWV, ...), or "N/A".
    pub catalogue_number: String,
    /// Key signature string, or "N/A".
    pub key: String,
    pub movements: Movements,
}

impl Composition {
    /// All candidate display names for similarity comparison, primary first.
    pub fn candidate_titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str())
            .chain(self.alternate_titles.iter().map(String::as_str))
            .chain(self.aliases.iter().map(String::as_str))
    }
}

// ============================================================================
// Query Models
// ============================================================================

/// One track to resolve. Ephemeral, one per query.
#[derive(Clone, Debug)]
pub struct QueryRecord {
    pub title: String,
    /// Composer as scraped: the first "/"-delimited segment of the track's
    /// artist field, not yet resolved to a canonical name.
    pub composer: String,
    /// Track duration in seconds, when the source supplies one. Carried for
    /// reporting; not used by the matching heuristics.
    pub duration: Option<f64>,
}

impl QueryRecord {
    /// Build a query record from a raw track row. The composer is the first
    /// "/"-delimited segment of the artist list.
    pub fn from_track(title: &str, artists: &str, duration: Option<f64>) -> Self {
        let composer = artists.split('/').next().unwrap_or("").trim().to_string();
        Self {
            title: title.to_string(),
            composer,
            duration,
        }
    }
}

// ============================================================================
// Match Results
// ============================================================================

/// Which rule of the ordered matching algorithm decided a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MatchPath {
    /// The catalogue-number filter left exactly one candidate.
    CatalogueNumber,
    /// The work-number filter disambiguated several candidates sharing one
    /// catalogue number.
    WorkNumber,
    /// Fuzzy-similarity fallback; carries the accepted score.
    Similarity { score: i32 },
}

/// A successful resolution. "Not found" is `None` at the API boundary, not
/// an error.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkMatch {
    pub composer: String,
    pub composition_title: String,
    /// Best-effort movement pick; empty when the composition has no
    /// movement list.
    pub movement_name: String,
    pub path: MatchPath,
}

// ============================================================================
// Batch Statistics
// ============================================================================

/// Per-path counters for a batch run, serialized to JSON for inspection.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LinkStats {
    pub total_records: usize,
    /// Applause/noise records excluded from the total.
    pub skipped: usize,
    pub matched: usize,
    pub missed: usize,

    pub via_catalogue_number: usize,
    pub via_work_number: usize,
    pub via_similarity: usize,

    pub elapsed_seconds: f64,
}

impl LinkStats {
    pub fn record(&mut self, outcome: Option<&LinkMatch>) {
        self.total_records += 1;
        match outcome {
            Some(m) => {
                self.matched += 1;
                match m.path {
                    MatchPath::CatalogueNumber => self.via_catalogue_number += 1,
                    MatchPath::WorkNumber => self.via_work_number += 1,
                    MatchPath::Similarity { .. } => self.via_similarity += 1,
                }
            }
            None => self.missed += 1,
        }
    }

    /// Match rate as a percentage of the records actually resolved.
    pub fn match_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            100.0 * self.matched as f64 / self.total_records as f64
        }
    }

    /// Write stats to a JSON file.
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
