//! Composition and movement matching.
//!
//! [`Linker`] owns the immutable reference state (catalog + composer
//! resolver) and resolves one track record at a time. Each query is a pure
//! function of that state and the record, so batch callers may fan out
//! across threads freely.

use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::composer::{ComposerResolver, TransliterationTable};
use crate::models::{Composition, LinkMatch, MatchPath, QueryRecord};
use crate::scoring::{self, ACCEPT_THRESHOLD};
use crate::title;

/// Delimiters that must immediately follow a catalogue token for a
/// reference field to count as containing it; "Op.1" must not match a
/// field carrying "Op.10".
const TOKEN_DELIMITERS: [char; 3] = ['\'', ' ', '/'];

fn contains_delimited(field: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    field.match_indices(token).any(|(start, _)| {
        field[start + token.len()..]
            .chars()
            .next()
            .is_some_and(|c| TOKEN_DELIMITERS.contains(&c))
    })
}

pub struct Linker {
    catalog: Catalog,
    composers: ComposerResolver,
}

impl Linker {
    /// Build a linker over a loaded catalog; the composer directory is
    /// derived from the catalog rows.
    pub fn new(catalog: Catalog, transliterations: TransliterationTable) -> Self {
        let composers = ComposerResolver::new(catalog.composers().to_vec(), transliterations);
        Self { catalog, composers }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn composers(&self) -> &ComposerResolver {
        &self.composers
    }

    /// Resolve one track record to a composition and a movement.
    ///
    /// `None` is the normal low-confidence outcome, not an error; the miss
    /// is logged with the record's original composer and title so batch
    /// runs stay auditable.
    pub fn query(&self, record: &QueryRecord) -> Option<LinkMatch> {
        match self.query_composition(record) {
            Some((composition, path)) => {
                let movement_name = self
                    .match_movement(composition, &record.title)
                    .unwrap_or_default()
                    .to_string();
                debug!(
                    composer = composition.composer.as_str(),
                    title = composition.title.as_str(),
                    movement = movement_name.as_str(),
                    ?path,
                    "resolved record"
                );
                Some(LinkMatch {
                    composer: composition.composer.clone(),
                    composition_title: composition.title.clone(),
                    movement_name,
                    path,
                })
            }
            None => {
                info!(
                    composer = record.composer.as_str(),
                    title = record.title.as_str(),
                    "not found"
                );
                None
            }
        }
    }

    /// The ordered matching algorithm; the first satisfied rule decides.
    ///
    /// 1. Scope to the resolved composer, widening to the whole catalog
    ///    when the composer is unresolvable or scopes to nothing.
    /// 2. Parse the title into key / catalogue number / work number.
    /// 3. Keep rows whose catalogue field contains the parsed catalogue
    ///    token on an exact delimiter boundary.
    /// 4. Within those, keep rows that also contain the work number.
    /// 5. A unique step-3 row wins; else a unique step-4 row wins; else
    ///    fall back to similarity scoring with an acceptance threshold.
    fn query_composition(&self, record: &QueryRecord) -> Option<(&Composition, MatchPath)> {
        let mut scope: Vec<&Composition> = match self.composers.resolve(&record.composer) {
            Some(name) => self.catalog.composer_scope(name),
            None => Vec::new(),
        };
        if scope.is_empty() {
            scope = self.catalog.rows().iter().collect();
        }
        if scope.is_empty() {
            return None;
        }

        let info = title::parse_title(&record.title);

        // An unparsed catalogue number leaves this set empty, which routes
        // the decision to the similarity fallback over the whole scope.
        let by_catalogue: Vec<&Composition> = match info.catalogue.as_deref() {
            Some(token) => scope
                .iter()
                .copied()
                .filter(|row| contains_delimited(&row.catalogue_number, token))
                .collect(),
            None => Vec::new(),
        };

        // Work number disambiguates multiple works under one catalogue
        // number.
        let by_work: Vec<&Composition> = match info.work_no.as_deref() {
            Some(number) => by_catalogue
                .iter()
                .copied()
                .filter(|row| contains_delimited(&row.catalogue_number, number))
                .collect(),
            None => Vec::new(),
        };

        if by_catalogue.len() == 1 {
            return Some((by_catalogue[0], MatchPath::CatalogueNumber));
        }
        if by_work.len() == 1 {
            return Some((by_work[0], MatchPath::WorkNumber));
        }

        let pool = if by_catalogue.is_empty() {
            &scope
        } else {
            &by_catalogue
        };
        let mut best: Option<(&Composition, i32)> = None;
        for &candidate in pool {
            let score = scoring::composition_score(candidate, info.key.as_deref(), &record.title);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
        let (composition, score) = best?;
        if score < ACCEPT_THRESHOLD {
            debug!(
                score,
                title = record.title.as_str(),
                "best candidate below acceptance threshold"
            );
            return None;
        }
        Some((composition, MatchPath::Similarity { score }))
    }

    /// Pick the best-matching movement within a resolved composition.
    ///
    /// Best-effort by contract: this never rejects the composition-level
    /// decision and returns `None` only when the row has no movement list.
    pub fn match_movement<'a>(
        &self,
        composition: &'a Composition,
        query_title: &str,
    ) -> Option<&'a str> {
        let mut best: Option<(&str, i32)> = None;
        for name in &composition.movements.names {
            let score = scoring::partial_similarity(name, query_title);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name)
    }

    /// Whether two track records resolve to the same composition and the
    /// same movement. False when either side fails to resolve.
    pub fn same_work(&self, a: &QueryRecord, b: &QueryRecord) -> bool {
        match (self.query(a), self.query(b)) {
            (Some(x), Some(y)) => {
                x.composition_title == y.composition_title && x.movement_name == y.movement_name
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_containment_requires_boundary() {
        assert!(contains_delimited("Op.1/No.2/", "Op.1"));
        assert!(contains_delimited("D.845/Op.42/", "Op.42"));
        assert!(contains_delimited("'Op. 42' 'D. 845'", "D. 845"));
        // "Op.1" inside "Op.10" crosses a digit, not a delimiter.
        assert!(!contains_delimited("Op.10/No.1/", "Op.1"));
        // Token at end of field has no trailing delimiter.
        assert!(!contains_delimited("BWV 846", "BWV 846"));
        assert!(!contains_delimited("N/A", "Op.1"));
        assert!(!contains_delimited("Op.1/", ""));
    }
}
