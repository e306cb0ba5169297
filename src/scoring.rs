//! Fuzzy similarity scoring between query titles and catalog rows.
//!
//! All comparisons go through partial-ratio matching (best-aligned
//! substring overlap on a 0-100 scale), which tolerates one string being a
//! prefix, suffix or substring-equivalent of the other - missing
//! honorifics, extra movement suffixes, transliteration spelling drift.

use any_ascii::any_ascii;
use unicode_normalization::UnicodeNormalization;

use crate::models::Composition;
use crate::title;

// ============================================================================
// Score Constants
// ============================================================================

/// Minimum combined score to accept a composition via the similarity
/// fallback.
pub const ACCEPT_THRESHOLD: i32 = 60;

/// Subtracted from a movement's similarity when the movement name's own
/// parsed key differs from the query's parsed key.
pub const KEY_MISMATCH_PENALTY: i32 = 30;

// ============================================================================
// String Preparation
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Canonical form fed to the fuzzy matcher: diacritics stripped via NFKD,
/// remaining non-Latin scripts transliterated to ASCII, lowercased, and
/// every punctuation run collapsed to a single space.
pub fn prepare(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let folded = any_ascii(&stripped).to_lowercase();

    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
    }
    let end = out.trim_end().len();
    out.truncate(end);
    out
}

/// Partial-ratio similarity on the 0-100 scale, rounded to the nearest
/// integer. Returns 0 when either side has no comparable content.
pub fn partial_similarity(a: &str, b: &str) -> i32 {
    let (a, b) = (prepare(a), prepare(b));
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (rapidfuzz::fuzz::partial_ratio(a.chars(), b.chars()) * 100.0).round() as i32
}

// ============================================================================
// Composition Scoring
// ============================================================================

/// Combined similarity of one catalog row against a query title.
///
/// Title component: best partial-ratio across the primary title, alternate
/// titles and aliases. Movement component: best partial-ratio across the
/// movement list, each movement penalized by [`KEY_MISMATCH_PENALTY`] when
/// its own parsed key differs from `query_key`; 0 when the row has no
/// movements. The two components are added, not averaged, so a row whose
/// title alone already matches well is favored even before movement
/// disambiguation.
pub fn composition_score(
    composition: &Composition,
    query_key: Option<&str>,
    query_title: &str,
) -> i32 {
    let title_component = composition
        .candidate_titles()
        .map(|candidate| partial_similarity(candidate, query_title))
        .max()
        .unwrap_or(0);

    let movement_component = composition
        .movements
        .names
        .iter()
        .map(|name| {
            let movement_key = title::parse_title(name).key;
            let penalty = if movement_key.as_deref() == query_key {
                0
            } else {
                KEY_MISMATCH_PENALTY
            };
            partial_similarity(name, query_title) - penalty
        })
        .max()
        .unwrap_or(0);

    title_component + movement_component
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movements;

    fn composition(title: &str, movements: &[&str]) -> Composition {
        Composition {
            composer: "Test Composer".into(),
            title: title.into(),
            alternate_titles: Vec::new(),
            aliases: Vec::new(),
            catalogue_number: "N/A".into(),
            key: "N/A".into(),
            movements: Movements {
                declared_count: movements.len(),
                names: movements.iter().map(|m| m.to_string()).collect(),
            },
        }
    }

    #[test]
    fn prepare_folds_diacritics_and_case() {
        assert_eq!(prepare("Dvořák"), "dvorak");
        assert_eq!(prepare("Années de pèlerinage"), "annees de pelerinage");
        assert_eq!(prepare("  Étude, Op. 10  "), "etude op 10");
    }

    #[test]
    fn prepare_transliterates_cyrillic() {
        assert!(!prepare("Чайковский").is_empty());
        assert!(prepare("Чайковский").is_ascii());
    }

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(partial_similarity("Moonlight Sonata", "Moonlight Sonata"), 100);
    }

    #[test]
    fn contained_substring_scores_100() {
        assert_eq!(
            partial_similarity("I. Moderato", "Piano Sonata in A Minor, D. 845: I. Moderato"),
            100
        );
    }

    #[test]
    fn disjoint_strings_score_0() {
        assert_eq!(partial_similarity("wwww", "kkkk"), 0);
    }

    #[test]
    fn empty_input_scores_0() {
        assert_eq!(partial_similarity("", "anything"), 0);
        assert_eq!(partial_similarity("??", "anything"), 0);
    }

    #[test]
    fn score_is_additive_over_title_and_movement() {
        let comp = composition("Suite bergamasque", &["III. Clair de lune"]);
        let score = composition_score(&comp, None, "Suite bergamasque: III. Clair de lune");
        // Both components align exactly; movement has no key, query has no
        // key, so no penalty applies.
        assert_eq!(score, 200);
    }

    #[test]
    fn movement_key_mismatch_costs_exactly_the_penalty() {
        let comp = composition("qqqq", &["II. Adagio in E Major,"]);
        let query = "II. Adagio in E Major, from somewhere";
        let matching = composition_score(&comp, Some("E Major"), query);
        let mismatching = composition_score(&comp, Some("B Minor"), query);
        assert_eq!(matching - mismatching, KEY_MISMATCH_PENALTY);
        // Title contributes nothing here, so the absolute values pin the
        // movement component as well.
        assert_eq!(matching, 100);
        assert_eq!(mismatching, 100 - KEY_MISMATCH_PENALTY);
    }

    #[test]
    fn no_movements_means_zero_movement_component() {
        let comp = composition("Fantasia", &[]);
        assert_eq!(composition_score(&comp, None, "Fantasia"), 100);
    }

    #[test]
    fn alternate_titles_lift_the_title_component() {
        let mut comp = composition("Klavierstücke", &[]);
        comp.aliases.push("Moonlight Sonata".into());
        let with_alias = composition_score(&comp, None, "Moonlight Sonata");
        assert_eq!(with_alias, 100);
    }
}
