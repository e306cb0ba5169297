//! Structured token parsing for free-text track titles.
//!
//! Crowd-sourced titles pack three useful tokens into prose: the musical
//! key ("in E-Flat Major"), a catalogue designation ("Op. 27", "BWV 846",
//! "D. 845") and a sub-work number ("No. 2"). Extraction is best-effort
//! and per-field: failure of one never blocks the others.

use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized catalogue-prefix tokens, in rule order. When several occur in
/// one title, the later rule overwrites the earlier one (last-applicable-
/// prefix wins; a known ambiguity of the source data, kept as-is).
pub const CATALOGUE_PREFIXES: [&str; 10] = [
    "Op.", "K.", "BWV", "FWV", "D.", "Sz.", "L.", "M.", "S.", "Hob.",
];

/// Key phrase up to a comma: "in E-Flat Major," / "In G minor,"
static KEY_BEFORE_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Ii]n .+?,").unwrap());

/// Key phrase ending in a mode word: "in B Minor" / "in A major"
static KEY_BEFORE_MODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Ii]n .+?or").unwrap());

/// Parenthesized key with a mode word: "(C minor"
static KEY_PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.+?or").unwrap());

/// Leading "in " / "In " inside a captured key span
static IN_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Ii]n ").unwrap());

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Structured tokens extracted from one raw title. `None` means the token
/// was not found; the fields are independent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TitleInfo {
    /// Normalized key signature, e.g. "E Major", "C Sharp Minor".
    pub key: Option<String>,
    /// Catalogue token, e.g. "Op.14", "BWV 846".
    pub catalogue: Option<String>,
    /// Sub-work number (digits only), subordinate to the catalogue number.
    pub work_no: Option<String>,
}

/// Extract {key, catalogue number, work number} from a raw title string.
pub fn parse_title(title: &str) -> TitleInfo {
    TitleInfo {
        key: parse_key(title),
        catalogue: parse_catalogue_number(title),
        work_no: parse_work_number(title),
    }
}

/// Title-casing with Python `str.title()` semantics: an alphabetic char
/// following a non-alphabetic one is uppercased, every other alphabetic
/// char is lowercased.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

fn parse_key(title: &str) -> Option<String> {
    let span = KEY_BEFORE_COMMA
        .find(title)
        .or_else(|| KEY_BEFORE_MODE.find(title))
        .or_else(|| KEY_PARENTHESIZED.find(title))?
        .as_str();

    let without_wrapping: String = span.chars().filter(|c| !matches!(c, '(' | ',')).collect();
    let mut key = IN_PREFIX.replace_all(&without_wrapping, "").into_owned();
    // A span with no mode word ("in E,") is a major key by convention.
    if !key.contains("or") {
        key.push_str(" Major");
    }
    let key = title_case(&key);
    Some(key.replace('♯', " Sharp").replace('♭', " Flat"))
}

fn parse_catalogue_number(title: &str) -> Option<String> {
    let mut catalogue = None;
    for prefix in CATALOGUE_PREFIXES {
        let Some(at) = title.rfind(prefix) else {
            continue;
        };
        // First digit run after the last occurrence of the prefix.
        if let Some(digits) = DIGITS.find(&title[at + prefix.len()..]) {
            catalogue = Some(if prefix.contains('.') {
                format!("{}{}", prefix, digits.as_str())
            } else {
                format!("{} {}", prefix, digits.as_str())
            });
        }
    }
    catalogue
}

fn parse_work_number(title: &str) -> Option<String> {
    let at = title.rfind("No.")?;
    DIGITS
        .find(&title[at + "No.".len()..])
        .map(|m| m.as_str().to_string())
}
