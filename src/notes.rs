//! Parser for the free-text notes field.
//!
//! Notes follow an informal convention:
//!
//! ```text
//! Bean: Ethiopia / Grind: 22 / Flavor floral, light / Balance: clean, bright
//! ```
//!
//! The parser locates every recognized label with its position, orders them,
//! and slices the text between consecutive labels. A delimiter only ends a
//! value when a recognized label follows it, so values such as
//! `bright / citrusy` survive intact.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{EtlError, Result};
use crate::models::ParsedNoteAttributes;

/// Delimiter used by the brewing app's notes convention.
pub const DEFAULT_DELIMITER: char = '/';

/// Separators people type by accident in place of the delimiter.
const LOOSE_SEPARATORS: [char; 3] = ['|', ';', ','];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Bean,
    Grinder,
    Grind,
    Flavor,
    Balance,
}

impl Label {
    const ALL: [Self; 5] = [Self::Bean, Self::Grinder, Self::Grind, Self::Flavor, Self::Balance];

    const fn text(self) -> &'static str {
        match self {
            Self::Bean => "Bean",
            Self::Grinder => "Grinder",
            Self::Grind => "Grind",
            Self::Flavor => "Flavor",
            Self::Balance => "Balance",
        }
    }
}

/// A label occurrence: where the label starts and where its value starts.
#[derive(Debug, Clone, Copy)]
struct LabelMatch {
    label: Label,
    start: usize,
    value_start: usize,
}

/// Extracts [`ParsedNoteAttributes`] from notes text. Never fails.
#[derive(Debug, Clone)]
pub struct NoteParser {
    delimiter: char,
    extra_spaces_regex: Regex,
}

impl NoteParser {
    /// Create a parser that splits fields on `delimiter`.
    pub fn new(delimiter: char) -> Result<Self> {
        if delimiter.is_alphanumeric() || delimiter.is_whitespace() || delimiter == ':' {
            return Err(EtlError::InvalidConfig(format!(
                "notes delimiter '{delimiter}' must be a punctuation character other than ':'"
            )));
        }

        let extra_spaces_regex =
            Regex::new(r"\s+").map_err(|e| EtlError::Other(format!("Failed to compile spaces regex: {e}")))?;

        Ok(Self {
            delimiter,
            extra_spaces_regex,
        })
    }

    /// Parse a notes string. Unrecognized text is dropped; a label that
    /// appears more than once keeps its last non-empty value.
    #[must_use]
    pub fn parse(&self, note: &str) -> ParsedNoteAttributes {
        let text: String = note.nfc().collect();
        let matches = self.locate_labels(&text);
        let mut attrs = ParsedNoteAttributes::default();

        for (i, current) in matches.iter().enumerate() {
            let next = matches.get(i + 1);
            let end = next.map_or(text.len(), |m| m.start);
            let raw = text.get(current.value_start..end).unwrap_or("");

            let Some(value) = self.clean_value(raw) else {
                continue;
            };

            let slot = match current.label {
                Label::Bean => &mut attrs.bean,
                Label::Grinder => &mut attrs.grinder,
                Label::Grind => &mut attrs.grind,
                Label::Flavor => &mut attrs.flavor,
                Label::Balance => &mut attrs.balance,
            };
            *slot = Some(value);
        }

        attrs
    }

    /// Every label occurrence in `text`, ordered by position.
    fn locate_labels(&self, text: &str) -> Vec<LabelMatch> {
        let mut found: Vec<LabelMatch> = Label::ALL
            .iter()
            .flat_map(|&label| {
                text.match_indices(label.text())
                    .filter_map(move |(pos, _)| self.label_at(text, label, pos))
            })
            .collect();

        found.sort_by_key(|m| m.start);
        found
    }

    /// Accept a candidate only when it stands as a whole word (so `Beans` and
    /// `Grinder` never count as `Bean` and `Grind`), and, past the start of
    /// the note, only when it follows a separator or carries its own colon.
    /// `Flavor: Balance of sweet and sour` keeps `Balance` inside the flavor.
    fn label_at(&self, text: &str, label: Label, pos: usize) -> Option<LabelMatch> {
        let before = &text[..pos];
        if before.chars().next_back().is_some_and(char::is_alphanumeric) {
            return None;
        }

        let after = pos + label.text().len();
        let rest = &text[after..];
        match rest.chars().next() {
            None => {}
            Some(c) if c == ':' || c == self.delimiter || c.is_whitespace() => {}
            Some(_) => return None,
        }

        let follows_separator = before
            .trim_end()
            .chars()
            .next_back()
            .map_or(true, |c| c == self.delimiter || LOOSE_SEPARATORS.contains(&c));
        if !follows_separator && !rest.starts_with(':') {
            return None;
        }

        let trimmed = rest.trim_start();
        let trimmed = trimmed.strip_prefix(':').unwrap_or(trimmed).trim_start();

        Some(LabelMatch {
            label,
            start: pos,
            value_start: after + (rest.len() - trimmed.len()),
        })
    }

    /// Trim a raw value slice, drop the separator that preceded the next label
    /// (or dangles at the end), and collapse runs of whitespace.
    fn clean_value(&self, raw: &str) -> Option<String> {
        let trimmed = raw
            .trim_end()
            .trim_end_matches(|c: char| c == self.delimiter || LOOSE_SEPARATORS.contains(&c))
            .trim();

        if trimmed.is_empty() {
            return None;
        }

        Some(self.extra_spaces_regex.replace_all(trimmed, " ").into_owned())
    }
}
