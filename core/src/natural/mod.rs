//! Natural ordering for folder entry names ("File 2" before "File 10").
//!
//! Names are trimmed, lowercased and compared one whitespace-delimited group at
//! a time; see [`group`] for how a group is split. Per group pair:
//!
//! 1. If only one side has a prefix, that prefix is compared as text against
//!    the other side's number text and the result is final. Two prefixes are
//!    compared as text.
//! 2. Two numbers compare by whole part, then fractional part, then suffix. A
//!    group without a number sorts before one with a number.
//! 3. A name that runs out of groups first sorts first; otherwise wider
//!    whitespace between groups sorts later.
//!
//! Two different names that still tie are ordered by their folded text, so
//! only names that differ in case alone compare equal.

pub mod group;
pub mod locale;

use std::cmp::Ordering;

use crate::error::MirrorError;
use crate::types::Entry;

pub use group::{GroupToken, Groups};
pub use locale::NumberSeparators;

/// Locale-aware natural-order comparator.
///
/// Holds no mutable state: clone it freely and share it across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalComparator {
    separators: NumberSeparators,
}

impl NaturalComparator {
    /// Comparator using the separators of the running locale.
    pub fn new() -> Self {
        Self { separators: NumberSeparators::from_env() }
    }

    /// Comparator with fixed separators, independent of the environment.
    pub fn with_separators(separators: NumberSeparators) -> Self {
        Self { separators }
    }

    /// Separators used to read decimal numbers inside names.
    pub fn separators(&self) -> NumberSeparators {
        self.separators
    }

    /// Compare two names. Fails when either is empty or whitespace-only.
    pub fn compare(&self, a: &str, b: &str) -> crate::Result<Ordering> {
        let a = fold(a).ok_or_else(|| blank_name("a", a))?;
        let b = fold(b).ok_or_else(|| blank_name("b", b))?;
        Ok(self.compare_folded(&a, &b))
    }

    /// Entry order: folders first, then natural name order, then raw name.
    ///
    /// Entries cannot carry blank names, so this never fails. The final raw
    /// comparison keeps the order consistent with entry identity for names that
    /// differ only in case.
    pub fn compare_entries(&self, a: &Entry, b: &Entry) -> Ordering {
        a.kind()
            .cmp(&b.kind())
            .then_with(|| {
                let folded_a = fold(a.name()).unwrap_or_default();
                let folded_b = fold(b.name()).unwrap_or_default();
                self.compare_folded(&folded_a, &folded_b)
            })
            .then_with(|| a.name().cmp(b.name()))
    }

    /// Sort in place by [`compare_entries`](Self::compare_entries). Stable.
    pub fn sort_entries(&self, entries: &mut [Entry]) {
        entries.sort_by(|a, b| self.compare_entries(a, b));
    }

    /// Lazily tokenise a name the same way [`compare`](Self::compare) sees it.
    pub fn groups(&self, name: &str) -> Groups {
        Groups::new(&fold(name).unwrap_or_default(), self.separators)
    }

    fn compare_folded(&self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        let mut a_groups = Groups::new(a, self.separators);
        let mut b_groups = Groups::new(b, self.separators);

        let grouped = loop {
            let (ga, gb) = match (a_groups.next(), b_groups.next()) {
                (Some(ga), Some(gb)) => (ga, gb),
                (None, None) => break Ordering::Equal,
                (None, Some(_)) => break Ordering::Less,
                (Some(_), None) => break Ordering::Greater,
            };

            let ordering = self.compare_groups(&ga, &gb);
            if ordering != Ordering::Equal {
                break ordering;
            }

            match (ga.is_last_group, gb.is_last_group) {
                (true, true) => break Ordering::Equal,
                (true, false) => break Ordering::Less,
                (false, true) => break Ordering::Greater,
                (false, false) => {}
            }

            let spacing = ga.trailing_space_count.cmp(&gb.trailing_space_count);
            if spacing != Ordering::Equal {
                break spacing;
            }
        };

        grouped.then_with(|| a.cmp(b))
    }

    fn compare_groups(&self, a: &GroupToken, b: &GroupToken) -> Ordering {
        match (a.prefix.is_empty(), b.prefix.is_empty()) {
            // Lexical on purpose: the other side starts straight with its number.
            (false, true) => return a.prefix.as_str().cmp(b.numeric_text.as_str()),
            (true, false) => return a.numeric_text.as_str().cmp(b.prefix.as_str()),
            (false, false) => {
                let ordering = a.prefix.cmp(&b.prefix);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (true, true) => {}
        }

        match (a.has_number(), b.has_number()) {
            (true, true) => {
                self.compare_numbers(a, b).then_with(|| a.suffix.cmp(&b.suffix))
            }
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }

    fn compare_numbers(&self, a: &GroupToken, b: &GroupToken) -> Ordering {
        let whole = match (&a.whole_number, &b.whole_number) {
            (Some(x), Some(y)) => compare_digits(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };

        whole.then_with(|| match (&a.decimal_text, &b.decimal_text) {
            (Some(x), Some(y)) => self.compare_fractions(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        })
    }

    fn compare_fractions(&self, a: &str, b: &str) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        match (self.parse_fraction(a), self.parse_fraction(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (parsed_a, parsed_b) => {
                tracing::debug!(
                    target: "natural",
                    fraction_a = a,
                    fraction_b = b,
                    a_parsed = parsed_a.is_some(),
                    b_parsed = parsed_b.is_some(),
                    "fraction did not parse, comparing as text"
                );
                a.cmp(b)
            }
        }
    }

    fn parse_fraction(&self, text: &str) -> Option<f64> {
        let digits: String = text.chars().filter(|c| *c != self.separators.decimal()).collect();
        format!("0.{digits}").parse().ok()
    }
}

impl Default for NaturalComparator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim and lowercase; `None` when nothing is left.
fn fold(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_lowercase()) }
}

fn blank_name(side: &str, value: &str) -> MirrorError {
    MirrorError::invalid_input(format!("cannot compare blank name {side} = {value:?}"))
}

/// Compare normalised digit strings numerically without parsing them.
fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
