//! Splits a folded name into whitespace-delimited groups of prefix, number, and suffix.
//!
//! A group is read left to right by a small state machine:
//!
//! ```text
//! "chapter12.5b  two"
//!  ^^^^^^^            prefix
//!         ^^^^        number (whole "12", decimal ".5")
//!             ^       suffix
//!              ^^     separating whitespace (2), then the next group
//! ```
//!
//! A number starts at a digit, or at a decimal separator directly followed by a
//! digit. Group separators only stay inside a number when a digit follows them.
//! A second decimal separator ends the number; everything after it is suffix.

use super::locale::NumberSeparators;

/// One whitespace-delimited segment of a name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupToken {
    /// Text before the number, or the whole group when it has no number.
    pub prefix: String,
    /// The number exactly as written, separators included.
    pub numeric_text: String,
    /// Text after the number.
    pub suffix: String,
    /// Digits of the whole part with leading zeros stripped. `None` for numbers like `.5`.
    pub whole_number: Option<String>,
    /// Fractional part including its decimal separator, group separators removed.
    pub decimal_text: Option<String>,
    /// Whitespace characters between this group and the next.
    pub trailing_space_count: usize,
    pub is_last_group: bool,
}

impl GroupToken {
    pub fn has_number(&self) -> bool {
        !self.numeric_text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    Prefix,
    Number,
    Suffix,
    Whitespace,
}

/// Lazy iterator over the groups of a name. Each group is only parsed when requested.
#[derive(Debug, Clone)]
pub struct Groups {
    chars: Vec<char>,
    index: usize,
    separators: NumberSeparators,
}

impl Groups {
    /// `text` is expected to be trimmed and case-folded already.
    pub fn new(text: &str, separators: NumberSeparators) -> Self {
        Self { chars: text.chars().collect(), index: 0, separators }
    }

    fn slice(&self, from: usize, to: usize) -> String {
        self.chars[from..to].iter().collect()
    }

    fn next_is_digit(&self, at: usize) -> bool {
        self.chars.get(at + 1).is_some_and(char::is_ascii_digit)
    }

    fn read_group(&mut self) -> GroupToken {
        let decimal = self.separators.decimal();
        let group = self.separators.group();

        let mut token = GroupToken::default();
        let mut state = Reading::Prefix;
        let mut start = self.index;
        let mut number_start: Option<usize> = None;
        let mut decimal_at: Option<usize> = None;
        let mut decimal_len = 0usize;

        while self.index < self.chars.len() {
            let i = self.index;
            let c = self.chars[i];

            if c.is_ascii_digit() {
                match state {
                    Reading::Prefix => {
                        token.prefix = self.slice(start, i);
                        state = Reading::Number;
                        number_start = Some(i);
                        start = i;
                    }
                    Reading::Number => {
                        if decimal_at.is_some() {
                            decimal_len += 1;
                        }
                    }
                    Reading::Suffix => {}
                    Reading::Whitespace => break,
                }
            } else if c == decimal {
                match state {
                    Reading::Prefix if self.next_is_digit(i) => {
                        token.prefix = self.slice(start, i);
                        state = Reading::Number;
                        number_start = Some(i);
                        decimal_at = Some(i);
                        decimal_len = 1;
                        start = i;
                    }
                    Reading::Prefix | Reading::Suffix => {}
                    Reading::Number if decimal_at.is_none() => {
                        decimal_at = Some(i);
                        if self.next_is_digit(i) {
                            decimal_len = 1;
                        } else {
                            // "5." keeps the point in the number text but has no fraction.
                            decimal_len = 0;
                            token.numeric_text = self.slice(start, i + 1);
                            state = Reading::Suffix;
                            start = i + 1;
                        }
                    }
                    Reading::Number => {
                        token.numeric_text = self.slice(start, i);
                        state = Reading::Suffix;
                        start = i;
                    }
                    Reading::Whitespace => break,
                }
            } else if c == group {
                match state {
                    Reading::Prefix | Reading::Suffix => {}
                    Reading::Number if self.next_is_digit(i) => {
                        if decimal_at.is_some() {
                            decimal_len += 1;
                        }
                    }
                    Reading::Number => {
                        token.numeric_text = self.slice(start, i);
                        state = Reading::Suffix;
                        start = i;
                    }
                    Reading::Whitespace => break,
                }
            } else if c.is_whitespace() {
                match state {
                    Reading::Prefix => token.prefix = self.slice(start, i),
                    Reading::Number => token.numeric_text = self.slice(start, i),
                    Reading::Suffix => token.suffix = self.slice(start, i),
                    Reading::Whitespace => {}
                }
                if state != Reading::Whitespace {
                    state = Reading::Whitespace;
                    start = i;
                }
            } else {
                match state {
                    Reading::Prefix | Reading::Suffix => {}
                    Reading::Number => {
                        token.numeric_text = self.slice(start, i);
                        state = Reading::Suffix;
                        start = i;
                    }
                    Reading::Whitespace => break,
                }
            }

            self.index += 1;
        }

        match state {
            Reading::Prefix => token.prefix = self.slice(start, self.index),
            Reading::Number => token.numeric_text = self.slice(start, self.index),
            Reading::Suffix => token.suffix = self.slice(start, self.index),
            Reading::Whitespace => token.trailing_space_count = self.index - start,
        }
        token.is_last_group = self.index >= self.chars.len();

        if let Some(number_start) = number_start {
            let whole_end = decimal_at.unwrap_or(number_start + token.numeric_text.chars().count());
            let digits: String =
                self.chars[number_start..whole_end].iter().filter(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                token.whole_number = Some(strip_leading_zeros(&digits));
            }

            if let Some(at) = decimal_at.filter(|_| decimal_len > 0) {
                let fraction: String =
                    self.chars[at..at + decimal_len].iter().filter(|&&c| c != group).collect();
                token.decimal_text = Some(fraction);
            }
        }

        token
    }
}

impl Iterator for Groups {
    type Item = GroupToken;

    fn next(&mut self) -> Option<GroupToken> {
        if self.index >= self.chars.len() {
            return None;
        }
        Some(self.read_group())
    }
}

fn strip_leading_zeros(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}
