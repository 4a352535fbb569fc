//! Decimal and group separators used by the number tokenizer.

use crate::error::MirrorError;

/// Environment variables consulted for the numeric locale, in POSIX precedence order.
const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_NUMERIC", "LANG"];

/// Languages that write `1.234,5`.
const COMMA_DECIMAL_DOT_GROUP: &[&str] =
    &["de", "es", "it", "nl", "pt", "id", "tr", "da", "el", "ro", "hr", "sl", "sr", "is", "vi"];

/// Languages that write `1 234,5` with a no-break space between groups.
const COMMA_DECIMAL_SPACE_GROUP: &[&str] =
    &["fr", "ru", "pl", "cs", "sk", "sv", "nb", "nn", "no", "fi", "uk", "hu", "bg", "et", "lt", "lv"];

const NO_BREAK_SPACE: char = '\u{a0}';

/// The pair of characters that delimit the fractional part and digit groups of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberSeparators {
    decimal: char,
    group: char,
}

impl NumberSeparators {
    /// `.` decimal point with `,` thousands separator.
    pub const POINT_COMMA: Self = Self { decimal: '.', group: ',' };

    /// `,` decimal point with `.` thousands separator.
    pub const COMMA_POINT: Self = Self { decimal: ',', group: '.' };

    pub fn new(decimal: char, group: char) -> crate::Result<Self> {
        if decimal == group {
            return Err(MirrorError::invalid_input(format!(
                "decimal and group separators must differ (both {decimal:?})"
            )));
        }
        if decimal.is_ascii_digit() || group.is_ascii_digit() {
            return Err(MirrorError::invalid_input("number separators cannot be digits"));
        }
        if decimal.is_whitespace() {
            return Err(MirrorError::invalid_input("decimal separator cannot be whitespace"));
        }
        Ok(Self { decimal, group })
    }

    /// Character between the whole and fractional part of a number.
    pub fn decimal(&self) -> char {
        self.decimal
    }

    /// Thousands separator. Ignored inside a number when a digit follows it.
    pub fn group(&self) -> char {
        self.group
    }

    /// Separators for the running process, read from the locale environment.
    pub fn from_env() -> Self {
        LOCALE_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|value| !value.trim().is_empty()))
            .map(|locale| Self::for_locale(&locale))
            .unwrap_or_default()
    }

    /// Separators for a POSIX locale name such as `de_DE.UTF-8` or `fr_CA`.
    pub fn for_locale(locale: &str) -> Self {
        let name = locale.split(['.', '@']).next().unwrap_or_default();
        let mut parts = name.split(['_', '-']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts.next().unwrap_or_default().to_ascii_uppercase();

        match (language.as_str(), region.as_str()) {
            ("de" | "it", "CH") => Self { decimal: '.', group: '\'' },
            ("es", "MX" | "US") => Self::POINT_COMMA,
            (lang, _) if COMMA_DECIMAL_DOT_GROUP.contains(&lang) => Self::COMMA_POINT,
            (lang, _) if COMMA_DECIMAL_SPACE_GROUP.contains(&lang) => {
                Self { decimal: ',', group: NO_BREAK_SPACE }
            }
            _ => Self::POINT_COMMA,
        }
    }
}

impl Default for NumberSeparators {
    fn default() -> Self {
        Self::POINT_COMMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_locales() {
        assert_eq!(NumberSeparators::for_locale("en_US.UTF-8"), NumberSeparators::POINT_COMMA);
        assert_eq!(NumberSeparators::for_locale("C"), NumberSeparators::POINT_COMMA);
        assert_eq!(NumberSeparators::for_locale("POSIX"), NumberSeparators::POINT_COMMA);
        assert_eq!(NumberSeparators::for_locale("de_DE.UTF-8"), NumberSeparators::COMMA_POINT);
        assert_eq!(NumberSeparators::for_locale("pt_BR"), NumberSeparators::COMMA_POINT);
        assert_eq!(NumberSeparators::for_locale("es_MX.UTF-8"), NumberSeparators::POINT_COMMA);

        let french = NumberSeparators::for_locale("fr_FR.UTF-8@euro");
        assert_eq!(french.decimal(), ',');
        assert_eq!(french.group(), NO_BREAK_SPACE);

        let swiss = NumberSeparators::for_locale("de_CH");
        assert_eq!((swiss.decimal(), swiss.group()), ('.', '\''));
    }

    #[test]
    fn rejects_ambiguous_separators() {
        assert!(NumberSeparators::new('.', '.').is_err());
        assert!(NumberSeparators::new('1', ',').is_err());
        assert!(NumberSeparators::new(' ', ',').is_err());
        assert!(NumberSeparators::new(',', NO_BREAK_SPACE).is_ok());
    }
}
