use std::path::Path;

/// Dot-files are hidden.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Lowercased extension without the dot, if the name has one.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name).extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase)
}

/// Whether `name` ends in one of `extensions` (lowercase, no dot). An empty list accepts everything.
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    extension_of(name).is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext))
}

/// `".PNG"` and `"png"` both become `"png"`.
pub fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_names() {
        assert!(is_hidden(".git"));
        assert!(!is_hidden("git"));
    }

    #[test]
    fn extension_filter() {
        let allowed = vec![normalize_extension(".PNG"), normalize_extension("jpg")];
        assert!(has_extension("Cover.png", &allowed));
        assert!(has_extension("a.b.JPG", &allowed));
        assert!(!has_extension("notes.txt", &allowed));
        assert!(!has_extension("Makefile", &allowed));
        assert!(has_extension("Makefile", &[]));
    }
}
