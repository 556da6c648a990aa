//! Title sanitization for path segments.

/// Strip characters that are unsafe in file names.
///
/// Removes path separators, shell-hostile punctuation, and control
/// characters, then trims surrounding whitespace and trailing dots. The
/// original title is kept for display; only path segments go through this.
pub fn sanitize_title(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();
    let cleaned = cleaned
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .trim_start();
    if cleaned.is_empty() {
        "untitled".to_owned()
    } else {
        cleaned.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_path_and_shell_characters() {
        assert_eq!(sanitize_title("Install / Upgrade: FAQ?"), "Install  Upgrade FAQ");
        assert_eq!(sanitize_title("a\\b|c<d>e\"f*g"), "abcdefg");
    }

    #[test]
    fn trims_whitespace_control_characters_and_trailing_dots() {
        assert_eq!(sanitize_title("  Setup\t\n. . "), "Setup");
    }

    #[test]
    fn unicode_titles_pass_through() {
        assert_eq!(sanitize_title("配置指南"), "配置指南");
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(sanitize_title("???"), "untitled");
        assert_eq!(sanitize_title("  "), "untitled");
    }
}
