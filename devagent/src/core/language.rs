//! File-extension to highlight-language mapping for the file viewer.

use std::path::Path;

/// Highlight language for `path`, or `None` when it has no extension.
///
/// Well-known extensions map to their language name; anything else is passed
/// through as-is so the viewer can still try it.
pub fn language_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    let language = match ext {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "sh" => "bash",
        "yml" | "yaml" => "yaml",
        other => other,
    };
    Some(language.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_map_to_languages() {
        assert_eq!(language_for(Path::new("a/app.js")).as_deref(), Some("javascript"));
        assert_eq!(language_for(Path::new("main.py")).as_deref(), Some("python"));
        assert_eq!(language_for(Path::new("ci.yml")).as_deref(), Some("yaml"));
        assert_eq!(language_for(Path::new("README.md")).as_deref(), Some("markdown"));
    }

    #[test]
    fn unknown_extension_passes_through() {
        assert_eq!(language_for(Path::new("lib.rs")).as_deref(), Some("rs"));
    }

    #[test]
    fn no_extension_has_no_language() {
        assert_eq!(language_for(Path::new("Makefile")), None);
    }
}
