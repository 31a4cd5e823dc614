//! Prompt templates
//!
//! Markdown files from the prompts directory, read once at startup.

use std::collections::BTreeMap;
use std::path::Path;

/// Prompt contents by filename, sorted
pub type PromptSet = BTreeMap<String, String>;

/// Load every `*.md` file in `dir`
///
/// A missing or unreadable directory yields an empty set and a warning;
/// unreadable files are skipped.
pub fn load_prompts(dir: &Path) -> PromptSet {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Prompts directory not readable");
            return PromptSet::new();
        }
    };

    let mut prompts = PromptSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                prompts.insert(name.to_string(), contents);
            }
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "Skipping prompt"),
        }
    }

    tracing::info!(count = prompts.len(), dir = %dir.display(), "Loaded prompts");
    prompts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_markdown_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_refine.md"), "Refine this").unwrap();
        std::fs::write(dir.path().join("a_system.md"), "You are an auditor").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = load_prompts(dir.path());
        let names: Vec<_> = prompts.keys().cloned().collect();
        assert_eq!(names, vec!["a_system.md", "b_refine.md"]);
        assert_eq!(prompts["a_system.md"], "You are an auditor");
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_prompts(&dir.path().join("absent")).is_empty());
    }
}
