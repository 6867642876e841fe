//! Settings infrastructure for spellsp.
//!
//! This module provides support for loading and parsing `spellchecker.toml`
//! files configuring the dictionary, the popover strings and the debounce
//! intervals.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::proofread::{Proofreader, WordListProofreader};
use crate::spellchecker::SpellcheckerOptions;

/// File name searched for by [`discover_settings`].
pub const SETTINGS_FILE: &str = "spellchecker.toml";

const DEFAULT_NO_SUGGESTIONS: &str = "No suggestions found";

/// Root settings structure loaded from spellchecker.toml.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Newline separated word list, relative to the settings file.
    pub dictionary: Option<PathBuf>,

    /// Whether dictionary lookups ignore case. Defaults to true.
    pub ignore_case: Option<bool>,

    /// Strings shown in the suggestion popover.
    #[serde(default)]
    pub ui_strings: UiStrings,

    /// Debounce intervals.
    #[serde(default)]
    pub debounce: DebounceSettings,
}

/// User-facing strings of the suggestion popover.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UiStrings {
    /// Shown instead of a list when there are no suggestions.
    #[serde(default)]
    pub no_suggestions: String,
}

impl UiStrings {
    /// The configured empty-state text, or a built-in default.
    pub fn no_suggestions_text(&self) -> &str {
        if self.no_suggestions.is_empty() {
            DEFAULT_NO_SUGGESTIONS
        } else {
            &self.no_suggestions
        }
    }
}

/// Quiet periods, in milliseconds, before deferred work is issued.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebounceSettings {
    /// Full-document checks (startup, pastes).
    pub document_ms: u64,
    /// Re-checks of the block being typed in.
    pub block_ms: u64,
    /// Marker clicks.
    pub click_ms: u64,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            document_ms: 500,
            block_ms: 300,
            click_ms: 0,
        }
    }
}

impl DebounceSettings {
    pub fn document(&self) -> Duration {
        Duration::from_millis(self.document_ms)
    }

    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }

    pub fn click(&self) -> Duration {
        Duration::from_millis(self.click_ms)
    }
}

/// Load settings from a spellchecker.toml file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("failed to parse {}: {}", path.display(), e);
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Discover spellchecker.toml by searching up the directory tree, then direct children.
///
/// Search order:
/// 1. Walk up from `start_dir` to filesystem root
/// 2. If not found, check immediate child directories of `start_dir`
///
/// Returns `(settings, settings_dir)` where `settings_dir` is the directory
/// containing the found file (used for resolving relative paths).
/// If not found, returns `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    // Phase 1: Walk up from start_dir
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    // Phase 2: Check immediate child directories
    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}

/// Load the configured word list.
///
/// Returns None if no dictionary is configured or if loading fails.
pub fn load_proofreader(settings: &Settings, settings_dir: &Path) -> Option<Arc<dyn Proofreader>> {
    let path = settings.dictionary.as_ref()?;
    let full_path = if path.is_absolute() {
        path.clone()
    } else {
        settings_dir.join(path)
    };

    match WordListProofreader::from_file(&full_path) {
        Ok(proofreader) => {
            let proofreader = proofreader.ignore_case(settings.ignore_case.unwrap_or(true));
            tracing::info!(
                words = proofreader.len(),
                "loaded dictionary {}",
                full_path.display()
            );
            Some(Arc::new(proofreader))
        }
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

/// Build spellchecker options from settings.
///
/// Returns None when no proofreader could be loaded.
pub fn build_options(settings: &Settings, settings_dir: &Path) -> Option<SpellcheckerOptions> {
    let proofreader = load_proofreader(settings, settings_dir)?;
    Some(SpellcheckerOptions {
        proofreader,
        ui_strings: settings.ui_strings.clone(),
        debounce: settings.debounce,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a unique temp directory for test isolation.
    fn make_test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("spellsp-test")
            .join(name)
            .join(format!("{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup_test_dir(dir: &Path) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn defaults_match_interactive_timings() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.debounce.document(), Duration::from_millis(500));
        assert_eq!(settings.debounce.block(), Duration::from_millis(300));
        assert_eq!(settings.debounce.click(), Duration::ZERO);
        assert!(settings.dictionary.is_none());
    }

    #[test]
    fn parse_full_settings() {
        let settings: Settings = toml::from_str(
            r#"
dictionary = "words.txt"
ignore_case = false

[ui_strings]
no_suggestions = "Keine Vorschläge"

[debounce]
block_ms = 150
"#,
        )
        .unwrap();

        assert_eq!(settings.dictionary, Some(PathBuf::from("words.txt")));
        assert_eq!(settings.ignore_case, Some(false));
        assert_eq!(settings.ui_strings.no_suggestions_text(), "Keine Vorschläge");
        assert_eq!(settings.debounce.block_ms, 150);
        assert_eq!(settings.debounce.document_ms, 500);
    }

    #[test]
    fn empty_no_suggestions_falls_back() {
        assert_eq!(UiStrings::default().no_suggestions_text(), "No suggestions found");
    }

    #[test]
    fn invalid_settings_fall_back_to_defaults() {
        let dir = make_test_dir("invalid");
        let path = dir.join(SETTINGS_FILE);
        std::fs::write(&path, "dictionary = [").unwrap();

        let settings = load_settings(&path);
        assert!(settings.dictionary.is_none());

        cleanup_test_dir(&dir);
    }

    #[test]
    fn discover_settings_in_parent_dir() {
        let parent = make_test_dir("discover-parent");
        let child = parent.join("subdir");
        std::fs::create_dir_all(&child).unwrap();

        std::fs::write(parent.join(SETTINGS_FILE), "dictionary = \"words.txt\"\n").unwrap();

        let (settings, settings_dir) = discover_settings(&child);
        assert_eq!(settings_dir, parent);
        assert_eq!(settings.dictionary, Some(PathBuf::from("words.txt")));

        cleanup_test_dir(&parent);
    }

    #[test]
    fn discover_settings_in_child_dir() {
        let parent = make_test_dir("discover-child");
        let child = parent.join("config");
        std::fs::create_dir_all(&child).unwrap();

        std::fs::write(child.join(SETTINGS_FILE), "[debounce]\nclick_ms = 20\n").unwrap();

        let (settings, settings_dir) = discover_settings(&parent);
        assert_eq!(settings_dir, child);
        assert_eq!(settings.debounce.click_ms, 20);

        cleanup_test_dir(&parent);
    }

    #[test]
    fn options_resolve_dictionary_relative_to_settings() {
        let dir = make_test_dir("options");
        std::fs::write(dir.join("words.txt"), "# comment\nthis\nis\n").unwrap();
        let settings: Settings = toml::from_str("dictionary = \"words.txt\"").unwrap();

        let options = build_options(&settings, &dir).expect("dictionary loads");
        assert_eq!(options.debounce, DebounceSettings::default());

        let missing: Settings = toml::from_str("dictionary = \"missing.txt\"").unwrap();
        assert!(build_options(&missing, &dir).is_none());

        cleanup_test_dir(&dir);
    }
}
