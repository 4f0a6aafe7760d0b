// Evaluator dispatcher: language id -> language spec
use crate::error::UnsupportedLanguage;
use crate::language::{builtin_languages, load_languages, LanguageSpec};
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// Registry of configured languages
/// This is the authoritative source for which language ids are accepted
#[derive(Debug, Clone)]
pub struct Dispatcher {
    languages: HashMap<String, LanguageSpec>,
}

impl Dispatcher {
    pub fn new(languages: Vec<LanguageSpec>) -> Self {
        let languages = languages
            .into_iter()
            .map(|lang| (lang.name.clone(), lang))
            .collect();
        Self { languages }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_languages())
    }

    /// Load from a languages.json file
    pub fn load(config_path: &Path) -> Result<Self> {
        Ok(Self::new(load_languages(config_path)?))
    }

    /// Load from `config_path` when given, otherwise use the built-in table
    pub fn from_optional_path(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Look up the language for `language_id` (exact, case-sensitive match)
    pub fn dispatch(&self, language_id: &str) -> Result<&LanguageSpec, UnsupportedLanguage> {
        self.languages
            .get(language_id)
            .ok_or_else(|| UnsupportedLanguage(language_id.to_string()))
    }

    /// List all configured language ids, sorted
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.languages.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::builtin()
    }
}
