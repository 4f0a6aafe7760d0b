// Language table for the judge
// A language is data: file extension, optional compile template, run template.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const SOURCE_PLACEHOLDER: &str = "{source}";
pub const ARTIFACT_PLACEHOLDER: &str = "{artifact}";

/// Command line with `{source}` / `{artifact}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute placeholders and return program followed by arguments
    pub fn render(&self, source: &Path, artifact: &Path) -> Vec<String> {
        let source = source.to_string_lossy();
        let artifact = artifact.to_string_lossy();
        std::iter::once(&self.command)
            .chain(self.args.iter())
            .map(|part| {
                part.replace(SOURCE_PLACEHOLDER, &source)
                    .replace(ARTIFACT_PLACEHOLDER, &artifact)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    pub name: String,
    pub file_extension: String,
    /// Present only for languages that compile before running
    #[serde(default)]
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
}

impl LanguageSpec {
    pub fn needs_compile(&self) -> bool {
        self.compile.is_some()
    }

    /// Source file name inside the evaluation scratch directory
    pub fn source_file_name(&self) -> String {
        format!("main.{}", self.file_extension)
    }

    /// Compiled artifact name, with the host executable suffix
    pub fn artifact_file_name(&self) -> String {
        format!("main{}", std::env::consts::EXE_SUFFIX)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageSpec>,
}

/// Built-in table: python runs directly, cpp compiles with g++
pub fn builtin_languages() -> Vec<LanguageSpec> {
    vec![
        LanguageSpec {
            name: "python".to_string(),
            file_extension: "py".to_string(),
            compile: None,
            run: CommandTemplate::new("python3", &[SOURCE_PLACEHOLDER]),
        },
        LanguageSpec {
            name: "cpp".to_string(),
            file_extension: "cpp".to_string(),
            compile: Some(CommandTemplate::new(
                "g++",
                &[SOURCE_PLACEHOLDER, "-o", ARTIFACT_PLACEHOLDER],
            )),
            run: CommandTemplate::new(ARTIFACT_PLACEHOLDER, &[]),
        },
    ]
}

/// Load language specs from a languages.json file
pub fn load_languages(config_path: &Path) -> Result<Vec<LanguageSpec>> {
    if !config_path.exists() {
        bail!("Language config file not found: {}", config_path.display());
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    parse_languages(&content)
        .with_context(|| format!("Invalid language config {}", config_path.display()))
}

/// Parse and validate the JSON language table
pub fn parse_languages(content: &str) -> Result<Vec<LanguageSpec>> {
    let languages_json: LanguagesJson =
        serde_json::from_str(content).context("Failed to parse languages.json")?;

    if languages_json.languages.is_empty() {
        bail!("No languages configured");
    }

    let mut seen = HashSet::new();
    for lang in &languages_json.languages {
        if lang.name.trim().is_empty() {
            bail!("Language with empty name");
        }
        if !seen.insert(lang.name.as_str()) {
            bail!("Duplicate language '{}'", lang.name);
        }
        if lang.run.command.is_empty() {
            bail!("Language '{}' has an empty run command", lang.name);
        }
    }

    Ok(languages_json.languages)
}
