//! RustedTutor settings.
//!
//! Read from `~/.rustedtutor/config.toml` (every field optional), then
//! environment overrides, then validation. A missing file means defaults,
//! which run fully offline: keyword classifier and reference handler.

use rustedtutor_core::provider::DEFAULT_TEMPERATURE;
use rustedtutor_core::subject::is_canonical_constant_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_PROVIDER: &str = "openrouter";
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 5;

/// Consulted in order when the file sets no `api_key`.
pub const API_KEY_VARS: [&str; 3] = ["RUSTEDTUTOR_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"];

/// A provider credential. `Debug` never shows it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shared by every provider without its own key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,
    pub default_provider: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub tutor: TutorConfig,
    pub keywords: KeywordConfig,
    /// Appended to the built-in constants table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<ConstantConfig>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: DEFAULT_PROVIDER.into(),
            default_model: DEFAULT_MODEL.into(),
            default_temperature: DEFAULT_TEMPERATURE,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            tutor: TutorConfig::default(),
            keywords: KeywordConfig::default(),
            constants: Vec::new(),
            providers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Keyword,
    /// Ask the model; keyword matching when it fails or answers off-list.
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Pulls tool inputs straight out of the question text.
    #[default]
    Reference,
    Llm,
}

/// How the keyword classifier settles a question that hits several subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Most keyword hits; equal counts go Physics, then Math, then CS.
    #[default]
    MostMatches,
    /// First of Physics, Math, CS with any hit.
    FirstMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub classifier: ClassifierKind,
    pub handler: HandlerKind,
    pub tie_break: TieBreak,
    /// Model round-trips the LLM handler may spend on one question.
    pub max_tool_iterations: usize,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::Keyword,
            handler: HandlerKind::Reference,
            tie_break: TieBreak::MostMatches,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }
}

/// Extra vocabulary per subject, on top of the built-in lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub physics: Vec<String>,
    pub math: Vec<String>,
    pub cs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantConfig {
    pub name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub symbol: String,
}

/// Per-provider overrides, keyed by provider name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// `~/.rustedtutor/config.toml` plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_dir().join(CONFIG_FILE))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Environment wins for provider and model; the API key only fills a gap.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = API_KEY_VARS.iter().find_map(|name| var(name)).map(ApiKey::new);
        }
        if let Some(provider) = var("RUSTEDTUTOR_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = var("RUSTEDTUTOR_MODEL") {
            self.default_model = model;
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".rustedtutor")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(message)) };

        if !(0.0..=2.0).contains(&self.default_temperature) {
            return invalid(format!(
                "default_temperature {} is outside 0.0..=2.0",
                self.default_temperature
            ));
        }
        if self.tutor.max_tool_iterations == 0 {
            return invalid("tutor.max_tool_iterations must be at least 1".into());
        }
        for constant in &self.constants {
            if !is_canonical_constant_name(&constant.name) {
                return invalid(format!(
                    "constant name '{}' must be lowercase with underscores",
                    constant.name
                ));
            }
            if !constant.value.is_finite() {
                return invalid(format!("constant '{}' must have a finite value", constant.name));
            }
        }
        Ok(())
    }

    /// The provider's own key, else the shared one.
    pub fn api_key_for(&self, provider: &str) -> Option<&ApiKey> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.as_ref())
            .or(self.api_key.as_ref())
    }

    /// The model to request: the default provider's override, else `default_model`.
    pub fn model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Whether the configured classifier or handler needs a language model.
    pub fn wants_llm(&self) -> bool {
        self.tutor.classifier == ClassifierKind::Llm || self.tutor.handler == HandlerKind::Llm
    }

    /// Contents written by `rustedtutor onboard`.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("cannot parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn defaults_run_offline() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, DEFAULT_PROVIDER);
        assert_eq!(config.tutor.classifier, ClassifierKind::Keyword);
        assert_eq!(config.tutor.handler, HandlerKind::Reference);
        assert_eq!(config.tutor.tie_break, TieBreak::MostMatches);
        assert!(config.validate().is_ok());
        assert!(!config.wants_llm());
    }

    #[test]
    fn default_toml_parses_back() {
        let text = AppConfig::default_toml();
        assert!(text.contains("[tutor]"));
        assert!(text.contains("most_matches"));
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.default_model, DEFAULT_MODEL);
        assert_eq!(parsed.tutor.max_tool_iterations, DEFAULT_MAX_TOOL_ITERATIONS);
    }

    #[test]
    fn out_of_range_settings_rejected() {
        let hot = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(matches!(hot.validate(), Err(ConfigError::Invalid(_))));

        let mut stuck = AppConfig::default();
        stuck.tutor.max_tool_iterations = 0;
        assert!(stuck.validate().is_err());
    }

    #[test]
    fn missing_file_means_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, DEFAULT_PROVIDER);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = config_file(
            r#"
default_model = "gpt-4o-mini"

[tutor]
classifier = "llm"
tie_break = "first_match"

[keywords]
physics = ["optics", "thermodynamics"]

[[constants]]
name = "vacuum_permittivity"
value = 8.8541878128e-12
unit = "F/m"
symbol = "ε₀"
"#,
        );

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.default_max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.tutor.classifier, ClassifierKind::Llm);
        assert_eq!(config.tutor.handler, HandlerKind::Reference);
        assert_eq!(config.tutor.tie_break, TieBreak::FirstMatch);
        assert_eq!(config.tutor.max_tool_iterations, DEFAULT_MAX_TOOL_ITERATIONS);
        assert_eq!(config.keywords.physics.len(), 2);
        assert!(config.keywords.cs.is_empty());
        assert_eq!(config.constants[0].symbol, "ε₀");
        assert!(config.wants_llm());
    }

    #[test]
    fn non_canonical_constant_name_rejected() {
        let file = config_file(
            r#"
[[constants]]
name = "Vacuum Permittivity"
value = 8.85e-12
unit = "F/m"
"#,
        );
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let file = config_file("[tutor\nclassifier = ");
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("cannot parse"));
    }

    #[test]
    fn unknown_classifier_kind_is_parse_error() {
        let file = config_file("[tutor]\nclassifier = \"oracle\"");
        assert!(matches!(AppConfig::load_from(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let env: HashMap<&str, &str> = [
            ("OPENROUTER_API_KEY", "sk-or-test"),
            ("OPENAI_API_KEY", "sk-openai-test"),
            ("RUSTEDTUTOR_MODEL", "gpt-4o"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_ref().map(ApiKey::expose), Some("sk-or-test"));
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.default_provider, DEFAULT_PROVIDER);
    }

    #[test]
    fn env_does_not_override_configured_key() {
        let mut config = AppConfig {
            api_key: Some(ApiKey::new("from-file")),
            ..AppConfig::default()
        };
        config.apply_env_overrides(|_| Some("from-env".into()));
        assert_eq!(config.api_key.as_ref().map(ApiKey::expose), Some("from-file"));
        assert_eq!(config.default_provider, "from-env");
    }

    #[test]
    fn provider_section_overrides_key_and_model() {
        let file = config_file(
            r#"
api_key = "sk-shared"
default_provider = "ollama"

[providers.ollama]
default_model = "llama3.2"

[providers.openai]
api_key = "sk-openai"
"#,
        );
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.api_key_for("openai").map(ApiKey::expose), Some("sk-openai"));
        assert_eq!(config.api_key_for("ollama").map(ApiKey::expose), Some("sk-shared"));

        let plain = AppConfig::default();
        assert_eq!(plain.model(), DEFAULT_MODEL);
        assert!(plain.api_key_for(DEFAULT_PROVIDER).is_none());
    }

    #[test]
    fn debug_output_redacts_api_keys() {
        let mut config = AppConfig {
            api_key: Some(ApiKey::new("sk-secret-value")),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some(ApiKey::new("sk-provider-secret")),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(!debug.contains("sk-provider-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
