//! Runtime configuration (`.sym/config.toml` plus `SYM_*` environment overrides).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SymError};

/// Default pass-wide deadline.
pub const DEFAULT_DEADLINE_SECS: u64 = 600;

/// Upper bound on concurrently executing units.
pub const MAX_CONCURRENCY: usize = 8;

/// Standard tool installation directory (`~/.sym/tools`).
pub fn default_tools_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sym")
        .join("tools")
}

/// Default scheduler concurrency: half the logical CPUs, clamped to `1..=8`.
pub fn default_concurrency() -> usize {
    (num_cpus::get() / 2).clamp(1, MAX_CONCURRENCY)
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SymConfig {
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Acting role override. When unset the role is resolved from
    /// `.sym/roles.json` using the git user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationSettings {
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Explicit concurrency; [`default_concurrency`] when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Where linters are installed; `~/.sym/tools` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_dir: Option<PathBuf>,
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            max_concurrency: None,
            tools_dir: None,
        }
    }
}

/// LLM providers, tried in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LlmSettings {
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
}

/// How a provider prefers to be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Capability-rich single session: one prompt with every rule and file.
    AgenticSingle,
    /// Stateless request/response API: many small independent calls.
    ParallelApi,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::AgenticSingle => f.write_str("agentic-single"),
            ExecutionMode::ParallelApi => f.write_str("parallel-api"),
        }
    }
}

/// One configured LLM backend.
///
/// Unknown keys are rejected so a misspelt override fails loudly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum ProviderSettings {
    /// OpenAI-compatible chat completions endpoint.
    OpenaiApi {
        model: String,
        #[serde(default = "default_base_url")]
        base_url: String,
        /// Environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<ExecutionMode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_prompt_chars: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_retries: Option<u32>,
    },
    /// Local agent CLI that receives the prompt on stdin.
    Cli {
        name: String,
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<ExecutionMode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_prompt_chars: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_retries: Option<u32>,
    },
}

/// Per-provider adjustments on top of the provider's built-in profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderOverrides {
    pub mode: Option<ExecutionMode>,
    pub max_prompt_chars: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl ProviderSettings {
    pub fn overrides(&self) -> ProviderOverrides {
        match *self {
            ProviderSettings::OpenaiApi {
                mode,
                max_prompt_chars,
                timeout_secs,
                max_retries,
                ..
            }
            | ProviderSettings::Cli {
                mode,
                max_prompt_chars,
                timeout_secs,
                max_retries,
                ..
            } => ProviderOverrides {
                mode,
                max_prompt_chars,
                timeout_secs,
                max_retries,
            },
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl SymConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `<repo_root>/.sym/config.toml` if present, then apply
    /// environment overrides.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(".sym").join("config.toml");
        let mut cfg = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            Self::from_toml(&text)?
        } else {
            Self::default()
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Apply `SYM_*` overrides from `lookup`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SYM_DEADLINE_SECS") {
            self.validation.deadline_secs = v.trim().parse().map_err(|_| {
                SymError::InvalidConfig(format!("SYM_DEADLINE_SECS must be an integer, got {v:?}"))
            })?;
        }
        if let Some(v) = get("SYM_MAX_CONCURRENCY") {
            let n: usize = v.trim().parse().map_err(|_| {
                SymError::InvalidConfig(format!("SYM_MAX_CONCURRENCY must be an integer, got {v:?}"))
            })?;
            self.validation.max_concurrency = Some(n);
        }
        if let Some(v) = get("SYM_TOOLS_DIR") {
            self.validation.tools_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SYM_ROLE") {
            self.role = Some(v);
        }
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.validation.deadline_secs)
    }

    /// Effective concurrency, never zero.
    pub fn concurrency(&self) -> usize {
        self.validation
            .max_concurrency
            .unwrap_or_else(default_concurrency)
            .max(1)
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.validation
            .tools_dir
            .clone()
            .unwrap_or_else(default_tools_dir)
    }
}
