//! LLM provider layer for semantic convention checks.
//!
//! Providers expose one [`Provider::execute`] call plus [`ProviderInfo`]
//! metadata (execution mode and call profile). Configured providers are
//! combined into a single [`FallbackProvider`] so callers never see the
//! chain.

pub mod cli;
pub mod controls;
pub mod error;
pub mod fakes;
pub mod fallback;
pub mod openai;
pub mod parse;
pub mod provider;

use std::sync::Arc;

use sym_core::{ProviderOverrides, ProviderSettings};
use tracing::warn;

pub use cli::CliProvider;
pub use controls::{execute_with_controls, ExecutionControls};
pub use error::{LlmError, LlmResult};
pub use fallback::FallbackProvider;
pub use openai::OpenAiApiProvider;
pub use parse::{extract_json, parse_response, truncate_chars};
pub use provider::{ExecutionMode, Provider, ProviderInfo, ProviderProfile, ResponseFormat};

/// Instantiate one provider from its settings, applying any configured
/// mode and profile overrides.
pub fn build_provider(settings: &ProviderSettings) -> LlmResult<Arc<dyn Provider>> {
    let overrides = settings.overrides();
    match settings {
        ProviderSettings::OpenaiApi {
            model,
            base_url,
            api_key_env,
            ..
        } => {
            let provider = OpenAiApiProvider::from_env(model.clone(), base_url.clone(), api_key_env)?;
            let profile = provider.info().profile.with_overrides(&overrides);
            let provider = provider
                .with_profile(profile)?
                .with_mode(mode_or(&overrides, ExecutionMode::ParallelApi));
            Ok(Arc::new(provider))
        }
        ProviderSettings::Cli {
            name,
            program,
            args,
            ..
        } => {
            let provider = CliProvider::new(name.clone(), program.clone(), args.clone());
            let profile = provider.info().profile.with_overrides(&overrides);
            Ok(Arc::new(
                provider
                    .with_profile(profile)
                    .with_mode(mode_or(&overrides, ExecutionMode::AgenticSingle)),
            ))
        }
    }
}

fn mode_or(overrides: &ProviderOverrides, default: ExecutionMode) -> ExecutionMode {
    overrides.mode.unwrap_or(default)
}

/// Build the effective provider from an ordered settings list.
///
/// Entries that cannot be constructed (missing API key, ...) are skipped
/// with a warning. Returns `None` when nothing usable remains.
pub fn build_chain(settings: &[ProviderSettings]) -> Option<Arc<dyn Provider>> {
    let providers: Vec<Arc<dyn Provider>> = settings
        .iter()
        .filter_map(|s| match build_provider(s) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "skipping unusable LLM provider");
                None
            }
        })
        .collect();

    FallbackProvider::new(providers)
        .ok()
        .map(|chain| Arc::new(chain) as Arc<dyn Provider>)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_settings(mode: Option<ExecutionMode>, max_prompt_chars: Option<usize>) -> ProviderSettings {
        ProviderSettings::Cli {
            name: "agent".to_string(),
            program: "agent".to_string(),
            args: vec![],
            mode,
            max_prompt_chars,
            timeout_secs: None,
            max_retries: None,
        }
    }

    #[test]
    fn test_build_provider_applies_overrides() {
        let provider = build_provider(&cli_settings(Some(ExecutionMode::ParallelApi), Some(4000))).unwrap();
        let info = provider.info();
        assert_eq!(info.mode, Some(ExecutionMode::ParallelApi));
        assert_eq!(info.profile.max_prompt_chars, 4000);
        assert_eq!(info.profile.default_timeout_secs, 300);
    }

    #[test]
    fn test_build_provider_from_toml_overrides() {
        let cfg = sym_core::SymConfig::from_toml(
            r#"
            [[llm.providers]]
            kind = "cli"
            name = "agent"
            program = "agent"
            mode = "parallel-api"
            max_prompt_chars = 4000
            max_retries = 2
            "#,
        )
        .unwrap();
        let info = build_provider(&cfg.llm.providers[0]).unwrap().info();
        assert_eq!(info.mode, Some(ExecutionMode::ParallelApi));
        assert_eq!(info.profile.max_prompt_chars, 4000);
        assert_eq!(info.profile.max_retries, 2);
    }

    #[test]
    fn test_build_provider_keeps_defaults_without_overrides() {
        let info = build_provider(&cli_settings(None, None)).unwrap().info();
        assert_eq!(info.mode, Some(ExecutionMode::AgenticSingle));
        assert_eq!(info.profile, ProviderProfile::AGENTIC_CLI);
    }

    #[test]
    fn test_build_chain_skips_unusable_entries() {
        let settings = vec![
            ProviderSettings::OpenaiApi {
                model: "gpt-4o-mini".to_string(),
                base_url: "http://localhost".to_string(),
                api_key_env: "SYM_TEST_NEVER_SET_KEY".to_string(),
                mode: None,
                max_prompt_chars: None,
                timeout_secs: None,
                max_retries: None,
            },
            cli_settings(None, None),
        ];
        let chain = build_chain(&settings).expect("cli entry is usable");
        assert_eq!(chain.name(), "agent");
        assert_eq!(chain.info().mode, Some(ExecutionMode::AgenticSingle));
    }

    #[test]
    fn test_build_chain_empty() {
        assert!(build_chain(&[]).is_none());
    }
}
