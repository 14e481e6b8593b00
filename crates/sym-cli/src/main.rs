//! Symphony CLI
//!
//! The `sym` command validates code changes against the repository's code
//! policy using external linters and LLM semantic checks.
//!
//! ## Commands
//!
//! - `validate`: Validate working tree or staged changes
//! - `check-rbac`: Report files the current role may not modify
//! - `providers`: List configured LLM providers

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use sym_core::git::{collect_changes, current_user, repo_root, ChangeScope};
use sym_core::rbac::{PolicyRoleStore, RoleStore};
use sym_core::{CodePolicy, SymConfig, ValidationResult};
use sym_linter::LinterRegistry;
use sym_llm::{build_chain, build_provider};
use sym_validator::Validator;

const DEFAULT_POLICY: &str = ".sym/code-policy.json";

#[derive(Parser)]
#[command(name = "sym")]
#[command(author = "DevSymphony")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convention enforcement for code changes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines and machine-readable reports
    #[arg(long, global = true)]
    json: bool,

    /// Repository directory (default: current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate changed files against the code policy
    Validate {
        /// Validate staged changes instead of the working tree
        #[arg(long)]
        staged: bool,

        /// Policy file (default: .sym/code-policy.json)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Act as this role for RBAC checks
        #[arg(long)]
        role: Option<String>,
    },

    /// Report files the current role may not modify
    CheckRbac {
        /// Files to check, relative to the repository root
        #[arg(required = true)]
        files: Vec<String>,

        /// Act as this role instead of the configured one
        #[arg(long)]
        role: Option<String>,
    },

    /// List configured LLM providers in fallback order
    Providers,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    sym_core::telemetry::init_tracing(cli.json, level);

    let root = repo_root(&cli.dir).unwrap_or_else(|_| cli.dir.clone());
    let config = SymConfig::load(&root).context("Failed to load .sym/config.toml")?;

    match cli.command {
        Commands::Validate {
            staged,
            policy,
            role,
        } => cmd_validate(&root, &config, staged, policy.as_deref(), role, cli.json).await,
        Commands::CheckRbac { files, role } => cmd_check_rbac(&root, &config, &files, role),
        Commands::Providers => cmd_providers(&config),
    }
}

fn role_store(root: &Path, config: &SymConfig, role: Option<String>) -> PolicyRoleStore {
    let user = current_user(root).ok();
    PolicyRoleStore::from_repo(root, role.or_else(|| config.role.clone()), user.as_deref())
}

async fn cmd_validate(
    root: &Path,
    config: &SymConfig,
    staged: bool,
    policy_path: Option<&Path>,
    role: Option<String>,
    json: bool,
) -> Result<ExitCode> {
    let policy_path = policy_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(DEFAULT_POLICY));
    let policy = CodePolicy::load(&policy_path)
        .with_context(|| format!("Failed to load policy from {}", policy_path.display()))?;

    let scope = if staged { ChangeScope::Staged } else { ChangeScope::WorkingTree };
    let changes = collect_changes(root, scope).context("Failed to collect git changes")?;
    if changes.is_empty() {
        info!("no changes to validate");
    }

    let tools_dir = config.tools_dir();
    let validator = Validator::new(Some(Arc::new(policy)))
        .with_config(config)
        .with_work_dir(root)
        .with_linters(LinterRegistry::with_defaults(&tools_dir, root))
        .with_provider(build_chain(&config.llm.providers))
        .with_role_store(Arc::new(role_store(root, config, role)));

    let result = validator
        .validate_changes(&changes)
        .await
        .context("Validation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&Report::new(&result))?);
    } else {
        print!("{}", render_result(&result));
    }
    Ok(exit_code(&result))
}

fn cmd_check_rbac(
    root: &Path,
    config: &SymConfig,
    files: &[String],
    role: Option<String>,
) -> Result<ExitCode> {
    let store = role_store(root, config, role);
    let role = store
        .current_role()
        .context("No current role; set --role, SYM_ROLE or .sym/roles.json")?;
    let check = store
        .validate_file_permissions(&role, files)
        .context("Failed to evaluate role permissions")?;

    if check.allowed {
        println!("Role '{}' may modify all {} file(s)", role, files.len());
        return Ok(ExitCode::SUCCESS);
    }
    println!("Role '{}' may not modify:", role);
    for file in &check.denied_files {
        println!("  {}", file);
    }
    Ok(ExitCode::from(1))
}

fn cmd_providers(config: &SymConfig) -> Result<ExitCode> {
    if config.llm.providers.is_empty() {
        println!("No LLM providers configured. Add [[llm.providers]] to .sym/config.toml");
        return Ok(ExitCode::SUCCESS);
    }
    for (i, settings) in config.llm.providers.iter().enumerate() {
        match build_provider(settings) {
            Ok(provider) => {
                let info = provider.info();
                let mode = info.mode.map(|m| m.to_string()).unwrap_or_else(|| "unknown".to_string());
                println!(
                    "{}. {} [{}] max_prompt_chars={} timeout={}s retries={}",
                    i + 1,
                    info.display_name,
                    mode,
                    info.profile.max_prompt_chars,
                    info.profile.default_timeout_secs,
                    info.profile.max_retries
                );
            }
            Err(e) => println!("{}. unavailable: {}", i + 1, e),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// 1 for violations, 2 when checks could not complete, 0 otherwise.
fn exit_code(result: &ValidationResult) -> ExitCode {
    if result.has_violations() {
        ExitCode::from(1)
    } else if result.has_errors() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    result: &'a ValidationResult,
}

impl<'a> Report<'a> {
    fn new(result: &'a ValidationResult) -> Self {
        Self {
            generated_at: chrono::Utc::now(),
            result,
        }
    }
}

fn render_result(result: &ValidationResult) -> String {
    let mut out = String::new();

    if !result.violations.is_empty() {
        out.push_str(&format!("Violations ({}):\n", result.violations.len()));
        for v in &result.violations {
            let location = if v.line > 0 {
                format!("{}:{}:{}", v.file, v.line, v.column)
            } else {
                v.file.clone()
            };
            out.push_str(&format!("  [{}] {} {}: {}\n", v.severity, location, v.rule_id, v.message));
        }
    }

    if !result.errors.is_empty() {
        out.push_str(&format!("Could not check ({}):\n", result.errors.len()));
        for e in &result.errors {
            out.push_str(&format!("  {} [{}]: {}\n", e.engine, e.rule_ids.join(", "), e.message));
        }
    }

    out.push_str(&format!(
        "Checked {} file(s): {} passed, {} failed\n",
        result.checked, result.passed, result.failed
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sym_core::{ValidationError, Violation};

    fn sample() -> ValidationResult {
        ValidationResult {
            violations: vec![Violation {
                rule_id: "no-console".to_string(),
                severity: "error".to_string(),
                message: "Unexpected console".to_string(),
                file: "a.js".to_string(),
                line: 3,
                column: 1,
                ..Violation::default()
            }],
            errors: vec![ValidationError {
                rule_ids: vec!["java-style".to_string()],
                engine: "checkstyle".to_string(),
                message: "linter not found: checkstyle".to_string(),
            }],
            checked: 2,
            passed: 1,
            failed: 1,
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&sample()), ExitCode::from(1));

        let errors_only = ValidationResult {
            violations: vec![],
            ..sample()
        };
        assert_eq!(exit_code(&errors_only), ExitCode::from(2));
        assert_eq!(exit_code(&ValidationResult::default()), ExitCode::SUCCESS);
    }

    #[test]
    fn test_render_lists_errors_separately() {
        let text = render_result(&sample());
        let violations_at = text.find("Violations (1)").unwrap();
        let errors_at = text.find("Could not check (1)").unwrap();
        assert!(violations_at < errors_at);
        assert!(text.contains("[error] a.js:3:1 no-console: Unexpected console"));
        assert!(text.contains("checkstyle [java-style]"));
        assert!(text.ends_with("Checked 2 file(s): 1 passed, 1 failed\n"));
    }

    #[test]
    fn test_json_report_flattens_result() {
        let result = sample();
        let value = serde_json::to_value(Report::new(&result)).unwrap();
        assert!(value.get("generated_at").is_some());
        assert_eq!(value["checked"], 2);
        assert_eq!(value["violations"][0]["rule_id"], "no-console");
    }

    #[test]
    fn test_cli_parses_validate_flags() {
        let cli = Cli::parse_from(["sym", "--json", "validate", "--staged", "--role", "dev"]);
        assert!(cli.json);
        match cli.command {
            Commands::Validate { staged, role, policy } => {
                assert!(staged);
                assert_eq!(role.as_deref(), Some("dev"));
                assert!(policy.is_none());
            }
            _ => panic!("expected validate"),
        }
    }
}
