//! ESLint adapter for JavaScript and TypeScript.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{LinterError, LinterResult};
use crate::subprocess::SubprocessExecutor;
use crate::types::{Capabilities, InstallConfig, Linter, LinterViolation, ToolOutput};

const NAME: &str = "eslint";
const CONFIG_FILE: &str = ".eslintrc.json";
const DEFAULT_VERSION: &str = "^8.0.0";
/// ESLint exits 1 when it reports problems and 2 on a fatal error.
const FATAL_EXIT_CODE: i32 = 2;

/// Runs ESLint with a generated legacy (`.eslintrc`) config and parses its
/// JSON formatter output.
#[derive(Debug, Clone)]
pub struct EslintLinter {
    tools_dir: PathBuf,
    work_dir: PathBuf,
}

impl EslintLinter {
    pub fn new(tools_dir: &Path, work_dir: &Path) -> Self {
        Self {
            tools_dir: tools_dir.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn local_binary(&self) -> PathBuf {
        self.tools_dir.join("node_modules").join(".bin").join("eslint")
    }

    /// Local install, then global `eslint`, then `npx eslint@8`.
    async fn command(&self) -> (String, Vec<String>) {
        let local = self.local_binary();
        if local.exists() {
            return (local.to_string_lossy().into_owned(), Vec::new());
        }
        if SubprocessExecutor::new()
            .execute(NAME, &["--version".to_string()])
            .await
            .is_ok_and(|out| out.exit_code == 0)
        {
            return (NAME.to_string(), Vec::new());
        }
        ("npx".to_string(), vec!["eslint@8".to_string()])
    }

    async fn write_config(&self, config: &[u8]) -> LinterResult<PathBuf> {
        let tmp_dir = self.tools_dir.join(".tmp");
        tokio::fs::create_dir_all(&tmp_dir).await?;
        let path = tmp_dir.join(format!("eslintrc-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, config).await?;
        Ok(path)
    }
}

#[async_trait]
impl Linter for EslintLinter {
    fn name(&self) -> &str {
        NAME
    }

    fn config_file(&self) -> &str {
        CONFIG_FILE
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            name: NAME.to_string(),
            supported_languages: ["javascript", "typescript", "jsx", "tsx"]
                .map(String::from)
                .to_vec(),
            supported_categories: ["pattern", "length", "style", "ast"]
                .map(String::from)
                .to_vec(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    async fn check_availability(&self) -> LinterResult<()> {
        if self.local_binary().exists() {
            return Ok(());
        }
        let version_check = SubprocessExecutor::new()
            .execute(NAME, &["--version".to_string()])
            .await;
        match version_check {
            Ok(out) if out.exit_code == 0 => Ok(()),
            _ => Err(LinterError::Unavailable {
                tool: NAME.to_string(),
                reason: format!(
                    "checked {} and global PATH",
                    self.local_binary().display()
                ),
            }),
        }
    }

    async fn install(&self, config: &InstallConfig) -> LinterResult<()> {
        let tools_dir = if config.tools_dir.as_os_str().is_empty() {
            self.tools_dir.clone()
        } else {
            config.tools_dir.clone()
        };
        tokio::fs::create_dir_all(&tools_dir).await?;

        let package_json = tools_dir.join("package.json");
        if !package_json.exists() {
            let manifest = serde_json::json!({
                "name": "symphony-tools",
                "version": "1.0.0",
                "private": true,
            });
            tokio::fs::write(&package_json, manifest.to_string()).await?;
        }

        let version = if config.version.is_empty() {
            DEFAULT_VERSION
        } else {
            config.version.as_str()
        };
        let mut args = vec![
            "install".to_string(),
            format!("eslint@{version}"),
            "@typescript-eslint/parser".to_string(),
        ];
        if config.force {
            args.push("--force".to_string());
        }

        info!(tools_dir = %tools_dir.display(), version = %version, "installing eslint");
        let out = SubprocessExecutor::new()
            .with_work_dir(&tools_dir)
            .execute("npm", &args)
            .await
            .map_err(|e| LinterError::InstallFailed {
                tool: NAME.to_string(),
                reason: e.to_string(),
            })?;
        if out.exit_code != 0 {
            return Err(LinterError::InstallFailed {
                tool: NAME.to_string(),
                reason: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn execute(&self, config: &[u8], files: &[String]) -> LinterResult<ToolOutput> {
        if files.is_empty() {
            return Ok(ToolOutput::empty("[]"));
        }

        let config_path = self.write_config(config).await?;
        let (program, mut args) = self.command().await;
        args.extend([
            "--config".to_string(),
            config_path.to_string_lossy().into_owned(),
            "--format".to_string(),
            "json".to_string(),
            "--no-eslintrc".to_string(),
        ]);
        args.extend(files.iter().cloned());

        let result = SubprocessExecutor::new()
            .with_work_dir(&self.work_dir)
            .with_env("ESLINT_USE_FLAT_CONFIG", "false")
            .execute(&program, &args)
            .await;

        if let Err(e) = tokio::fs::remove_file(&config_path).await {
            debug!(path = %config_path.display(), error = %e, "failed to remove temp config");
        }
        result
    }

    fn parse_output(&self, output: &ToolOutput) -> LinterResult<Vec<LinterViolation>> {
        if output.exit_code >= FATAL_EXIT_CODE || output.exit_code < 0 {
            let stderr = output.stderr.trim();
            return Err(LinterError::ExecutionFailed {
                tool: NAME.to_string(),
                reason: if stderr.is_empty() {
                    format!("exited with code {}", output.exit_code)
                } else {
                    format!("exited with code {}: {stderr}", output.exit_code)
                },
            });
        }
        parse_eslint_json(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResult {
    file_path: String,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    #[serde(default)]
    rule_id: Option<String>,
    /// 0 = off, 1 = warn, 2 = error
    #[serde(default)]
    severity: u8,
    #[serde(default)]
    message: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
}

fn parse_eslint_json(stdout: &str) -> LinterResult<Vec<LinterViolation>> {
    let stdout = stdout.trim();
    if stdout.is_empty() || stdout == "[]" {
        return Ok(Vec::new());
    }

    let results: Vec<FileResult> =
        serde_json::from_str(stdout).map_err(|e| LinterError::ParseFailed {
            tool: NAME.to_string(),
            reason: e.to_string(),
        })?;

    Ok(results
        .into_iter()
        .flat_map(|file| {
            let path = file.file_path;
            file.messages.into_iter().map(move |msg| LinterViolation {
                file: path.clone(),
                line: msg.line,
                column: msg.column,
                message: msg.message,
                severity: match msg.severity {
                    2 => "error",
                    1 => "warning",
                    _ => "info",
                }
                .to_string(),
                rule_id: msg.rule_id.unwrap_or_default(),
            })
        })
        .collect())
}
