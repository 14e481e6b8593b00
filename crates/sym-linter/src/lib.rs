//! External linter adapters.
//!
//! A [`Linter`] wraps one deterministic tool (ESLint, ...): it checks that
//! the tool is installed, installs it on demand, runs it once over a batch
//! of files and parses the raw output into [`LinterViolation`]s. The
//! validator looks linters up by engine name in a [`LinterRegistry`].

pub mod error;
pub mod eslint;
pub mod fakes;
pub mod registry;
pub mod subprocess;
pub mod types;

pub use error::{LinterError, LinterResult};
pub use eslint::EslintLinter;
pub use registry::LinterRegistry;
pub use subprocess::SubprocessExecutor;
pub use types::{
    default_tools_dir, map_severity, Capabilities, InstallConfig, Linter, LinterViolation,
    ToolOutput,
};
