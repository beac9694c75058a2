//! command::request
//!
//! The request descriptor for one invocation of the external executable.

use std::fmt;
use std::path::{Path, PathBuf};

/// Closed set of supported subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    Add,
    Checkout,
    Commit,
    Diff,
    Info,
    Lock,
    Unlock,
    Update,
}

impl OperationName {
    /// The subcommand string passed to the executable.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::Add => "add",
            OperationName::Checkout => "checkout",
            OperationName::Commit => "commit",
            OperationName::Diff => "diff",
            OperationName::Info => "info",
            OperationName::Lock => "lock",
            OperationName::Unlock => "unlock",
            OperationName::Update => "update",
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target of a request: a local path or a remote URL, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A working-copy path.
    Path(PathBuf),
    /// A repository URL.
    Url(String),
}

impl Target {
    pub fn is_url(&self) -> bool {
        matches!(self, Target::Url(_))
    }

    /// The URL, when this target is remote.
    pub fn url(&self) -> Option<&str> {
        match self {
            Target::Url(url) => Some(url),
            Target::Path(_) => None,
        }
    }

    /// The argument form passed to the executable.
    pub fn as_arg(&self) -> String {
        match self {
            Target::Path(path) => path.display().to_string(),
            Target::Url(url) => url.clone(),
        }
    }
}

/// One request against the external executable.
///
/// Built once per call through the consuming builder methods; immutable
/// after the call is issued and consumed exactly once by the runtime.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    operation: OperationName,
    args: Vec<String>,
    target: Option<Target>,
    operands: Vec<String>,
    working_dir: Option<PathBuf>,
    structured_output: bool,
}

impl CommandRequest {
    pub fn new(operation: OperationName) -> Self {
        Self {
            operation,
            args: Vec::new(),
            target: None,
            operands: Vec::new(),
            working_dir: None,
            structured_output: false,
        }
    }

    /// Append one argument before the target.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments before the target.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the target. A request has at most one.
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Append an operand placed after the target (e.g. the destination
    /// path of a checkout).
    pub fn operand(mut self, operand: impl Into<String>) -> Self {
        self.operands.push(operand.into());
        self
    }

    /// Append several operands.
    pub fn operands<I, S>(mut self, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operands.extend(operands.into_iter().map(Into::into));
        self
    }

    /// Set the working directory the process is spawned in.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Request structured (`--xml`) output where the subcommand supports
    /// it.
    pub fn structured_output(mut self) -> Self {
        self.structured_output = true;
        self
    }

    pub fn operation(&self) -> OperationName {
        self.operation
    }

    /// The remote URL this request authenticates against, when the target
    /// is remote.
    pub fn target_url(&self) -> Option<&str> {
        self.target.as_ref().and_then(Target::url)
    }

    pub fn working_dir_path(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Assemble the full argument vector for one attempt.
    ///
    /// Layout: subcommand, `--non-interactive` (prompting is this crate's
    /// job, never the executable's), optional `--config-dir`, optional
    /// `--xml`, per-attempt authentication arguments, request arguments,
    /// target, trailing operands.
    pub(crate) fn cli_args(&self, config_dir: Option<&Path>, auth_args: &[String]) -> Vec<String> {
        let mut args = vec![
            self.operation.as_str().to_string(),
            "--non-interactive".to_string(),
        ];
        if let Some(dir) = config_dir {
            args.push("--config-dir".to_string());
            args.push(dir.display().to_string());
        }
        if self.structured_output {
            args.push("--xml".to_string());
        }
        args.extend(auth_args.iter().cloned());
        args.extend(self.args.iter().cloned());
        if let Some(target) = &self.target {
            args.push(target.as_arg());
        }
        args.extend(self.operands.iter().cloned());
        args
    }
}
