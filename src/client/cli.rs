//! client::cli
//!
//! Command-line backend. Each client builds a [`CommandRequest`], runs it
//! through a fresh [`CommandRuntime`], and interprets the executable's
//! stdout. Revision results come from the trailing summary lines the
//! executable prints (`Checked out revision 42.` and friends).

use std::path::Path;
use std::sync::Arc;

use crate::command::{
    CommandRequest, CommitOutputParser, OperationName, OutputParser, Target, UpdateOutputParser,
};
use crate::progress::ProgressTracker;
use crate::protocol::{Depth, Revision};

use crate::protocol::NodeKind;

use super::{ClientContext, ClientError};
use super::traits::{
    AddClient, CheckoutClient, CommitClient, DiffClient, EntryInfo, InfoClient, LockClient,
    UpdateClient,
};

/// Pull the revision number out of a summary line with a known prefix.
///
/// `"Checked out revision 42."` with prefix `"Checked out revision "`
/// yields 42. The trailing period is optional.
fn parse_revision_line(line: &str, prefix: &str) -> Option<i64> {
    let rest = line.trim().strip_prefix(prefix)?;
    rest.trim_end_matches('.').parse().ok()
}

/// Scan output bottom-up for the first summary line matching `prefix`.
///
/// Summary lines come last, so scanning from the end finds the result
/// without touching the per-path noise above it.
fn find_revision(stdout: &str, prefix: &str) -> Option<i64> {
    stdout
        .lines()
        .rev()
        .find_map(|line| parse_revision_line(line, prefix))
}

/// Revision flag shared by every subcommand that accepts one.
fn revision_args(revision: Revision) -> Vec<String> {
    vec!["--revision".to_string(), revision.as_arg()]
}

fn depth_args(depth: Depth) -> Vec<String> {
    vec!["--depth".to_string(), depth.as_arg().to_string()]
}

pub struct CliAddClient {
    context: Arc<ClientContext>,
}

impl CliAddClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl AddClient for CliAddClient {
    fn add(
        &self,
        path: &Path,
        depth: Depth,
        force: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError> {
        let mut request = CommandRequest::new(OperationName::Add)
            .args(depth_args(depth))
            .target(Target::Path(path.to_path_buf()));
        if force {
            request = request.arg("--force");
        }
        let parser: Arc<dyn OutputParser> = Arc::new(UpdateOutputParser);
        self.context
            .new_runtime()
            .execute(request, tracker, Some(parser))?;
        Ok(())
    }
}

pub struct CliCheckoutClient {
    context: Arc<ClientContext>,
}

impl CliCheckoutClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl CheckoutClient for CliCheckoutClient {
    fn checkout(
        &self,
        url: &str,
        destination: &Path,
        revision: Revision,
        depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<i64, ClientError> {
        let request = CommandRequest::new(OperationName::Checkout)
            .args(revision_args(revision))
            .args(depth_args(depth))
            .target(Target::Url(url.to_string()))
            .operand(destination.to_string_lossy());
        let parser: Arc<dyn OutputParser> = Arc::new(UpdateOutputParser);
        let output = self
            .context
            .new_runtime()
            .execute(request, tracker, Some(parser))?;
        find_revision(&output.stdout_text, "Checked out revision ").ok_or_else(|| {
            ClientError::MalformedOutput("no checkout revision in output".to_string())
        })
    }
}

pub struct CliCommitClient {
    context: Arc<ClientContext>,
}

impl CliCommitClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl CommitClient for CliCommitClient {
    fn commit(
        &self,
        paths: &[&Path],
        message: &str,
        depth: Depth,
        keep_locks: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Option<i64>, ClientError> {
        let mut request = CommandRequest::new(OperationName::Commit)
            .arg("--message")
            .arg(message)
            .args(depth_args(depth))
            .operands(paths.iter().map(|path| path.to_string_lossy().into_owned()));
        if keep_locks {
            request = request.arg("--no-unlock");
        }
        let parser: Arc<dyn OutputParser> = Arc::new(CommitOutputParser);
        let output = self
            .context
            .new_runtime()
            .execute(request, tracker, Some(parser))?;
        // An empty commit exits 0 with no summary line.
        Ok(find_revision(&output.stdout_text, "Committed revision "))
    }
}

pub struct CliDiffClient {
    context: Arc<ClientContext>,
}

impl CliDiffClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl DiffClient for CliDiffClient {
    fn diff(
        &self,
        path: &Path,
        from: Revision,
        to: Revision,
        depth: Depth,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<u8>, ClientError> {
        let request = CommandRequest::new(OperationName::Diff)
            .arg("--revision")
            .arg(format!("{}:{}", from.as_arg(), to.as_arg()))
            .args(depth_args(depth))
            .target(Target::Path(path.to_path_buf()));
        // No parser: diff output is payload, not progress.
        let output = self.context.new_runtime().execute(request, tracker, None)?;
        Ok(output.stdout_raw)
    }
}

/// Interpret the key-value lines of `info` output.
///
/// Unrecognized keys are skipped; `info` prints many fields this crate has
/// no use for.
fn parse_info(stdout: &str) -> EntryInfo {
    let mut info = EntryInfo::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "URL" => info.url = Some(value.to_string()),
            "Repository Root" => info.repository_root = Some(value.to_string()),
            "Revision" => info.revision = value.parse().ok(),
            "Last Changed Rev" => info.last_changed_revision = value.parse().ok(),
            "Node Kind" => {
                info.kind = match value {
                    "file" => NodeKind::File,
                    "directory" => NodeKind::Dir,
                    "none" => NodeKind::None,
                    _ => NodeKind::Unknown,
                }
            }
            _ => {}
        }
    }
    info
}

pub struct CliInfoClient {
    context: Arc<ClientContext>,
}

impl CliInfoClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl InfoClient for CliInfoClient {
    fn info(
        &self,
        target: &Target,
        revision: Option<Revision>,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<EntryInfo, ClientError> {
        let mut request = CommandRequest::new(OperationName::Info).target(target.clone());
        if let Some(revision) = revision {
            request = request.args(revision_args(revision));
        }
        let output = self.context.new_runtime().execute(request, tracker, None)?;
        let info = parse_info(&output.stdout_text);
        if info == EntryInfo::default() {
            return Err(ClientError::MalformedOutput(
                "info produced no recognizable fields".to_string(),
            ));
        }
        Ok(info)
    }
}

pub struct CliLockClient {
    context: Arc<ClientContext>,
}

impl CliLockClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl LockClient for CliLockClient {
    fn lock(
        &self,
        path: &Path,
        message: Option<&str>,
        steal: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError> {
        let mut request =
            CommandRequest::new(OperationName::Lock).target(Target::Path(path.to_path_buf()));
        if let Some(message) = message {
            request = request.arg("--message").arg(message);
        }
        if steal {
            request = request.arg("--force");
        }
        self.context.new_runtime().execute(request, tracker, None)?;
        Ok(())
    }

    fn unlock(
        &self,
        path: &Path,
        break_lock: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<(), ClientError> {
        let mut request =
            CommandRequest::new(OperationName::Unlock).target(Target::Path(path.to_path_buf()));
        if break_lock {
            request = request.arg("--force");
        }
        self.context.new_runtime().execute(request, tracker, None)?;
        Ok(())
    }
}

pub struct CliUpdateClient {
    context: Arc<ClientContext>,
}

impl CliUpdateClient {
    pub fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl UpdateClient for CliUpdateClient {
    fn update(
        &self,
        paths: &[&Path],
        revision: Revision,
        depth: Depth,
        allow_unversioned_obstructions: bool,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Result<Vec<i64>, ClientError> {
        let mut request = CommandRequest::new(OperationName::Update)
            .args(revision_args(revision))
            .args(depth_args(depth))
            .operands(paths.iter().map(|path| path.to_string_lossy().into_owned()));
        if allow_unversioned_obstructions {
            request = request.arg("--force");
        }
        let parser: Arc<dyn OutputParser> = Arc::new(UpdateOutputParser);
        let output = self
            .context
            .new_runtime()
            .execute(request, tracker, Some(parser))?;

        // One summary line per target: `Updated to revision N.` when files
        // changed, `At revision N.` when already current.
        let revisions: Vec<i64> = output
            .stdout_text
            .lines()
            .filter_map(|line| {
                parse_revision_line(line, "Updated to revision ")
                    .or_else(|| parse_revision_line(line, "At revision "))
            })
            .collect();
        if revisions.len() != paths.len() {
            return Err(ClientError::MalformedOutput(format!(
                "expected {} update summaries, found {}",
                paths.len(),
                revisions.len()
            )));
        }
        Ok(revisions)
    }
}
