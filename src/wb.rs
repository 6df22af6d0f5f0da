//! The external connectome-workbench collaborator.
//!
//! Every computationally significant surface and volume operation (format
//! conversion, metric separation, geodesic ROI generation, dilation) is
//! delegated to the `wb_command` binary. This module owns its discovery,
//! version reporting and invocation; the rest of the crate only sees the
//! [`WorkbenchRunner`] trait, so the extraction pipeline can be exercised
//! without the binary installed.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{debug, info};

use crate::error::{MeantsError, Result};

/// Explicit run configuration, threaded through every call site rather than
/// kept in process-wide state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSettings {
    /// Log every delegated command line before running it.
    pub debug: bool,
    /// Log the delegated command lines without executing anything.
    pub dry_run: bool,
}

/// Executes wb_command invocations, one blocking call per command, in
/// strict sequence. A non-zero exit is fatal to the whole invocation; there
/// is no retry.
pub trait WorkbenchRunner {
    fn run(&self, args: &[String]) -> Result<()>;
}

/// The real wb_command binary.
#[derive(Debug, Clone)]
pub struct Workbench {
    exe: PathBuf,
    settings: RunSettings,
}

impl Workbench {
    /// Locate wb_command and wrap it with the given settings. The
    /// `WB_COMMAND` environment variable wins over the `PATH` search.
    pub fn discover(settings: RunSettings) -> Result<Workbench> {
        let exe = find_wb_command().ok_or(MeantsError::WorkbenchNotFound)?;
        Ok(Workbench { exe, settings })
    }

    /// Wrap a known wb_command executable path.
    pub fn at<P: Into<PathBuf>>(exe: P, settings: RunSettings) -> Workbench {
        Workbench {
            exe: exe.into(),
            settings,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.exe
    }

    /// Version info as reported by `wb_command -version`, trimmed to the
    /// leading lines that carry the version proper.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.exe).arg("-version").output()?;
        if !output.status.success() {
            return Err(MeantsError::ExternalToolFailure(
                format!("{} -version", self.exe.display()),
                status_detail(output.status, &output.stderr),
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text
            .lines()
            .take(3)
            .collect::<Vec<&str>>()
            .join("\n    "))
    }
}

impl WorkbenchRunner for Workbench {
    fn run(&self, args: &[String]) -> Result<()> {
        let cmdline = render_cmdline(&self.exe, args);
        if self.settings.dry_run {
            info!("dry run: {}", cmdline);
            return Ok(());
        }
        if self.settings.debug {
            debug!("running: {}", cmdline);
        }
        let output = Command::new(&self.exe).args(args).output()?;
        if !output.status.success() {
            return Err(MeantsError::ExternalToolFailure(
                cmdline,
                status_detail(output.status, &output.stderr),
            ));
        }
        Ok(())
    }
}

/// A runner for pipelines that need no conversion at all; any call is a
/// programming error surfaced as [`MeantsError::WorkbenchNotFound`].
#[derive(Debug, Clone, Copy)]
pub struct NoWorkbench;

impl WorkbenchRunner for NoWorkbench {
    fn run(&self, _args: &[String]) -> Result<()> {
        Err(MeantsError::WorkbenchNotFound)
    }
}

/// Search the `WB_COMMAND` override and then the `PATH` for wb_command.
pub fn find_wb_command() -> Option<PathBuf> {
    if let Some(exe) = env::var_os("WB_COMMAND") {
        let exe = PathBuf::from(exe);
        if exe.is_file() {
            return Some(exe);
        }
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join("wb_command"))
        .find(|candidate| candidate.is_file())
}

fn render_cmdline(exe: &Path, args: &[String]) -> String {
    let mut cmdline = exe.display().to_string();
    for arg in args {
        cmdline.push(' ');
        cmdline.push_str(arg);
    }
    cmdline
}

fn status_detail(status: ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    match status.code() {
        Some(code) if stderr.is_empty() => format!("exit code {}", code),
        Some(code) => format!("exit code {}: {}", code, stderr),
        None => String::from("terminated by signal"),
    }
}
