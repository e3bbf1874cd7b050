use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

#[cfg(feature = "serde-errors")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "pure-rust")]
use std::fs;
#[cfg(feature = "dry-run")]
use std::sync::{Arc, Mutex};

/// Logical grouping for commands issued by the [`BashRunner`][crate::BashRunner].
#[cfg_attr(feature = "serde-errors", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    ChangeDirectory,
    ListDirectory,
    PrintDirectory,
    CreateDirectory,
    Remove,
    Copy,
    Move,
    Search,
}

/// Shell family used to execute commands.
#[cfg_attr(feature = "serde-errors", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    Unix,
    Windows,
}

/// Describes a command that will be executed by a [`CommandExecutor`].
#[cfg_attr(feature = "serde-errors", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub shell: ShellKind,
    pub command: String,
    pub category: CommandCategory,
    pub working_dir: PathBuf,
    pub touched_paths: Vec<PathBuf>,
}

impl CommandInvocation {
    pub fn new(
        shell: ShellKind,
        command: String,
        category: CommandCategory,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            shell,
            command,
            category,
            working_dir,
            touched_paths: Vec::new(),
        }
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.touched_paths = paths;
        self
    }
}

/// Describes the exit status of a command execution.
#[cfg_attr(feature = "serde-errors", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    success: bool,
    code: Option<i32>,
}

impl CommandStatus {
    pub fn new(success: bool, code: Option<i32>) -> Self {
        Self { success, code }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn failure(code: Option<i32>) -> Self {
        Self {
            success: false,
            code,
        }
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        let code = status.code();
        Self {
            success: status.success(),
            code,
        }
    }
}

/// Output produced by the executor for a command invocation.
#[cfg_attr(feature = "serde-errors", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::new(true, Some(0)),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            status: CommandStatus::failure(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Trait implemented by concrete command execution strategies.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput>;
}

/// Executes commands by delegating to the system shell via [`std::process::Command`].
#[cfg(feature = "std-process")]
pub struct ProcessCommandExecutor;

#[cfg(feature = "std-process")]
impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "std-process")]
impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std-process")]
impl CommandExecutor for ProcessCommandExecutor {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        use std::process::Command;

        let mut cmd = match invocation.shell {
            ShellKind::Unix => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(&invocation.command);
                command
            }
            ShellKind::Windows => {
                #[cfg(not(feature = "powershell-process"))]
                {
                    bail!(
                        "powershell-process feature disabled; enable it to execute Windows commands"
                    );
                }
                #[cfg(feature = "powershell-process")]
                let mut command = Command::new("powershell");
                command
                    .arg("-NoProfile")
                    .arg("-NonInteractive")
                    .arg("-Command")
                    .arg(&invocation.command);
                #[cfg(feature = "powershell-process")]
                {
                    command
                }
            }
        };

        cmd.current_dir(&invocation.working_dir);
        let output = cmd
            .output()
            .with_context(|| format!("failed to execute command: {}", invocation.command))?;

        Ok(CommandOutput {
            status: CommandStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(feature = "dry-run")]
#[derive(Clone, Default)]
pub struct DryRunCommandExecutor {
    log: Arc<Mutex<Vec<CommandInvocation>>>,
}

#[cfg(feature = "dry-run")]
impl DryRunCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_invocations(&self) -> Vec<CommandInvocation> {
        match self.log.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(feature = "dry-run")]
impl CommandExecutor for DryRunCommandExecutor {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        let mut guard = match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(invocation.clone());
        Ok(match invocation.category {
            CommandCategory::ListDirectory => CommandOutput::success("(dry-run listing)"),
            _ => CommandOutput::success(String::new()),
        })
    }
}

#[cfg(feature = "pure-rust")]
#[derive(Debug, Default, Clone, Copy)]
pub struct PureRustCommandExecutor;

#[cfg(feature = "pure-rust")]
impl PureRustCommandExecutor {
    fn resolve_primary_path(invocation: &CommandInvocation) -> Result<&PathBuf> {
        invocation
            .touched_paths
            .first()
            .ok_or_else(|| anyhow!("invocation missing target path"))
    }

    fn should_include_hidden(command: &str) -> bool {
        command.contains("-a") || command.contains("-Force")
    }

    fn mkdir(path: &Path, command: &str) -> Result<()> {
        if command.contains("-p") || command.contains("-Force") {
            fs::create_dir_all(path)
                .with_context(|| format!("failed to create directory `{}`", path.display()))?
        } else {
            fs::create_dir(path)
                .with_context(|| format!("failed to create directory `{}`", path.display()))?
        }
        Ok(())
    }

    fn rm(path: &Path, command: &str) -> Result<()> {
        if path.is_dir() {
            if command.contains("-r") || command.contains("-Recurse") {
                fs::remove_dir_all(path)
                    .with_context(|| format!("failed to remove directory `{}`", path.display()))?
            } else {
                fs::remove_dir(path)
                    .with_context(|| format!("failed to remove directory `{}`", path.display()))?
            }
        } else if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("failed to remove file `{}`", path.display()))?
        }
        Ok(())
    }

    fn copy_recursive(source: &Path, dest: &Path, recursive: bool) -> Result<()> {
        if source.is_dir() {
            if !recursive {
                bail!(
                    "copying directory `{}` requires recursive flag",
                    source.display()
                );
            }
            fs::create_dir_all(dest)
                .with_context(|| format!("failed to create directory `{}`", dest.display()))?;
            for entry in fs::read_dir(source)
                .with_context(|| format!("failed to read directory `{}`", source.display()))?
            {
                let entry = entry?;
                let entry_path = entry.path();
                let dest_path = dest.join(entry.file_name());
                if entry_path.is_dir() {
                    Self::copy_recursive(&entry_path, &dest_path, true)?;
                } else {
                    Self::copy_file(&entry_path, &dest_path)?;
                }
            }
        } else {
            Self::copy_file(source, dest)?;
        }
        Ok(())
    }

    fn copy_file(source: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to prepare destination directory `{}`",
                    parent.display()
                )
            })?;
        }
        fs::copy(source, dest).with_context(|| {
            format!(
                "failed to copy `{}` to `{}`",
                source.display(),
                dest.display()
            )
        })?;
        Ok(())
    }

    fn move_path(source: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to prepare destination directory `{}`",
                    parent.display()
                )
            })?;
        }

        if let Err(rename_err) = fs::rename(source, dest) {
            Self::copy_recursive(source, dest, true)
                .and_then(|_| Self::rm(source, "-r -f"))
                .with_context(|| {
                    format!(
                        "failed to move `{}` to `{}` via rename: {rename_err}",
                        source.display(),
                        dest.display()
                    )
                })?;
        }
        Ok(())
    }
}

#[cfg(feature = "pure-rust")]
impl CommandExecutor for PureRustCommandExecutor {
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        match invocation.category {
            CommandCategory::ListDirectory => {
                let path = Self::resolve_primary_path(invocation)?;
                let mut entries = Vec::new();
                for entry in fs::read_dir(path)
                    .with_context(|| format!("failed to read directory `{}`", path.display()))?
                {
                    let entry = entry?;
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    if !Self::should_include_hidden(&invocation.command) && name.starts_with('.') {
                        continue;
                    }
                    entries.push(name.to_string());
                }
                entries.sort();
                Ok(CommandOutput::success(entries.join("\n")))
            }
            CommandCategory::CreateDirectory => {
                let path = Self::resolve_primary_path(invocation)?;
                Self::mkdir(path, &invocation.command)?;
                Ok(CommandOutput::success(String::new()))
            }
            CommandCategory::Remove => {
                let path = Self::resolve_primary_path(invocation)?;
                Self::rm(path, &invocation.command)?;
                Ok(CommandOutput::success(String::new()))
            }
            CommandCategory::Copy => {
                let source = invocation
                    .touched_paths
                    .first()
                    .ok_or_else(|| anyhow!("copy missing source path"))?;
                let dest = invocation
                    .touched_paths
                    .get(1)
                    .ok_or_else(|| anyhow!("copy missing destination path"))?;
                let recursive =
                    invocation.command.contains("-r") || invocation.command.contains("-Recurse");
                Self::copy_recursive(source.as_path(), dest.as_path(), recursive)?;
                Ok(CommandOutput::success(String::new()))
            }
            CommandCategory::Move => {
                let source = invocation
                    .touched_paths
                    .first()
                    .ok_or_else(|| anyhow!("move missing source path"))?;
                let dest = invocation
                    .touched_paths
                    .get(1)
                    .ok_or_else(|| anyhow!("move missing destination path"))?;
                Self::move_path(source.as_path(), dest.as_path())?;
                Ok(CommandOutput::success(String::new()))
            }
            CommandCategory::Search => bail!(
                "pure-rust executor does not implement search; enable std-process or provide a custom executor"
            ),
            CommandCategory::ChangeDirectory | CommandCategory::PrintDirectory => {
                Ok(CommandOutput::success(String::new()))
            }
        }
    }
}

/// A backend binary whose presence on the host is probed once and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GitBash,
    NativeDiff,
    NativeTar,
    NativeAwk,
    NativeSed,
    NativeGrep,
    NativeJq,
}

impl Capability {
    /// The native-binary capabilities, in the order the original tool
    /// probed them (`diff`, `tar`, `awk`, `sed`, `grep`, `jq`).
    pub const NATIVE_BINS: [Capability; 6] = [
        Capability::NativeDiff,
        Capability::NativeTar,
        Capability::NativeAwk,
        Capability::NativeSed,
        Capability::NativeGrep,
        Capability::NativeJq,
    ];

    fn binary_name(self) -> &'static str {
        match self {
            Capability::GitBash => "bash",
            Capability::NativeDiff => "diff",
            Capability::NativeTar => "tar",
            Capability::NativeAwk => "awk",
            Capability::NativeSed => "sed",
            Capability::NativeGrep => "grep",
            Capability::NativeJq => "jq",
        }
    }
}

/// Result of probing a single [`Capability`].
#[derive(Debug, Clone, Default)]
pub struct CapabilityInfo {
    pub available: bool,
    pub path: Option<PathBuf>,
}

impl CapabilityInfo {
    fn found(path: PathBuf) -> Self {
        Self {
            available: true,
            path: Some(path),
        }
    }

    fn missing() -> Self {
        Self {
            available: false,
            path: None,
        }
    }
}

/// The full set of probed capabilities, keyed by [`Capability`].
pub type CapabilitySet = HashMap<Capability, CapabilityInfo>;

/// One of the five (four, with Python excluded) peer invocation methods the
/// strategy analyzer can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMethod {
    Cmd,
    PowerShell,
    Bash,
    Native,
}

/// Per-method invocation counters, exposed via [`ExecutionEngine::get_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub cmd: u64,
    pub powershell: u64,
    pub bash: u64,
    pub native: u64,
}

impl ExecutionStats {
    pub fn total(&self) -> u64 {
        self.cmd + self.powershell + self.bash + self.native
    }

    fn increment(&mut self, method: ExecutionMethod) {
        match method {
            ExecutionMethod::Cmd => self.cmd += 1,
            ExecutionMethod::PowerShell => self.powershell += 1,
            ExecutionMethod::Bash => self.bash += 1,
            ExecutionMethod::Native => self.native += 1,
        }
    }
}

/// Locates `bash.exe` the way Git for Windows installs it: two fixed
/// locations first, then a PATH search filtered to entries containing
/// `Git` (so a stray MSYS/WSL `bash.exe` earlier on PATH is not picked up).
fn detect_git_bash() -> Option<PathBuf> {
    const FIXED_LOCATIONS: [&str; 2] = [
        r"C:\Program Files\Git\bin\bash.exe",
        r"C:\Program Files (x86)\Git\bin\bash.exe",
    ];

    for candidate in FIXED_LOCATIONS {
        let path = Path::new(candidate);
        if path.is_file() {
            return Some(path.to_path_buf());
        }
    }

    let output = StdCommand::new("where").arg("bash.exe").output().ok()?;
    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| line.contains("Git"))
        .map(PathBuf::from)
}

/// Locates a native-binary port (`diff.exe`, `tar.exe`, ...) via a PATH
/// search, using `where` on Windows and `which` everywhere else so the
/// engine also probes sensibly when developed or tested off-Windows.
fn detect_native_binary(name: &str) -> Option<PathBuf> {
    let finder = if cfg!(windows) { "where" } else { "which" };
    let target = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };

    let output = StdCommand::new(finder).arg(&target).output().ok()?;
    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
}

fn detect_capabilities() -> CapabilitySet {
    let mut capabilities = CapabilitySet::new();

    capabilities.insert(
        Capability::GitBash,
        match detect_git_bash() {
            Some(path) => CapabilityInfo::found(path),
            None => CapabilityInfo::missing(),
        },
    );

    for capability in Capability::NATIVE_BINS {
        let info = match detect_native_binary(capability.binary_name()) {
            Some(path) => CapabilityInfo::found(path),
            None => CapabilityInfo::missing(),
        };
        capabilities.insert(capability, info);
    }

    capabilities
}

/// Sentinel error so callers (the orchestrator) can distinguish "the process
/// ran and failed" from "the process was killed for running too long" and
/// surface the latter as a dedicated timeout error instead of a generic one.
#[derive(Debug, thiserror::Error)]
#[error("command timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Spawns `command` with piped stdout/stderr, polling for completion instead
/// of blocking on `Command::output()` so a runaway child can be killed once
/// `timeout` elapses. Output is drained on background threads while polling
/// to avoid deadlocking on a full pipe buffer.
fn run_with_timeout(command: &mut StdCommand, timeout: Duration) -> Result<std::process::Output> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().context("failed to spawn process")?;

    let mut stdout_pipe = child.stdout.take().expect("stdout piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr piped");
    let stdout_reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        buf
    });
    let stderr_reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf);
        buf
    });

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().context("failed to poll child process")? {
            break status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TimeoutError(timeout).into());
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();
    Ok(std::process::Output {
        status,
        stdout,
        stderr,
    })
}

fn all_capabilities_available() -> CapabilitySet {
    let mut capabilities = CapabilitySet::new();
    capabilities.insert(
        Capability::GitBash,
        CapabilityInfo::found(PathBuf::from("bash")),
    );
    for capability in Capability::NATIVE_BINS {
        capabilities.insert(
            capability,
            CapabilityInfo::found(PathBuf::from(capability.binary_name())),
        );
    }
    capabilities
}

/// Single chokepoint for dispatching a preprocessed command string to one of
/// the four backend shells. Construct once per [`crate::runner::BashRunner`]
/// (or orchestrator) lifetime so capability probing happens only once.
pub struct ExecutionEngine {
    capabilities: CapabilitySet,
    stats: StdMutex<ExecutionStats>,
    test_mode: bool,
}

impl ExecutionEngine {
    /// Probe the host for Git Bash and the native-binary ports.
    pub fn new() -> Self {
        Self {
            capabilities: detect_capabilities(),
            stats: StdMutex::new(ExecutionStats::default()),
            test_mode: false,
        }
    }

    /// Construct an engine that reports every capability as present and
    /// short-circuits every `execute_*` call with a synthesized zero-exit
    /// output instead of spawning a process. Mirrors the original tool's own
    /// test harness.
    pub fn test_mode() -> Self {
        Self {
            capabilities: all_capabilities_available(),
            stats: StdMutex::new(ExecutionStats::default()),
            test_mode: true,
        }
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn capability(&self, capability: Capability) -> CapabilityInfo {
        self.capabilities
            .get(&capability)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_stats(&self) -> ExecutionStats {
        self.stats.lock().map(|guard| *guard).unwrap_or_default()
    }

    pub fn reset_stats(&self) {
        if let Ok(mut guard) = self.stats.lock() {
            *guard = ExecutionStats::default();
        }
    }

    fn record(&self, method: ExecutionMethod) {
        if let Ok(mut guard) = self.stats.lock() {
            guard.increment(method);
        }
    }

    fn test_mode_output(&self, method: ExecutionMethod, rendered: &str) -> CommandOutput {
        tracing::debug!(method = ?method, command = rendered, "test-mode execution, not spawning");
        CommandOutput::success(format!("[test-mode {method:?}] {rendered}"))
    }

    /// Run `command` through `cmd.exe /C`, killing it if it outlives `timeout`.
    pub fn execute_cmd(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        self.record(ExecutionMethod::Cmd);
        if self.test_mode {
            return Ok(self.test_mode_output(ExecutionMethod::Cmd, command));
        }

        let mut cmd = StdCommand::new("cmd");
        cmd.arg("/C").arg(command).current_dir(working_dir);
        let output = run_with_timeout(&mut cmd, timeout)
            .with_context(|| format!("failed to execute via cmd.exe: {command}"))?;

        Ok(CommandOutput {
            status: CommandStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run `command` through Windows PowerShell, non-interactively and
    /// without loading the user profile, killing it if it outlives `timeout`.
    pub fn execute_powershell(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        self.record(ExecutionMethod::PowerShell);
        if self.test_mode {
            return Ok(self.test_mode_output(ExecutionMethod::PowerShell, command));
        }

        let mut cmd = StdCommand::new("powershell");
        cmd.arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(command)
            .current_dir(working_dir);
        let output = run_with_timeout(&mut cmd, timeout)
            .with_context(|| format!("failed to execute via powershell: {command}"))?;

        Ok(CommandOutput {
            status: CommandStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run `command` through the discovered Git Bash binary, killing it if it
    /// outlives `timeout`.
    pub fn execute_bash(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        self.record(ExecutionMethod::Bash);
        if self.test_mode {
            return Ok(self.test_mode_output(ExecutionMethod::Bash, command));
        }

        let bash_path = self
            .capability(Capability::GitBash)
            .path
            .ok_or_else(|| anyhow!("Git Bash is not available on this host"))?;

        let mut cmd = StdCommand::new(bash_path);
        cmd.arg("-c").arg(command).current_dir(working_dir);
        let output = run_with_timeout(&mut cmd, timeout)
            .with_context(|| format!("failed to execute via Git Bash: {command}"))?;

        Ok(CommandOutput {
            status: CommandStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run a native Windows port of a GNU utility directly, bypassing every
    /// shell layer. Killed if it outlives `timeout`.
    pub fn execute_native(
        &self,
        capability: Capability,
        args: &[String],
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        self.record(ExecutionMethod::Native);
        let rendered = format!("{} {}", capability.binary_name(), args.join(" "));
        if self.test_mode {
            return Ok(self.test_mode_output(ExecutionMethod::Native, &rendered));
        }

        let info = self.capability(capability);
        if !info.available {
            bail!(
                "native binary `{}` is not available on this host",
                capability.binary_name()
            );
        }
        let binary = info.path.ok_or_else(|| {
            anyhow!(
                "native binary `{}` has no resolved path",
                capability.binary_name()
            )
        })?;

        let mut cmd = StdCommand::new(binary);
        cmd.args(args).current_dir(working_dir);
        let output = run_with_timeout(&mut cmd, timeout)
            .with_context(|| format!("failed to execute native binary: {rendered}"))?;

        Ok(CommandOutput {
            status: CommandStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod execution_engine_tests {
    use super::*;

    #[test]
    fn test_mode_short_circuits_every_method() {
        let engine = ExecutionEngine::test_mode();
        let dir = Path::new(".");
        let timeout = Duration::from_secs(30);

        let cmd_out = engine.execute_cmd("dir", dir, timeout).unwrap();
        assert!(cmd_out.status.success());
        let ps_out = engine
            .execute_powershell("Get-ChildItem", dir, timeout)
            .unwrap();
        assert!(ps_out.status.success());
        let bash_out = engine.execute_bash("ls", dir, timeout).unwrap();
        assert!(bash_out.status.success());
        let native_out = engine
            .execute_native(Capability::NativeGrep, &["foo".to_string()], dir, timeout)
            .unwrap();
        assert!(native_out.status.success());

        let stats = engine.get_stats();
        assert_eq!(stats.cmd, 1);
        assert_eq!(stats.powershell, 1);
        assert_eq!(stats.bash, 1);
        assert_eq!(stats.native, 1);
        assert_eq!(stats.total(), 4);
    }

    #[test]
    fn reset_stats_zeroes_counters() {
        let engine = ExecutionEngine::test_mode();
        engine
            .execute_cmd("ver", Path::new("."), Duration::from_secs(30))
            .unwrap();
        assert_eq!(engine.get_stats().total(), 1);
        engine.reset_stats();
        assert_eq!(engine.get_stats().total(), 0);
    }

    #[test]
    fn test_mode_reports_every_capability_available() {
        let engine = ExecutionEngine::test_mode();
        for capability in Capability::NATIVE_BINS {
            assert!(engine.capability(capability).available);
        }
        assert!(engine.capability(Capability::GitBash).available);
    }
}
