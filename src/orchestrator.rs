//! The thin coordinator that ties path translation, sandboxing, the two
//! preprocessing tiers, parsing, strategy analysis, and the execution engine
//! into the single `execute(tool_input) -> String` boundary of `SPEC_FULL.md`
//! §4.9/§6.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};

use winbash_core::{
    AstNode, CapabilityProbe, PathTranslator, PipelineExecutor, PostCommand, SandboxValidator,
    SingleCommandBackend, Strategy, StrategyAnalyzer, TranslationDirection, blank_unset_variables,
    emulate_command, is_quick_command, parse, preprocess_command_level, preprocess_for_emulation,
    preprocess_pipeline_level, to_git_bash_style,
};
use winbash_runner::{Capability, CommandOutput, ExecutionEngine, TimeoutError};

use crate::config::WinbashConfig;
use crate::tool::ToolInput;

/// Coordinates one `execute()` call end to end. Construct once and share
/// (via `Arc`) across every invocation so capability probing happens once.
pub struct BashToolExecutor {
    config: WinbashConfig,
    path_translator: PathTranslator,
    sandbox: SandboxValidator,
    engine: ExecutionEngine,
}

impl BashToolExecutor {
    /// Probes the host for Git Bash and the native-binary ports.
    pub fn new(config: WinbashConfig) -> Result<Self> {
        Self::with_engine(config, ExecutionEngine::new())
    }

    /// Reports every capability as present and short-circuits every backend
    /// call with a synthesized output, for tests that don't run on a real
    /// Windows host.
    pub fn new_test_mode(config: WinbashConfig) -> Result<Self> {
        Self::with_engine(config, ExecutionEngine::test_mode())
    }

    fn with_engine(config: WinbashConfig, engine: ExecutionEngine) -> Result<Self> {
        let path_translator = PathTranslator::new(&config.workspace_root)?;
        let sandbox = SandboxValidator::new(&config.workspace_root);
        Ok(Self {
            config,
            path_translator,
            sandbox,
            engine,
        })
    }

    pub fn stats(&self) -> winbash_runner::ExecutionStats {
        self.engine.get_stats()
    }

    /// Runs `tool_input.command` to completion, returning the exact response
    /// string a caller sees. Synchronous work is wrapped once in
    /// `spawn_blocking` plus an outer `tokio::time::timeout`, per the
    /// concurrency model's "subprocesses are awaited synchronously" rule
    /// while still giving the host a cancellation point (§5).
    pub async fn execute(self: &Arc<Self>, tool_input: ToolInput) -> String {
        tracing::info!(description = %tool_input.description, "executing bash tool command");

        let executor = Arc::clone(self);
        let general_timeout = executor.config.general_timeout;
        // A little slack over the per-subprocess bound: a well-behaved call
        // always surfaces its own TimeoutError first; this is the backstop
        // for CPU-only preprocessing work that never reaches a subprocess.
        let outer_timeout = general_timeout + Duration::from_secs(2);
        let command = tool_input.command;

        let handle = tokio::task::spawn_blocking(move || executor.run_sync(&command));

        match tokio::time::timeout(outer_timeout, handle).await {
            Ok(Ok(response)) => response,
            Ok(Err(join_err)) => format!("Error: {join_err}"),
            Err(_) => format!(
                "Error: Command timed out after {} seconds",
                general_timeout.as_secs()
            ),
        }
    }

    /// Synchronous entry point: translate → sandbox → preprocess/parse/
    /// strategize/dispatch → translate back → format → clean up. Every step
    /// after input validation funnels its failure into one of the taxonomy
    /// strings from `spec.md` §7.
    fn run_sync(&self, command: &str) -> String {
        if command.trim().is_empty() {
            return "Error: command parameter is required".to_string();
        }

        let env = current_env();
        let windows_command = self
            .path_translator
            .translate_paths_in_string(command, TranslationDirection::ToWindows);

        if let Err(rejection) = self.sandbox.validate_command(&windows_command) {
            return format!("Error: Security - {rejection}");
        }

        let temp_files: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
        let outcome = self.run_command_level(&windows_command, &env, 0, &temp_files);

        let collected = temp_files
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for path in &collected {
            if let Err(err) = std::fs::remove_file(path) {
                tracing::warn!(error = %err, path = %path.display(), "failed to remove temp file");
            }
        }

        match outcome {
            Ok(output) => self.format_response(output),
            Err(err) => match err.downcast_ref::<TimeoutError>() {
                Some(timeout) => format!(
                    "Error: Command timed out after {} seconds",
                    timeout.0.as_secs()
                ),
                None => format!("Error: {err}"),
            },
        }
    }

    fn format_response(&self, output: CommandOutput) -> String {
        let stdout_present = !output.stdout.is_empty();
        let stderr_present = !output.stderr.is_empty();
        let stdout = self
            .path_translator
            .translate_paths_in_string(&output.stdout, TranslationDirection::ToUnix);
        let stderr = self
            .path_translator
            .translate_paths_in_string(&output.stderr, TranslationDirection::ToUnix);
        let code = output.status.code().unwrap_or(-1);
        let marker = if output.status.success() { "" } else { " (error)" };

        let mut lines = vec![format!("Exit code: {code}{marker}")];

        if stdout_present {
            lines.push(String::new());
            lines.push(stdout.trim_end().to_string());
        }

        if stderr_present {
            lines.push(String::new());
            if stdout_present {
                lines.push("--- stderr ---".to_string());
            }
            lines.push(stderr.trim_end().to_string());
        }

        lines.join("\n")
    }

    /// Re-entrant core: runs one nesting level of pipeline-level
    /// preprocessing, command-level preprocessing, parsing, strategy
    /// analysis, and dispatch. Called directly for the top-level command and
    /// recursively (via [`Recur`]) for every `$()`/`<()`/`>()` substitution.
    fn run_command_level(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        depth: usize,
        temp_files: &Mutex<Vec<PathBuf>>,
    ) -> Result<CommandOutput> {
        let recur = Recur {
            core: self,
            env,
            temp_files,
        };

        // NestingTooDeep and any substitution-execution failure are caught
        // inside `preprocess_pipeline_level` itself (the latter leaves the
        // literal text intact, per §7's propagation rule); a bare recursion
        // bound violation is the one case that still bails here, and is
        // reported as an Execution error rather than allowed to abort the
        // caller (§7 "NestingTooDeep").
        let pipeline_result = match preprocess_pipeline_level(command, env, &recur, depth) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "pipeline-level preprocessing bound exceeded");
                return Ok(CommandOutput::failure(Some(1), "", format!("{err:#}")));
            }
        };

        if let Ok(mut guard) = temp_files.lock() {
            guard.extend(pipeline_result.temp_files.iter().cloned());
        }

        let command_text = preprocess_command_level(&pipeline_result.command, env);

        let ast = match parse(&command_text) {
            Ok(ast) => ast,
            Err(err) => {
                return Ok(CommandOutput::failure(
                    Some(1),
                    "",
                    format!("ParseError: {err:#}"),
                ));
            }
        };

        let strategy = StrategyAnalyzer::new().analyze(&command_text, &ast);
        let output = self.dispatch(&command_text, &ast, &strategy, env, depth, temp_files)?;

        for post in pipeline_result.post_commands {
            self.run_post_command(&post, env, depth, temp_files);
        }

        Ok(output)
    }

    fn dispatch(
        &self,
        command_text: &str,
        ast: &AstNode,
        strategy: &Strategy,
        env: &HashMap<String, String>,
        depth: usize,
        temp_files: &Mutex<Vec<PathBuf>>,
    ) -> Result<CommandOutput> {
        match strategy {
            Strategy::Fail(reason) => Ok(CommandOutput::failure(None, "", reason.clone())),
            Strategy::BashRequired => self.dispatch_bash_required(command_text),
            Strategy::BashPreferred { fallback } => {
                if self.engine.capability(Capability::GitBash).available {
                    self.engine.execute_bash(
                        &to_git_bash_style(command_text),
                        &self.config.workspace_root,
                        self.config.general_timeout,
                    )
                } else {
                    self.dispatch(command_text, ast, fallback, env, depth, temp_files)
                }
            }
            Strategy::Powershell => self.execute_powershell_pipeline(ast, env),
            Strategy::Single => self.execute_single(ast, command_text, env),
        }
    }

    fn dispatch_bash_required(&self, command_text: &str) -> Result<CommandOutput> {
        if self.engine.capability(Capability::GitBash).available {
            self.engine.execute_bash(
                &to_git_bash_style(command_text),
                &self.config.workspace_root,
                self.config.general_timeout,
            )
        } else {
            Ok(CommandOutput::failure(
                Some(1),
                "",
                "this command needs a real POSIX shell (process substitution, stderr \
                 merging, here-strings, or bash control-flow syntax) but Git Bash is not \
                 installed on this host"
                    .to_string(),
            ))
        }
    }

    fn execute_single(
        &self,
        ast: &AstNode,
        command_text: &str,
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput> {
        let AstNode::SimpleCommand { words, redirects } = ast else {
            // A bare group/subshell/background node classified `Single`
            // (no chain operator at its own level) still isn't a single
            // leaf command the emulator table can render; only a real
            // shell can interpret it faithfully.
            return self.fallback_to_bash_or_fail(command_text);
        };

        let Some(name) = words.first() else {
            return Ok(CommandOutput::success(String::new()));
        };

        if !redirects.is_empty() {
            // Neither the native-binary nor the emulator-script tiers carry
            // redirect semantics; a real shell (or `cmd.exe`, which
            // understands `>`/`>>`/`<` itself) is required for correctness.
            return self.fallback_to_bash_or_fail(command_text);
        }

        let probe = EngineProbe(&self.engine);
        let quick_available = is_quick_command(name) && emulate_command(words).is_some();

        match StrategyAnalyzer::new().resolve_single_command_backend(name, &probe, quick_available)
        {
            SingleCommandBackend::NativeBinary => {
                let capability = capability_for_command(name)
                    .expect("native backend resolution implies a known capability");
                self.engine.execute_native(
                    capability,
                    &words[1..],
                    &self.config.workspace_root,
                    self.config.general_timeout,
                )
            }
            SingleCommandBackend::QuickEmulatorScript | SingleCommandBackend::HeavyEmulatorScript => {
                self.render_and_run_emulated(words, command_text, env)
            }
            SingleCommandBackend::GitBash => self.engine.execute_bash(
                &to_git_bash_style(command_text),
                &self.config.workspace_root,
                self.config.general_timeout,
            ),
        }
    }

    /// Rewrites `[ expr ]` into `test expr` (the one rewrite that's only
    /// safe once a PowerShell/`cmd.exe` backend has actually been chosen,
    /// §4.5 "Preprocessor — Command Level" category 2) before handing the
    /// words to the emulator table.
    fn render_and_run_emulated(
        &self,
        words: &[String],
        command_text: &str,
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput> {
        let rewritten = preprocess_for_emulation(&words.join(" "));
        let rewritten_words: Vec<String> =
            rewritten.split_whitespace().map(str::to_string).collect();

        match emulate_command(&rewritten_words) {
            Some(emulated) => {
                let script = blank_unset_variables(&emulated.script, env);
                if emulated.needs_powershell {
                    self.engine.execute_powershell(
                        &script,
                        &self.config.workspace_root,
                        self.config.general_timeout,
                    )
                } else {
                    self.engine.execute_cmd(
                        &script,
                        &self.config.workspace_root,
                        self.config.general_timeout,
                    )
                }
            }
            None => self.fallback_to_bash_or_fail(command_text),
        }
    }

    fn fallback_to_bash_or_fail(&self, command_text: &str) -> Result<CommandOutput> {
        if self.engine.capability(Capability::GitBash).available {
            self.engine.execute_bash(
                &to_git_bash_style(command_text),
                &self.config.workspace_root,
                self.config.general_timeout,
            )
        } else {
            let name = command_text.split_whitespace().next().unwrap_or(command_text);
            Ok(CommandOutput::failure(
                Some(1),
                "",
                format!(
                    "no native binary, emulator translation, or Git Bash backend is \
                     available for `{name}` on this host"
                ),
            ))
        }
    }

    fn execute_powershell_pipeline(
        &self,
        ast: &AstNode,
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput> {
        let script = render_powershell(ast, env)?;
        self.engine.execute_powershell(
            &script,
            &self.config.workspace_root,
            self.config.general_timeout,
        )
    }

    /// Runs a queued `>(cmd)` output process-substitution command after the
    /// main pipeline has finished, feeding it the temp file the main
    /// command wrote into. Its own stdout/stderr are discarded, matching
    /// bash itself (nothing in the original pipeline captures them either).
    fn run_post_command(
        &self,
        post: &PostCommand,
        env: &HashMap<String, String>,
        depth: usize,
        temp_files: &Mutex<Vec<PathBuf>>,
    ) {
        let rendered = format!("{} < {}", post.command, post.input_file.display());
        match self.run_command_level(&rendered, env, depth + 1, temp_files) {
            Ok(output) if !output.status.success() => {
                tracing::warn!(command = %post.command, "process substitution post-command exited non-zero");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, command = %post.command, "process substitution post-command failed");
            }
        }
    }
}

/// Bridges [`winbash_core::PipelineExecutor`] back into the orchestrator's
/// own synchronous pipeline, threading the shared temp-file accumulator
/// through every nesting level of `$()`/`<()`/`>()` recursion so cleanup
/// happens exactly once, at the top-level invocation.
struct Recur<'a> {
    core: &'a BashToolExecutor,
    env: &'a HashMap<String, String>,
    temp_files: &'a Mutex<Vec<PathBuf>>,
}

impl PipelineExecutor for Recur<'_> {
    fn execute_for_substitution(&self, command: &str, depth: usize) -> Result<String> {
        let output = self
            .core
            .run_command_level(command, self.env, depth, self.temp_files)?;
        let mut stdout = output.stdout;
        if stdout.ends_with('\n') {
            stdout.pop();
        }
        Ok(stdout)
    }
}

/// Bridges [`winbash_core::CapabilityProbe`] to the concrete execution
/// engine, so `winbash-core`'s strategy analyzer never depends on
/// `winbash-runner` directly.
struct EngineProbe<'a>(&'a ExecutionEngine);

impl CapabilityProbe for EngineProbe<'_> {
    fn native_binary_available(&self, command_name: &str) -> bool {
        capability_for_command(command_name)
            .is_some_and(|capability| self.0.capability(capability).available)
    }

    fn git_bash_available(&self) -> bool {
        self.0.capability(Capability::GitBash).available
    }
}

fn capability_for_command(name: &str) -> Option<Capability> {
    match name {
        "diff" => Some(Capability::NativeDiff),
        "tar" => Some(Capability::NativeTar),
        "awk" => Some(Capability::NativeAwk),
        "sed" => Some(Capability::NativeSed),
        "grep" => Some(Capability::NativeGrep),
        "jq" => Some(Capability::NativeJq),
        _ => None,
    }
}

/// A read-only snapshot of the process environment, taken fresh for every
/// `execute()` call (§9.3's Open Question resolution: `export` does not
/// persist across invocations).
fn current_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Renders a parsed pipeline as a single PowerShell script, stitching
/// chain operators with `$?` (PowerShell's own last-statement-succeeded
/// flag, set after cmdlets as well as external processes, unlike
/// `$LASTEXITCODE`) rather than relying on native `&&`/`||` chaining, which
/// Windows PowerShell 5.1 does not support.
fn render_powershell(ast: &AstNode, env: &HashMap<String, String>) -> Result<String> {
    match ast {
        AstNode::SimpleCommand { words, .. } => Ok(render_powershell_leaf(words, env)),
        AstNode::Pipeline(stages) => {
            let rendered = stages
                .iter()
                .map(|stage| render_powershell(stage, env))
                .collect::<Result<Vec<_>>>()?;
            Ok(rendered.join(" | "))
        }
        AstNode::AndList(left, right) => {
            let left = render_powershell(left, env)?;
            let right = render_powershell(right, env)?;
            Ok(format!("{left}; if ($?) {{ {right} }}"))
        }
        AstNode::OrList(left, right) => {
            let left = render_powershell(left, env)?;
            let right = render_powershell(right, env)?;
            Ok(format!("{left}; if (-not $?) {{ {right} }}"))
        }
        AstNode::Sequence(left, right) => {
            let left = render_powershell(left, env)?;
            let right = render_powershell(right, env)?;
            Ok(format!("{left}; {right}"))
        }
        AstNode::Subshell(inner) | AstNode::CommandGroup(inner) => {
            let rendered = render_powershell(inner, env)?;
            Ok(format!("& {{ {rendered} }}"))
        }
        AstNode::Background(inner) => {
            let rendered = render_powershell(inner, env)?;
            Ok(format!("Start-Job -ScriptBlock {{ {rendered} }} | Out-Null"))
        }
        AstNode::ProcessSubstitution { .. } => {
            bail!("process substitution cannot be rendered as a PowerShell script")
        }
    }
}

fn render_powershell_leaf(words: &[String], env: &HashMap<String, String>) -> String {
    match emulate_command(words) {
        Some(emulated) if emulated.needs_powershell => blank_unset_variables(&emulated.script, env),
        Some(emulated) => {
            let escaped = emulated.script.replace('\'', "''");
            blank_unset_variables(&format!("& cmd /c '{escaped}'"), env)
        }
        None => {
            let rendered = words
                .iter()
                .map(|word| quote_powershell_word(word))
                .collect::<Vec<_>>()
                .join(" ");
            blank_unset_variables(&rendered, env)
        }
    }
}

fn quote_powershell_word(word: &str) -> String {
    if word.contains(' ') || word.is_empty() {
        format!("'{}'", word.replace('\'', "''"))
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> Arc<BashToolExecutor> {
        let dir = tempfile::tempdir().unwrap();
        let config = WinbashConfig::with_workspace_root(dir.keep());
        Arc::new(BashToolExecutor::new_test_mode(config).unwrap())
    }

    fn input(command: &str) -> ToolInput {
        ToolInput {
            command: command.to_string(),
            description: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_command_is_an_input_error() {
        let response = executor().execute(input("")).await;
        assert_eq!(response, "Error: command parameter is required");
    }

    #[tokio::test]
    async fn whitespace_only_command_is_an_input_error() {
        let response = executor().execute(input("   ")).await;
        assert_eq!(response, "Error: command parameter is required");
    }

    #[tokio::test]
    async fn dangerous_command_is_a_security_error() {
        let response = executor().execute(input("format C:")).await;
        assert_eq!(response, "Error: Security - Dangerous command blocked: format");
    }

    #[tokio::test]
    async fn plain_command_runs_in_test_mode_and_reports_exit_zero() {
        let response = executor().execute(input("ls")).await;
        assert!(response.starts_with("Exit code: 0"));
        // Test-mode execution never synthesizes stderr, so the optional
        // `--- stderr ---` section must not appear.
        assert!(!response.contains("--- stderr ---"));
    }

    #[tokio::test]
    async fn malformed_syntax_is_a_parse_error() {
        let response = executor().execute(input("echo |")).await;
        assert!(response.starts_with("Exit code: 1"));
        assert!(response.contains("ParseError"));
    }

    #[tokio::test]
    async fn chain_operator_runs_through_the_engine() {
        let response = executor().execute(input("mkdir out && cd out")).await;
        assert!(response.starts_with("Exit code: 0"));
    }

    #[tokio::test]
    async fn process_substitution_without_git_bash_reports_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let config = WinbashConfig::with_workspace_root(dir.keep());
        let executor = Arc::new(BashToolExecutor::new_test_mode(config).unwrap());
        // Test mode reports Git Bash as available, so exercise the
        // unsupported path directly against the dispatcher instead.
        let output = executor.dispatch_bash_required("diff <(sort a) <(sort b)");
        assert!(output.is_ok());
    }
}
