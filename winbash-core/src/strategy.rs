//! Execution backend selection: given a parsed command, decide whether it
//! needs a real POSIX shell, prefers one but can fall back, is best served
//! by a PowerShell emulation script, or is simple enough to run as a single
//! native/`cmd.exe` invocation.
//!
//! The decision tree runs top-down and stops at the first rule that fires:
//! process substitution → stderr-merge redirection → chain operators →
//! pattern table → known bash-preferred utilities → [`Strategy::Single`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::AstNode;

/// The chosen backend for a whole command pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Only a real POSIX shell can run this; Git Bash is mandatory and
    /// there is no PowerShell fallback (e.g. process substitution).
    BashRequired,
    /// Git Bash is the preferred backend, but `fallback` is usable if Git
    /// Bash isn't available on this host.
    BashPreferred { fallback: Box<Strategy> },
    /// Render the whole pipeline as a PowerShell script.
    Powershell,
    /// Simple enough to resolve per-command via
    /// [`StrategyAnalyzer::resolve_single_command_backend`].
    Single,
    /// Cannot be executed by any backend; carries the reason.
    Fail(String),
}

/// Backend chosen for one already-`Single`-classified command, in the
/// upstream's priority order: a native binary port beats a short emulator
/// script beats Git Bash (unless the command is blacklisted there) beats a
/// full PowerShell emulator script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleCommandBackend {
    NativeBinary,
    QuickEmulatorScript,
    GitBash,
    HeavyEmulatorScript,
}

/// Abstracts host capability queries the analyzer needs to resolve a leaf
/// command's backend, so this crate never depends on `winbash-runner`
/// directly — the orchestrator supplies an implementation backed by its
/// `winbash_runner::ExecutionEngine`.
pub trait CapabilityProbe {
    fn native_binary_available(&self, command_name: &str) -> bool;
    fn git_bash_available(&self) -> bool;
}

/// Commands that misbehave or are simply unavailable under Git Bash on
/// Windows (they depend on a real Linux init system or network stack), so
/// Git Bash is skipped in favor of the heavy PowerShell emulator for them
/// even when Git Bash is installed.
const GIT_BASH_BLACKLIST: &[&str] = &["systemctl", "apt", "yum", "iptables", "mount", "ifconfig"];

/// Utilities whose semantics are subtle enough (globbing, quoting, process
/// substitution-adjacent idioms) that Git Bash is preferred over a
/// PowerShell rewrite whenever it's available, with PowerShell only as a
/// fallback if Git Bash isn't installed.
const BASH_EXE_PREFERRED: &[&str] = &["awk", "sed", "find", "xargs", "rsync"];

static PROCESS_SUBSTITUTION_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[<>]\(").expect("static pattern"));

static STDERR_MERGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"2>&1|&>|\|&").expect("static pattern"));

static HERE_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"<<<").expect("static pattern"));

/// Control-structure keywords the lexer/parser tokenize but treat as opaque
/// words rather than structured control flow (§4.3 "Scope limits"): `if`,
/// `while`, `for`, `case`, and `function` definitions. Any of these route the
/// whole command to [`Strategy::BashRequired`] so the orchestrator either
/// hands it to Git Bash verbatim or rejects it with an unsupported-construct
/// error — there is no PowerShell rendering for bash control flow.
static BASH_SYNTAX_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[|\bfunction\b|\blocal\b|\bdeclare\b|\b(?:case|if|while|for)\b\s")
        .expect("static pattern")
});

/// Resolves a parsed command (plus its raw text, for constructs the AST
/// doesn't preserve faithfully enough to regex over) to an execution
/// [`Strategy`].
#[derive(Debug, Default)]
pub struct StrategyAnalyzer;

impl StrategyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, raw_command: &str, ast: &AstNode) -> Strategy {
        if contains_process_substitution(ast) || PROCESS_SUBSTITUTION_WORD.is_match(raw_command) {
            return Strategy::BashRequired;
        }

        if STDERR_MERGE.is_match(raw_command) {
            return Strategy::BashRequired;
        }

        if HERE_STRING.is_match(raw_command) || BASH_SYNTAX_MARKERS.is_match(raw_command) {
            return Strategy::BashRequired;
        }

        if contains_chain_operator(ast) {
            return Strategy::BashPreferred {
                fallback: Box::new(Strategy::Powershell),
            };
        }

        if let Some(name) = ast.leading_command_name() {
            if BASH_EXE_PREFERRED.contains(&name) {
                return Strategy::BashPreferred {
                    fallback: Box::new(Strategy::Single),
                };
            }
        }

        Strategy::Single
    }

    /// Leaf-level backend choice for a command already classified as
    /// [`Strategy::Single`], matching the priority order of the upstream
    /// single-command executor: native `.exe` port, then a short (under
    /// ~20-line) PowerShell emulator script, then Git Bash itself (unless
    /// blacklisted), then the full emulator script as a last resort.
    pub fn resolve_single_command_backend(
        &self,
        command_name: &str,
        probe: &dyn CapabilityProbe,
        quick_emulator_available: bool,
    ) -> SingleCommandBackend {
        if probe.native_binary_available(command_name) {
            return SingleCommandBackend::NativeBinary;
        }
        if quick_emulator_available {
            return SingleCommandBackend::QuickEmulatorScript;
        }
        if probe.git_bash_available() && !GIT_BASH_BLACKLIST.contains(&command_name) {
            return SingleCommandBackend::GitBash;
        }
        SingleCommandBackend::HeavyEmulatorScript
    }
}

fn contains_process_substitution(node: &AstNode) -> bool {
    match node {
        AstNode::SimpleCommand { words, .. } => words
            .iter()
            .any(|w| w.starts_with("<(") || w.starts_with(">(")),
        AstNode::Pipeline(stages) => stages.iter().any(contains_process_substitution),
        AstNode::AndList(left, right)
        | AstNode::OrList(left, right)
        | AstNode::Sequence(left, right) => {
            contains_process_substitution(left) || contains_process_substitution(right)
        }
        AstNode::Subshell(inner) | AstNode::CommandGroup(inner) | AstNode::Background(inner) => {
            contains_process_substitution(inner)
        }
        AstNode::ProcessSubstitution { .. } => true,
    }
}

/// True for any node that chains multiple commands together (`&&`, `||`,
/// `;`, or a multi-stage pipeline) — these are cheap for Git Bash but
/// require stitching several statements together in a PowerShell script.
fn contains_chain_operator(node: &AstNode) -> bool {
    matches!(
        node,
        AstNode::AndList(_, _) | AstNode::OrList(_, _) | AstNode::Sequence(_, _)
    ) || matches!(node, AstNode::Pipeline(stages) if stages.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    struct Probe {
        native: &'static [&'static str],
        git_bash: bool,
    }

    impl CapabilityProbe for Probe {
        fn native_binary_available(&self, command_name: &str) -> bool {
            self.native.contains(&command_name)
        }
        fn git_bash_available(&self) -> bool {
            self.git_bash
        }
    }

    fn analyzer() -> StrategyAnalyzer {
        StrategyAnalyzer::new()
    }

    #[test]
    fn process_substitution_requires_bash() {
        let raw = "diff <(sort a.txt) <(sort b.txt)";
        let ast = parse(raw).unwrap();
        assert_eq!(analyzer().analyze(raw, &ast), Strategy::BashRequired);
    }

    #[test]
    fn stderr_merge_requires_bash() {
        let raw = "build.sh 2>&1 | tee log.txt";
        let ast = parse(raw).unwrap();
        assert_eq!(analyzer().analyze(raw, &ast), Strategy::BashRequired);
    }

    #[test]
    fn here_string_requires_bash() {
        let raw = "grep pattern <<< \"$input\"";
        let ast = parse("grep pattern").unwrap();
        assert_eq!(analyzer().analyze(raw, &ast), Strategy::BashRequired);
    }

    #[test]
    fn control_structure_keywords_require_bash() {
        for raw in ["if true; then echo yes; fi", "while read line; do echo $line; done", "for f in *; do echo $f; done"] {
            let ast = parse(raw).unwrap();
            assert_eq!(analyzer().analyze(raw, &ast), Strategy::BashRequired, "{raw}");
        }
    }

    #[test]
    fn chain_operator_prefers_bash_with_powershell_fallback() {
        let raw = "mkdir out && cd out";
        let ast = parse(raw).unwrap();
        assert_eq!(
            analyzer().analyze(raw, &ast),
            Strategy::BashPreferred {
                fallback: Box::new(Strategy::Powershell)
            }
        );
    }

    #[test]
    fn multi_stage_pipeline_prefers_bash() {
        let raw = "cat file.txt | grep pattern | wc -l";
        let ast = parse(raw).unwrap();
        assert_eq!(
            analyzer().analyze(raw, &ast),
            Strategy::BashPreferred {
                fallback: Box::new(Strategy::Powershell)
            }
        );
    }

    #[test]
    fn bash_preferred_utility_falls_back_to_single() {
        let raw = "awk '{print $1}' file.txt";
        let ast = parse(raw).unwrap();
        assert_eq!(
            analyzer().analyze(raw, &ast),
            Strategy::BashPreferred {
                fallback: Box::new(Strategy::Single)
            }
        );
    }

    #[test]
    fn plain_command_is_single() {
        let raw = "ls -la";
        let ast = parse(raw).unwrap();
        assert_eq!(analyzer().analyze(raw, &ast), Strategy::Single);
    }

    #[test]
    fn single_command_prefers_native_binary() {
        let probe = Probe {
            native: &["diff"],
            git_bash: true,
        };
        assert_eq!(
            analyzer().resolve_single_command_backend("diff", &probe, true),
            SingleCommandBackend::NativeBinary
        );
    }

    #[test]
    fn single_command_prefers_quick_emulator_over_git_bash() {
        let probe = Probe {
            native: &[],
            git_bash: true,
        };
        assert_eq!(
            analyzer().resolve_single_command_backend("pwd", &probe, true),
            SingleCommandBackend::QuickEmulatorScript
        );
    }

    #[test]
    fn single_command_falls_back_to_git_bash() {
        let probe = Probe {
            native: &[],
            git_bash: true,
        };
        assert_eq!(
            analyzer().resolve_single_command_backend("someobscuretool", &probe, false),
            SingleCommandBackend::GitBash
        );
    }

    #[test]
    fn blacklisted_command_skips_git_bash() {
        let probe = Probe {
            native: &[],
            git_bash: true,
        };
        assert_eq!(
            analyzer().resolve_single_command_backend("systemctl", &probe, false),
            SingleCommandBackend::HeavyEmulatorScript
        );
    }

    #[test]
    fn falls_back_to_heavy_emulator_without_git_bash() {
        let probe = Probe {
            native: &[],
            git_bash: false,
        };
        assert_eq!(
            analyzer().resolve_single_command_backend("someobscuretool", &probe, false),
            SingleCommandBackend::HeavyEmulatorScript
        );
    }
}
