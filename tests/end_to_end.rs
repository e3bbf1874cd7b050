//! Exercises the scenarios from `spec.md` §8 end to end through
//! [`BashToolExecutor`], plus the nesting-depth and opaque-compound-AST
//! fallbacks the orchestrator is responsible for on top of them.

use std::path::PathBuf;
use std::sync::Arc;

use winbash::{BashToolExecutor, ToolInput, WinbashConfig};
use winbash_core::path_translator::PathTranslator;

fn executor() -> (Arc<BashToolExecutor>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = WinbashConfig::with_workspace_root(dir.path());
    let executor = Arc::new(BashToolExecutor::new_test_mode(config).unwrap());
    (executor, dir)
}

fn input(command: &str) -> ToolInput {
    ToolInput {
        command: command.to_string(),
        description: "end-to-end test".to_string(),
    }
}

#[tokio::test]
async fn path_round_trip_through_the_virtual_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let translator = PathTranslator::new(dir.path()).unwrap();

    for unix_path in [
        "/home/claude",
        "/home/claude/script.py",
        "/mnt/user-data/uploads/data.csv",
        "/mnt/user-data/outputs/report.pdf",
    ] {
        let windows = translator.to_windows(unix_path).unwrap();
        let back = translator.to_unix(&windows).unwrap();
        assert_eq!(back, unix_path, "round trip failed for {unix_path}");
    }
}

#[tokio::test]
async fn ls_against_the_virtual_home_reports_success_with_no_stderr() {
    let (executor, _dir) = executor();
    let response = executor.execute(input("ls /home/claude")).await;
    assert!(response.starts_with("Exit code: 0"), "{response}");
    let stderr_section = response.split("--- stderr ---").nth(1).unwrap_or("");
    assert!(stderr_section.trim().is_empty(), "{response}");
}

#[tokio::test]
async fn sandbox_blocks_path_outside_workspace_with_the_exact_taxonomy_string() {
    let (executor, _dir) = executor();
    let response = executor.execute(input(r"rm -rf C:\Windows")).await;
    assert_eq!(
        response,
        r"Error: Security - Path outside workspace blocked: C:\Windows"
    );
}

#[tokio::test]
async fn dangerous_command_is_blocked_before_any_backend_runs() {
    let (executor, _dir) = executor();
    let response = executor.execute(input("shutdown /s /t 0")).await;
    assert_eq!(response, "Error: Security - Dangerous command blocked: shutdown");
}

#[tokio::test]
async fn missing_command_parameter_is_an_input_error() {
    let (executor, _dir) = executor();
    assert_eq!(
        executor.execute(input("")).await,
        "Error: command parameter is required"
    );
}

#[tokio::test]
async fn command_substitution_recurses_through_the_orchestrator() {
    let (executor, _dir) = executor();
    let response = executor.execute(input("echo count=$(printf 'x\\ny\\n' | wc -l)")).await;
    assert!(response.starts_with("Exit code: 0"), "{response}");
}

#[tokio::test]
async fn heredoc_temp_file_does_not_survive_the_call() {
    let (executor, _dir) = executor();
    let before: Vec<_> = list_winbash_temp_files();

    let response = executor
        .execute(input("cat <<EOF\nhello\nEOF\n"))
        .await;
    assert!(response.starts_with("Exit code: 0"), "{response}");

    let after = list_winbash_temp_files();
    assert_eq!(
        before, after,
        "a winbash-prefixed temp file leaked past the call"
    );
}

#[tokio::test]
async fn nesting_too_deep_is_reported_as_an_execution_error_not_a_hard_failure() {
    let (executor, _dir) = executor();

    // Nine levels of command substitution, one past the default bound of 8.
    let mut command = "echo hi".to_string();
    for _ in 0..9 {
        command = format!("echo $({command})");
    }

    let response = executor.execute(input(&command)).await;
    assert!(response.starts_with("Exit code: 1"), "{response}");
    assert!(response.to_lowercase().contains("nesting"), "{response}");
}

#[tokio::test]
async fn malformed_pipeline_syntax_is_reported_as_a_parse_error() {
    let (executor, _dir) = executor();
    let response = executor.execute(input("echo |")).await;
    assert!(response.starts_with("Exit code: 1"), "{response}");
    assert!(response.contains("ParseError"), "{response}");
}

#[tokio::test]
async fn a_subshell_reached_as_single_strategy_falls_back_instead_of_misrendering() {
    // `strategy.rs`'s chain-operator check only looks at a node's own
    // top-level variant, so `(echo a; echo b)` is classified `Single` even
    // though its body is a `Sequence`. The orchestrator must not hand this
    // to the single-leaf emulator dispatch as if it were one plain command;
    // in test mode Git Bash is reported available, so it is still run (via
    // the opaque-compound fallback) rather than rejected.
    let (executor, _dir) = executor();
    let response = executor.execute(input("(echo a; echo b)")).await;
    assert!(response.starts_with("Exit code: 0"), "{response}");
}

#[tokio::test]
async fn redirects_on_a_single_command_force_a_real_shell_backend() {
    let (executor, _dir) = executor();
    let response = executor.execute(input("echo hi > out.txt")).await;
    assert!(response.starts_with("Exit code: 0"), "{response}");
}

fn list_winbash_temp_files() -> Vec<PathBuf> {
    let dir = std::env::temp_dir();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("winbash-"))
        })
        .collect()
}
