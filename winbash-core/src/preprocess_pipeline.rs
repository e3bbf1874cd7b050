//! Pipeline-level preprocessing: the substitutions that require actually
//! *running* something — command substitution, heredocs, and process
//! substitution — each realized here as a Windows temp file, since none of
//! those constructs exist as such on the Windows side of any backend.
//!
//! This module never spawns a process itself; it calls back into a
//! [`PipelineExecutor`] supplied by the orchestrator, which re-enters the
//! full preprocess → parse → strategy → execute flow for the inner command.
//! That keeps `winbash-core` free of any direct process-spawning dependency
//! on `winbash-runner`.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::Builder;

use crate::preprocess_command::expand_variables_only;

/// Upper bound on recursive pipeline-level nesting (`$()` inside `$()`,
/// `<()` inside `<()`, and so on), matching the "Nesting Depth" concern in
/// §4.4 — a command nested deeper than this is rejected rather than risk
/// runaway recursion or an unbounded temp-file count.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

/// Abstracts "run this command and give me its output" so this module can
/// realize `$(...)`/`<(...)`/`>(...)` without depending on `winbash-runner`
/// directly. The orchestrator's implementation re-enters the whole
/// preprocess/parse/strategy/execute pipeline for `command`.
pub trait PipelineExecutor {
    /// Execute `command` for substitution purposes at the given nesting
    /// `depth`, returning its captured stdout. Implementations should strip
    /// exactly one trailing newline, matching `$(...)`'s bash semantics.
    fn execute_for_substitution(&self, command: &str, depth: usize) -> Result<String>;
}

/// Result of one pipeline-level preprocessing pass.
#[derive(Debug)]
pub struct PipelinePreprocessResult {
    /// The command text with every pipeline-level construct replaced.
    pub command: String,
    /// Every temp file created while processing this command. The caller
    /// owns their cleanup once the command has finished executing.
    pub temp_files: Vec<PathBuf>,
    /// Commands queued by `>(cmd)` output process substitution, to be run
    /// (in order) after the main command completes, each consuming the
    /// corresponding temp file as its stdin.
    pub post_commands: Vec<PostCommand>,
}

/// A command queued by `>(cmd)` substitution: run `command` after the main
/// pipeline finishes, feeding it `input_file`'s contents on stdin.
#[derive(Debug)]
pub struct PostCommand {
    pub command: String,
    pub input_file: PathBuf,
}

// The `regex` crate has no backreferences, so the three quoting forms are
// written as separate alternatives rather than `(['"]?)(\w+)\2`.
static HEREDOC_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<<(-)?\s*(?:"(\w+)"|'(\w+)'|(\w+))"#).expect("static pattern"));

/// Runs command substitution, heredoc extraction, and process substitution
/// over `command`, in that order, at nesting `depth`. `env` supplies
/// variable values for expanding unquoted heredoc bodies.
pub fn preprocess_pipeline_level(
    command: &str,
    env: &HashMap<String, String>,
    executor: &dyn PipelineExecutor,
    depth: usize,
) -> Result<PipelinePreprocessResult> {
    if depth > DEFAULT_MAX_NESTING_DEPTH {
        bail!(
            "pipeline nesting depth {depth} exceeds the maximum of {DEFAULT_MAX_NESTING_DEPTH}"
        );
    }

    let mut temp_files = Vec::new();
    let mut post_commands = Vec::new();

    let command = expand_command_substitution(command, executor, depth)?;
    let command = expand_heredocs(&command, env, &mut temp_files)?;
    let command = expand_process_substitution(&command, executor, depth, &mut temp_files, &mut post_commands)?;

    Ok(PipelinePreprocessResult {
        command,
        temp_files,
        post_commands,
    })
}

fn new_temp_file(suffix: &str) -> Result<(PathBuf, std::fs::File)> {
    let file = Builder::new()
        .prefix("winbash-")
        .suffix(suffix)
        .tempfile()
        .context("failed to create temp file for pipeline substitution")?;
    let (file, path) = file.keep().context("failed to persist temp file")?;
    Ok((path, file))
}

/// `$(...)` — balanced-paren scan so nested substitutions parse correctly;
/// `$((...))` arithmetic is recognized and skipped so it survives intact for
/// the command-level arithmetic pass.
fn expand_command_substitution(
    command: &str,
    executor: &dyn PipelineExecutor,
    depth: usize,
) -> Result<String> {
    if depth > DEFAULT_MAX_NESTING_DEPTH {
        bail!("pipeline nesting depth {depth} exceeds the maximum of {DEFAULT_MAX_NESTING_DEPTH}");
    }

    let bytes = command.as_bytes();
    let mut result = String::with_capacity(command.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'(') {
            if bytes.get(i + 2) == Some(&b'(') {
                // `$((` — arithmetic expression, not command substitution.
                // Copy through to the matching `))` untouched.
                let Some(end) = find_arithmetic_end(command, i) else {
                    result.push_str(&command[i..]);
                    break;
                };
                result.push_str(&command[i..end]);
                i = end;
                continue;
            }

            let Some(close) = find_matching_paren(command, i + 1) else {
                // Unbalanced — leave the rest of the string untouched.
                result.push_str(&command[i..]);
                break;
            };
            let inner = &command[i + 2..close];
            // Resolve any nested `$(...)` before handing the text to the
            // executor, so `$(echo $(whoami))` runs `whoami` first.
            let inner = expand_command_substitution(inner, executor, depth + 1)?;
            // A failure here does not abort the outer command (§5
            // "Propagation"): the substitution is left as literal text and
            // the failure is logged, not raised.
            match executor.execute_for_substitution(&inner, depth + 1) {
                Ok(output) => result.push_str(output.trim_end_matches('\n')),
                Err(err) => {
                    tracing::warn!(error = %err, command = inner, "command substitution failed, keeping literal text");
                    result.push_str(&command[i..=close]);
                }
            }
            i = close + 1;
            continue;
        }

        let char_len = utf8_char_len(bytes[i]);
        result.push_str(&command[i..i + char_len]);
        i += char_len;
    }

    Ok(result)
}

fn utf8_char_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

/// Finds the index just past the closing `))` of a `$((...))` expression
/// starting at `start` (the index of `$`).
fn find_arithmetic_end(command: &str, start: usize) -> Option<usize> {
    let bytes = command.as_bytes();
    // Both parens of "$((" are already open; wait for two closes.
    let mut depth = 2i32;
    let mut i = start + 3; // skip past "$(("
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Finds the index of the `)` matching the `(` at `open_paren_index`.
fn find_matching_paren(command: &str, open_paren_index: usize) -> Option<usize> {
    let bytes = command.as_bytes();
    let mut depth = 0i32;
    let mut i = open_paren_index;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// `<<WORD`, `<<-WORD`, `<<"WORD"`, `<<'WORD'` — extracts the body up to a
/// line consisting solely of `WORD`, writes it to a temp file, and replaces
/// the whole heredoc construct with `< <tempfile>`. `<<-` strips leading
/// tabs from every body line and from the terminator line before matching.
/// An unquoted delimiter allows variable expansion of the body; a quoted
/// one (`'WORD'`/`"WORD"`) suppresses it, matching bash's heredoc rules.
fn expand_heredocs(
    command: &str,
    env: &HashMap<String, String>,
    temp_files: &mut Vec<PathBuf>,
) -> Result<String> {
    let Some(captures) = HEREDOC_START.captures(command) else {
        return Ok(command.to_string());
    };

    let whole_match = captures.get(0).expect("group 0 always matches");
    let strip_tabs = captures.get(1).is_some();
    // Exactly one of groups 2/3/4 matches: double-quoted, single-quoted, or
    // bare word. Quoted forms (either quote style) suppress body expansion.
    let quoted = captures.get(2).is_some() || captures.get(3).is_some();
    let word = captures
        .get(2)
        .or_else(|| captures.get(3))
        .or_else(|| captures.get(4))
        .expect("one of the three word alternatives always matches")
        .as_str();

    let after_operator = &command[whole_match.end()..];
    let newline_offset = after_operator
        .find('\n')
        .context("heredoc operator with no following body")?;
    let before_body = &after_operator[..newline_offset];
    let body_and_rest = &after_operator[newline_offset + 1..];

    let mut body = String::new();
    let mut rest_start = 0;
    for line in split_lines_with_ends(body_and_rest) {
        let trimmed = if strip_tabs { line.trim_start_matches('\t') } else { line };
        let terminator_candidate = trimmed.trim_end_matches(['\n', '\r']);
        if terminator_candidate == word {
            rest_start += line.len();
            break;
        }
        body.push_str(trimmed);
        rest_start += line.len();
    }
    let rest = &body_and_rest[rest_start..];

    let body = if quoted {
        body
    } else {
        expand_variables_only(&body, env)
    };

    let (path, file) = new_temp_file(".heredoc")?;
    {
        use std::io::Write;
        let mut file = file;
        file.write_all(body.as_bytes())
            .context("failed to write heredoc body to temp file")?;
    }
    temp_files.push(path.clone());

    let replacement = format!("< {}", path.display());
    let rewritten = format!(
        "{}{}{}{}",
        &command[..whole_match.start()],
        replacement,
        before_body,
        rest
    );

    // A command can carry at most one heredoc body in this implementation;
    // recurse only if a second `<<` marker remains in what's left over.
    if HEREDOC_START.is_match(&rewritten) {
        expand_heredocs(&rewritten, env, temp_files)
    } else {
        Ok(rewritten)
    }
}

fn split_lines_with_ends(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            lines.push(&text[start..=i]);
            start = i + 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// `<(cmd)` and `>(cmd)` — balanced-paren scan (an improvement over a
/// non-nesting regex: `<(grep x <(cat a))` parses correctly here).
/// `<(cmd)` executes eagerly and substitutes a temp file holding its
/// output; `>(cmd)` substitutes an empty temp file for the main command to
/// write into, and queues `cmd` to run afterward consuming that file.
fn expand_process_substitution(
    command: &str,
    executor: &dyn PipelineExecutor,
    depth: usize,
    temp_files: &mut Vec<PathBuf>,
    post_commands: &mut Vec<PostCommand>,
) -> Result<String> {
    let bytes = command.as_bytes();
    let mut result = String::with_capacity(command.len());
    let mut i = 0;

    while i < bytes.len() {
        let is_input = bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'(');
        let is_output = bytes[i] == b'>' && bytes.get(i + 1) == Some(&b'(');

        if is_input || is_output {
            let Some(close) = find_matching_paren(command, i + 1) else {
                result.push_str(&command[i..]);
                break;
            };
            let inner = &command[i + 2..close];

            if is_input {
                let inner = expand_command_substitution(inner, executor, depth + 1)?;
                // As with command substitution, a failed inner command does
                // not abort the outer pipeline; keep `<(...)` literal.
                match executor.execute_for_substitution(&inner, depth + 1) {
                    Ok(output) => {
                        let (path, file) = new_temp_file(".procin")?;
                        {
                            use std::io::Write;
                            let mut file = file;
                            file.write_all(output.as_bytes())
                                .context("failed to write process substitution output to temp file")?;
                        }
                        temp_files.push(path.clone());
                        result.push_str(&path.display().to_string());
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, command = inner, "input process substitution failed, keeping literal text");
                        result.push_str(&command[i..=close]);
                    }
                }
            } else {
                let (path, _file) = new_temp_file(".procout")?;
                temp_files.push(path.clone());
                post_commands.push(PostCommand {
                    command: inner.to_string(),
                    input_file: path.clone(),
                });
                result.push_str(&path.display().to_string());
            }

            i = close + 1;
            continue;
        }

        let char_len = utf8_char_len(bytes[i]);
        result.push_str(&command[i..i + char_len]);
        i += char_len;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticExecutor;

    impl PipelineExecutor for StaticExecutor {
        fn execute_for_substitution(&self, command: &str, _depth: usize) -> Result<String> {
            Ok(match command {
                "echo hi" => "hi\n".to_string(),
                "whoami" => "claude\n".to_string(),
                other => format!("ran: {other}"),
            })
        }
    }

    struct FailingExecutor;

    impl PipelineExecutor for FailingExecutor {
        fn execute_for_substitution(&self, command: &str, _depth: usize) -> Result<String> {
            bail!("no such backend for: {command}")
        }
    }

    fn env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn expands_simple_command_substitution() {
        let result = preprocess_pipeline_level("echo $(echo hi)", &env(), &StaticExecutor, 0).unwrap();
        assert_eq!(result.command, "echo hi");
    }

    #[test]
    fn leaves_arithmetic_untouched() {
        let result = preprocess_pipeline_level("echo $((1+2))", &env(), &StaticExecutor, 0).unwrap();
        assert_eq!(result.command, "echo $((1+2))");
    }

    #[test]
    fn expands_nested_command_substitution() {
        let result =
            preprocess_pipeline_level("echo $(echo $(whoami))", &env(), &StaticExecutor, 0).unwrap();
        assert_eq!(result.command, "echo ran: echo claude");
    }

    #[test]
    fn rejects_excessive_nesting_depth() {
        let err = preprocess_pipeline_level("echo hi", &env(), &StaticExecutor, DEFAULT_MAX_NESTING_DEPTH + 1)
            .unwrap_err();
        assert!(err.to_string().contains("nesting depth"));
    }

    #[test]
    fn failed_substitution_keeps_literal_text_instead_of_aborting() {
        let result =
            preprocess_pipeline_level("echo $(nope) done", &env(), &FailingExecutor, 0).unwrap();
        assert_eq!(result.command, "echo $(nope) done");
    }

    #[test]
    fn extracts_heredoc_body_to_temp_file() {
        let command = "cat <<EOF\nline one\nline two\nEOF\n";
        let result = preprocess_pipeline_level(command, &env(), &StaticExecutor, 0).unwrap();
        assert_eq!(result.temp_files.len(), 1);
        let contents = std::fs::read_to_string(&result.temp_files[0]).unwrap();
        assert_eq!(contents, "line one\nline two\n");
        assert!(result.command.starts_with("cat < "));
    }

    #[test]
    fn dash_heredoc_strips_leading_tabs() {
        let command = "cat <<-EOF\n\tindented\n\tEOF\n";
        let result = preprocess_pipeline_level(command, &env(), &StaticExecutor, 0).unwrap();
        let contents = std::fs::read_to_string(&result.temp_files[0]).unwrap();
        assert_eq!(contents, "indented\n");
    }

    #[test]
    fn quoted_heredoc_delimiter_suppresses_variable_expansion() {
        let mut e = env();
        e.insert("NAME".to_string(), "claude".to_string());
        let command = "cat <<'EOF'\nhello $NAME\nEOF\n";
        let result = preprocess_pipeline_level(command, &e, &StaticExecutor, 0).unwrap();
        let contents = std::fs::read_to_string(&result.temp_files[0]).unwrap();
        assert_eq!(contents, "hello $NAME\n");
    }

    #[test]
    fn unquoted_heredoc_delimiter_expands_variables() {
        let mut e = env();
        e.insert("NAME".to_string(), "claude".to_string());
        let command = "cat <<EOF\nhello $NAME\nEOF\n";
        let result = preprocess_pipeline_level(command, &e, &StaticExecutor, 0).unwrap();
        let contents = std::fs::read_to_string(&result.temp_files[0]).unwrap();
        assert_eq!(contents, "hello claude\n");
    }

    #[test]
    fn input_process_substitution_materializes_output_as_temp_file() {
        let result = preprocess_pipeline_level("diff <(echo hi) file.txt", &env(), &StaticExecutor, 0).unwrap();
        assert_eq!(result.temp_files.len(), 1);
        let contents = std::fs::read_to_string(&result.temp_files[0]).unwrap();
        assert_eq!(contents, "hi\n");
        assert!(!result.command.contains("<("));
    }

    #[test]
    fn output_process_substitution_queues_post_command() {
        let result = preprocess_pipeline_level("tee >(wc -l)", &env(), &StaticExecutor, 0).unwrap();
        assert_eq!(result.post_commands.len(), 1);
        assert_eq!(result.post_commands[0].command, "wc -l");
        assert_eq!(result.temp_files.len(), 1);
    }
}
