//! Per-utility translators from a Unix command invocation to a PowerShell
//! (or, for a handful of commands, plain `cmd.exe`) script that reproduces
//! its behavior closely enough for interactive and scripted use.
//!
//! Each translator takes the command's already-preprocessed argument words
//! (aliases, tilde, variables, and braces already expanded; paths already
//! rewritten to real Windows locations) and renders a script body. None of
//! these functions spawn anything themselves — [`winbash_runner`] does that
//! once a backend has been chosen.

mod archive;
mod checksum;
mod file_ops;
mod jq;
mod net;
mod pattern;
mod system;
mod text;

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// The rendered result of translating one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatedCommand {
    /// The script body to execute.
    pub script: String,
    /// `true` if `script` must run under `powershell.exe -Command`; `false`
    /// if it is plain enough to hand to `cmd.exe` directly.
    pub needs_powershell: bool,
}

impl EmulatedCommand {
    fn powershell(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            needs_powershell: true,
        }
    }

    fn cmd(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            needs_powershell: false,
        }
    }
}

/// Commands with a short (roughly sub-20-line), self-contained PowerShell
/// translation — the strategy analyzer's "quick emulator script" tier beats
/// falling through to Git Bash or a heavier script for these.
static QUICK_COMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "pwd", "whoami", "hostname", "true", "false", "echo", "env", "printenv", "export",
        "basename", "dirname", "readlink", "realpath", "touch", "mkdir", "rm", "cd", "sleep",
        "which", "yes", "cat",
    ]
    .into_iter()
    .collect()
});

pub fn is_quick_command(name: &str) -> bool {
    QUICK_COMMANDS.contains(name)
}

/// Translates one command invocation, dispatching on its leading word.
/// Returns `None` for a command name this emulator has no translator for —
/// the caller falls back to Git Bash or fails the command, per the
/// strategy analyzer's leaf priority order.
pub fn emulate_command(words: &[String]) -> Option<EmulatedCommand> {
    let (name, args) = words.split_first()?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let args = args.as_slice();

    match name.as_str() {
        "ls" => Some(file_ops::ls(args)),
        "cat" => Some(file_ops::cat(args)),
        "cd" => Some(file_ops::cd(args)),
        "pwd" => Some(file_ops::pwd()),
        "chmod" => Some(file_ops::chmod(args)),
        "chown" => Some(file_ops::chown(args)),
        "cp" => Some(file_ops::cp(args)),
        "mv" => Some(file_ops::mv(args)),
        "rm" => Some(file_ops::rm(args)),
        "mkdir" => Some(file_ops::mkdir(args)),
        "touch" => Some(file_ops::touch(args)),
        "ln" => Some(file_ops::ln(args)),
        "readlink" => Some(file_ops::readlink(args)),
        "realpath" => Some(file_ops::realpath(args)),
        "basename" => Some(file_ops::basename(args)),
        "dirname" => Some(file_ops::dirname(args)),
        "df" => Some(file_ops::df(args)),
        "du" => Some(file_ops::du(args)),
        "file" => Some(file_ops::file_cmd(args)),
        "test" | "[" => Some(file_ops::test_cmd(args)),

        "grep" => Some(pattern::grep(args)),
        "find" => Some(pattern::find(args)),

        "sort" => Some(text::sort(args)),
        "uniq" => Some(text::uniq(args)),
        "cut" => Some(text::cut(args)),
        "tr" => Some(text::tr(args)),
        "head" => Some(text::head(args)),
        "tail" => Some(text::tail(args)),
        "wc" => Some(text::wc(args)),
        "paste" => Some(text::paste(args)),
        "column" => Some(text::column(args)),
        "comm" => Some(text::comm(args)),
        "join" => Some(text::join(args)),
        "hexdump" => Some(text::hexdump(args)),
        "strings" => Some(text::strings(args)),
        "sed" => Some(text::sed(args)),
        "awk" => Some(text::awk(args)),
        "tee" => Some(text::tee(args)),
        "yes" => Some(text::yes(args)),
        "echo" => Some(text::echo(args)),
        "split" => Some(text::split(args)),
        "diff" => Some(text::diff(args)),

        "tar" => Some(archive::tar(args)),
        "gzip" => Some(archive::gzip(args)),
        "gunzip" => Some(archive::gunzip(args)),
        "zip" => Some(archive::zip(args)),
        "unzip" => Some(archive::unzip(args)),

        "ps" => Some(system::ps(args)),
        "kill" => Some(system::kill(args)),
        "sleep" => Some(system::sleep(args)),
        "timeout" => Some(system::timeout(args)),
        "watch" => Some(system::watch(args)),
        "date" => Some(system::date(args)),
        "hostname" => Some(system::hostname()),
        "whoami" => Some(system::whoami()),
        "env" => Some(system::env_cmd(args)),
        "export" => Some(system::export(args)),
        "printenv" => Some(system::printenv(args)),
        "true" => Some(system::true_cmd()),
        "false" => Some(system::false_cmd()),
        "which" => Some(system::which(args)),

        "curl" => Some(net::curl(args)),
        "wget" => Some(net::wget(args)),

        "md5sum" => Some(checksum::md5sum(args)),
        "sha1sum" => Some(checksum::sha1sum(args)),
        "sha256sum" => Some(checksum::sha256sum(args)),
        "base64" => Some(checksum::base64(args)),

        "jq" => Some(jq::jq(args)),

        // Windows installs of Python ship `python.exe`, not `python3.exe`;
        // rewrite the command name and pass every argument through verbatim
        // rather than adding a dedicated translator for an interpreter we
        // otherwise don't emulate.
        "python3" => Some(python3_passthrough(args)),

        _ => None,
    }
}

fn python3_passthrough(args: &[&str]) -> EmulatedCommand {
    let mut words = vec!["python".to_string()];
    words.extend(args.iter().map(|arg| quote_if_needed(arg)));
    EmulatedCommand::cmd(words.join(" "))
}

/// Joins argument words for embedding in a PowerShell script, quoting any
/// word that contains whitespace. Shared by every translator submodule.
pub(crate) fn quote_if_needed(word: &str) -> String {
    if word.contains(' ') || word.is_empty() {
        format!("'{}'", word.replace('\'', "''"))
    } else {
        word.to_string()
    }
}

/// Splits `args` into flags (leading with `-`) and positional operands, in
/// first-flags-then-operands order as virtually every one of these
/// utilities expects (no GNU-style flag/operand interleaving support).
pub(crate) fn split_flags<'a>(args: &[&'a str]) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    let mut operands_started = false;
    for &arg in args {
        if !operands_started && arg.starts_with('-') && arg.len() > 1 {
            flags.push(arg);
        } else {
            operands_started = true;
            operands.push(arg);
        }
    }
    (flags, operands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_known_command() {
        let words = vec!["pwd".to_string()];
        assert!(emulate_command(&words).is_some());
    }

    #[test]
    fn returns_none_for_unknown_command() {
        let words = vec!["some-unheard-of-tool".to_string()];
        assert!(emulate_command(&words).is_none());
    }

    #[test]
    fn rewrites_python3_to_python() {
        let words = vec!["python3".to_string(), "-c".to_string(), "print(1)".to_string()];
        let emulated = emulate_command(&words).unwrap();
        assert!(!emulated.needs_powershell);
        assert_eq!(emulated.script, "python -c print(1)");
    }

    #[test]
    fn quick_command_set_matches_dispatch_table() {
        assert!(is_quick_command("pwd"));
        assert!(!is_quick_command("awk"));
    }
}
