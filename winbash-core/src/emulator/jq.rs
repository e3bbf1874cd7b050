//! `jq` — simple dot-path filters compiled to PowerShell JSON traversal.
//! Anything beyond a plain `.a.b.c` / `.a[0].b` / `.` path requires native
//! `jq.exe`, per the strategy analyzer.

use super::{EmulatedCommand, quote_if_needed, split_flags};

pub fn jq(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let raw_output = flags.iter().any(|f| f.contains('r'));
    let Some((filter, files)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'jq: missing filter'".to_string());
    };

    let source = match files.first() {
        Some(path) => format!(
            "Get-Content {} -Raw | ConvertFrom-Json",
            quote_if_needed(path)
        ),
        None => "[Console]::In.ReadToEnd() | ConvertFrom-Json".to_string(),
    };

    if !is_simple_path(filter) {
        return EmulatedCommand::powershell(
            "Write-Error 'jq: filter requires native jq.exe'; exit 1".to_string(),
        );
    }

    let accessor = compile_path(filter);
    let converted = format!("($json{accessor})");
    let emit = if raw_output {
        format!("if ({converted} -is [string]) {{ {converted} }} else {{ {converted} | ConvertTo-Json -Compress }}")
    } else {
        format!("{converted} | ConvertTo-Json -Compress")
    };

    EmulatedCommand::powershell(format!("$json = {source}; {emit}"))
}

/// A "simple" jq path is `.`, or a sequence of `.name` and `[N]` segments
/// with no pipes, functions, or object construction.
fn is_simple_path(filter: &str) -> bool {
    let filter = filter.trim();
    if filter == "." {
        return true;
    }
    filter
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '[' | ']'))
        && filter.starts_with('.')
        && !filter.contains("..")
}

fn compile_path(filter: &str) -> String {
    let filter = filter.trim();
    if filter == "." {
        return String::new();
    }
    let mut out = String::new();
    for segment in filter.split('.').skip(1) {
        if segment.is_empty() {
            continue;
        }
        if let Some((name, rest)) = segment.split_once('[') {
            if !name.is_empty() {
                out.push('.');
                out.push_str(name);
            }
            out.push('[');
            out.push_str(rest.trim_end_matches(']'));
            out.push(']');
        } else {
            out.push('.');
            out.push_str(segment);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_dot_path_compiles() {
        let cmd = jq(&[".a.b", "file.json"]);
        assert!(cmd.script.contains(".a.b"));
    }

    #[test]
    fn identity_filter_passes_through() {
        let cmd = jq(&[".", "file.json"]);
        assert!(!cmd.script.contains("requires native"));
    }

    #[test]
    fn complex_filter_requires_native_jq() {
        let cmd = jq(&["map(.a)", "file.json"]);
        assert!(cmd.script.contains("requires native jq.exe"));
    }
}
