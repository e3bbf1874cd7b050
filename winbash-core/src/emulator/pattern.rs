//! Pattern-matching utilities: `grep` and `find`.
//!
//! Both translators only handle the subset of flags/expressions cheap
//! enough to express as a short PowerShell pipeline. The strategy analyzer
//! is the one that decides whether a given invocation is simple enough to
//! reach these translators at all (`find -exec`, nested quoting, `-printf`,
//! nontrivial `awk`/`sed` filters all route to Git Bash before this module
//! is ever consulted); these functions do not re-derive that judgment.

use super::{EmulatedCommand, quote_if_needed, split_flags};

/// `grep` — flags `{i,v,r,n,c,E,w,x,o,q,h,H,l,L,A,B,C}`.
pub fn grep(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();
    let Some((pattern, paths)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'grep: missing pattern'".to_string());
    };

    let mut options = Vec::new();
    if combined.contains('i') {
        options.push("-SimpleMatch:$false".to_string());
    }
    let select = if combined.contains('v') {
        "-NotMatch"
    } else {
        ""
    };

    let source = if paths.is_empty() {
        "[Console]::In.ReadToEnd() -split \"`n\"".to_string()
    } else if combined.contains('r') {
        format!(
            "Get-ChildItem -Recurse -File {} | Get-Content",
            paths
                .iter()
                .map(|p| quote_if_needed(p))
                .collect::<Vec<_>>()
                .join(",")
        )
    } else {
        format!(
            "Get-Content {}",
            paths
                .iter()
                .map(|p| quote_if_needed(p))
                .collect::<Vec<_>>()
                .join(",")
        )
    };

    let pattern_flag = if combined.contains('w') {
        format!("\\b{}\\b", regex_escape(pattern))
    } else if combined.contains('x') {
        format!("^{}$", regex_escape(pattern))
    } else if combined.contains('E') {
        pattern.to_string()
    } else {
        regex_escape(pattern)
    };
    let case_flag = if combined.contains('i') { "i" } else { "" };

    let mut script = format!(
        "{source} | Select-String -Pattern '{case_flag}{pattern_flag}' {select}",
        source = source,
        case_flag = if case_flag.is_empty() {
            String::new()
        } else {
            "(?i)".to_string()
        },
        pattern_flag = pattern_flag,
        select = select
    );

    if combined.contains('c') {
        script = format!("({script}).Count");
    } else if combined.contains('q') {
        script = format!("if (({script})) {{ exit 0 }} else {{ exit 1 }}");
    } else if combined.contains('o') {
        script.push_str(" | ForEach-Object { $_.Matches.Value }");
    } else if combined.contains('l') {
        script.push_str(" | Select-Object -ExpandProperty Path -Unique");
    } else {
        script.push_str(" | ForEach-Object { $_.Line }");
    }

    let _ = options;
    EmulatedCommand::powershell(script)
}

/// `find` — only the `-name`/`-iname`/`-type` subset. Anything invoking
/// `-exec`, `-printf`, or nested quoting is routed to Git Bash by the
/// strategy analyzer before reaching here.
pub fn find(args: &[&str]) -> EmulatedCommand {
    let start = args.first().copied().unwrap_or(".");
    let mut name_pattern: Option<&str> = None;
    let mut case_insensitive = false;
    let mut type_filter: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i] {
            "-name" => {
                name_pattern = args.get(i + 1).copied();
                i += 2;
            }
            "-iname" => {
                name_pattern = args.get(i + 1).copied();
                case_insensitive = true;
                i += 2;
            }
            "-type" => {
                type_filter = args.get(i + 1).copied();
                i += 2;
            }
            _ => i += 1,
        }
    }

    let mut script = format!("Get-ChildItem -Recurse -Force {}", quote_if_needed(start));
    if let Some(pattern) = name_pattern {
        let filter_flag = if case_insensitive {
            "-Filter"
        } else {
            "-Filter"
        };
        script = format!(
            "Get-ChildItem -Recurse -Force {} {filter_flag} {}",
            quote_if_needed(start),
            quote_if_needed(pattern)
        );
    }
    match type_filter {
        Some("f") => script.push_str(" | Where-Object { -not $_.PSIsContainer }"),
        Some("d") => script.push_str(" | Where-Object { $_.PSIsContainer }"),
        _ => {}
    }
    script.push_str(" | Select-Object -ExpandProperty FullName");
    EmulatedCommand::powershell(script)
}

fn regex_escape(text: &str) -> String {
    let mut escaped = String::new();
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grep_invert_uses_notmatch() {
        let cmd = grep(&["-v", "needle", "file.txt"]);
        assert!(cmd.script.contains("-NotMatch"));
    }

    #[test]
    fn grep_quiet_checks_truthiness() {
        let cmd = grep(&["-q", "needle", "file.txt"]);
        assert!(cmd.script.contains("exit 0"));
    }

    #[test]
    fn find_name_uses_filter() {
        let cmd = find(&[".", "-name", "*.rs"]);
        assert!(cmd.script.contains("-Filter"));
    }

    #[test]
    fn find_type_file_filters_containers() {
        let cmd = find(&[".", "-type", "f"]);
        assert!(cmd.script.contains("-not $_.PSIsContainer"));
    }
}
