//! File and directory manipulation: `ls`, `cat`, `cd`, `cp`, `mv`, `rm`,
//! `mkdir`, `touch`, `ln`, `chmod`/`chown`, path-reporting tools, `df`/`du`,
//! `file`, and POSIX `test`.

use super::{EmulatedCommand, quote_if_needed, split_flags};

/// `ls` — the most commonly invoked command in practice, so its flag
/// handling gets full treatment: `-l` (long format), `-a`/`-A` (hidden
/// entries), `-R` (recursive), `-t` (sort by modification time), `-r`
/// (reverse), `-h` (human-readable sizes), combinable as `-la` etc.
pub fn ls(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();

    let mut pipeline = String::from("Get-ChildItem");
    if combined.contains('a') || combined.contains('A') {
        pipeline.push_str(" -Force");
    }
    if combined.contains('R') {
        pipeline.push_str(" -Recurse");
    }
    if let Some(path) = operands.first() {
        pipeline.push(' ');
        pipeline.push_str(&quote_if_needed(path));
    }
    if combined.contains('t') {
        pipeline.push_str(" | Sort-Object LastWriteTime");
        if !combined.contains('r') {
            pipeline.push_str(" -Descending");
        }
    } else if combined.contains('r') {
        pipeline.push_str(" | Sort-Object Name -Descending");
    }

    if combined.contains('l') {
        if combined.contains('h') {
            pipeline.push_str(
                " | Select-Object Mode,LastWriteTime,@{N='Length';E={if($_.PSIsContainer){''}else{'{0:N1}KB' -f ($_.Length/1KB)}}},Name",
            );
        } else {
            pipeline.push_str(" | Select-Object Mode,LastWriteTime,Length,Name");
        }
        pipeline.push_str(" | Format-Table -AutoSize");
    } else {
        pipeline.push_str(" | Select-Object -ExpandProperty Name");
    }

    EmulatedCommand::powershell(pipeline)
}

/// `cat` — `-n` numbers every line, matching GNU `cat -n`'s right-aligned
/// six-column counter.
pub fn cat(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let paths: Vec<String> = operands.iter().map(|p| quote_if_needed(p)).collect();
    let content = if paths.is_empty() {
        "[Console]::In.ReadToEnd()".to_string()
    } else {
        format!("Get-Content {}", paths.join(","))
    };

    if flags.iter().any(|f| f.contains('n')) {
        EmulatedCommand::powershell(format!(
            "$i=0; {content} | ForEach-Object {{ $i++; '{{0,6}}  {{1}}' -f $i,$_ }}"
        ))
    } else {
        EmulatedCommand::powershell(format!("{content} | Write-Output"))
    }
}

pub fn cd(args: &[&str]) -> EmulatedCommand {
    let target = args.first().copied().unwrap_or("~");
    EmulatedCommand::powershell(format!("Set-Location {}", quote_if_needed(target)))
}

pub fn pwd() -> EmulatedCommand {
    EmulatedCommand::powershell("(Get-Location).Path".to_string())
}

/// `chmod` has no real Windows equivalent; only the read-only bit can be
/// toggled, via the `w` permission of the symbolic mode or a numeric mode's
/// owner-write bit.
pub fn chmod(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some((mode, paths)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'chmod: missing operand'".to_string());
    };
    let writable = mode.contains('w') || mode.chars().next().is_some_and(|c| matches!(c, '4'..='7'));
    let readonly_flag = if writable { "$false" } else { "$true" };
    let targets = paths
        .iter()
        .map(|p| quote_if_needed(p))
        .collect::<Vec<_>>()
        .join(",");
    EmulatedCommand::powershell(format!(
        "Set-ItemProperty -Path {targets} -Name IsReadOnly -Value {readonly_flag}"
    ))
}

/// `chown` is a no-op translation on Windows — ownership/ACL changes are
/// out of scope, matching the upstream emulator's stance that this command
/// is accepted but does nothing observable.
pub fn chown(_args: &[&str]) -> EmulatedCommand {
    EmulatedCommand::powershell("$null".to_string())
}

pub fn cp(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let recurse = flags.iter().any(|f| f.contains('r') || f.contains('R'));
    let Some((dest, sources)) = operands.split_last() else {
        return EmulatedCommand::powershell("Write-Error 'cp: missing operand'".to_string());
    };
    let sources = sources
        .iter()
        .map(|p| quote_if_needed(p))
        .collect::<Vec<_>>()
        .join(",");
    let recurse_flag = if recurse { " -Recurse" } else { "" };
    EmulatedCommand::powershell(format!(
        "Copy-Item -Path {sources} -Destination {}{recurse_flag} -Force",
        quote_if_needed(dest)
    ))
}

pub fn mv(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some((dest, sources)) = operands.split_last() else {
        return EmulatedCommand::powershell("Write-Error 'mv: missing operand'".to_string());
    };
    let sources = sources
        .iter()
        .map(|p| quote_if_needed(p))
        .collect::<Vec<_>>()
        .join(",");
    EmulatedCommand::powershell(format!(
        "Move-Item -Path {sources} -Destination {} -Force",
        quote_if_needed(dest)
    ))
}

pub fn rm(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let recurse = flags.iter().any(|f| f.contains('r') || f.contains('R'));
    let force = flags.iter().any(|f| f.contains('f'));
    let targets = operands
        .iter()
        .map(|p| quote_if_needed(p))
        .collect::<Vec<_>>()
        .join(",");
    let mut script = format!("Remove-Item -Path {targets}");
    if recurse {
        script.push_str(" -Recurse");
    }
    if force {
        script.push_str(" -Force");
    } else {
        script.push_str(" -ErrorAction Stop");
    }
    EmulatedCommand::powershell(script)
}

pub fn mkdir(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let targets = operands
        .iter()
        .map(|p| quote_if_needed(p))
        .collect::<Vec<_>>()
        .join(",");
    EmulatedCommand::powershell(format!(
        "New-Item -ItemType Directory -Path {targets} -Force | Out-Null"
    ))
}

pub fn touch(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let targets: Vec<String> = operands.iter().map(|p| quote_if_needed(p)).collect();
    let body = targets
        .iter()
        .map(|p| format!("if (Test-Path {p}) {{ (Get-Item {p}).LastWriteTime = Get-Date }} else {{ New-Item -ItemType File -Path {p} | Out-Null }}"))
        .collect::<Vec<_>>()
        .join("; ");
    EmulatedCommand::powershell(body)
}

/// `ln -s` maps to a directory or file symbolic link; a hard link (no
/// `-s`) uses `New-Item -ItemType HardLink`.
pub fn ln(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let symbolic = flags.iter().any(|f| f.contains('s'));
    let Some([target, link_name]) = operands.get(0..2) else {
        return EmulatedCommand::powershell("Write-Error 'ln: missing operand'".to_string());
    };
    let item_type = if symbolic { "SymbolicLink" } else { "HardLink" };
    EmulatedCommand::powershell(format!(
        "New-Item -ItemType {item_type} -Path {} -Target {}",
        quote_if_needed(link_name),
        quote_if_needed(target)
    ))
}

pub fn readlink(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'readlink: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "(Get-Item {}).Target",
        quote_if_needed(path)
    ))
}

pub fn realpath(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'realpath: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "(Resolve-Path {}).Path",
        quote_if_needed(path)
    ))
}

pub fn basename(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'basename: missing operand'".to_string());
    };
    let mut script = format!("Split-Path -Leaf {}", quote_if_needed(path));
    if let Some(suffix) = operands.get(1) {
        script = format!(
            "({script}) -replace '{}$',''",
            regex_escape_for_powershell(suffix)
        );
    }
    EmulatedCommand::powershell(script)
}

pub fn dirname(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'dirname: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!("Split-Path -Parent {}", quote_if_needed(path)))
}

pub fn df(args: &[&str]) -> EmulatedCommand {
    let _ = args;
    EmulatedCommand::powershell(
        "Get-PSDrive -PSProvider FileSystem | Select-Object Name,Used,Free | Format-Table -AutoSize"
            .to_string(),
    )
}

pub fn du(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let path = operands.first().copied().unwrap_or(".");
    let summarize = flags.iter().any(|f| f.contains('s'));
    if summarize {
        EmulatedCommand::powershell(format!(
            "'{{0:N0}}' -f ((Get-ChildItem -Recurse -File {} | Measure-Object -Property Length -Sum).Sum / 1KB)",
            quote_if_needed(path)
        ))
    } else {
        EmulatedCommand::powershell(format!(
            "Get-ChildItem -Recurse -File {} | ForEach-Object {{ '{{0,10}}  {{1}}' -f [math]::Ceiling($_.Length/1KB), $_.FullName }}",
            quote_if_needed(path)
        ))
    }
}

pub fn file_cmd(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'file: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "if ((Get-Item {p}).PSIsContainer) {{ '{p}: directory' }} else {{ $ext = [System.IO.Path]::GetExtension({p}); \"{p}: $ext file\" }}",
        p = quote_if_needed(path)
    ))
}

/// `test` / `[` — the handful of unary and binary predicates actually
/// exercised in practice: `-f`, `-d`, `-e`, `-z`, `-n`, and string/integer
/// equality.
pub fn test_cmd(args: &[&str]) -> EmulatedCommand {
    let args: Vec<&str> = args.iter().filter(|a| **a != "]").copied().collect();
    let script = match args.as_slice() {
        ["-f", path] => format!(
            "if ((Test-Path {p}) -and -not (Get-Item {p}).PSIsContainer) {{ exit 0 }} else {{ exit 1 }}",
            p = quote_if_needed(path)
        ),
        ["-d", path] => format!(
            "if ((Test-Path {p}) -and (Get-Item {p}).PSIsContainer) {{ exit 0 }} else {{ exit 1 }}",
            p = quote_if_needed(path)
        ),
        ["-e", path] => format!(
            "if (Test-Path {p}) {{ exit 0 }} else {{ exit 1 }}",
            p = quote_if_needed(path)
        ),
        ["-z", value] => format!(
            "if ([string]::IsNullOrEmpty({v})) {{ exit 0 }} else {{ exit 1 }}",
            v = quote_if_needed(value)
        ),
        ["-n", value] => format!(
            "if (-not [string]::IsNullOrEmpty({v})) {{ exit 0 }} else {{ exit 1 }}",
            v = quote_if_needed(value)
        ),
        [left, "=", right] => format!(
            "if ({l} -eq {r}) {{ exit 0 }} else {{ exit 1 }}",
            l = quote_if_needed(left),
            r = quote_if_needed(right)
        ),
        [left, "-eq", right] => format!(
            "if ([int]{l} -eq [int]{r}) {{ exit 0 }} else {{ exit 1 }}",
            l = quote_if_needed(left),
            r = quote_if_needed(right)
        ),
        _ => "exit 1".to_string(),
    };
    EmulatedCommand::powershell(script)
}

fn regex_escape_for_powershell(text: &str) -> String {
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
    fn ls_long_format_includes_select_object() {
        let cmd = ls(&["-la"]);
        assert!(cmd.script.contains("Get-ChildItem"));
        assert!(cmd.script.contains("-Force"));
        assert!(cmd.script.contains("Format-Table"));
    }

    #[test]
    fn cat_with_line_numbers() {
        let cmd = cat(&["-n", "file.txt"]);
        assert!(cmd.script.contains("ForEach-Object"));
    }

    #[test]
    fn test_checks_file_existence() {
        let cmd = test_cmd(&["-f", "file.txt"]);
        assert!(cmd.script.contains("Test-Path"));
    }

    #[test]
    fn basename_strips_suffix() {
        let cmd = basename(&["archive.tar.gz", ".gz"]);
        assert!(cmd.script.contains("-replace"));
    }
}
