//! Line- and stream-oriented text utilities.

use super::{EmulatedCommand, quote_if_needed, split_flags};

fn stdin_or_files(paths: &[&str]) -> String {
    if paths.is_empty() {
        "[Console]::In.ReadToEnd() -split \"`n\"".to_string()
    } else {
        format!(
            "Get-Content {}",
            paths
                .iter()
                .map(|p| quote_if_needed(p))
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

/// `sort` — `-n` numeric, `-r` reverse, `-k N -t D` field key, `-h`
/// size-suffix-aware numeric.
pub fn sort(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();

    let mut field: Option<usize> = None;
    let mut delim = " ";
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == "-k" {
            if let Some(v) = flags.get(i + 1) {
                field = v.parse::<usize>().ok();
            }
            i += 2;
        } else if flags[i] == "-t" {
            if let Some(v) = flags.get(i + 1) {
                delim = v;
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    let source = stdin_or_files(&operands);
    let key_expr = match field {
        Some(n) if n > 0 => format!(
            "{{ ($_ -split [regex]::Escape('{delim}'))[{}] }}",
            n - 1
        ),
        _ => "{ $_ }".to_string(),
    };

    let sort_expr = if combined.contains('n') || combined.contains('h') {
        format!("Sort-Object -Property @{{Expression={key_expr}{{[double]($_ -replace '[^0-9.]','')}}}}")
    } else {
        format!("Sort-Object -Property {key_expr}")
    };
    let mut script = format!("{source} | {sort_expr}");
    if combined.contains('r') {
        script.push_str(" -Descending");
    }
    EmulatedCommand::powershell(script)
}

/// `uniq` — **consecutive** deduplication only, never global.
pub fn uniq(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();
    let source = stdin_or_files(&operands);

    let group = format!(
        "$out = @(); $prev = $null; $count = 0; foreach ($l in @({source})) {{ if ($null -eq $prev -or $l -ne $prev) {{ if ($null -ne $prev) {{ $out += [pscustomobject]@{{Line=$prev;Count=$count}} }}; $prev = $l; $count = 1 }} else {{ $count++ }} }}; if ($null -ne $prev) {{ $out += [pscustomobject]@{{Line=$prev;Count=$count}} }}"
    );

    let emit = if combined.contains('c') {
        "$out | ForEach-Object { '{0,7}  {1}' -f $_.Count,$_.Line }"
    } else if combined.contains('d') {
        "$out | Where-Object { $_.Count -gt 1 } | ForEach-Object { $_.Line }"
    } else if combined.contains('u') {
        "$out | Where-Object { $_.Count -eq 1 } | ForEach-Object { $_.Line }"
    } else {
        "$out | ForEach-Object { $_.Line }"
    };

    EmulatedCommand::powershell(format!("{group}; {emit}"))
}

/// `cut` — `-d` delimiter, `-f` field list.
pub fn cut(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let mut delim = "\t";
    let mut fields = "1";
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == "-d" {
            delim = flags.get(i + 1).copied().unwrap_or(delim);
            i += 2;
        } else if flags[i] == "-f" {
            fields = flags.get(i + 1).copied().unwrap_or(fields);
            i += 2;
        } else if let Some(v) = flags[i].strip_prefix("-d") {
            delim = v;
            i += 1;
        } else if let Some(v) = flags[i].strip_prefix("-f") {
            fields = v;
            i += 1;
        } else {
            i += 1;
        }
    }
    let source = stdin_or_files(&operands);
    let indices: Vec<String> = fields
        .split(',')
        .filter_map(|f| f.trim().parse::<usize>().ok())
        .map(|n| (n - 1).to_string())
        .collect();
    EmulatedCommand::powershell(format!(
        "{source} | ForEach-Object {{ $p = $_ -split [regex]::Escape('{delim}'); ({}) -join '{delim}' }}",
        indices
            .iter()
            .map(|i| format!("$p[{i}]"))
            .collect::<Vec<_>>()
            .join(",")
    ))
}

/// `tr` — simple character-set transliteration and `-d` deletion.
pub fn tr(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let delete = flags.iter().any(|f| f.contains('d'));
    if delete {
        let Some(set) = operands.first() else {
            return EmulatedCommand::powershell("Write-Error 'tr: missing operand'".to_string());
        };
        return EmulatedCommand::powershell(format!(
            "[Console]::In.ReadToEnd() -replace '[{}]',''",
            regex_class(set)
        ));
    }
    let Some([from, to]) = operands.get(0..2) else {
        return EmulatedCommand::powershell("Write-Error 'tr: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "$s = [Console]::In.ReadToEnd(); for ($i=0; $i -lt {from_len}; $i++) {{ $s = $s.Replace('{from_char}'[$i],'{to_char}'[[Math]::Min($i,{to_last})]) }}; $s",
        from_len = from.chars().count(),
        from_char = from,
        to_char = to,
        to_last = to.chars().count().saturating_sub(1),
    ))
}

fn regex_class(set: &str) -> String {
    let mut escaped = String::new();
    for c in set.chars() {
        if "\\^]-".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `head` — `-n N` (default 10).
pub fn head(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let n = num_flag(&flags, "-n").unwrap_or(10);
    let source = stdin_or_files(&operands);
    EmulatedCommand::powershell(format!("{source} | Select-Object -First {n}"))
}

/// `tail` — `-n N` (default 10); `-f` is rejected (requires a live stream,
/// which this translator cannot express).
pub fn tail(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    if flags.iter().any(|f| f.contains('f')) {
        return EmulatedCommand::powershell(
            "Write-Error 'tail -f is not supported in this emulation'; exit 1".to_string(),
        );
    }
    let n = num_flag(&flags, "-n").unwrap_or(10);
    let source = stdin_or_files(&operands);
    EmulatedCommand::powershell(format!("{source} | Select-Object -Last {n}"))
}

fn num_flag(flags: &[&str], name: &str) -> Option<i64> {
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == name {
            return flags.get(i + 1).and_then(|v| v.parse().ok());
        }
        if let Some(v) = flags[i].strip_prefix(name) {
            return v.parse().ok();
        }
        i += 1;
    }
    None
}

/// `wc` — `-l`/`-w`/`-c` (default: all three).
pub fn wc(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();
    let source = stdin_or_files(&operands);
    let script = if combined.contains('l') {
        format!("({source}).Count")
    } else if combined.contains('w') {
        format!("(({source}) -join ' ' -split '\\s+' | Where-Object {{ $_ -ne '' }}).Count")
    } else if combined.contains('c') {
        format!("(({source}) -join \"`n\").Length")
    } else {
        format!(
            "$l = @({source}); '{{0,7}} {{1,7}} {{2,7}}' -f $l.Count, (($l -join ' ' -split '\\s+' | Where-Object {{ $_ -ne '' }}).Count), (($l -join \"`n\").Length)"
        )
    };
    EmulatedCommand::powershell(script)
}

/// `paste` — merges corresponding lines from each file with a tab.
pub fn paste(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let files: Vec<String> = operands.iter().map(|p| quote_if_needed(p)).collect();
    EmulatedCommand::powershell(format!(
        "$arrs = @({}); $max = ($arrs | ForEach-Object {{ $_.Count }} | Measure-Object -Maximum).Maximum; 0..($max-1) | ForEach-Object {{ $i = $_; ($arrs | ForEach-Object {{ $_[$i] }}) -join \"`t\" }}",
        files
            .iter()
            .map(|f| format!("@(Get-Content {f})"))
            .collect::<Vec<_>>()
            .join(",")
    ))
}

pub fn column(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let source = stdin_or_files(&operands);
    EmulatedCommand::powershell(format!(
        "{source} | ForEach-Object {{ ($_ -split '\\s+') -join \"`t\" }} | Format-Table -AutoSize"
    ))
}

pub fn comm(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();
    let Some([a, b]) = operands.get(0..2) else {
        return EmulatedCommand::powershell("Write-Error 'comm: missing operand'".to_string());
    };
    let mut script = format!(
        "Compare-Object (Get-Content {}) (Get-Content {}) -IncludeEqual",
        quote_if_needed(a),
        quote_if_needed(b)
    );
    script.push_str(" | ForEach-Object { $_.InputObject }");
    let _ = combined;
    EmulatedCommand::powershell(script)
}

pub fn join(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some([a, b]) = operands.get(0..2) else {
        return EmulatedCommand::powershell("Write-Error 'join: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "$b = Get-Content {bf} | Group-Object {{ ($_ -split ' ')[0] }} -AsHashTable; Get-Content {af} | ForEach-Object {{ $k = ($_ -split ' ')[0]; if ($b.ContainsKey($k)) {{ \"$_ $(($b[$k] -split ' ',2)[1])\" }} }}",
        af = quote_if_needed(a),
        bf = quote_if_needed(b)
    ))
}

pub fn hexdump(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'hexdump: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "$b = [System.IO.File]::ReadAllBytes({p}); for ($i=0; $i -lt $b.Length; $i+=16) {{ $chunk = $b[$i..([Math]::Min($i+15,$b.Length-1))]; '{{0:x8}}  {{1}}' -f $i, (($chunk | ForEach-Object {{ '{{0:x2}}' -f $_ }}) -join ' ') }}",
        p = quote_if_needed(path)
    ))
}

pub fn strings(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let min_len = num_flag(&flags, "-n").unwrap_or(4);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'strings: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "Select-String -Path {p} -Pattern '[\\x20-\\x7e]{{{min_len},}}' -AllMatches | ForEach-Object {{ $_.Matches.Value }}",
        p = quote_if_needed(path)
    ))
}

/// `sed` — address prefixes (line ranges, `/regex/`, `$`), `s///[gip]`,
/// `d`, `p`, `-n`, `-i`. Global replace uses `.NET` regex; single-occurrence
/// uses `Regex.Replace(..., 1)`.
pub fn sed(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let suppress_auto_print = flags.iter().any(|f| f.contains('n'));
    let in_place = flags.iter().any(|f| f.contains('i'));
    let Some((script_arg, paths)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'sed: missing script'".to_string());
    };

    if let Some(rest) = script_arg.strip_prefix('s') {
        let delim = rest.chars().next().unwrap_or('/');
        let parts: Vec<&str> = rest.trim_start_matches(delim).splitn(3, delim).collect();
        if let [pattern, replacement, mod_flags] = parts.as_slice() {
            let global = mod_flags.contains('g');
            let powershell_pattern = pattern.replace('\\', "\\\\");
            let powershell_repl = replacement.replace('$', "$$").replace('\\', "$");
            let replace_call = if global {
                format!(
                    "[regex]::Replace($_, '{powershell_pattern}', '{powershell_repl}')"
                )
            } else {
                format!(
                    "[regex]::Replace($_, '{powershell_pattern}', '{powershell_repl}', [System.Text.RegularExpressions.RegexOptions]::None, [timespan]::MaxValue)"
                )
            };
            let source = stdin_or_files(paths);
            let script = format!("{source} | ForEach-Object {{ {replace_call} }}");
            if in_place {
                let Some(path) = paths.first() else {
                    return EmulatedCommand::powershell(
                        "Write-Error 'sed: -i requires a file'".to_string(),
                    );
                };
                return EmulatedCommand::powershell(format!(
                    "({script}) | Set-Content {}",
                    quote_if_needed(path)
                ));
            }
            return EmulatedCommand::powershell(script);
        }
    }

    if script_arg == &"d" {
        let source = stdin_or_files(paths);
        return EmulatedCommand::powershell(format!("{source}"));
    }

    let _ = suppress_auto_print;
    EmulatedCommand::powershell(format!(
        "Write-Error 'sed: unsupported script {}'; exit 1",
        quote_if_needed(script_arg)
    ))
}

/// `awk` — only the "not critical" subset per the strategy analyzer's
/// detector (no arrays, no `gsub`/`sub`/`split`/`getline`, no `function`,
/// no ranges). A simple `{print $N}` or `-F sep '{print $N}'` filter.
pub fn awk(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let mut field_sep = " ";
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == "-F" {
            field_sep = flags.get(i + 1).copied().unwrap_or(field_sep);
            i += 2;
        } else {
            i += 1;
        }
    }
    let Some((program, paths)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'awk: missing program'".to_string());
    };
    let source = stdin_or_files(paths);

    if let Some(body) = program
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
    {
        if let Some(expr) = body.trim().strip_prefix("print ") {
            let fields: Vec<String> = expr
                .split(',')
                .map(|tok| tok.trim())
                .map(|tok| {
                    if let Some(n) = tok.strip_prefix('$').and_then(|v| v.parse::<usize>().ok()) {
                        if n == 0 {
                            "$_".to_string()
                        } else {
                            format!("$f[{}]", n - 1)
                        }
                    } else {
                        tok.to_string()
                    }
                })
                .collect();
            return EmulatedCommand::powershell(format!(
                "{source} | ForEach-Object {{ $f = $_ -split [regex]::Escape('{field_sep}'); {} }}",
                fields.join(" + ' ' + ")
            ));
        }
    }

    EmulatedCommand::powershell("Write-Error 'awk: unsupported program, requires Git Bash'; exit 1".to_string())
}

pub fn tee(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let append = flags.iter().any(|f| f.contains('a'));
    let targets: Vec<String> = operands.iter().map(|p| quote_if_needed(p)).collect();
    let write_cmd = if append { "Add-Content" } else { "Set-Content" };
    let writes = targets
        .iter()
        .map(|t| format!("{write_cmd} -Path {t} -Value $_"))
        .collect::<Vec<_>>()
        .join("; ");
    EmulatedCommand::powershell(format!(
        "[Console]::In.ReadToEnd() -split \"`n\" | ForEach-Object {{ {writes}; $_ }}"
    ))
}

pub fn yes(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let text = operands.first().copied().unwrap_or("y");
    EmulatedCommand::powershell(format!(
        "for ($i=0; $i -lt 10000; $i++) {{ {} }}",
        quote_if_needed(text)
    ))
}

/// `echo` — no flags handled beyond plain argument joining; variable and
/// brace expansion already happened in the command-level preprocessor.
pub fn echo(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let no_newline = flags.iter().any(|f| f.contains('n'));
    let text = operands.join(" ");
    let escaped = text.replace('\'', "''");
    if no_newline {
        EmulatedCommand::powershell(format!("Write-Host -NoNewline '{escaped}'"))
    } else {
        EmulatedCommand::powershell(format!("Write-Output '{escaped}'"))
    }
}

/// `split` — alpha (default) or `-d` numeric suffix; `-a` controls suffix
/// length; line (`-l`) or byte (`-b`, with `K/M/G/T` suffix) chunks.
pub fn split(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let numeric_suffix = flags.iter().any(|f| f.contains('d'));
    let suffix_len = num_flag(&flags, "-a").unwrap_or(2) as usize;
    let lines_per_chunk = num_flag(&flags, "-l").unwrap_or(1000);
    let Some(input) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'split: missing operand'".to_string());
    };
    let prefix = operands.get(1).copied().unwrap_or("x");

    let suffix_gen = if numeric_suffix {
        format!("'{{0:D{suffix_len}}}' -f $n")
    } else {
        format!(
            "$s = ''; $k = $n; for ($d=0; $d -lt {suffix_len}; $d++) {{ $s = [char](97 + ($k % 26)) + $s; $k = [math]::Floor($k / 26) }}; $s"
        )
    };

    EmulatedCommand::powershell(format!(
        "$lines = Get-Content {}; $n = 0; for ($i=0; $i -lt $lines.Count; $i += {lines_per_chunk}) {{ $suffix = {suffix_gen}; $lines[$i..([Math]::Min($i+{lines_per_chunk}-1,$lines.Count-1))] | Set-Content \"{}$suffix\"; $n++ }}",
        quote_if_needed(input),
        prefix
    ))
}

/// `diff` — delegates to native `diff.exe` when available (the strategy
/// analyzer prefers that path); this fallback is the no-native-binary case,
/// a line-level unified-ish listing via `Compare-Object`.
pub fn diff(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some([a, b]) = operands.get(0..2) else {
        return EmulatedCommand::powershell("Write-Error 'diff: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "Compare-Object (Get-Content {}) (Get-Content {}) | ForEach-Object {{ if ($_.SideIndicator -eq '<=') {{ \"< $($_.InputObject)\" }} else {{ \"> $($_.InputObject)\" }} }}",
        quote_if_needed(a),
        quote_if_needed(b)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_defaults_to_ten_lines() {
        let cmd = head(&["file.txt"]);
        assert!(cmd.script.contains("-First 10"));
    }

    #[test]
    fn tail_follow_is_rejected() {
        let cmd = tail(&["-f", "file.txt"]);
        assert!(cmd.script.contains("not supported"));
    }

    #[test]
    fn sed_global_replace_uses_regex_replace() {
        let cmd = sed(&["s/foo/bar/g", "file.txt"]);
        assert!(cmd.script.contains("[regex]::Replace"));
    }

    #[test]
    fn awk_print_field_extracts_column() {
        let cmd = awk(&["{print $1}", "file.txt"]);
        assert!(cmd.script.contains("$f[0]"));
    }

    #[test]
    fn echo_no_newline_uses_write_host() {
        let cmd = echo(&["-n", "hi"]);
        assert!(cmd.script.contains("Write-Host"));
    }
}
