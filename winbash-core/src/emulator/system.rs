//! Process, environment, and host-information utilities.

use super::{EmulatedCommand, quote_if_needed, split_flags};

pub fn ps(args: &[&str]) -> EmulatedCommand {
    let _ = args;
    EmulatedCommand::powershell(
        "Get-Process | Select-Object Id,ProcessName,CPU | Format-Table -AutoSize".to_string(),
    )
}

pub fn kill(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let force = flags.iter().any(|f| f.contains('9'));
    let pids = operands.join(",");
    let force_flag = if force { " -Force" } else { "" };
    EmulatedCommand::powershell(format!("Stop-Process -Id {pids}{force_flag}"))
}

pub fn sleep(args: &[&str]) -> EmulatedCommand {
    let duration = args.first().copied().unwrap_or("1");
    let seconds = parse_duration_seconds(duration);
    EmulatedCommand::powershell(format!("Start-Sleep -Seconds {seconds}"))
}

fn parse_duration_seconds(spec: &str) -> String {
    let trimmed = spec.trim();
    if let Some(num) = trimmed.strip_suffix('s') {
        num.to_string()
    } else if let Some(num) = trimmed.strip_suffix('m') {
        format!("({num} * 60)")
    } else if let Some(num) = trimmed.strip_suffix('h') {
        format!("({num} * 3600)")
    } else {
        trimmed.to_string()
    }
}

/// `timeout` — starts a background job and waits with `-Timeout`, exiting
/// 124 if the job had to be stopped.
pub fn timeout(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some((duration, command)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'timeout: missing operand'".to_string());
    };
    let seconds = parse_duration_seconds(duration);
    let command_line = command.join(" ").replace('\'', "''");
    EmulatedCommand::powershell(format!(
        "$job = Start-Job -ScriptBlock {{ Invoke-Expression '{command_line}' }}; if (Wait-Job $job -Timeout {seconds}) {{ Receive-Job $job }} else {{ Stop-Job $job; exit 124 }}"
    ))
}

/// `watch` — repeats a command at an interval; capped at a bounded number
/// of iterations since this emulator has no interactive terminal to drive.
pub fn watch(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let mut interval = "2";
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == "-n" {
            interval = flags.get(i + 1).copied().unwrap_or(interval);
            i += 2;
        } else {
            i += 1;
        }
    }
    let command_line = operands.join(" ").replace('\'', "''");
    EmulatedCommand::powershell(format!(
        "for ($i=0; $i -lt 10; $i++) {{ Invoke-Expression '{command_line}'; Start-Sleep -Seconds {interval} }}"
    ))
}

pub fn date(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    if let Some(fmt) = operands.first().and_then(|s| s.strip_prefix('+')) {
        let ps_format = fmt
            .replace("%Y", "yyyy")
            .replace("%m", "MM")
            .replace("%d", "dd")
            .replace("%H", "HH")
            .replace("%M", "mm")
            .replace("%S", "ss");
        EmulatedCommand::powershell(format!("Get-Date -UFormat '{ps_format}'"))
    } else {
        EmulatedCommand::powershell("Get-Date".to_string())
    }
}

pub fn hostname() -> EmulatedCommand {
    EmulatedCommand::powershell("$env:COMPUTERNAME".to_string())
}

pub fn whoami() -> EmulatedCommand {
    EmulatedCommand::powershell("[Environment]::UserName".to_string())
}

pub fn env_cmd(args: &[&str]) -> EmulatedCommand {
    let _ = args;
    EmulatedCommand::powershell(
        "Get-ChildItem Env: | ForEach-Object { \"$($_.Name)=$($_.Value)\" }".to_string(),
    )
}

/// `export VAR=value` — a process-local assignment, not persisted across
/// invocations (per the engine's environment-snapshot policy).
pub fn export(args: &[&str]) -> EmulatedCommand {
    let Some(assignment) = args.first() else {
        return env_cmd(&[]);
    };
    let Some((name, value)) = assignment.split_once('=') else {
        return EmulatedCommand::powershell(format!("Write-Error 'export: invalid assignment {assignment}'"));
    };
    EmulatedCommand::powershell(format!(
        "$env:{name} = {}",
        quote_if_needed(value)
    ))
}

pub fn printenv(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    match operands.first() {
        Some(name) => EmulatedCommand::powershell(format!("$env:{name}")),
        None => env_cmd(&[]),
    }
}

pub fn true_cmd() -> EmulatedCommand {
    EmulatedCommand::cmd("exit 0".to_string())
}

pub fn false_cmd() -> EmulatedCommand {
    EmulatedCommand::cmd("exit 1".to_string())
}

/// `which` — resolves via `Get-Command`, matching GNU `which`'s "print
/// first match on PATH, exit 1 if none" contract.
pub fn which(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(name) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'which: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "$c = Get-Command {} -ErrorAction SilentlyContinue; if ($c) {{ $c.Source }} else {{ exit 1 }}",
        quote_if_needed(name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_converts_minute_suffix() {
        let cmd = sleep(&["2m"]);
        assert!(cmd.script.contains("* 60"));
    }

    #[test]
    fn export_sets_env_var() {
        let cmd = export(&["FOO=bar"]);
        assert!(cmd.script.contains("$env:FOO"));
    }

    #[test]
    fn which_falls_back_to_exit_one() {
        let cmd = which(&["nonexistent-tool"]);
        assert!(cmd.script.contains("exit 1"));
    }
}
