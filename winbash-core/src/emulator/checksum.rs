//! Checksum and encoding utilities: `md5sum`, `sha1sum`, `sha256sum`,
//! `base64`.
//!
//! Output format matches GNU coreutils: `<hash>  <file>` (two spaces),
//! lowercase hex.

use super::{EmulatedCommand, quote_if_needed, split_flags};

fn hash_script(algorithm: &str, args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    if flags.iter().any(|f| f.contains('c')) {
        let Some(sumfile) = operands.first() else {
            return EmulatedCommand::powershell("Write-Error 'missing checksum file'".to_string());
        };
        return EmulatedCommand::powershell(format!(
            "$ok = $true; Get-Content {} | ForEach-Object {{ $parts = $_ -split '  ',2; $actual = (Get-FileHash -Algorithm {algorithm} $parts[1]).Hash.ToLower(); if ($actual -ne $parts[0]) {{ \"$($parts[1]): FAILED\"; $ok = $false }} else {{ \"$($parts[1]): OK\" }} }}; if (-not $ok) {{ exit 1 }}",
            quote_if_needed(sumfile)
        ));
    }
    let files: Vec<String> = operands.iter().map(|p| quote_if_needed(p)).collect();
    if files.is_empty() {
        return EmulatedCommand::powershell(format!(
            "$b = [Console]::OpenStandardInput(); $h = [System.Security.Cryptography.{algorithm}]::Create().ComputeHash($b); ($h | ForEach-Object {{ '{{0:x2}}' -f $_ }}) -join ''"
        ));
    }
    EmulatedCommand::powershell(format!(
        "@({}) | ForEach-Object {{ '{{0}}  {{1}}' -f (Get-FileHash -Algorithm {algorithm} $_).Hash.ToLower(), $_ }}",
        files.join(",")
    ))
}

pub fn md5sum(args: &[&str]) -> EmulatedCommand {
    hash_script("MD5", args)
}

pub fn sha1sum(args: &[&str]) -> EmulatedCommand {
    hash_script("SHA1", args)
}

pub fn sha256sum(args: &[&str]) -> EmulatedCommand {
    hash_script("SHA256", args)
}

/// `base64` — `-d` decode via `FromBase64String`, encode via
/// `ToBase64String`; accepts a file operand or stdin.
pub fn base64(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let decode = flags.iter().any(|f| f.contains('d'));
    let source = match operands.first() {
        Some(path) => format!("[System.IO.File]::ReadAllText({})", quote_if_needed(path)),
        None => "[Console]::In.ReadToEnd()".to_string(),
    };
    if decode {
        EmulatedCommand::powershell(format!(
            "[System.Text.Encoding]::UTF8.GetString([Convert]::FromBase64String(({source}).Trim()))"
        ))
    } else {
        let bytes_source = match operands.first() {
            Some(path) => format!("[System.IO.File]::ReadAllBytes({})", quote_if_needed(path)),
            None => "[System.Text.Encoding]::UTF8.GetBytes([Console]::In.ReadToEnd())".to_string(),
        };
        EmulatedCommand::powershell(format!("[Convert]::ToBase64String({bytes_source})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256sum_outputs_gnu_format() {
        let cmd = sha256sum(&["file.txt"]);
        assert!(cmd.script.contains("Get-FileHash"));
        assert!(cmd.script.contains("SHA256"));
    }

    #[test]
    fn base64_decode_uses_frombase64() {
        let cmd = base64(&["-d"]);
        assert!(cmd.script.contains("FromBase64String"));
    }
}
