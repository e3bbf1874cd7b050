//! Archive and compression utilities: `tar`, `gzip`/`gunzip`, `zip`/`unzip`.
//!
//! The strategy analyzer prefers a native `.exe` (`tar.exe` ships with
//! modern Windows) whenever the capability map reports one; these
//! translators are the fallback when it doesn't, built on `.NET`'s
//! `GZipStream` and `Compress-Archive`/`Expand-Archive`.

use super::{EmulatedCommand, quote_if_needed, split_flags};

/// `tar` — only the common `c`/`x`/`t` with `z`/`f` modifiers. PowerShell has
/// no built-in tar format support, so this emits an explicit failure
/// pointing at the native binary or Git Bash; a faithful `.NET`-only tar
/// reimplementation is out of scope.
pub fn tar(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let combined: String = flags.iter().map(|f| f.trim_start_matches('-')).collect();
    if combined.is_empty() {
        return EmulatedCommand::powershell(
            "Write-Error 'tar: requires native tar.exe or Git Bash'; exit 1".to_string(),
        );
    }
    let Some(archive) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'tar: missing archive operand'".to_string());
    };
    if combined.contains('c') {
        let sources = operands[1..]
            .iter()
            .map(|p| quote_if_needed(p))
            .collect::<Vec<_>>()
            .join(",");
        EmulatedCommand::powershell(format!(
            "Write-Error 'tar: creation requires native tar.exe (archive {}, sources {})'; exit 1",
            quote_if_needed(archive),
            sources
        ))
    } else {
        EmulatedCommand::powershell(format!(
            "Write-Error 'tar: extraction requires native tar.exe (archive {})'; exit 1",
            quote_if_needed(archive)
        ))
    }
}

/// `gzip` — compresses a file in place, appending `.gz`, via `GZipStream`.
pub fn gzip(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'gzip: missing operand'".to_string());
    };
    let p = quote_if_needed(path);
    EmulatedCommand::powershell(format!(
        "$inp = [System.IO.File]::OpenRead({p}); $out = [System.IO.File]::Create(\"{path}.gz\"); $gz = New-Object System.IO.Compression.GZipStream($out, [System.IO.Compression.CompressionMode]::Compress); $inp.CopyTo($gz); $gz.Close(); $inp.Close(); Remove-Item {p}"
    ))
}

/// `gunzip` — decompresses a `.gz` file, stripping the suffix.
pub fn gunzip(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some(path) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'gunzip: missing operand'".to_string());
    };
    let p = quote_if_needed(path);
    let dest = path.strip_suffix(".gz").unwrap_or(path);
    EmulatedCommand::powershell(format!(
        "$inp = [System.IO.File]::OpenRead({p}); $gz = New-Object System.IO.Compression.GZipStream($inp, [System.IO.Compression.CompressionMode]::Decompress); $out = [System.IO.File]::Create(\"{dest}\"); $gz.CopyTo($out); $out.Close(); $gz.Close(); $inp.Close(); Remove-Item {p}"
    ))
}

pub fn zip(args: &[&str]) -> EmulatedCommand {
    let (_, operands) = split_flags(args);
    let Some((archive, sources)) = operands.split_first() else {
        return EmulatedCommand::powershell("Write-Error 'zip: missing operand'".to_string());
    };
    let source_list = sources
        .iter()
        .map(|p| quote_if_needed(p))
        .collect::<Vec<_>>()
        .join(",");
    EmulatedCommand::powershell(format!(
        "Compress-Archive -Path {source_list} -DestinationPath {} -Force",
        quote_if_needed(archive)
    ))
}

pub fn unzip(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let dest_flag_idx = flags.iter().position(|f| *f == "-d");
    let dest = dest_flag_idx
        .and_then(|i| flags.get(i + 1))
        .copied()
        .unwrap_or(".");
    let Some(archive) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'unzip: missing operand'".to_string());
    };
    EmulatedCommand::powershell(format!(
        "Expand-Archive -Path {} -DestinationPath {} -Force",
        quote_if_needed(archive),
        quote_if_needed(dest)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tar_without_mode_flag_fails_explicitly() {
        let cmd = tar(&["archive.tar"]);
        assert!(cmd.script.contains("Write-Error"));
    }

    #[test]
    fn zip_compresses_sources() {
        let cmd = zip(&["out.zip", "a.txt", "b.txt"]);
        assert!(cmd.script.contains("Compress-Archive"));
    }

    #[test]
    fn unzip_respects_dest_flag() {
        let cmd = unzip(&["-d", "out", "archive.zip"]);
        assert!(cmd.script.contains("out"));
    }
}
