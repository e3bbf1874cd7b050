//! Network fetch utilities: `curl` and `wget`.
//!
//! Both translate to `Invoke-WebRequest`; neither attempts the full flag
//! surface of their GNU counterparts, only the common fetch-to-stdout or
//! fetch-to-file shapes.

use super::{EmulatedCommand, quote_if_needed, split_flags};

pub fn curl(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let silent = flags.iter().any(|f| f.contains('s'));
    let mut output: Option<&str> = None;
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == "-o" {
            output = flags.get(i + 1).copied();
            i += 2;
        } else {
            i += 1;
        }
    }
    let Some(url) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'curl: missing URL'".to_string());
    };
    let progress_flag = if silent {
        " -UseBasicParsing"
    } else {
        " -UseBasicParsing"
    };
    match output {
        Some(path) => EmulatedCommand::powershell(format!(
            "Invoke-WebRequest -Uri {}{progress_flag} -OutFile {}",
            quote_if_needed(url),
            quote_if_needed(path)
        )),
        None => EmulatedCommand::powershell(format!(
            "(Invoke-WebRequest -Uri {}{progress_flag}).Content",
            quote_if_needed(url)
        )),
    }
}

pub fn wget(args: &[&str]) -> EmulatedCommand {
    let (flags, operands) = split_flags(args);
    let mut output: Option<&str> = None;
    let mut i = 0;
    while i < flags.len() {
        if flags[i] == "-O" {
            output = flags.get(i + 1).copied();
            i += 2;
        } else {
            i += 1;
        }
    }
    let Some(url) = operands.first() else {
        return EmulatedCommand::powershell("Write-Error 'wget: missing URL'".to_string());
    };
    let dest = output
        .map(String::from)
        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or("index.html").to_string());
    EmulatedCommand::powershell(format!(
        "Invoke-WebRequest -Uri {} -UseBasicParsing -OutFile {}",
        quote_if_needed(url),
        quote_if_needed(&dest)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curl_without_output_flag_returns_content() {
        let cmd = curl(&["https://example.com"]);
        assert!(cmd.script.contains(".Content"));
    }

    #[test]
    fn wget_defaults_output_to_basename() {
        let cmd = wget(&["https://example.com/file.txt"]);
        assert!(cmd.script.contains("file.txt"));
    }
}
