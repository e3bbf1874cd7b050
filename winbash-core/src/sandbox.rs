//! Workspace containment and command-blacklist enforcement.
//!
//! This is the hard stop before a command ever reaches a backend shell: a
//! rejection here short-circuits the whole pipeline with
//! `Error: Security - <reason>`, regardless of what the strategy analyzer
//! would otherwise have chosen.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

const DANGEROUS_COMMANDS: &[&str] = &[
    "format", "diskpart", "chkdsk", "reg", "regedit", "shutdown", "restart", "logoff", "sc",
    "net", "taskkill", "bcdedit", "powercfg", "wmic", "msiexec", "schtasks", "at", "netsh",
];

const RESTRICTED_COMMANDS: &[&str] = &[
    "del", "erase", "rd", "rmdir", "deltree", "move", "ren", "rename", "copy", "xcopy", "robocopy",
];

static PATH_BOUNDARY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)([A-Z]):\\([^\s"]+)"#).expect("static pattern is valid"));

static DRIVE_ACCESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([A-Z]):").expect("static pattern is valid"));

/// Rejects recursive wildcard operations at a drive root, e.g. `del C:\*`,
/// `rd C:\ /S`, or any restricted command given a bare `*` alongside `/S`.
static DRIVE_ROOT_WILDCARD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[A-Z]:\\\s*\*|\*.*[\\/][sS]\b|[\\/][sS]\b.*\*|[A-Z]:\\\s*[\\/][sS]\b",
    )
    .expect("static pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRejection(pub String);

impl std::fmt::Display for SandboxRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SandboxRejection {}

/// Validates commands against workspace containment and a Windows
/// system-utility blacklist before they are allowed to execute.
pub struct SandboxValidator {
    workspace_root: PathBuf,
    workspace_drive: Option<char>,
}

impl SandboxValidator {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        let workspace_drive = workspace_root
            .components()
            .next()
            .and_then(|component| component.as_os_str().to_str())
            .and_then(|prefix| prefix.chars().next())
            .map(|c| c.to_ascii_uppercase());

        Self {
            workspace_root,
            workspace_drive,
        }
    }

    /// Validate a command, applying each check in order. Returns `Ok(())`
    /// for an allowed command and `Err(SandboxRejection)` with the reason
    /// for the first failing check.
    pub fn validate_command(&self, command: &str) -> Result<(), SandboxRejection> {
        if command.trim().is_empty() {
            return Ok(());
        }

        let command_lower = command.to_lowercase();
        let command_lower = command_lower.trim();

        for dangerous in DANGEROUS_COMMANDS {
            if contains_command(command_lower, dangerous) {
                return Err(SandboxRejection(format!(
                    "Dangerous command blocked: {dangerous}"
                )));
            }
        }

        self.check_path_boundaries(command)?;
        self.check_drive_access(command)?;

        for restricted in RESTRICTED_COMMANDS {
            if contains_command(command_lower, restricted) {
                self.check_restricted_wildcard(command, restricted)?;
            }
        }

        Ok(())
    }

    fn check_path_boundaries(&self, command: &str) -> Result<(), SandboxRejection> {
        for captures in PATH_BOUNDARY_PATTERN.find_iter(command) {
            let candidate = captures.as_str();
            let resolved = resolve_lexically(Path::new(candidate));
            if !resolved.starts_with(&self.workspace_root) {
                return Err(SandboxRejection(format!(
                    "Path outside workspace blocked: {candidate}"
                )));
            }
        }
        Ok(())
    }

    fn check_drive_access(&self, command: &str) -> Result<(), SandboxRejection> {
        let Some(workspace_drive) = self.workspace_drive else {
            return Ok(());
        };

        for captures in DRIVE_ACCESS_PATTERN.captures_iter(command) {
            let drive = captures[1].chars().next().unwrap().to_ascii_uppercase();
            if drive != workspace_drive {
                return Err(SandboxRejection(format!(
                    "Access to drive {drive}: blocked (workspace is on {workspace_drive}:)"
                )));
            }
        }
        Ok(())
    }

    /// Blocks recursive wildcard deletes/moves at a drive root, e.g.
    /// `del C:\*` or `rd C:\ /S`.
    fn check_restricted_wildcard(&self, command: &str, cmd_name: &str) -> Result<(), SandboxRejection> {
        if DRIVE_ROOT_WILDCARD_PATTERN.is_match(command) {
            return Err(SandboxRejection(format!(
                "Recursive wildcard blocked for restricted command: {cmd_name}"
            )));
        }
        Ok(())
    }
}

/// Whole-word match for `cmd_name`, bounded by start-of-string/whitespace/
/// `|`/`&`/`;` on the left and whitespace/`.`/end on the right.
fn contains_command(command: &str, cmd_name: &str) -> bool {
    let pattern = format!(
        r"(?:^|[\s|&;]){}(?:[\s.]|$)",
        regex::escape(cmd_name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(command))
        .unwrap_or(false)
}

fn resolve_lexically(path: &Path) -> PathBuf {
    winbash_commons::normalize_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SandboxValidator {
        SandboxValidator::new(PathBuf::from(r"C:\workspace"))
    }

    /// A workspace rooted at the drive itself, so a literal drive-root
    /// wildcard (`C:\*`) is inside the workspace and reaches the restricted-
    /// wildcard guard (check 4) instead of being rejected earlier by the
    /// path-boundary check (check 2).
    fn root_validator() -> SandboxValidator {
        SandboxValidator::new(PathBuf::from(r"C:\"))
    }

    #[test]
    fn allows_empty_command() {
        assert!(validator().validate_command("").is_ok());
        assert!(validator().validate_command("   ").is_ok());
    }

    #[test]
    fn blocks_dangerous_command() {
        let err = validator().validate_command("format C:").unwrap_err();
        assert_eq!(err.0, "Dangerous command blocked: format");
    }

    #[test]
    fn does_not_flag_dangerous_command_as_substring() {
        assert!(validator().validate_command("reformat-tool --help").is_ok());
    }

    #[test]
    fn blocks_path_outside_workspace() {
        let err = validator()
            .validate_command(r"type C:\Windows\win.ini")
            .unwrap_err();
        assert_eq!(err.0, r"Path outside workspace blocked: C:\Windows\win.ini");
    }

    #[test]
    fn allows_path_inside_workspace() {
        assert!(
            validator()
                .validate_command(r"type C:\workspace\claude\notes.txt")
                .is_ok()
        );
    }

    #[test]
    fn blocks_other_drive_access() {
        let err = validator().validate_command("dir D:").unwrap_err();
        assert_eq!(
            err.0,
            "Access to drive D: blocked (workspace is on C:)"
        );
    }

    #[test]
    fn blocks_recursive_wildcard_delete_at_drive_root() {
        let err = root_validator().validate_command(r"del C:\*").unwrap_err();
        assert!(err.0.contains("Recursive wildcard blocked"));
    }

    #[test]
    fn blocks_recursive_flag_at_drive_root_without_a_wildcard() {
        let err = root_validator().validate_command(r"rd C:\ /S").unwrap_err();
        assert!(err.0.contains("Recursive wildcard blocked"));
    }

    #[test]
    fn allows_scoped_restricted_command() {
        assert!(
            validator()
                .validate_command(r"del C:\workspace\claude\scratch.txt")
                .is_ok()
        );
    }
}
