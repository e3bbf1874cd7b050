//! Bidirectional Unix↔Windows path translation.
//!
//! Commands arrive written against a virtual Unix namespace
//! (`/home/claude`, `/mnt/user-data/uploads`, `/mnt/user-data/outputs`) and
//! must be rewritten to real Windows paths under the workspace root before
//! a backend shell ever sees them, then rewritten back for anything that
//! echoes a path in its output.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

const UNIX_HOME: &str = "/home/claude";
const UNIX_UPLOADS: &str = "/mnt/user-data/uploads";
const UNIX_OUTPUTS: &str = "/mnt/user-data/outputs";

static UNIX_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(/(?:home/claude|mnt/user-data/(?:uploads|outputs))(?:/[\w\-.]+)*)")
        .expect("static pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationDirection {
    ToWindows,
    ToUnix,
}

/// Translates paths between the virtual Unix namespace Claude writes
/// commands against and the real Windows filesystem backing it.
pub struct PathTranslator {
    workspace_root: PathBuf,
}

impl PathTranslator {
    /// Construct a translator rooted at `workspace_root`, creating the three
    /// managed subdirectories (`claude/`, `uploads/`, `outputs/`) if they do
    /// not already exist. Per the data-model invariant, a `PathTranslator`
    /// never exists without its mapped roots present on disk.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Result<Self> {
        let workspace_root = workspace_root.into();
        let translator = Self { workspace_root };

        for dir in [
            translator.claude_home_windows(),
            translator.uploads_directory_windows(),
            translator.outputs_directory_windows(),
        ] {
            std::fs::create_dir_all(&dir)
                .map_err(|err| anyhow::anyhow!("failed to create {}: {err}", dir.display()))?;
        }

        Ok(translator)
    }

    /// Construct a translator without touching the filesystem. Intended for
    /// unit tests that only exercise the pure string-translation logic.
    #[cfg(test)]
    fn new_unchecked(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn claude_home_unix(&self) -> &'static str {
        UNIX_HOME
    }

    pub fn claude_home_windows(&self) -> PathBuf {
        self.workspace_root.join("claude")
    }

    pub fn uploads_directory_unix(&self) -> &'static str {
        UNIX_UPLOADS
    }

    pub fn uploads_directory_windows(&self) -> PathBuf {
        self.workspace_root.join("uploads")
    }

    pub fn outputs_directory_unix(&self) -> &'static str {
        UNIX_OUTPUTS
    }

    pub fn outputs_directory_windows(&self) -> PathBuf {
        self.workspace_root.join("outputs")
    }

    pub fn tool_scratch_directory(&self, tool_name: &str) -> PathBuf {
        self.workspace_root.join(tool_name)
    }

    /// Translate a single Unix path into its real Windows location.
    ///
    /// Only paths under the three managed roots are recognized; anything
    /// else is an error, matching the upstream translator's closed mapping.
    pub fn to_windows(&self, unix_path: &str) -> Result<PathBuf> {
        let normalized = unix_path.replace('\\', "/");

        if let Some(relative) = strip_root(&normalized, UNIX_HOME) {
            return Ok(join_relative(&self.workspace_root.join("claude"), relative));
        }
        if let Some(relative) = strip_root(&normalized, UNIX_UPLOADS) {
            return Ok(join_relative(
                &self.workspace_root.join("uploads"),
                relative,
            ));
        }
        if let Some(relative) = strip_root(&normalized, UNIX_OUTPUTS) {
            return Ok(join_relative(
                &self.workspace_root.join("outputs"),
                relative,
            ));
        }

        bail!(
            "PathTranslator only handles {}, {}, {}. Got: {}",
            UNIX_HOME,
            UNIX_UPLOADS,
            UNIX_OUTPUTS,
            unix_path
        )
    }

    /// Translate a real Windows path back into the virtual Unix namespace.
    pub fn to_unix(&self, windows_path: &Path) -> Result<String> {
        let claude_dir = self.workspace_root.join("claude");
        let uploads_dir = self.workspace_root.join("uploads");
        let outputs_dir = self.workspace_root.join("outputs");

        if let Some(unix) = relative_unix_path(windows_path, &claude_dir, UNIX_HOME) {
            return Ok(unix);
        }
        if let Some(unix) = relative_unix_path(windows_path, &uploads_dir, UNIX_UPLOADS) {
            return Ok(unix);
        }
        if let Some(unix) = relative_unix_path(windows_path, &outputs_dir, UNIX_OUTPUTS) {
            return Ok(unix);
        }

        bail!(
            "PathTranslator only handles claude/, uploads/, outputs/. Got: {}",
            windows_path.display()
        )
    }

    /// Rewrite every recognizable path occurring inside `text`, leaving
    /// anything that fails to translate untouched (matches upstream's
    /// best-effort substitution — a malformed or unmanaged path is left as
    /// literal text rather than aborting the whole command).
    pub fn translate_paths_in_string(&self, text: &str, direction: TranslationDirection) -> String {
        if text.is_empty() {
            return text.to_string();
        }

        match direction {
            TranslationDirection::ToWindows => self.translate_unix_paths_to_windows(text),
            TranslationDirection::ToUnix => self.translate_windows_paths_to_unix(text),
        }
    }

    fn translate_unix_paths_to_windows(&self, text: &str) -> String {
        UNIX_PATH_PATTERN
            .replace_all(text, |captures: &regex::Captures| {
                let unix_path = &captures[1];
                match self.to_windows(unix_path) {
                    Ok(windows_path) => {
                        let rendered = windows_path.display().to_string();
                        if rendered.contains(' ') {
                            format!("\"{rendered}\"")
                        } else {
                            rendered
                        }
                    }
                    Err(_) => unix_path.to_string(),
                }
            })
            .into_owned()
    }

    fn translate_windows_paths_to_unix(&self, text: &str) -> String {
        let workspace = self.workspace_root.display().to_string();
        let escaped_root = regex::escape(&workspace);
        let pattern = format!(r"{escaped_root}[\\/](?:claude|uploads|outputs)(?:[\\/\w\-.]+)*");
        let windows_pattern = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => return text.to_string(),
        };

        windows_pattern
            .replace_all(text, |captures: &regex::Captures| {
                let matched = &captures[0];
                match self.to_unix(Path::new(matched)) {
                    Ok(unix_path) => unix_path,
                    Err(_) => matched.to_string(),
                }
            })
            .into_owned()
    }
}

/// Rewrites every `C:\foo\bar`-shaped drive path in `text` to Git Bash's
/// `/c/foo/bar` mount convention, applied to an already Windows-translated
/// command string right before handing it to `execute_bash` (§4.8).
pub fn to_git_bash_style(text: &str) -> String {
    static DRIVE_PATH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\b([A-Z]):\\([^\s\"']*)").expect("static pattern"));

    DRIVE_PATH
        .replace_all(text, |captures: &regex::Captures| {
            let drive = captures[1].to_lowercase();
            let rest = captures[2].replace('\\', "/");
            format!("/{drive}/{rest}")
        })
        .into_owned()
}

fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if path == root {
        Some("")
    } else {
        path.strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

fn join_relative(base: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}

fn relative_unix_path(windows_path: &Path, managed_dir: &Path, unix_root: &'static str) -> Option<String> {
    let relative = windows_path.strip_prefix(managed_dir).ok()?;
    if relative.as_os_str().is_empty() {
        Some(unix_root.to_string())
    } else {
        let posix = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Some(format!("{unix_root}/{posix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> PathTranslator {
        PathTranslator::new_unchecked(PathBuf::from(r"C:\workspace"))
    }

    #[test]
    fn construction_creates_managed_directories() {
        let temp = tempfile::tempdir().unwrap();
        let translator = PathTranslator::new(temp.path()).unwrap();
        assert!(translator.claude_home_windows().is_dir());
        assert!(translator.uploads_directory_windows().is_dir());
        assert!(translator.outputs_directory_windows().is_dir());
    }

    #[test]
    fn translates_home_to_windows() {
        let translated = translator().to_windows("/home/claude/script.py").unwrap();
        assert_eq!(translated, PathBuf::from(r"C:\workspace\claude\script.py"));
    }

    #[test]
    fn translates_uploads_to_windows() {
        let translated = translator()
            .to_windows("/mnt/user-data/uploads/data.csv")
            .unwrap();
        assert_eq!(
            translated,
            PathBuf::from(r"C:\workspace\uploads\data.csv")
        );
    }

    #[test]
    fn translates_bare_home_root() {
        let translated = translator().to_windows("/home/claude").unwrap();
        assert_eq!(translated, PathBuf::from(r"C:\workspace\claude"));
    }

    #[test]
    fn rejects_unmanaged_unix_path() {
        assert!(translator().to_windows("/etc/passwd").is_err());
    }

    #[test]
    fn round_trips_outputs_directory() {
        let t = translator();
        let windows = t.to_windows("/mnt/user-data/outputs/report.pdf").unwrap();
        let unix = t.to_unix(&windows).unwrap();
        assert_eq!(unix, "/mnt/user-data/outputs/report.pdf");
    }

    #[test]
    fn translates_paths_embedded_in_command_string() {
        let rendered = translator().translate_paths_in_string(
            "cat /home/claude/notes.txt",
            TranslationDirection::ToWindows,
        );
        assert_eq!(rendered, r"cat C:\workspace\claude\notes.txt");
    }

    #[test]
    fn leaves_unrecognized_paths_untouched() {
        let rendered = translator()
            .translate_paths_in_string("echo /tmp/scratch", TranslationDirection::ToWindows);
        assert_eq!(rendered, "echo /tmp/scratch");
    }

    #[test]
    fn converts_drive_paths_to_git_bash_mounts() {
        assert_eq!(
            to_git_bash_style(r"cat C:\workspace\claude\notes.txt"),
            "cat /c/workspace/claude/notes.txt"
        );
    }
}
