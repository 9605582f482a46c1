//! Platform probe-tool selection.
//!
//! On Windows the bundled `tracert` is used. Elsewhere `traceroute` is
//! preferred when present on PATH, with `tracepath` as the lighter fallback.
//! Selection binds the output dialect once, before any parsing happens.

use std::path::{Path, PathBuf};

use crate::probe::parser::Dialect;

/// A selected path-discovery command and its output dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTool {
    pub command: PathBuf,
    pub dialect: Dialect,
}

impl ProbeTool {
    /// Argument list forcing numeric-only output and a bounded hop count
    pub fn args(&self, target: &str, max_hops: u8) -> Vec<String> {
        match self.dialect {
            Dialect::WindowsTracert => vec![
                "-d".to_string(),
                "-h".to_string(),
                max_hops.to_string(),
                target.to_string(),
            ],
            Dialect::Traceroute => vec![
                "-n".to_string(),
                "-m".to_string(),
                max_hops.to_string(),
                target.to_string(),
            ],
            Dialect::Tracepath => vec!["-n".to_string(), target.to_string()],
        }
    }

    /// Command name for diagnostics
    pub fn name(&self) -> String {
        self.command
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.command.display().to_string())
    }
}

/// Select the best available probing tool for this platform, or None when no
/// local tool exists.
pub fn select_tool() -> Option<ProbeTool> {
    if cfg!(windows) {
        // tracert ships with the OS; absence surfaces as a spawn failure
        return Some(ProbeTool {
            command: PathBuf::from("tracert"),
            dialect: Dialect::WindowsTracert,
        });
    }

    if let Some(path) = find_in_path("traceroute") {
        tracing::debug!("Selected traceroute at {}", path.display());
        return Some(ProbeTool {
            command: path,
            dialect: Dialect::Traceroute,
        });
    }

    if let Some(path) = find_in_path("tracepath") {
        tracing::debug!("Selected tracepath at {}", path.display());
        return Some(ProbeTool {
            command: path,
            dialect: Dialect::Tracepath,
        });
    }

    tracing::warn!("No local path-discovery tool found on PATH");
    None
}

/// Locate an executable on PATH
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_lists_bind_hop_count() {
        let tool = ProbeTool {
            command: PathBuf::from("/usr/sbin/traceroute"),
            dialect: Dialect::Traceroute,
        };
        assert_eq!(
            tool.args("8.8.8.8", 30),
            vec!["-n", "-m", "30", "8.8.8.8"]
        );

        let tool = ProbeTool {
            command: PathBuf::from("tracert"),
            dialect: Dialect::WindowsTracert,
        };
        assert_eq!(
            tool.args("example.com", 15),
            vec!["-d", "-h", "15", "example.com"]
        );

        let tool = ProbeTool {
            command: PathBuf::from("/usr/bin/tracepath"),
            dialect: Dialect::Tracepath,
        };
        assert_eq!(tool.args("example.com", 30), vec!["-n", "example.com"]);
    }

    #[test]
    fn test_tool_name() {
        let tool = ProbeTool {
            command: PathBuf::from("/usr/sbin/traceroute"),
            dialect: Dialect::Traceroute,
        };
        assert_eq!(tool.name(), "traceroute");
    }

    #[test]
    fn test_find_in_path_misses_nonsense() {
        assert_eq!(find_in_path("definitely-not-a-real-binary-7f3a"), None);
    }
}
