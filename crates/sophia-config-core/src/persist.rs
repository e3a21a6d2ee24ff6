//! Writing identity variables to shell profiles
//!
//! Only the identity keys in [`PERSISTED_KEYS`] are exported, with the values
//! detection chose. Profiles that don't exist are left alone; the writer never
//! creates them.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::PersistMode;
use crate::detect::DetectedEnvironment;
use crate::logging::SharedLogger;
use crate::schema::PERSISTED_KEYS;
use crate::{log_info, log_warn};

pub const PROFILE_HEADER: &str = "# Sophia AI configuration (sophia-config)";

/// What a persist pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    /// Profiles that were changed
    pub updated: Vec<PathBuf>,
    /// Profiles that already held every line
    pub unchanged: Vec<PathBuf>,
    /// Profiles that could not be read or written, with the reason
    pub failed: Vec<(PathBuf, String)>,
    pub lines_written: usize,
    /// Older exports dropped in `ReplaceByKey` mode
    pub lines_removed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Change {
    written: usize,
    removed: usize,
}

pub struct PersistentWriter {
    profiles: Vec<PathBuf>,
    mode: PersistMode,
    logger: SharedLogger,
}

impl PersistentWriter {
    pub fn new(profiles: Vec<PathBuf>, mode: PersistMode, logger: SharedLogger) -> Self {
        Self { profiles, mode, logger }
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    /// `export VAR="value"` lines for the detected identity
    pub fn export_lines(detected: &DetectedEnvironment) -> Vec<(String, String)> {
        PERSISTED_KEYS
            .iter()
            .filter_map(|(key, variable)| {
                let value = detected.identity(key)?.replace('\\', "\\\\").replace('"', "\\\"");
                Some((variable.to_string(), format!("export {}=\"{}\"", variable, value)))
            })
            .collect()
    }

    /// Apply the export lines to every existing profile; never fails
    pub fn persist(&self, detected: &DetectedEnvironment) -> PersistSummary {
        let exports = Self::export_lines(detected);
        let mut summary = PersistSummary::default();
        if exports.is_empty() {
            return summary;
        }

        for path in self.profiles.iter().filter(|p| p.is_file()) {
            match self.update_profile(path, &exports) {
                Ok(Change { written: 0, removed: 0 }) => summary.unchanged.push(path.clone()),
                Ok(change) => {
                    log_info!(
                        self.logger,
                        "updated {}: {} line(s) written, {} removed",
                        path.display(),
                        change.written,
                        change.removed
                    );
                    summary.lines_written += change.written;
                    summary.lines_removed += change.removed;
                    summary.updated.push(path.clone());
                }
                Err(e) => {
                    log_warn!(self.logger, "skipping {}: {}", path.display(), e);
                    summary.failed.push((path.clone(), e.to_string()));
                }
            }
        }
        summary
    }

    fn update_profile(&self, path: &Path, exports: &[(String, String)]) -> io::Result<Change> {
        let content = fs::read_to_string(path)?;
        match self.mode {
            PersistMode::Append => append_missing(path, &content, exports),
            PersistMode::ReplaceByKey => replace_by_key(path, &content, exports),
        }
    }
}

fn has_line(content: &str, line: &str) -> bool {
    content.lines().any(|l| l.trim() == line)
}

fn block(content: &str, lines: &[&str]) -> String {
    let mut out = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    if !has_line(content, PROFILE_HEADER) {
        out.push('\n');
        out.push_str(PROFILE_HEADER);
        out.push('\n');
    }
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn append_missing(path: &Path, content: &str, exports: &[(String, String)]) -> io::Result<Change> {
    let missing: Vec<&str> = exports
        .iter()
        .map(|(_, line)| line.as_str())
        .filter(|line| !has_line(content, line))
        .collect();
    if missing.is_empty() {
        return Ok(Change::default());
    }

    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(block(content, &missing).as_bytes())?;
    Ok(Change {
        written: missing.len(),
        removed: 0,
    })
}

fn replace_by_key(path: &Path, content: &str, exports: &[(String, String)]) -> io::Result<Change> {
    let mut removed = 0;
    let kept: Vec<&str> = content
        .lines()
        .filter(|l| {
            let stale = exports.iter().any(|(variable, line)| {
                let trimmed = l.trim();
                trimmed != line.as_str() && trimmed.starts_with(&format!("export {}=", variable))
            });
            if stale {
                removed += 1;
            }
            !stale
        })
        .collect();

    let mut rewritten = kept.join("\n");
    if !rewritten.is_empty() {
        rewritten.push('\n');
    }
    let missing: Vec<&str> = exports
        .iter()
        .map(|(_, line)| line.as_str())
        .filter(|line| !has_line(&rewritten, line))
        .collect();
    if missing.is_empty() && removed == 0 {
        return Ok(Change::default());
    }
    if !missing.is_empty() {
        let appended = block(&rewritten, &missing);
        rewritten.push_str(&appended);
    }

    fs::write(path, rewritten)?;
    Ok(Change {
        written: missing.len(),
        removed,
    })
}
