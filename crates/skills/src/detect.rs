//! Best-effort detection of which registered tools exist on this machine.

use std::path::Path;

use serde::Serialize;

use crate::platform::{self, PlatformInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// A known config path exists under the home directory.
    ConfigPath,
    /// The tool's executable is on `PATH`.
    Command,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectedPlatform {
    pub id: &'static str,
    pub name: &'static str,
    pub source: DetectionSource,
    pub supports_skills: bool,
}

/// Detect platforms by config paths under `home` and executables on `PATH`.
pub fn detect_platforms(home: &Path) -> Vec<DetectedPlatform> {
    detect_platforms_with(home, |cmd| which::which(cmd).is_ok())
}

/// Same as [`detect_platforms`] with a caller-supplied executable check.
pub fn detect_platforms_with(
    home: &Path,
    has_command: impl Fn(&str) -> bool,
) -> Vec<DetectedPlatform> {
    platform::all()
        .iter()
        .filter_map(|info| {
            let source = detection_source(info, home, &has_command)?;
            Some(DetectedPlatform {
                id: info.id,
                name: info.name,
                source,
                supports_skills: info.supports_skills(),
            })
        })
        .collect()
}

fn detection_source(
    info: &PlatformInfo,
    home: &Path,
    has_command: &impl Fn(&str) -> bool,
) -> Option<DetectionSource> {
    if info.detect_paths.iter().any(|p| home.join(p).exists()) {
        Some(DetectionSource::ConfigPath)
    } else if info.cli_command.is_some_and(has_command) {
        Some(DetectionSource::Command)
    } else {
        None
    }
}
