/*
 * This file is part of Klipswitch.
 *
 * Copyright (C) 2025 Klipswitch contributors
 *
 * Klipswitch is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Klipswitch is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Klipswitch. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitchError};
use crate::identifier::{CodePattern, DEFAULT_CODE_PATTERN};

/// Which family of fragments a code selects
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Material,
    Toolhead,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Material => "material",
            Mode::Toolhead => "toolhead",
        }
    }
}

fn default_printer_config_file() -> PathBuf { PathBuf::from("printer.cfg") }
fn default_material_directory() -> PathBuf { PathBuf::from("MaterialSpecificConfigs") }
fn default_toolhead_directory() -> PathBuf { PathBuf::from("ToolheadSpecificConfigs") }
fn default_backup_extension() -> String { ".bup".to_string() }
fn default_code_pattern() -> String { DEFAULT_CODE_PATTERN.to_string() }
fn default_code_example() -> String { "PLA001".to_string() }
fn default_command_pipe() -> PathBuf { PathBuf::from("/tmp/printer") }
fn default_log_file() -> PathBuf { PathBuf::from("/tmp/klipswitch_logs.json") }

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchConfig {
    /// Main printer config holding the include directive
    #[serde(default = "default_printer_config_file")]
    pub printer_config_file: PathBuf,
    #[serde(default = "default_material_directory")]
    pub material_directory: PathBuf,
    #[serde(default = "default_toolhead_directory")]
    pub toolhead_directory: PathBuf,
    /// Appended to `printer_config_file` to form the backup path
    #[serde(default = "default_backup_extension")]
    pub backup_extension: String,
    /// Code regex; a trailing `$` is accepted, a leading `^` is not
    #[serde(default = "default_code_pattern")]
    pub code_pattern: String,
    /// Shown next to the pattern in diagnostics; empty disables it
    #[serde(default = "default_code_example")]
    pub code_example: String,
    /// Klipper's virtual serial / command pipe
    #[serde(default = "default_command_pipe")]
    pub command_pipe: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            printer_config_file: default_printer_config_file(),
            material_directory: default_material_directory(),
            toolhead_directory: default_toolhead_directory(),
            backup_extension: default_backup_extension(),
            code_pattern: default_code_pattern(),
            code_example: default_code_example(),
            command_pipe: default_command_pipe(),
            log_file: default_log_file(),
        }
    }
}

impl SwitchConfig {
    pub fn directory(&self, mode: Mode) -> &Path {
        match mode {
            Mode::Material => &self.material_directory,
            Mode::Toolhead => &self.toolhead_directory,
        }
    }

    /// Sibling of the printer config with the backup extension appended
    pub fn backup_path(&self) -> PathBuf {
        let mut name: OsString = self.printer_config_file.clone().into_os_string();
        name.push(&self.backup_extension);
        PathBuf::from(name)
    }

    pub fn code_pattern(&self) -> Result<CodePattern> {
        CodePattern::new(&self.code_pattern)
    }
}

/// Final path component of a fragment directory, as written in include lines
pub fn directory_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .ok_or_else(|| SwitchError::config(format!("directory {} has no usable name", dir.display())))
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("klipswitch").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("klipswitch")
            .join("config.json");
    }
    PathBuf::from("/etc/klipswitch/config.json")
}

pub fn validate_switch_config(cfg: &SwitchConfig) -> Result<()> {
    let pattern = cfg.code_pattern()?;

    if cfg.backup_extension.is_empty() {
        return Err(SwitchError::config("backup_extension must not be empty"));
    }
    if cfg.backup_extension.contains('/') {
        return Err(SwitchError::config("backup_extension must not contain '/'"));
    }
    if cfg.printer_config_file.file_name().is_none() {
        return Err(SwitchError::config("printer_config_file must name a file"));
    }
    directory_name(&cfg.material_directory)?;
    directory_name(&cfg.toolhead_directory)?;
    if !cfg.code_example.is_empty() && !pattern.is_exact(&cfg.code_example) {
        return Err(SwitchError::config(format!(
            "code_example '{}' does not match code_pattern '{}'",
            cfg.code_example, cfg.code_pattern
        )));
    }
    Ok(())
}

/// Load from `path`; a missing file yields the defaults
pub fn load_switch_config(path: &Path) -> Result<SwitchConfig> {
    let cfg = match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).map_err(|e| SwitchError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => SwitchConfig::default(),
        Err(e) => return Err(SwitchError::read(path, e)),
    };
    validate_switch_config(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = SwitchConfig::default();
        assert_eq!(cfg.printer_config_file, PathBuf::from("printer.cfg"));
        assert_eq!(cfg.backup_path(), PathBuf::from("printer.cfg.bup"));
        assert_eq!(cfg.command_pipe, PathBuf::from("/tmp/printer"));
        assert_eq!(cfg.directory(Mode::Toolhead), Path::new("ToolheadSpecificConfigs"));
        assert!(validate_switch_config(&cfg).is_ok());
    }

    #[test]
    fn test_backup_path_is_sibling() {
        let cfg = SwitchConfig {
            printer_config_file: PathBuf::from("/home/pi/klipper_config/printer.cfg"),
            ..SwitchConfig::default()
        };
        assert_eq!(cfg.backup_path(), PathBuf::from("/home/pi/klipper_config/printer.cfg.bup"));
    }

    #[test]
    fn test_directory_name() {
        assert_eq!(directory_name(Path::new("/home/pi/klipper_config/MaterialSpecificConfigs/")).unwrap(), "MaterialSpecificConfigs");
        assert_eq!(directory_name(Path::new("Configs")).unwrap(), "Configs");
        assert!(directory_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Material).unwrap(), "\"material\"");
        assert_eq!(serde_json::from_str::<Mode>("\"toolhead\"").unwrap(), Mode::Toolhead);
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let cfg = SwitchConfig { code_pattern: "[A-Z".to_string(), ..SwitchConfig::default() };
        assert!(matches!(validate_switch_config(&cfg), Err(SwitchError::InvalidPattern { .. })));
    }

    #[test]
    fn test_validate_rejects_example_not_matching() {
        let cfg = SwitchConfig { code_example: "pla1".to_string(), ..SwitchConfig::default() };
        assert!(validate_switch_config(&cfg).is_err());

        let cfg = SwitchConfig { code_example: String::new(), ..SwitchConfig::default() };
        assert!(validate_switch_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_backup_extension() {
        let cfg = SwitchConfig { backup_extension: String::new(), ..SwitchConfig::default() };
        assert!(validate_switch_config(&cfg).is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_switch_config(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg.backup_extension, ".bup");
    }

    #[test]
    fn test_load_partial_file() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"printer_config_file": "/cfg/printer.cfg", "command_pipe": "/run/klipper"}}"#).unwrap();
        f.flush().unwrap();
        let cfg = load_switch_config(f.path()).unwrap();
        assert_eq!(cfg.printer_config_file, PathBuf::from("/cfg/printer.cfg"));
        assert_eq!(cfg.command_pipe, PathBuf::from("/run/klipper"));
        assert_eq!(cfg.code_pattern, DEFAULT_CODE_PATTERN);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"printer_cfg": "typo.cfg"}}"#).unwrap();
        f.flush().unwrap();
        assert!(matches!(load_switch_config(f.path()), Err(SwitchError::ConfigParse { .. })));
    }
}
