/*
 * Test utilities for Klipswitch
 *
 * Builds a throwaway klipper config tree (printer.cfg, fragment directories
 * and a plain file standing in for the command pipe) inside a TempDir.
 */

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::config::SwitchConfig;
use crate::identifier::{CodePattern, Identifier};

/// Validates `raw` with the default pattern
pub fn code(raw: &str) -> Identifier {
    CodePattern::default().validate(raw).unwrap()
}

pub struct Workspace {
    pub dir: TempDir,
    pub config: SwitchConfig,
}

impl Workspace {
    /// Creates printer.cfg with `main_contents`, empty `Configs/` and `Toolheads/`
    pub fn new(main_contents: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Configs")).unwrap();
        fs::create_dir_all(root.join("Toolheads")).unwrap();
        fs::write(root.join("printer.cfg"), main_contents).unwrap();
        fs::write(root.join("printer"), "").unwrap();

        let config = SwitchConfig {
            printer_config_file: root.join("printer.cfg"),
            material_directory: root.join("Configs"),
            toolhead_directory: root.join("Toolheads"),
            command_pipe: root.join("printer"),
            log_file: root.join("log.json"),
            ..SwitchConfig::default()
        };
        Self { dir, config }
    }

    pub fn fragment(&self, code: &str, contents: &str) -> PathBuf {
        let path = self.config.material_directory.join(format!("{}.cfg", code));
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn toolhead_fragment(&self, code: &str, contents: &str) -> PathBuf {
        let path = self.config.toolhead_directory.join(format!("{}.cfg", code));
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn read_fragment(&self, code: &str) -> String {
        fs::read_to_string(self.config.material_directory.join(format!("{}.cfg", code))).unwrap()
    }

    pub fn main(&self) -> String {
        fs::read_to_string(&self.config.printer_config_file).unwrap()
    }

    pub fn backup(&self) -> String {
        fs::read_to_string(self.config.backup_path()).unwrap()
    }

    pub fn write_backup(&self, contents: &str) {
        fs::write(self.config.backup_path(), contents).unwrap();
    }

    pub fn backup_exists(&self) -> bool {
        self.config.backup_path().exists()
    }
}
