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

//! Swaps the active `[include ...]` directive in the printer config.
//!
//! The checks run in a fixed order and the first failure aborts the switch.
//! Nothing is written before the fragment has been found and its header
//! verified; the printer config is backed up before it is rewritten and
//! restored from that backup if the rewrite fails.

use std::fs;
use std::path::PathBuf;

use regex::bytes::Regex;
use serde_json::json;

use crate::config::{directory_name, Mode, SwitchConfig};
use crate::error::{Result, SwitchError};
use crate::identifier::{include_directive, CodePattern, Identifier};
use crate::logger;
use crate::textfile::{self, ConfigWriter, FsWriter, Line};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub fragment: PathBuf,
    pub backup: PathBuf,
    pub line_index: usize,
    /// Replaced line without its terminator
    pub previous_entry: String,
    pub new_entry: String,
    /// The new entry equals the old one; the file was still rewritten
    pub unchanged: bool,
}

/// Index of the first line matching `include`; scanning stops there
pub fn locate_entry(lines: &[Line], include: &Regex) -> Option<usize> {
    lines.iter().position(|line| include.is_match(line))
}

pub struct ConfigRewriter<W: ConfigWriter = FsWriter> {
    main_config: PathBuf,
    backup: PathBuf,
    directory: PathBuf,
    dir_name: String,
    pattern: CodePattern,
    include: Regex,
    writer: W,
}

impl ConfigRewriter<FsWriter> {
    pub fn new(cfg: &SwitchConfig, mode: Mode) -> Result<Self> {
        let pattern = cfg.code_pattern()?;
        let directory = cfg.directory(mode).to_path_buf();
        let dir_name = directory_name(&directory)?;
        let include = pattern.include_regex(&dir_name)?;
        Ok(Self {
            main_config: cfg.printer_config_file.clone(),
            backup: cfg.backup_path(),
            directory,
            dir_name,
            pattern,
            include,
            writer: FsWriter,
        })
    }
}

impl<W: ConfigWriter> ConfigRewriter<W> {
    pub fn with_writer<V: ConfigWriter>(self, writer: V) -> ConfigRewriter<V> {
        ConfigRewriter {
            main_config: self.main_config,
            backup: self.backup,
            directory: self.directory,
            dir_name: self.dir_name,
            pattern: self.pattern,
            include: self.include,
            writer,
        }
    }

    pub fn fragment_path(&self, code: &Identifier) -> PathBuf {
        self.directory.join(code.file_name())
    }

    /// Existence of the printer config and fragment, then the fragment header
    pub fn check_fragment(&self, code: &Identifier) -> Result<PathBuf> {
        if !self.main_config.is_file() {
            return Err(SwitchError::MainConfigMissing(self.main_config.clone()));
        }

        let fragment = self.fragment_path(code);
        if !fragment.is_file() {
            return Err(SwitchError::FragmentMissing(fragment));
        }

        let header = textfile::read_first_line(&fragment)?;
        let declared = match header.strip_prefix('#') {
            Some(rest) if self.pattern.is_exact(rest) => rest,
            _ => {
                return Err(SwitchError::FragmentHeaderInvalid { path: fragment, found: header.clone() });
            }
        };
        if declared != code.as_str() {
            return Err(SwitchError::FragmentCodeMismatch {
                path: fragment,
                declared: declared.to_string(),
                requested: code.to_string(),
            });
        }
        Ok(fragment)
    }

    /// Copy the printer config over any previous backup
    pub fn backup(&self) -> Result<()> {
        fs::copy(&self.main_config, &self.backup).map_err(|e| SwitchError::BackupFailed {
            path: self.main_config.clone(),
            backup: self.backup.clone(),
            source: e,
        })?;
        logger::log_event(
            "backup",
            json!({
                "from": self.main_config.display().to_string(),
                "to": self.backup.display().to_string(),
            }),
        );
        Ok(())
    }

    // TODO: skip the backup and rewrite when the active entry already names `code`
    pub fn switch_to(&self, code: &Identifier) -> Result<RewriteOutcome> {
        let fragment = self.check_fragment(code)?;
        self.backup()?;

        let mut lines = textfile::read_lines(&self.main_config)?;
        let index = locate_entry(&lines, &self.include)
            .ok_or_else(|| SwitchError::NoIncludeDirective(self.main_config.clone()))?;

        let old = std::mem::take(&mut lines[index]);
        let mut ending = textfile::terminator(&old);
        if ending.is_empty() && index + 1 < lines.len() {
            ending = &b"\n"[..];
        }
        let new_entry = include_directive(&self.dir_name, code);
        lines[index] = [new_entry.as_bytes(), ending].concat();

        self.write_with_rollback(&lines)?;

        let previous_entry = String::from_utf8_lossy(textfile::strip_terminator(&old)).into_owned();
        logger::log_event(
            "entry_rewritten",
            json!({
                "file": self.main_config.display().to_string(),
                "line": index,
                "old": previous_entry,
                "new": new_entry,
            }),
        );
        Ok(RewriteOutcome {
            fragment,
            backup: self.backup.clone(),
            line_index: index,
            unchanged: previous_entry == new_entry,
            previous_entry,
            new_entry,
        })
    }

    fn write_with_rollback(&self, lines: &[Line]) -> Result<()> {
        let source = match self.writer.write_lines(&self.main_config, lines) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        logger::log_event(
            "write_failed",
            json!({ "file": self.main_config.display().to_string(), "error": source.to_string() }),
        );

        if !self.backup.is_file() {
            return Err(SwitchError::Unrecoverable {
                path: self.main_config.clone(),
                backup: self.backup.clone(),
                source,
            });
        }
        match fs::copy(&self.backup, &self.main_config) {
            Ok(_) => Err(SwitchError::WriteFailed {
                path: self.main_config.clone(),
                backup: self.backup.clone(),
                source,
            }),
            Err(restore) => Err(SwitchError::RollbackFailed {
                path: self.main_config.clone(),
                backup: self.backup.clone(),
                source,
                restore,
            }),
        }
    }
}
