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

//! Read-only listing of the fragments a mode can switch to.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::directory_name;
use crate::error::{Result, SwitchError};
use crate::identifier::CodePattern;
use crate::offset::find_offset_entry;
use crate::rewriter::locate_entry;
use crate::textfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "header", rename_all = "lowercase")]
pub enum HeaderStatus {
    Valid,
    /// Header is a valid code but not this file's
    Mismatch(String),
    /// Header is not `#<code>`
    Invalid(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentEntry {
    pub code: String,
    pub path: PathBuf,
    pub header: HeaderStatus,
    /// Calibration line not yet relocated
    pub has_offset: bool,
}

fn header_status(pattern: &CodePattern, code: &str, header: &str) -> HeaderStatus {
    match header.strip_prefix('#') {
        Some(declared) if declared == code => HeaderStatus::Valid,
        Some(declared) if pattern.is_exact(declared) => HeaderStatus::Mismatch(declared.to_string()),
        _ => HeaderStatus::Invalid(header.to_string()),
    }
}

/// Every `<CODE>.cfg` in `dir`, sorted by code. Other files are skipped.
pub fn list_fragments(dir: &Path, pattern: &CodePattern) -> Result<Vec<FragmentEntry>> {
    let entries = match fs::read_dir(dir) {
        Ok(it) => it,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SwitchError::read(dir, e)),
    };

    let mut out = Vec::new();
    for ent in entries.flatten() {
        let path = ent.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("cfg") {
            continue;
        }
        let code = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if pattern.is_exact(stem) => stem.to_string(),
            _ => continue,
        };
        let header = textfile::read_first_line(&path)?;
        let lines = textfile::read_lines(&path)?;
        out.push(FragmentEntry {
            header: header_status(pattern, &code, &header),
            has_offset: find_offset_entry(&lines).is_some(),
            code,
            path,
        });
    }
    out.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(out)
}

/// Code named by the first include directive for `dir` in `main_config`
pub fn active_code(main_config: &Path, dir: &Path, pattern: &CodePattern) -> Result<Option<String>> {
    if !main_config.is_file() {
        return Err(SwitchError::MainConfigMissing(main_config.to_path_buf()));
    }
    let include = pattern.include_regex(&directory_name(dir)?)?;
    let lines = textfile::read_lines(main_config)?;
    Ok(locate_entry(&lines, &include)
        .and_then(|i| include.captures(&lines[i]))
        .map(|caps| String::from_utf8_lossy(&caps["code"]).into_owned()))
}
