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

//! Moves `position_endstop_diff` out of a fragment and into a firmware variable.
//!
//! Klipper rejects the key, so fragments carry it commented out. The first
//! time a fragment is selected the value is sent as `SAVE_VARIABLE` and the
//! line is commented a second time so it is never picked up again.

use std::path::Path;

use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde_json::json;

use crate::channel::{issue, CommandChannel, FirmwareCommand};
use crate::error::{Result, SwitchError};
use crate::logger;
use crate::textfile::{self, ConfigWriter, FsWriter, Line};

lazy_static! {
    static ref OFFSET_ENTRY: Regex =
        Regex::new(r"^#\s*(position_endstop_diff\s*=\s*([-+]?\d*\.?\d+))\s*$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetEntry {
    pub line_index: usize,
    /// Value text exactly as written in the fragment
    pub value: String,
}

/// First calibration line in `lines`, if any
pub fn find_offset_entry(lines: &[Line]) -> Option<OffsetEntry> {
    lines.iter().enumerate().find_map(|(i, line)| {
        OFFSET_ENTRY.captures(textfile::strip_terminator(line)).map(|caps| OffsetEntry {
            line_index: i,
            value: String::from_utf8_lossy(&caps[2]).into_owned(),
        })
    })
}

/// `# ` in front of the original line keeps the text but stops it matching
pub fn disable_line(line: &[u8]) -> Line {
    let ending: &[u8] = match textfile::terminator(line) {
        b"" => b"\n",
        other => other,
    };
    [&b"# "[..], textfile::trim_bytes(textfile::strip_terminator(line)), ending].concat()
}

pub struct OffsetRelocator<W: ConfigWriter = FsWriter> {
    writer: W,
}

impl OffsetRelocator<FsWriter> {
    pub fn new() -> Self {
        Self { writer: FsWriter }
    }
}

impl Default for OffsetRelocator<FsWriter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: ConfigWriter> OffsetRelocator<W> {
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Strip the calibration line from `fragment` and send its value.
    /// Returns the value sent, or None when the fragment has no entry.
    pub fn relocate(&self, fragment: &Path, channel: &mut dyn CommandChannel) -> Result<Option<String>> {
        let mut lines = textfile::read_lines(fragment)?;
        let entry = match find_offset_entry(&lines) {
            Some(e) => e,
            None => return Ok(None),
        };

        lines[entry.line_index] = disable_line(&lines[entry.line_index]);
        self.writer
            .write_lines(fragment, &lines)
            .map_err(|e| SwitchError::write(fragment, e))?;
        logger::log_event(
            "offset_extracted",
            json!({
                "fragment": fragment.display().to_string(),
                "line": entry.line_index,
                "value": entry.value,
            }),
        );

        issue(channel, &FirmwareCommand::save_z_offset(&entry.value))?;
        Ok(Some(entry.value))
    }
}
