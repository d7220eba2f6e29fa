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

//! Line-oriented reading and writing of Klipper config files.
//!
//! Lines are raw bytes and keep their terminators, so a file written back
//! from `read_lines` output is byte-identical to the original even when
//! unrelated lines are not valid UTF-8.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, SwitchError};

pub type Line = Vec<u8>;

pub fn split_lines(data: &[u8]) -> Vec<Line> {
    data.split_inclusive(|b| *b == b'\n').map(<[u8]>::to_vec).collect()
}

pub fn read_lines(path: &Path) -> Result<Vec<Line>> {
    let data = fs::read(path).map_err(|e| SwitchError::read(path, e))?;
    Ok(split_lines(&data))
}

/// First line of `path` with surrounding whitespace removed; invalid UTF-8
/// is replaced so it still fails the header pattern
pub fn read_first_line(path: &Path) -> Result<String> {
    let f = File::open(path).map_err(|e| SwitchError::read(path, e))?;
    let mut line = Vec::new();
    BufReader::new(f)
        .read_until(b'\n', &mut line)
        .map_err(|e| SwitchError::read(path, e))?;
    Ok(String::from_utf8_lossy(&line).trim().to_string())
}

/// "\r\n", "\n" or "" for an unterminated last line
pub fn terminator(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r\n") {
        b"\r\n"
    } else if line.ends_with(b"\n") {
        b"\n"
    } else {
        b""
    }
}

pub fn strip_terminator(line: &[u8]) -> &[u8] {
    &line[..line.len() - terminator(line).len()]
}

/// `line` without leading and trailing ASCII whitespace
pub fn trim_bytes(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &line[start..end]
}

/// Seam for the one write whose failure triggers a rollback
#[cfg_attr(test, mockall::automock)]
pub trait ConfigWriter {
    fn write_lines(&self, path: &Path, lines: &[Line]) -> io::Result<()>;
}

/// Recreates the file and writes every line
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

impl ConfigWriter for FsWriter {
    fn write_lines(&self, path: &Path, lines: &[Line]) -> io::Result<()> {
        fs::write(path, lines.concat())
    }
}
