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

//! Material/toolhead code validation.
//!
//! A code pattern is configured without a start anchor (e.g. `[A-Z]{3}[0-9]{3}`) and
//! compiled into the three forms the switch needs.

use std::fmt;

use regex::{bytes, Regex};

use crate::error::{Result, SwitchError};

pub const DEFAULT_CODE_PATTERN: &str = "[A-Z]{3}[0-9]{3}";

/// A validated code. Only `CodePattern::validate` constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the fragment file carrying this code
    pub fn file_name(&self) -> String {
        format!("{}.cfg", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CodePattern {
    source: String,
    trailing: Regex,
    exact: Regex,
}

/// Drop one trailing `$` unless it is escaped
fn strip_end_anchor(pattern: &str) -> &str {
    match pattern.strip_suffix('$') {
        Some(rest) if rest.chars().rev().take_while(|c| *c == '\\').count() % 2 == 0 => rest,
        _ => pattern,
    }
}

impl CodePattern {
    /// `pattern` may end in `$`; it is anchored per use anyway
    pub fn new(pattern: &str) -> Result<Self> {
        let body = strip_end_anchor(pattern);
        let compile = |re: String| {
            Regex::new(&re).map_err(|e| SwitchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
        };
        if body.is_empty() || body.starts_with('^') {
            return Err(SwitchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern must be non-empty and not start with '^'".to_string(),
            });
        }
        Ok(Self {
            source: body.to_string(),
            trailing: compile(format!("(?:{})$", body))?,
            exact: compile(format!("^(?:{})$", body))?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Accept `raw` when it ends with a code. Leading characters are not
    /// checked here; the fragment header check rejects them later.
    pub fn validate(&self, raw: &str) -> Result<Identifier> {
        if self.trailing.is_match(raw) {
            Ok(Identifier(raw.to_string()))
        } else {
            Err(SwitchError::InvalidCode { code: raw.to_string() })
        }
    }

    /// Whole-string match, used for fragment headers and file stems
    pub fn is_exact(&self, s: &str) -> bool {
        self.exact.is_match(s)
    }

    /// Pattern for `[include <dir_name>/<CODE>.cfg]` at the start of a line
    pub fn include_regex(&self, dir_name: &str) -> Result<bytes::Regex> {
        let re = format!(r"^\[include {}/(?P<code>{})\.cfg\]", regex::escape(dir_name), self.source);
        bytes::Regex::new(&re).map_err(|e| SwitchError::InvalidPattern {
            pattern: self.source.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for CodePattern {
    fn default() -> Self {
        // The built-in pattern always compiles
        match Self::new(DEFAULT_CODE_PATTERN) {
            Ok(p) => p,
            Err(e) => unreachable!("default code pattern: {e}"),
        }
    }
}

/// Format the include directive that selects `code` from `dir_name`
pub fn include_directive(dir_name: &str, code: &Identifier) -> String {
    format!("[include {}/{}]", dir_name, code.file_name())
}
