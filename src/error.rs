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

//! Error types shared by every stage of a switch.

use std::io;
use std::path::PathBuf;

/// Result type alias using SwitchError
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Failure writing to the firmware command channel
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("Failed to open command channel {path}: {source}")]
    Open {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write command channel {path}: {source}")]
    Write {
        path: PathBuf,
        source: io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SwitchError {
    // ============================================================================
    // Input Errors
    // ============================================================================
    #[error("Input code error '{code}'! Please provide a valid code")]
    InvalidCode {
        code: String,
    },

    #[error("Invalid code pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    // ============================================================================
    // Lookup Errors
    // ============================================================================
    #[error("Printer config file {0} does not exist!")]
    MainConfigMissing(PathBuf),

    #[error("Configuration file {0} does not exist!")]
    FragmentMissing(PathBuf),

    // ============================================================================
    // Consistency Errors
    // ============================================================================
    #[error("File {path} does not start with a valid code: '{found}'")]
    FragmentHeaderInvalid {
        path: PathBuf,
        found: String,
    },

    #[error("File {path}'s code {declared} does not match file name {requested}")]
    FragmentCodeMismatch {
        path: PathBuf,
        declared: String,
        requested: String,
    },

    // ============================================================================
    // Structural Errors
    // ============================================================================
    #[error("Did not find any include directive in printer config file {0}! No changes were made!")]
    NoIncludeDirective(PathBuf),

    // ============================================================================
    // I/O and Write Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to back up {path} to {backup}: {source}")]
    BackupFailed {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write {path} ({source}); original restored from {backup}")]
    WriteFailed {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write {path} ({source}) and restoring from {backup} failed: {restore}")]
    RollbackFailed {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
        restore: io::Error,
    },

    #[error("Failed to write {path} ({source}) and backup {backup} is missing; cannot restore")]
    Unrecoverable {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    // ============================================================================
    // Command Channel Errors
    // ============================================================================
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl SwitchError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a file read error for `path`
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a file write error for `path`
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised before any file was touched
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidCode { .. } | Self::InvalidPattern { .. })
    }
}
