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

//! Write-only command channel to the firmware host.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use serde_json::json;

use crate::error::ChannelError;
use crate::logger;

/// Firmware commands this tool issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareCommand {
    /// Persist a value through Klipper's save_variables
    SaveVariable { name: String, value: String },
    FirmwareRestart,
}

impl FirmwareCommand {
    pub fn save_z_offset(value: &str) -> Self {
        FirmwareCommand::SaveVariable { name: "z_offset".to_string(), value: value.to_string() }
    }
}

impl fmt::Display for FirmwareCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareCommand::SaveVariable { name, value } => {
                write!(f, "SAVE_VARIABLE VARIABLE={} VALUE={}", name, value)
            }
            FirmwareCommand::FirmwareRestart => f.write_str("FIRMWARE_RESTART"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait CommandChannel {
    /// Deliver one command line. Nothing is read back.
    fn send(&mut self, command: &str) -> Result<(), ChannelError>;
}

/// Named pipe (or plain file) the firmware host reads commands from
#[derive(Debug, Clone)]
pub struct PipeChannel {
    path: PathBuf,
}

impl PipeChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CommandChannel for PipeChannel {
    fn send(&mut self, command: &str) -> Result<(), ChannelError> {
        // O_NONBLOCK: opening a FIFO nobody reads fails with ENXIO instead of hanging.
        // The pipe is never created here.
        let mut f = OpenOptions::new()
            .append(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| ChannelError::Open { path: self.path.clone(), source: e })?;
        let line = format!("{}\n", command);
        f.write_all(line.as_bytes())
            .map_err(|e| ChannelError::Write { path: self.path.clone(), source: e })?;
        logger::log_event(
            "command_sent",
            json!({
                "channel": self.path.display().to_string(),
                "command": command,
            }),
        );
        Ok(())
    }
}

/// Send a typed command through any channel
pub fn issue(channel: &mut dyn CommandChannel, command: &FirmwareCommand) -> Result<(), ChannelError> {
    channel.send(&command.to_string())
}
