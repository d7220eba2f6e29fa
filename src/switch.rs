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

use serde_json::json;

use crate::channel::{issue, CommandChannel, FirmwareCommand};
use crate::config::{Mode, SwitchConfig};
use crate::error::Result;
use crate::identifier::Identifier;
use crate::logger;
use crate::offset::OffsetRelocator;
use crate::rewriter::{ConfigRewriter, RewriteOutcome};

#[derive(Debug, Clone, Copy)]
pub struct SwitchOptions {
    pub mode: Mode,
    /// Send FIRMWARE_RESTART after a successful switch
    pub restart: bool,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self { mode: Mode::Material, restart: true }
    }
}

#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub code: Identifier,
    pub mode: Mode,
    pub rewrite: RewriteOutcome,
    /// Calibration value sent to the firmware, if the fragment still had one
    pub z_offset: Option<String>,
    pub restarted: bool,
}

/// Validate, rewrite the include entry, relocate the z offset, restart.
/// Stops at the first failing stage.
pub fn run_switch(
    cfg: &SwitchConfig,
    raw_code: &str,
    opts: SwitchOptions,
    channel: &mut dyn CommandChannel,
) -> Result<SwitchReport> {
    let code = cfg.code_pattern()?.validate(raw_code)?;
    logger::log_event(
        "switch_start",
        json!({ "code": code.as_str(), "mode": opts.mode.label() }),
    );

    let rewrite = ConfigRewriter::new(cfg, opts.mode)?.switch_to(&code)?;
    let z_offset = OffsetRelocator::new().relocate(&rewrite.fragment, channel)?;

    if opts.restart {
        issue(channel, &FirmwareCommand::FirmwareRestart)?;
    }

    logger::log_event(
        "switch_done",
        json!({
            "code": code.as_str(),
            "entry": rewrite.new_entry,
            "z_offset": z_offset,
            "restart": opts.restart,
        }),
    );
    Ok(SwitchReport { code, mode: opts.mode, rewrite, z_offset, restarted: opts.restart })
}

/// Relocate the calibration value of `raw_code`'s fragment without touching
/// the printer config. No backup is taken and no restart is sent.
pub fn run_offset_update(
    cfg: &SwitchConfig,
    raw_code: &str,
    mode: Mode,
    channel: &mut dyn CommandChannel,
) -> Result<Option<String>> {
    let code = cfg.code_pattern()?.validate(raw_code)?;
    let fragment = ConfigRewriter::new(cfg, mode)?.check_fragment(&code)?;
    let z_offset = OffsetRelocator::new().relocate(&fragment, channel)?;
    logger::log_event(
        "offset_update_done",
        json!({
            "code": code.as_str(),
            "mode": mode.label(),
            "z_offset": z_offset,
        }),
    );
    Ok(z_offset)
}
