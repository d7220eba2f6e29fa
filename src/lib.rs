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

//! Klipswitch - material/toolhead config switching for Klipper
//!
//! Points the printer config's include directive at a different config
//! fragment, moves the fragment's z offset into a firmware variable and
//! restarts the firmware through its command pipe.

pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod identifier;
pub mod logger;
pub mod offset;
pub mod rewriter;
pub mod switch;
pub mod textfile;

#[cfg(test)]
pub mod test_utils;
