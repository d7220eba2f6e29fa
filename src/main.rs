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

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use klipswitch::catalog::{active_code, list_fragments, HeaderStatus};
use klipswitch::channel::PipeChannel;
use klipswitch::config::{config_path, load_switch_config, Mode, SwitchConfig};
use klipswitch::logger;
use klipswitch::switch::{run_offset_update, run_switch, SwitchOptions, SwitchReport};

#[derive(Parser)]
#[command(name = "klipswitch")]
#[command(version)]
#[command(about = "Switch Klipper material/toolhead config fragments")]
#[command(long_about = "Switch Klipper material/toolhead config fragments

Points the [include ...] directive in printer.cfg at <DIR>/<CODE>.cfg,
keeps a backup of printer.cfg, moves a commented position_endstop_diff
from the fragment into the z_offset save variable and restarts the firmware.

EXAMPLES:
    klipswitch PLA001              Switch material to PLA001
    klipswitch -t MOS002           Switch toolhead to MOS002
    klipswitch --offset-only PLA001
                                   Store PLA001's z offset, leave printer.cfg as is
    klipswitch --list              List material fragments
    klipswitch -t --list --json    List toolhead fragments as JSON

FILES:
    ~/.config/klipswitch/config.json    Paths, code pattern and command pipe")]
struct Cli {
    /// Look CODE up among material fragments (default)
    #[arg(short = 'm', long, conflicts_with = "toolhead")]
    material: bool,

    /// Look CODE up among toolhead fragments
    #[arg(short = 't', long)]
    toolhead: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Append JSON events to the configured log file
    #[arg(long)]
    logging: bool,

    /// Do not send FIRMWARE_RESTART after switching
    #[arg(long)]
    no_restart: bool,

    /// Only move the fragment's z offset into the save variable; printer.cfg
    /// is neither backed up nor rewritten and no restart is sent
    #[arg(long, conflicts_with_all = ["list", "no_restart"])]
    offset_only: bool,

    /// List available fragments instead of switching
    #[arg(long, conflicts_with = "code")]
    list: bool,

    /// Print the listing as JSON
    #[arg(long, requires = "list")]
    json: bool,

    /// Material or toolhead code, e.g. PLA001
    code: Option<String>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.toolhead { Mode::Toolhead } else { Mode::Material }
    }
}

fn print_code_pattern(cfg: &SwitchConfig) {
    eprintln!("Configured code regex is of form {}", cfg.code_pattern);
    if !cfg.code_example.is_empty() {
        eprintln!("Example: {}", cfg.code_example);
    }
}

fn print_report(cfg: &SwitchConfig, report: &SwitchReport) {
    let rewrite = &report.rewrite;
    println!("Switching to {}: {}", report.mode.label(), report.code);
    println!("New config file: {}", rewrite.fragment.display());
    println!(
        "Backed up '{}' to '{}'",
        cfg.printer_config_file.display(),
        rewrite.backup.display()
    );
    println!("Old include entry (line {}): {}", rewrite.line_index + 1, rewrite.previous_entry);
    println!("New include entry: {}", rewrite.new_entry);
    if rewrite.unchanged {
        println!("Entry was already active; file rewritten unchanged");
    }
    if let Some(z) = &report.z_offset {
        println!("Found endstop diff = {}, stored as z_offset", z);
    }
    if report.restarted {
        println!("Sent FIRMWARE_RESTART to {}", cfg.command_pipe.display());
    }
}

fn list(cfg: &SwitchConfig, mode: Mode, json: bool) -> anyhow::Result<()> {
    let pattern = cfg.code_pattern()?;
    let dir = cfg.directory(mode);
    let fragments = list_fragments(dir, &pattern)?;
    let active = active_code(&cfg.printer_config_file, dir, &pattern)?;

    if json {
        let out = serde_json::json!({
            "mode": mode,
            "directory": dir.display().to_string(),
            "active": active,
            "fragments": fragments,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} fragments in {}:", mode.label(), dir.display());
    for f in &fragments {
        let marker = if active.as_deref() == Some(f.code.as_str()) { "*" } else { " " };
        let note = match &f.header {
            HeaderStatus::Valid => String::new(),
            HeaderStatus::Mismatch(declared) => format!(" (header declares {})", declared),
            HeaderStatus::Invalid(found) => format!(" (invalid header '{}')", found),
        };
        let offset = if f.has_offset { " [z offset pending]" } else { "" };
        println!("{} {}{}{}", marker, f.code, note, offset);
    }
    if fragments.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let path = cli.config.clone().unwrap_or_else(config_path);
    let cfg = load_switch_config(&path)
        .with_context(|| format!("loading configuration {}", path.display()))?;

    if cli.logging {
        if let Err(e) = logger::init_logging(&cfg.log_file) {
            eprintln!("Warning: cannot open log file {}: {}", cfg.log_file.display(), e);
        }
        logger::log_event("startup", serde_json::json!({
            "args": std::env::args().collect::<Vec<_>>(),
            "config": path.display().to_string(),
        }));
    }

    let mode = cli.mode();
    if cli.list {
        list(&cfg, mode, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let code = match &cli.code {
        Some(c) => c,
        None => {
            eprintln!("{}", Cli::command().render_usage());
            print_code_pattern(&cfg);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut channel = PipeChannel::new(&cfg.command_pipe);
    let result = if cli.offset_only {
        run_offset_update(&cfg, code, mode, &mut channel).map(|z| match z {
            Some(z) => println!("Found endstop diff = {}, stored as z_offset", z),
            None => println!("No endstop diff in {} {}; nothing sent", mode.label(), code),
        })
    } else {
        let opts = SwitchOptions { mode, restart: !cli.no_restart };
        run_switch(&cfg, code, opts, &mut channel).map(|report| print_report(&cfg, &report))
    };
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
            if err.is_input_error() {
                eprintln!("Error: {}", err);
                print_code_pattern(&cfg);
                return Ok(ExitCode::FAILURE);
            }
            Err(err.into())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
