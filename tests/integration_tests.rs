/*
 * Integration tests for Klipswitch
 *
 * These drive whole switches through the public API against a temporary
 * klipper config tree, with a plain file standing in for the command pipe.
 */

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use klipswitch::catalog::{active_code, list_fragments};
use klipswitch::channel::PipeChannel;
use klipswitch::config::{config_path, load_switch_config, Mode, SwitchConfig};
use klipswitch::error::SwitchError;
use klipswitch::switch::{run_switch, SwitchOptions};
use serial_test::serial;
use tempfile::TempDir;

const PRINTER_CFG: &str = "\
[include mainsail.cfg]
[printer]
kinematics: corexy
[include MaterialSpecificConfigs/PLA001.cfg]
[include ToolheadSpecificConfigs/STK001.cfg]

#*# <---------------------- SAVE_CONFIG ---------------------->
#*# [stepper_z]
#*# position_endstop = 0.8
";

// Test utilities
struct Printer {
    _dir: TempDir,
    cfg: SwitchConfig,
}

impl Printer {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("MaterialSpecificConfigs")).unwrap();
        fs::create_dir_all(root.join("ToolheadSpecificConfigs")).unwrap();
        fs::write(root.join("printer.cfg"), PRINTER_CFG).unwrap();
        fs::write(root.join("printer"), "").unwrap();

        let cfg = SwitchConfig {
            printer_config_file: root.join("printer.cfg"),
            material_directory: root.join("MaterialSpecificConfigs"),
            toolhead_directory: root.join("ToolheadSpecificConfigs"),
            command_pipe: root.join("printer"),
            log_file: root.join("logs.json"),
            ..SwitchConfig::default()
        };
        let p = Printer { _dir: dir, cfg };
        p.material("PLA001", "#PLA001\n[extruder]\nnozzle_diameter: 0.4\n");
        p
    }

    fn material(&self, code: &str, contents: &str) -> PathBuf {
        let path = self.cfg.material_directory.join(format!("{}.cfg", code));
        fs::write(&path, contents).unwrap();
        path
    }

    fn switch(&self, code: &str) -> Result<klipswitch::switch::SwitchReport, SwitchError> {
        let mut channel = PipeChannel::new(&self.cfg.command_pipe);
        run_switch(&self.cfg, code, SwitchOptions::default(), &mut channel)
    }

    fn main(&self) -> String {
        fs::read_to_string(&self.cfg.printer_config_file).unwrap()
    }

    /// Run the klipswitch binary against this tree's configuration
    fn cli(&self, args: &[&str]) -> Output {
        let config = self._dir.path().join("config.json");
        fs::write(&config, serde_json::to_string_pretty(&self.cfg).unwrap()).unwrap();
        Command::new(env!("CARGO_BIN_EXE_klipswitch"))
            .arg("--config")
            .arg(&config)
            .args(args)
            .output()
            .unwrap()
    }

    /// Commands sent since the last call
    fn take_sent(&self) -> Vec<String> {
        let text = fs::read_to_string(&self.cfg.command_pipe).unwrap();
        fs::write(&self.cfg.command_pipe, "").unwrap();
        text.lines().map(str::to_string).collect()
    }
}

#[test]
fn test_switch_round_trip_preserves_other_lines() {
    let p = Printer::new();
    p.material("ABS002", "#ABS002\n[extruder]\nnozzle_diameter: 0.6\n");

    p.switch("ABS002").unwrap();
    let after = p.main();
    assert_eq!(after, PRINTER_CFG.replace("MaterialSpecificConfigs/PLA001", "MaterialSpecificConfigs/ABS002"));
    assert_eq!(after.matches("[include MaterialSpecificConfigs/").count(), 1);
    assert_eq!(p.take_sent(), vec!["FIRMWARE_RESTART"]);

    p.switch("PLA001").unwrap();
    assert_eq!(p.main(), PRINTER_CFG);
    assert_eq!(
        fs::read_to_string(p.cfg.backup_path()).unwrap(),
        after,
        "backup holds the state before the latest switch"
    );
}

#[test]
fn test_offset_is_relocated_once() {
    let p = Printer::new();
    let fragment = p.material("PET003", "#PET003\n[extruder]\n# position_endstop_diff = -1.25\n");

    p.switch("PET003").unwrap();
    assert_eq!(
        p.take_sent(),
        vec!["SAVE_VARIABLE VARIABLE=z_offset VALUE=-1.25", "FIRMWARE_RESTART"]
    );
    assert_eq!(
        fs::read_to_string(&fragment).unwrap(),
        "#PET003\n[extruder]\n# # position_endstop_diff = -1.25\n"
    );

    p.switch("PLA001").unwrap();
    assert_eq!(p.take_sent(), vec!["FIRMWARE_RESTART"]);

    let report = p.switch("PET003").unwrap();
    assert!(report.z_offset.is_none());
    assert_eq!(p.take_sent(), vec!["FIRMWARE_RESTART"]);
}

#[test]
fn test_rejected_inputs_leave_files_untouched() {
    let p = Printer::new();
    p.material("BAD001", "#BAD002\n");

    for (code, check) in [
        ("pla001", "input"),
        ("PLA001x", "input"),
        ("TPU404", "lookup"),
        ("BAD001", "consistency"),
    ] {
        let err = p.switch(code).unwrap_err();
        match check {
            "input" => assert!(matches!(err, SwitchError::InvalidCode { .. })),
            "lookup" => assert!(matches!(err, SwitchError::FragmentMissing(_))),
            _ => assert!(matches!(err, SwitchError::FragmentCodeMismatch { .. })),
        }
        assert_eq!(p.main(), PRINTER_CFG);
        assert!(!p.cfg.backup_path().exists());
        assert!(p.take_sent().is_empty());
    }
}

#[test]
fn test_missing_command_pipe_fails_after_rewrite() {
    let p = Printer::new();
    p.material("ABS002", "#ABS002\n");
    fs::remove_file(&p.cfg.command_pipe).unwrap();

    let err = p.switch("ABS002").unwrap_err();
    assert!(matches!(err, SwitchError::Channel(_)));
    assert!(p.main().contains("[include MaterialSpecificConfigs/ABS002.cfg]"));
    assert!(!p.cfg.command_pipe.exists());
}

#[test]
fn test_catalog_reflects_switches() {
    let p = Printer::new();
    p.material("ABS002", "#ABS002\n# position_endstop_diff = 0.1\n");
    let pattern = p.cfg.code_pattern().unwrap();
    let dir = p.cfg.directory(Mode::Material);

    assert_eq!(active_code(&p.cfg.printer_config_file, dir, &pattern).unwrap().as_deref(), Some("PLA001"));
    let before = list_fragments(dir, &pattern).unwrap();
    assert!(before.iter().any(|f| f.code == "ABS002" && f.has_offset));

    p.switch("ABS002").unwrap();
    assert_eq!(active_code(&p.cfg.printer_config_file, dir, &pattern).unwrap().as_deref(), Some("ABS002"));
    let after = list_fragments(dir, &pattern).unwrap();
    assert!(after.iter().all(|f| !f.has_offset));
}

#[test]
#[serial]
fn test_config_loaded_from_xdg_location() {
    let dir = TempDir::new().unwrap();
    let cfg_dir = dir.path().join("klipswitch");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("config.json"),
        r#"{ "printer_config_file": "/home/pi/printer_data/config/printer.cfg", "code_example": "" }"#,
    )
    .unwrap();

    let old = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", dir.path());
    let path = config_path();
    let loaded = load_switch_config(&path);
    match old {
        Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(path, cfg_dir.join("config.json"));
    let cfg = loaded.unwrap();
    assert_eq!(cfg.printer_config_file, PathBuf::from("/home/pi/printer_data/config/printer.cfg"));
    assert_eq!(cfg.backup_path(), PathBuf::from("/home/pi/printer_data/config/printer.cfg.bup"));
    assert!(cfg.code_example.is_empty());
}

#[test]
fn test_cli_missing_code_prints_usage_and_pattern() {
    let p = Printer::new();
    let out = p.cli(&[]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr.contains("Usage:"), "stderr: {}", stderr);
    assert!(stderr.contains("Configured code regex is of form [A-Z]{3}[0-9]{3}"), "stderr: {}", stderr);
    assert!(stderr.contains("Example: PLA001"), "stderr: {}", stderr);
    assert_eq!(p.main(), PRINTER_CFG);
}

#[test]
fn test_cli_invalid_code_prints_pattern() {
    let p = Printer::new();
    let out = p.cli(&["pla001"]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr.contains("pla001"), "stderr: {}", stderr);
    assert!(stderr.contains("Configured code regex is of form [A-Z]{3}[0-9]{3}"), "stderr: {}", stderr);
    assert_eq!(p.main(), PRINTER_CFG);
    assert!(!p.cfg.backup_path().exists());
    assert!(p.take_sent().is_empty());
}

#[test]
fn test_cli_switch_succeeds() {
    let p = Printer::new();
    p.material("ABS002", "#ABS002\n# position_endstop_diff = 0.2\n");
    let out = p.cli(&["ABS002"]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("New include entry: [include MaterialSpecificConfigs/ABS002.cfg]"));
    assert!(p.main().contains("[include MaterialSpecificConfigs/ABS002.cfg]"));
    assert_eq!(fs::read_to_string(p.cfg.backup_path()).unwrap(), PRINTER_CFG);
    assert_eq!(
        p.take_sent(),
        vec!["SAVE_VARIABLE VARIABLE=z_offset VALUE=0.2", "FIRMWARE_RESTART"]
    );
}

#[test]
fn test_cli_offset_only_keeps_printer_config() {
    let p = Printer::new();
    let fragment = p.material("PET003", "#PET003\n# position_endstop_diff = -0.75\n");
    let out = p.cli(&["--offset-only", "PET003"]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(p.main(), PRINTER_CFG);
    assert!(!p.cfg.backup_path().exists());
    assert_eq!(p.take_sent(), vec!["SAVE_VARIABLE VARIABLE=z_offset VALUE=-0.75"]);
    assert_eq!(fs::read_to_string(&fragment).unwrap(), "#PET003\n# # position_endstop_diff = -0.75\n");

    // Already relocated: nothing left to send
    let out = p.cli(&["--offset-only", "PET003"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(p.take_sent().is_empty());
}
