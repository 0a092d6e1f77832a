#[path = "../../oblivion_core/tests/support/mod.rs"]
mod support;

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use oblivion_core::records::types::{BOOK, CREA};
use serde_json::Value;
use support::SaveBuilder;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_oblivion-se"))
        .args(args)
        .output()
        .expect("failed to run oblivion-se CLI")
}

fn temp_save_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}.ess", std::process::id(), nanos))
}

fn write_save(prefix: &str, builder: &SaveBuilder) -> PathBuf {
    let path = temp_save_path(prefix);
    std::fs::write(&path, builder.build()).expect("failed to write temp save");
    path
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn cli_prints_single_name_field() {
    let path = write_save("oblivion_name", &SaveBuilder::new());
    let output = run_cli(&["--name", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "name=Hero");
}

#[test]
fn cli_prints_multiple_requested_fields_in_fixed_order() {
    let path = write_save("oblivion_multi", &SaveBuilder::new());
    let path_arg = path.to_string_lossy();
    let output = run_cli(&["--save-number", "--cell", "--level", &path_arg]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "level=12",
            "cell=Imperial City Market District",
            "save_number=7",
        ]
    );
}

#[test]
fn cli_prints_plugins_and_record_counts() {
    let builder = SaveBuilder::new()
        .plugin("Knights.esp")
        .change(0x0000_2001, BOOK, 0, &[])
        .change(0x0000_2002, BOOK, 0, &[])
        .change(0x0000_3001, CREA, 0, &[]);
    let path = write_save("oblivion_counts", &builder);
    let output = run_cli(&["--plugins", "--record-counts", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "plugins=Oblivion.esm,Knights.esp",
            "record_counts=BOOK:2,CREA:1",
        ]
    );
}

#[test]
fn cli_without_field_flags_prints_summary() {
    let path = write_save("oblivion_summary", &SaveBuilder::new());
    let output = run_cli(&[&path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Hero"));
    assert!(text.contains("Imperial City Market District"));
    assert!(text.contains("Oblivion.esm"));
}

#[test]
fn cli_json_full_contains_header_values() {
    let path = write_save("oblivion_json_full", &SaveBuilder::new());
    let output = run_cli(&["--json", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout)
        .expect("stdout should be JSON");
    assert_eq!(json["name"], "Hero");
    assert_eq!(json["level"], 12);
    assert_eq!(json["save_number"], 7);
    assert_eq!(json["plugins"][0], "Oblivion.esm");
}

#[test]
fn cli_json_selected_only_contains_requested_keys() {
    let path = write_save("oblivion_json_selected", &SaveBuilder::new());
    let output = run_cli(&["--json", "--name", "--level", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout)
        .expect("stdout should be JSON");
    let object = json.as_object().expect("json should be an object");
    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["name", "level"]);
}

#[test]
fn cli_layout_lists_sections() {
    let path = write_save("oblivion_layout", &SaveBuilder::new());
    let output = run_cli(&["--layout", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let text = stdout(&output);
    let first = text.lines().next().unwrap_or_default();
    assert!(first.starts_with("section"));
    assert!(text.contains("change records"));
    assert!(text.contains("world spaces"));
}

#[test]
fn cli_layout_json_reports_file_length() {
    let builder = SaveBuilder::new();
    let len = builder.build().len();
    let path = write_save("oblivion_layout_json", &builder);
    let output = run_cli(&["--layout", "--json", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout)
        .expect("stdout should be JSON");
    assert_eq!(json["file_len"], len);
    assert!(json["sections"].as_array().is_some_and(|s| !s.is_empty()));
}

#[test]
fn cli_missing_file_exits_with_one() {
    let path = temp_save_path("oblivion_missing");
    let output = run_cli(&["--name", &path.to_string_lossy()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error opening save file"));
}

#[test]
fn cli_bad_magic_exits_with_one() {
    let path = temp_save_path("oblivion_bad_magic");
    let mut bytes = SaveBuilder::new().build();
    bytes[0] = b'X';
    std::fs::write(&path, bytes).expect("failed to write temp save");
    let output = run_cli(&[&path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn cli_field_flags_with_record_dump_exit_with_two() {
    let path = write_save("oblivion_conflict", &SaveBuilder::new());
    let output = run_cli(&["--name", "--change-records", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_layout_with_field_flags_exits_with_two() {
    let path = write_save("oblivion_layout_conflict", &SaveBuilder::new());
    let output = run_cli(&["--layout", "--level", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(2));
}
