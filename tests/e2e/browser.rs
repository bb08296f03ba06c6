use std::collections::HashMap;

use crate::common::harness::RexTestHarness;
use crossterm::event::KeyCode;

#[test]
fn test_browser_lists_entries() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.create_dir("logs").unwrap();
    harness.create_file("readme.txt", "hello").unwrap();
    harness.load().unwrap();
    harness.render().unwrap();

    let root = harness.root().to_string_lossy().to_string();
    harness.assert_screen_contains(&format!("testhost:{root}"));
    harness.assert_screen_contains("../");
    harness.assert_screen_contains("logs/");
    harness.assert_screen_contains("readme.txt");
    harness.assert_screen_contains("q quit");
}

#[test]
fn test_enter_and_leave_directory() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.create_file("logs/app.log", "line").unwrap();
    harness.load().unwrap();

    harness.select("logs").unwrap();
    harness.press(KeyCode::Enter).unwrap();
    let logs = harness.root().join("logs");
    assert_eq!(harness.app().target().cwd(), logs.to_string_lossy());
    harness.assert_screen_contains("app.log");

    harness.press(KeyCode::Char('p')).unwrap();
    assert_eq!(
        harness.app().target().cwd(),
        harness.root().to_string_lossy()
    );
    harness.assert_screen_contains("logs/");
}

#[test]
fn test_vanished_directory_keeps_location() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.create_dir("gone").unwrap();
    harness.load().unwrap();
    std::fs::remove_dir(harness.root().join("gone")).unwrap();

    harness.select("gone").unwrap();
    harness.press(KeyCode::Enter).unwrap();

    assert_eq!(
        harness.app().target().cwd(),
        harness.root().to_string_lossy()
    );
    harness.assert_screen_contains("Error:");
    // The stale listing is still shown
    harness.assert_screen_contains("gone/");
}

#[test]
fn test_reload_picks_up_new_files() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();
    harness.render().unwrap();
    harness.assert_screen_not_contains("fresh.txt");

    harness.create_file("fresh.txt", "").unwrap();
    harness.press(KeyCode::Char('r')).unwrap();
    harness.assert_screen_contains("fresh.txt");
}

#[test]
fn test_edit_runs_resolved_editor() {
    let settings = HashMap::from([
        ("VISUAL".to_string(), String::new()),
        ("EDITOR".to_string(), "sh -c 'exit 3'".to_string()),
    ]);
    let mut harness = RexTestHarness::with_editor_settings(100, 24, settings).unwrap();
    harness.create_file("notes.txt", "todo").unwrap();
    harness.load().unwrap();

    harness.select("notes.txt").unwrap();
    harness.press(KeyCode::Char('e')).unwrap();
    let request = harness.app_mut().take_interactive_request().unwrap();
    assert!(request
        .line
        .as_str()
        .ends_with("'sh' '-c' 'exit 3' -- 'notes.txt'"));

    harness.app_mut().run_interactive(&request);
    assert_eq!(
        harness.app().status(),
        Some("edit notes.txt exited with 3")
    );
}

#[test]
fn test_broken_editor_setting_falls_back() {
    let settings = HashMap::from([
        ("VISUAL".to_string(), String::new()),
        ("EDITOR".to_string(), "foo \"bar".to_string()),
    ]);
    let mut harness = RexTestHarness::with_editor_settings(100, 24, settings).unwrap();
    harness.create_file("notes.txt", "todo").unwrap();
    harness.load().unwrap();

    harness.select("notes.txt").unwrap();
    harness.press(KeyCode::Char('e')).unwrap();
    let request = harness.app_mut().take_interactive_request().unwrap();
    assert!(request.line.as_str().ends_with("'vi' -- 'notes.txt'"));
}

#[test]
fn test_open_file_uses_pager() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.create_file("notes.txt", "todo").unwrap();
    harness.load().unwrap();

    harness.select("notes.txt").unwrap();
    harness.press(KeyCode::Enter).unwrap();
    let request = harness.app_mut().take_interactive_request().unwrap();
    assert_eq!(request.label, "view notes.txt");
    assert!(request.line.as_str().contains("less -- 'notes.txt'"));
}
