use crate::common::harness::RexTestHarness;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::style::Color;
use rex::view::command_panel::PanelMode;

fn output_lines(harness: &RexTestHarness) -> Vec<String> {
    let output = harness.app().panel().output();
    (0..output.total_lines())
        .filter_map(|i| output.plain_line(i).map(str::to_string))
        .collect()
}

#[test]
fn test_run_command_shows_output() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.create_file("a.txt", "").unwrap();
    harness.load().unwrap();

    harness.run_command("ls").unwrap();
    harness.wait_for_command().unwrap();

    harness.assert_screen_contains("$ ls");
    harness.assert_screen_contains("a.txt");
    harness.assert_screen_contains("Command finished");
    assert_eq!(harness.app().panel().mode(), PanelMode::Paging);
}

#[test]
fn test_command_runs_in_current_directory() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    let name = "a b;c$(x)'q\"r";
    harness.create_dir(name).unwrap();
    harness.load().unwrap();
    harness.select(name).unwrap();
    harness.press(KeyCode::Enter).unwrap();

    harness.run_command("pwd -P").unwrap();
    harness.wait_for_command().unwrap();

    let expected = harness.root().join(name).to_string_lossy().to_string();
    assert_eq!(output_lines(&harness)[1], expected);
}

#[test]
fn test_shell_syntax_is_interpreted_as_typed() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness
        .run_command("echo one > f.txt && cat f.txt | tr a-z A-Z")
        .unwrap();
    harness.wait_for_command().unwrap();

    assert_eq!(output_lines(&harness)[1], "ONE");
    assert!(harness.root().join("f.txt").exists());
}

#[test]
fn test_stderr_is_prefixed() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness.run_command("echo oops >&2").unwrap();
    harness.wait_for_command().unwrap();
    harness.assert_screen_contains("stderr: oops");
}

#[test]
fn test_exit_code_marker() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness.run_command("echo bye; exit 3").unwrap();
    harness.wait_for_command().unwrap();

    harness.assert_screen_contains("[exit 3]");
    harness.assert_screen_contains("Command failed (3)");
    harness.assert_screen_not_contains("[no output]");
}

#[test]
fn test_ansi_colors_are_rendered() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness
        .run_command("printf '\\033[31mred\\033[0m plain\\n'")
        .unwrap();
    harness.wait_for_command().unwrap();

    let row = harness
        .screen_lines()
        .iter()
        .position(|line| line == "red plain")
        .expect("output line on screen") as u16;
    let buffer = harness.buffer();
    assert_eq!(buffer[(0, row)].fg, Color::Red);
    assert_eq!(buffer[(4, row)].fg, Color::Reset);
}

#[test]
fn test_cancel_long_running_command() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness.run_command("echo started; sleep 30").unwrap();
    assert!(harness.app().panel().is_running());
    harness.assert_screen_contains("[running]");
    harness.assert_screen_contains("Ctrl-C cancel");

    harness
        .send_key(KeyCode::Char('c'), KeyModifiers::CONTROL)
        .unwrap();

    assert!(!harness.app().panel().is_running());
    assert_eq!(harness.app().panel().mode(), PanelMode::Editing);
    assert_eq!(output_lines(&harness).last().unwrap(), "[cancelled]");
    harness.assert_screen_contains("Command cancelled");
}

#[test]
fn test_history_recall_with_arrows() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness.run_command("echo first").unwrap();
    harness.wait_for_command().unwrap();
    harness.press(KeyCode::Enter).unwrap();
    harness.run_command("echo second").unwrap();
    harness.wait_for_command().unwrap();
    harness.press(KeyCode::Enter).unwrap();

    harness.type_text("draft").unwrap();
    harness.press(KeyCode::Up).unwrap();
    harness.press(KeyCode::Up).unwrap();
    assert_eq!(harness.app().panel().edit_text(), "echo first");
    harness.assert_screen_contains("$ echo first");

    harness.press(KeyCode::Down).unwrap();
    harness.press(KeyCode::Down).unwrap();
    assert_eq!(harness.app().panel().edit_text(), "draft");
}

#[test]
fn test_empty_command_keeps_prompt() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.load().unwrap();

    harness.run_command("  ").unwrap();
    assert_eq!(harness.app().panel().mode(), PanelMode::Editing);
    harness.assert_screen_contains("Empty command");
}

#[test]
fn test_close_panel_returns_to_browser() {
    let mut harness = RexTestHarness::new(100, 24).unwrap();
    harness.create_file("kept.txt", "").unwrap();
    harness.load().unwrap();

    harness.run_command("true").unwrap();
    harness.wait_for_command().unwrap();
    harness.assert_screen_contains("[no output]");

    harness.press(KeyCode::Char('q')).unwrap();
    assert_eq!(harness.app().panel().mode(), PanelMode::Hidden);
    assert!(!harness.app().should_quit());
    harness.assert_screen_contains("kept.txt");
}
