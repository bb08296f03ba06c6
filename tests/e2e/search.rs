use crate::common::harness::RexTestHarness;
use crossterm::event::KeyCode;
use ratatui::style::Color;
use rex::view::command_panel::PanelMode;

fn search(harness: &mut RexTestHarness, pattern: &str) {
    harness.press(KeyCode::Char('/')).unwrap();
    assert_eq!(harness.app().panel().mode(), PanelMode::Searching);
    harness.type_text(pattern).unwrap();
    harness.press(KeyCode::Enter).unwrap();
}

#[test]
fn test_paging_keys_move_by_page() {
    let mut harness = RexTestHarness::new(80, 24).unwrap();
    harness.load().unwrap();
    harness.run_command("seq 1 100").unwrap();
    harness.wait_for_command().unwrap();

    // 24 rows: title, border, 20 output rows, prompt, status
    harness.assert_screen_contains("Output 1-20/101");
    harness.press(KeyCode::PageDown).unwrap();
    harness.press(KeyCode::PageDown).unwrap();
    harness.assert_screen_contains("Output 41-60/101");

    for _ in 0..10 {
        harness.press(KeyCode::PageDown).unwrap();
    }
    harness.assert_screen_contains("Output 82-101/101");
    assert_eq!(harness.app().panel().output().scroll_offset(), 81);

    harness.press(KeyCode::PageUp).unwrap();
    assert_eq!(harness.app().panel().output().scroll_offset(), 61);
}

#[test]
fn test_search_reveals_and_highlights_match() {
    let mut harness = RexTestHarness::new(80, 24).unwrap();
    harness.load().unwrap();
    harness.run_command("seq 1 100").unwrap();
    harness.wait_for_command().unwrap();

    search(&mut harness, "77");
    harness.assert_screen_contains("Match 1/1 for '77'");

    let row = harness
        .screen_lines()
        .iter()
        .position(|line| line == "77")
        .expect("match scrolled into view") as u16;
    assert_eq!(harness.buffer()[(0, row)].bg, Color::LightRed);
}

#[test]
fn test_search_cycles_with_n() {
    let mut harness = RexTestHarness::new(80, 24).unwrap();
    harness.load().unwrap();
    // Uppercased so the echoed command line is not a match
    harness
        .run_command("seq 1 9 | sed 's/^/row/' | tr a-z A-Z")
        .unwrap();
    harness.wait_for_command().unwrap();

    search(&mut harness, "ROW");
    harness.assert_screen_contains("Match 1/9 for 'ROW'");
    harness.press(KeyCode::Char('n')).unwrap();
    harness.assert_screen_contains("Match 2/9 for 'ROW'");
    harness.press(KeyCode::Char('N')).unwrap();
    harness.press(KeyCode::Char('N')).unwrap();
    harness.assert_screen_contains("Match 9/9 for 'ROW'");
}

#[test]
fn test_search_without_matches_keeps_position() {
    let mut harness = RexTestHarness::new(80, 24).unwrap();
    harness.load().unwrap();
    harness.run_command("seq 1 100").unwrap();
    harness.wait_for_command().unwrap();
    harness.press(KeyCode::PageDown).unwrap();

    search(&mut harness, "zzz");
    harness.assert_screen_contains("No matches for 'zzz'");
    assert_eq!(harness.app().panel().output().scroll_offset(), 20);
}

#[test]
fn test_escape_leaves_search_prompt() {
    let mut harness = RexTestHarness::new(80, 24).unwrap();
    harness.load().unwrap();
    harness.run_command("seq 1 30").unwrap();
    harness.wait_for_command().unwrap();

    search(&mut harness, "2");
    let before = harness.app().panel().output().active_match_position();

    harness.press(KeyCode::Char('/')).unwrap();
    harness.type_text("29").unwrap();
    harness.assert_screen_contains("/29");
    harness.press(KeyCode::Esc).unwrap();

    assert_eq!(harness.app().panel().mode(), PanelMode::Paging);
    assert_eq!(harness.app().panel().output().search_pattern(), Some("2"));
    assert_eq!(
        harness.app().panel().output().active_match_position(),
        before
    );
}
