//! Key handling for the command panel
//!
//! Translates crossterm key events into panel operations for the current
//! mode. Returns whether the key was consumed so the caller can fall back
//! to browser keys while the panel is hidden.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::services::remote::RemoteTarget;
use crate::view::command_panel::{CommandPanel, PanelMode};

/// Handle a key for the panel. Returns true if it was consumed.
pub fn handle_panel_key(panel: &mut CommandPanel, event: &KeyEvent, target: &RemoteTarget) -> bool {
    if event.kind == KeyEventKind::Release {
        return false;
    }
    match panel.mode() {
        PanelMode::Hidden => false,
        PanelMode::Editing => {
            handle_editing_key(panel, event, target);
            true
        }
        PanelMode::Searching => {
            handle_search_key(panel, event);
            true
        }
        PanelMode::Paging => {
            handle_paging_key(panel, event);
            true
        }
    }
}

fn handle_editing_key(panel: &mut CommandPanel, event: &KeyEvent, target: &RemoteTarget) {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Enter => panel.submit(target),
        KeyCode::Esc => panel.dismiss(),
        KeyCode::Char('c') if ctrl => panel.dismiss(),
        KeyCode::Up => panel.history_prev(),
        KeyCode::Down => panel.history_next(),
        KeyCode::Char('p') if ctrl => panel.history_prev(),
        KeyCode::Char('n') if ctrl => panel.history_next(),
        _ => handle_line_key(panel, event),
    }
}

fn handle_search_key(panel: &mut CommandPanel, event: &KeyEvent) {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Enter => panel.confirm_search(),
        KeyCode::Esc => panel.cancel_search(),
        KeyCode::Char('c') if ctrl => panel.cancel_search(),
        _ => handle_line_key(panel, event),
    }
}

/// Editing keys shared by the command and search prompts
fn handle_line_key(panel: &mut CommandPanel, event: &KeyEvent) {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    match event.code {
        KeyCode::Char('a') if ctrl => panel.move_home(),
        KeyCode::Char('e') if ctrl => panel.move_end(),
        KeyCode::Char('b') if ctrl => panel.move_left(),
        KeyCode::Char('f') if ctrl => panel.move_right(),
        KeyCode::Char('u') if ctrl => panel.kill_to_start(),
        KeyCode::Char('k') if ctrl => panel.kill_to_end(),
        KeyCode::Char('w') if ctrl => panel.delete_word_backward(),
        KeyCode::Char('d') if ctrl => panel.delete(),
        KeyCode::Char('b') if alt => panel.move_word_left(),
        KeyCode::Char('f') if alt => panel.move_word_right(),
        KeyCode::Char(_) if ctrl || alt => {}
        KeyCode::Char(c) => panel.insert_char(c),
        KeyCode::Backspace if ctrl => panel.delete_word_backward(),
        KeyCode::Backspace => panel.backspace(),
        KeyCode::Delete => panel.delete(),
        KeyCode::Left if ctrl => panel.move_word_left(),
        KeyCode::Left => panel.move_left(),
        KeyCode::Right if ctrl => panel.move_word_right(),
        KeyCode::Right => panel.move_right(),
        KeyCode::Home => panel.move_home(),
        KeyCode::End => panel.move_end(),
        _ => {}
    }
}

fn handle_paging_key(panel: &mut CommandPanel, event: &KeyEvent) {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Char('c') if ctrl => {
            if !panel.cancel() {
                panel.dismiss();
            }
        }
        KeyCode::Esc | KeyCode::Char('q') => panel.dismiss(),
        KeyCode::Enter | KeyCode::Char(':') => panel.edit_next(),
        KeyCode::Char('/') => panel.begin_search(),
        KeyCode::Char('n') => panel.next_match(),
        KeyCode::Char('N') => panel.prev_match(),
        KeyCode::PageDown | KeyCode::Char(' ') | KeyCode::Char('f') => {
            panel.output_mut().page_down()
        }
        KeyCode::PageUp | KeyCode::Char('b') => panel.output_mut().page_up(),
        KeyCode::Down | KeyCode::Char('j') => panel.output_mut().scroll_by(1),
        KeyCode::Up | KeyCode::Char('k') => panel.output_mut().scroll_by(-1),
        KeyCode::Home | KeyCode::Char('g') => panel.output_mut().scroll_to_top(),
        KeyCode::End | KeyCode::Char('G') => panel.output_mut().scroll_to_bottom(),
        _ => {}
    }
}
