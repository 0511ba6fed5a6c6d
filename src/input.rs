//! Mapping of terminal input events to actions.

use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::action::{Action, Focus};

/// Map a key press to an action.
///
/// While the search field has focus every printable key edits the query and
/// no shortcut fires.
pub fn handle_key_event(
    code: KeyCode,
    modifiers: KeyModifiers,
    focus: Focus,
    show_help: bool,
) -> Action {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let command = ctrl || modifiers.contains(KeyModifiers::SUPER);

    if ctrl && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    if focus == Focus::Search {
        return handle_search_key(code, ctrl);
    }

    // Handle help overlay
    if show_help {
        return match code {
            KeyCode::Esc | KeyCode::Char('?') => Action::HideHelp,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::None,
        };
    }

    match code {
        KeyCode::Char('f') | KeyCode::Char('F') if command => Action::FocusSearch,
        KeyCode::Char('/') => Action::FocusSearch,
        KeyCode::Esc => Action::BlurSearch,

        // Playback
        KeyCode::Char(' ') => Action::PlayPause,
        KeyCode::Char('.') | KeyCode::Char('>') => Action::SeekForward,
        KeyCode::Char(',') | KeyCode::Char('<') => Action::SeekBackward,

        // Volume
        KeyCode::Up => Action::VolumeUp,
        KeyCode::Down => Action::VolumeDown,
        KeyCode::Char('m') => Action::ToggleMute,

        // Results
        KeyCode::Char('k') => Action::NavigateUp,
        KeyCode::Char('j') => Action::NavigateDown,
        KeyCode::Enter => Action::PlaySelected,

        // Toggles
        KeyCode::Char('l') => Action::ToggleLike,
        KeyCode::Char('s') => Action::ToggleShuffle,
        KeyCode::Char('r') => Action::ToggleRepeat,

        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char('q') => Action::Quit,

        _ => Action::None,
    }
}

/// Handle key events while typing in the search field.
fn handle_search_key(code: KeyCode, ctrl: bool) -> Action {
    match code {
        KeyCode::Char('u') if ctrl => Action::SearchClear,
        KeyCode::Char(_) if ctrl => Action::None,
        KeyCode::Char(c) => Action::SearchInput(c),
        KeyCode::Backspace => Action::SearchBackspace,
        KeyCode::Esc => Action::BlurSearch,
        KeyCode::Enter | KeyCode::Tab => Action::FocusResults,
        _ => Action::None,
    }
}

/// Handle mouse events.
pub fn handle_mouse_event(mouse: MouseEvent) -> Action {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Action::MouseDown(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => Action::MouseDrag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => Action::MouseUp(mouse.column, mouse.row),
        MouseEventKind::ScrollUp => Action::MouseScroll(-1, mouse.column, mouse.row),
        MouseEventKind::ScrollDown => Action::MouseScroll(1, mouse.column, mouse.row),
        _ => Action::None,
    }
}
