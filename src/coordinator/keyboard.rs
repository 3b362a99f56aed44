use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Camera commands bound to the keyboard
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MapCommand {
    /// Pan by a pixel offset
    Pan { dx: f64, dy: f64 },
    ZoomIn,
    ZoomOut,
    /// Back to the default center and zoom
    Reset,
}

/// Map a key press to a camera command. `step` is the pan distance in pixels.
pub fn command_for(key: &KeyEvent, step: f64) -> Option<MapCommand> {
    if key.kind != KeyEventKind::Press || key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    let command = match key.code {
        KeyCode::Left | KeyCode::Char('h') => MapCommand::Pan { dx: -step, dy: 0.0 },
        KeyCode::Right | KeyCode::Char('l') => MapCommand::Pan { dx: step, dy: 0.0 },
        KeyCode::Up | KeyCode::Char('k') => MapCommand::Pan { dx: 0.0, dy: -step },
        KeyCode::Down | KeyCode::Char('j') => MapCommand::Pan { dx: 0.0, dy: step },
        KeyCode::Char('+') | KeyCode::Char('=') => MapCommand::ZoomIn,
        KeyCode::Char('-') | KeyCode::Char('_') => MapCommand::ZoomOut,
        KeyCode::Char('r') | KeyCode::Char('0') => MapCommand::Reset,
        _ => return None,
    };
    Some(command)
}
