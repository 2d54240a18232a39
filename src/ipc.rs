//! The IPC command channel entry point. External tools deliver commands as a
//! client message carrying our command atom; the payload is one or more
//! semicolon-separated action lines in the same vocabulary keybinds use.

use tracing::warn;

use crate::config::action::Action;

/// Decodes a command payload. Unparsable commands are logged and dropped;
/// the remaining ones still run.
pub fn parse_commands(payload: &str) -> Vec<Action> {
    payload
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Action>() {
            Ok(action) => Some(action),
            Err(e) => {
                warn!(command = s, "ignoring IPC command: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::action::Direction;

    #[test]
    fn parses_multiple_commands() {
        let actions = parse_commands("navigate_left; goto_workspace:2");
        assert_eq!(
            actions,
            vec![Action::Navigate(Direction::Left), Action::GotoWorkspace(1)]
        );
    }

    #[test]
    fn bad_commands_are_dropped_good_ones_kept() {
        let actions = parse_commands("gibberish; kill;");
        assert_eq!(actions, vec![Action::Kill]);
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert!(parse_commands("").is_empty());
        assert!(parse_commands(" ; ; ").is_empty());
    }
}
