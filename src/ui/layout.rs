use ratatui::layout::{Constraint, Direction, Layout, Rect};

const ROOMS_PANE_WIDTH: u16 = 24;

/// Screen regions for one frame: the room list down the left, then a
/// status line, the transcript, and the input box stacked on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub rooms: Rect,
    pub status: Rect,
    pub transcript: Rect,
    pub input: Rect,
}

pub fn split_chat_layout(area: Rect, input_rows: u16) -> ChatLayout {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(ROOMS_PANE_WIDTH), Constraint::Min(1)])
        .split(area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(input_rows.max(1)),
        ])
        .split(columns[1]);

    ChatLayout {
        rooms: columns[0],
        status: rows[0],
        transcript: rows[1],
        input: rows[2],
    }
}
