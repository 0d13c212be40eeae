use crate::api::{ApiClient, StreamReader, StreamUpdate};
use crate::config::Config;
use crate::state::{Phase, Session, TypingAnimator, TYPING_BATCH_SIZE};
use crate::types::{
    ChatTurn, Chatroom, MovieSummary, STATUS_DATABASE, STATUS_ERROR, STATUS_ORGANIZING,
    STATUS_PREPARING, STATUS_SEARCHING,
};
use crate::ui::input_metrics::clamp_to_char_boundary_left;
use crate::ui::layout::split_chat_layout;
use crate::ui::render::{
    input_visual_rows, render_input, render_recommend_modal, render_rooms, render_status_line,
    render_transcript,
};
use crate::util::parse_bool_flag;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const ANIMATION_TICK_INTERVAL: Duration = Duration::from_millis(16);
const TYPING_BATCH_ENV: &str = "REEL_TYPING_BATCH";
const DISABLE_TYPING_ENV: &str = "REEL_DISABLE_TYPING";
const MAX_TYPING_BATCH: usize = 64;
const SCROLL_STEP: usize = 3;

/// Everything the event loop reacts to besides terminal input: stream
/// traffic from the active send, and results of background fetches.
pub enum UiUpdate {
    Stream(StreamUpdate),
    RoomsLoaded(Vec<Chatroom>),
    HistoryLoaded { room_id: u64, turns: Vec<ChatTurn> },
    RecommendationsLoaded { room_id: u64, movies: Vec<MovieSummary> },
    FetchFailed { what: &'static str, detail: String },
}

pub struct App {
    client: ApiClient,
    update_tx: mpsc::UnboundedSender<UiUpdate>,
    update_rx: mpsc::UnboundedReceiver<UiUpdate>,
    session: Session,
    animator: TypingAnimator,
    typing_disabled: bool,
    rooms: Vec<Chatroom>,
    selected_room: usize,
    transcript: Vec<ChatTurn>,
    recommendations: Vec<MovieSummary>,
    recommend_open: bool,
    notice: Option<String>,
    input_buffer: String,
    cursor_byte: usize,
    scroll_offset: usize,
    next_stream_id: u64,
    should_quit: bool,
    terminal: crate::terminal::TerminalType,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let client = ApiClient::new(&config);
        let terminal = crate::terminal::setup()?;

        let app = Self {
            client,
            update_tx,
            update_rx,
            session: Session::new(0),
            animator: TypingAnimator::new(resolve_typing_batch()),
            typing_disabled: typing_disabled(),
            rooms: Vec::new(),
            selected_room: 0,
            transcript: Vec::new(),
            recommendations: Vec::new(),
            recommend_open: false,
            notice: None,
            input_buffer: String::new(),
            cursor_byte: 0,
            scroll_offset: 0,
            next_stream_id: 0,
            should_quit: false,
            terminal,
        };
        app.spawn_rooms_fetch();
        Ok(app)
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tick = tokio::time::interval(ANIMATION_TICK_INTERVAL);
        while !self.should_quit {
            self.draw_frame()?;
            self.process_terminal_events()?;

            tokio::select! {
                _ = tick.tick() => {
                    self.on_animation_tick();
                }
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
                update = self.update_rx.recv() => {
                    if let Some(update) = update {
                        self.handle_update(update);
                    }
                }
            }
        }

        self.session.cancel();
        crate::terminal::restore()?;
        Ok(())
    }

    fn on_animation_tick(&mut self) {
        if self.session.needs_animation() {
            let now = Instant::now();
            if self.typing_disabled {
                let all = self.session.queue_mut().drain(usize::MAX);
                if !all.is_empty() {
                    self.session.append_visible(&all.concat());
                }
            } else if let Some(batch) = self.animator.poll(now, self.session.queue_mut()) {
                self.session.append_visible(&batch);
            }
        }

        if let Some(invalidations) = self.session.try_finalize() {
            for invalidation in invalidations {
                match invalidation {
                    crate::state::Invalidation::Transcript(room_id) => {
                        self.spawn_history_fetch(room_id)
                    }
                    crate::state::Invalidation::Recommendations(room_id) => {
                        self.spawn_recommendations_fetch(room_id)
                    }
                    crate::state::Invalidation::ChatroomList => self.spawn_rooms_fetch(),
                }
            }
        }
    }

    fn handle_update(&mut self, update: UiUpdate) {
        match update {
            UiUpdate::Stream(stream_update) => {
                self.session.apply(stream_update);
            }
            UiUpdate::RoomsLoaded(rooms) => {
                let first_load = self.rooms.is_empty() && !rooms.is_empty();
                self.rooms = rooms;
                if self.selected_room >= self.rooms.len() {
                    self.selected_room = self.rooms.len().saturating_sub(1);
                }
                if first_load {
                    self.activate_selected_room();
                }
            }
            UiUpdate::HistoryLoaded { room_id, turns } => {
                if room_id == self.session.room_id() {
                    self.transcript = turns;
                    // The refreshed history now covers the streamed reply.
                    self.session.clear_visible();
                }
            }
            UiUpdate::RecommendationsLoaded { room_id, movies } => {
                if room_id == self.session.room_id() {
                    self.recommendations = movies;
                }
            }
            UiUpdate::FetchFailed { what, detail } => {
                self.notice = Some(format!("{what} failed: {detail}"));
            }
        }
    }

    fn submit(&mut self) {
        let text = self.input_buffer.trim().to_string();
        if !self.session.can_submit(&text) {
            return;
        }

        self.input_buffer.clear();
        self.cursor_byte = 0;
        self.notice = None;
        self.next_stream_id += 1;
        let stream_id = self.next_stream_id;

        let (stream_tx, mut stream_rx) = mpsc::unbounded_channel::<StreamUpdate>();
        let forward_tx = self.update_tx.clone();
        tokio::spawn(async move {
            while let Some(update) = stream_rx.recv().await {
                let _ = forward_tx.send(UiUpdate::Stream(update));
            }
        });

        let handle = StreamReader::open(
            self.client.clone(),
            self.session.room_id(),
            text.clone(),
            stream_id,
            stream_tx,
        );
        self.session.begin_send(text, stream_id, handle);
        self.animator.reset(Instant::now());
        self.scroll_offset = 0;
    }

    /// Tears down the current room's state and loads the newly selected
    /// one. Any in-flight stream is silently abandoned.
    fn activate_selected_room(&mut self) {
        let Some(room) = self.rooms.get(self.selected_room) else {
            return;
        };
        let room_id = room.id;

        self.session.cancel();
        self.session = Session::new(room_id);
        self.transcript.clear();
        self.recommendations.clear();
        self.recommend_open = false;
        self.scroll_offset = 0;
        self.spawn_history_fetch(room_id);
        self.spawn_recommendations_fetch(room_id);
    }

    fn select_room_offset(&mut self, offset: isize) {
        if self.rooms.is_empty() {
            return;
        }
        let last = self.rooms.len() as isize - 1;
        let next = (self.selected_room as isize + offset).clamp(0, last) as usize;
        if next != self.selected_room {
            self.selected_room = next;
            self.activate_selected_room();
        }
    }

    fn spawn_rooms_fetch(&self) {
        let client = self.client.clone();
        let tx = self.update_tx.clone();
        tokio::spawn(async move {
            match client.fetch_chatrooms().await {
                Ok(rooms) => {
                    let _ = tx.send(UiUpdate::RoomsLoaded(rooms));
                }
                Err(error) => {
                    let _ = tx.send(UiUpdate::FetchFailed {
                        what: "room list",
                        detail: error.to_string(),
                    });
                }
            }
        });
    }

    fn spawn_history_fetch(&self, room_id: u64) {
        let client = self.client.clone();
        let tx = self.update_tx.clone();
        tokio::spawn(async move {
            match client.fetch_history(room_id).await {
                Ok(turns) => {
                    let _ = tx.send(UiUpdate::HistoryLoaded { room_id, turns });
                }
                Err(error) => {
                    let _ = tx.send(UiUpdate::FetchFailed {
                        what: "history",
                        detail: error.to_string(),
                    });
                }
            }
        });
    }

    fn spawn_recommendations_fetch(&self, room_id: u64) {
        let client = self.client.clone();
        let tx = self.update_tx.clone();
        tokio::spawn(async move {
            match client.fetch_recommendations(room_id).await {
                Ok(movies) => {
                    let _ = tx.send(UiUpdate::RecommendationsLoaded { room_id, movies });
                }
                Err(error) => {
                    let _ = tx.send(UiUpdate::FetchFailed {
                        what: "recommendations",
                        detail: error.to_string(),
                    });
                }
            }
        });
    }

    fn process_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Paste(text) => {
                    if !self.recommend_open && !text.is_empty() {
                        self.insert_str(&text);
                    }
                }
                Event::Key(key)
                    if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat =>
                {
                    self.handle_key_event(key);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if self.recommend_open {
            match key.code {
                KeyCode::Esc => self.recommend_open = false,
                KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.recommend_open = false;
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true;
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.recommend_open = true;
                self.session.dismiss_recommendations();
                self.spawn_recommendations_fetch(self.session.room_id());
            }
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_str("\n");
            }
            KeyCode::Up if key.modifiers.contains(KeyModifiers::ALT) => {
                self.select_room_offset(-1);
            }
            KeyCode::Down if key.modifiers.contains(KeyModifiers::ALT) => {
                self.select_room_offset(1);
            }
            KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP);
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(SCROLL_STEP);
            }
            KeyCode::Esc => {
                if self.session.phase() == Phase::Error {
                    self.session.dismiss_error();
                } else if self.notice.is_some() {
                    self.notice = None;
                } else {
                    self.input_buffer.clear();
                    self.cursor_byte = 0;
                }
            }
            KeyCode::Home => self.cursor_byte = 0,
            KeyCode::End => self.cursor_byte = self.input_buffer.len(),
            KeyCode::Left => self.cursor_byte = self.prev_char_boundary(self.cursor_byte),
            KeyCode::Right => self.cursor_byte = self.next_char_boundary(self.cursor_byte),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.insert_str("\n");
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.insert_str(&ch.to_string());
            }
            _ => {}
        }
    }

    fn insert_str(&mut self, value: &str) {
        let cursor = clamp_to_char_boundary_left(&self.input_buffer, self.cursor_byte);
        self.input_buffer.insert_str(cursor, value);
        self.cursor_byte = cursor + value.len();
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = clamp_to_char_boundary_left(&self.input_buffer, idx);
        if i == 0 {
            return 0;
        }
        let mut j = i - 1;
        while j > 0 && !self.input_buffer.is_char_boundary(j) {
            j -= 1;
        }
        j
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = clamp_to_char_boundary_left(&self.input_buffer, idx);
        match self.input_buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.input_buffer.len(),
        }
    }

    fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.input_buffer, self.cursor_byte);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.input_buffer.replace_range(start..end, "");
        self.cursor_byte = start;
    }

    fn delete_forward(&mut self) {
        let start = clamp_to_char_boundary_left(&self.input_buffer, self.cursor_byte);
        if start >= self.input_buffer.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.input_buffer.replace_range(start..end, "");
        self.cursor_byte = start;
    }

    fn status_line_text(&self) -> String {
        let room = self
            .rooms
            .get(self.selected_room)
            .map(|room| room.name.as_str())
            .unwrap_or("no room");

        if let Some(notice) = &self.notice {
            return format!("{room} | {notice}");
        }
        if self.session.phase() == Phase::Error {
            let detail = self
                .session
                .last_error()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "something went wrong".to_string());
            return format!("{room} | {detail} (esc to dismiss, enter to retry)");
        }
        if let Some(progress) = server_status_text(self.session.server_status()) {
            return format!("{room} | {progress}");
        }
        if self.session.recommendations_ready() {
            return format!("{room} | recommendations ready (ctrl+r)");
        }
        format!("{room} | ready")
    }

    fn transcript_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for turn in &self.transcript {
            if let Some(user) = &turn.user_message {
                lines.push(format!("> {user}"));
            }
            if let Some(assistant) = &turn.ai_message {
                lines.push(assistant.clone());
            }
            lines.push(String::new());
        }

        if self.session.is_busy() {
            lines.push(format!("> {}", self.session.pending_user_text()));
        }
        if !self.session.visible_assistant_text().is_empty() {
            lines.push(self.session.visible_assistant_text().to_string());
        }
        lines
    }

    fn draw_frame(&mut self) -> Result<()> {
        let status = self.status_line_text();
        let lines = self.transcript_lines();
        let input = self.input_buffer.clone();
        let cursor_byte = self.cursor_byte;
        let scroll_offset = self.scroll_offset;
        let rooms = self.rooms.clone();
        let selected_room = self.selected_room;
        let recommendations_ready = self.session.recommendations_ready();
        let recommend_modal = self
            .recommend_open
            .then(|| self.recommendations.clone());

        self.terminal.draw(|frame| {
            let area = frame.area();
            let input_width = area.width.saturating_sub(26).max(1) as usize;
            let input_rows = input_visual_rows(&input, input_width).min(8) as u16;
            let panes = split_chat_layout(area, input_rows);

            render_rooms(
                frame,
                panes.rooms,
                &rooms,
                selected_room,
                recommendations_ready,
            );
            render_status_line(frame, panes.status, &status);
            render_transcript(frame, panes.transcript, &lines, scroll_offset);
            render_input(frame, panes.input, &input, cursor_byte);

            if let Some(movies) = &recommend_modal {
                render_recommend_modal(frame, movies);
            }
        })?;

        Ok(())
    }
}

/// Progress wording for each code the backend announces mid-stream.
fn server_status_text(code: u8) -> Option<&'static str> {
    match code {
        STATUS_SEARCHING => Some("searching movie data..."),
        STATUS_PREPARING => Some("preparing a reply..."),
        STATUS_DATABASE => Some("checking the database..."),
        STATUS_ERROR => Some("temporary problem, try again"),
        STATUS_ORGANIZING => Some("organizing results..."),
        _ => None,
    }
}

fn resolve_typing_batch() -> usize {
    std::env::var(TYPING_BATCH_ENV)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .map(|value| value.clamp(1, MAX_TYPING_BATCH))
        .unwrap_or(TYPING_BATCH_SIZE)
}

fn typing_disabled() -> bool {
    std::env::var(DISABLE_TYPING_ENV)
        .ok()
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ENV_LOCK;
    use crate::types::STATUS_NONE;

    #[test]
    fn test_status_wording_covers_every_progress_code() {
        assert_eq!(server_status_text(STATUS_NONE), None);
        for code in [
            STATUS_SEARCHING,
            STATUS_PREPARING,
            STATUS_DATABASE,
            STATUS_ERROR,
            STATUS_ORGANIZING,
        ] {
            assert!(server_status_text(code).is_some(), "code {code} has no text");
        }
        assert_eq!(server_status_text(99), None);
    }

    #[test]
    fn test_typing_batch_env_is_clamped() {
        let _guard = ENV_LOCK.blocking_lock();
        std::env::remove_var(TYPING_BATCH_ENV);
        assert_eq!(resolve_typing_batch(), TYPING_BATCH_SIZE);

        std::env::set_var(TYPING_BATCH_ENV, "0");
        assert_eq!(resolve_typing_batch(), 1);

        std::env::set_var(TYPING_BATCH_ENV, "500");
        assert_eq!(resolve_typing_batch(), MAX_TYPING_BATCH);

        std::env::set_var(TYPING_BATCH_ENV, "5");
        assert_eq!(resolve_typing_batch(), 5);

        std::env::remove_var(TYPING_BATCH_ENV);
    }

    #[test]
    fn test_typing_disable_flag_parses_like_other_flags() {
        let _guard = ENV_LOCK.blocking_lock();
        std::env::remove_var(DISABLE_TYPING_ENV);
        assert!(!typing_disabled());

        std::env::set_var(DISABLE_TYPING_ENV, "1");
        assert!(typing_disabled());

        std::env::set_var(DISABLE_TYPING_ENV, "off");
        assert!(!typing_disabled());

        std::env::remove_var(DISABLE_TYPING_ENV);
    }
}
