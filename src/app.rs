use chrono::Local;
use ratatui::layout::Rect;
use tracing::{error, info, warn};

use crate::identity::{self, Identity};
use crate::message::{ChatMessage, ClientFrame};
use crate::session::{Session, SessionEvent};
use crate::storage::LocalStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First-run dialog asking for a display name.
    NamePrompt,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No session was ever started (no endpoint configured).
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character-based cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn reset(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub mode: Mode,
    pub status: ConnectionStatus,

    // Identity
    pub user_name: String,
    pub name_input: TextInput,
    pub name_fallback: String,

    // Composer
    pub input: TextInput,

    // Server-authoritative message list
    pub messages: Vec<ChatMessage>,
    pub scroll_back: u16, // lines scrolled up from the newest message
    pub messages_area: Option<Rect>,

    // Animation state for entries still marked as sending
    pub animation_frame: u8,

    session: Option<Session>,
    storage: LocalStorage,
}

impl App {
    pub fn new(storage: LocalStorage) -> Self {
        let (mode, user_name, name_fallback) = match identity::resolve(&storage) {
            Identity::Known(name) => (Mode::Chat, name, String::new()),
            Identity::Unknown { fallback } => (Mode::NamePrompt, String::new(), fallback),
        };

        Self {
            should_quit: false,
            mode,
            status: ConnectionStatus::Idle,
            user_name,
            name_input: TextInput::with_value(&name_fallback),
            name_fallback,
            input: TextInput::default(),
            messages: Vec::new(),
            scroll_back: 0,
            messages_area: None,
            animation_frame: 0,
            session: None,
            storage,
        }
    }

    /// Attach the session opened for this activation of the view.
    pub fn activate(&mut self, session: Session) {
        self.status = if session.is_open() {
            ConnectionStatus::Open
        } else {
            ConnectionStatus::Connecting
        };
        self.session = Some(session);
    }

    /// Release the session, if any. Safe to call more than once.
    pub async fn deactivate(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        if self.status != ConnectionStatus::Idle {
            self.status = ConnectionStatus::Closed;
        }
    }

    pub fn server_url(&self) -> Option<&str> {
        self.session.as_ref().map(Session::url)
    }

    pub fn apply_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened => self.status = ConnectionStatus::Open,
            SessionEvent::Messages(messages) => {
                // Every frame is the whole list; nothing local survives it.
                self.messages = messages;
            }
            SessionEvent::Error(e) => warn!("session error: {}", e),
            SessionEvent::Closed => self.status = ConnectionStatus::Closed,
        }
    }

    /// Accept the name typed into the onboarding dialog.
    pub fn confirm_name(&mut self) {
        let answer = self.name_input.value.clone();
        self.adopt_name(Some(&answer));
    }

    /// Dismiss the onboarding dialog, falling back to the generated name.
    pub fn dismiss_name(&mut self) {
        self.adopt_name(None);
    }

    fn adopt_name(&mut self, answer: Option<&str>) {
        let name = match identity::adopt(&mut self.storage, answer, &self.name_fallback) {
            Ok(name) => name,
            Err(e) => {
                error!(path = %self.storage.path().display(), "failed to store display name: {}", e);
                identity::choose(answer, &self.name_fallback)
            }
        };
        info!(%name, "display name adopted");
        self.user_name = name;
        self.name_input.reset();
        self.mode = Mode::Chat;
    }

    /// Send the composed message. Blank input is ignored and left in place.
    pub fn submit(&mut self) {
        if self.input.value.trim().is_empty() {
            return;
        }

        let message = ChatMessage::compose(&self.user_name, &self.input.value, &Local::now());
        if let Some(session) = &self.session {
            session.send(&ClientFrame::Message(message));
        }
        // The list only changes when the server rebroadcasts it.
        self.input.reset();
        self.scroll_back = 0;
    }

    pub fn clear_all(&mut self) {
        if let Some(session) = &self.session {
            session.send(&ClientFrame::ClearAll);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.sending)
    }

    pub fn tick_animation(&mut self) {
        if self.has_pending() {
            self.animation_frame = (self.animation_frame + 1) % 2;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }
}
