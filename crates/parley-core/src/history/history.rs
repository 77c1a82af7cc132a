use crate::providers::provider::Message;
use tracing::warn;

/// Append-only conversation log with one pinned system slot at index 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a history with prior messages.
    ///
    /// The first system message found is moved to the front; any later ones
    /// are dropped so the log never holds more than one.
    pub fn with_messages(seed: Vec<Message>) -> Self {
        let mut system = None;
        let mut rest = Vec::with_capacity(seed.len());
        for msg in seed {
            if !msg.is_system() {
                rest.push(msg);
            } else if system.is_none() {
                system = Some(msg);
            } else {
                warn!("dropping extra system message from seeded history");
            }
        }
        let mut messages = Vec::with_capacity(rest.len() + 1);
        messages.extend(system);
        messages.extend(rest);
        Self { messages }
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full log when `max_messages` is `None`; otherwise a window of at most
    /// `max_messages` entries that still starts with the system message.
    pub fn get_history(&self, max_messages: Option<usize>) -> Vec<Message> {
        let Some(max) = max_messages else {
            return self.messages.clone();
        };
        let keep = max.max(1) - 1;
        let start = self.messages.len().saturating_sub(keep);
        let mut window = Vec::with_capacity(keep + 1);
        if start > 0 {
            if let Some(system) = self.system_message() {
                window.push(system.clone());
            }
        }
        window.extend_from_slice(&self.messages[start..]);
        window
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.is_system())
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.messages.first_mut() {
            Some(first) if first.is_system() => first.content = text,
            _ => self.messages.insert(0, Message::system(text)),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for History {
    fn from(seed: Vec<Message>) -> Self {
        Self::with_messages(seed)
    }
}
