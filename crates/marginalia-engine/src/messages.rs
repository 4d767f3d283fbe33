use serde::Serialize;

use crate::models::SentenceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// What a message or emphasis points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Sentence,
    Remark,
}

/// Notification that a sentence or remark was created.
///
/// `id` is the id of the created sentence or remark; `sentence_id` is set for
/// remarks and names the owning sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewContent {
    pub text: String,
    pub sender: Sender,
    pub kind: ContentKind,
    pub id: String,
    pub sentence_id: Option<SentenceId>,
}

/// The companion panel listing sentences and remarks as a conversation
pub trait MessagePanel {
    fn on_new_content(&mut self, content: &NewContent);

    fn scroll_into_view(&mut self, message_id: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub kind: ContentKind,
    pub sentence_id: Option<SentenceId>,
}

/// Append-only in-memory [`MessagePanel`]
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    scroll_request: Option<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    /// Most recent scroll request, if any
    pub fn scroll_request(&self) -> Option<&str> {
        self.scroll_request.as_deref()
    }
}

impl MessagePanel for MessageLog {
    fn on_new_content(&mut self, content: &NewContent) {
        // Sentences always read as the user's, remarks as the AI's
        let sender = match content.kind {
            ContentKind::Sentence => Sender::User,
            ContentKind::Remark => Sender::Ai,
        };
        self.messages.push(Message {
            id: content.id.clone(),
            text: content.text.clone(),
            sender,
            kind: content.kind,
            sentence_id: content.sentence_id.clone(),
        });
    }

    fn scroll_into_view(&mut self, message_id: &str) {
        self.scroll_request = Some(message_id.to_string());
    }
}
