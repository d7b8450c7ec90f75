//! Plain-text rendering of view state

use crate::gateway::{AssistantModel, CollectionId, Message, Role};
use crate::session::{EmptyState, SessionSnapshot, SessionState, ViewState};

pub fn render_collections(view: &ViewState) -> String {
    if view.list_loading && view.collections.is_empty() {
        return "Loading collections...".to_string();
    }

    match &view.empty_state {
        EmptyState::NoCollections => {
            return "You don't have any collections yet. Create one with /new [name].".to_string()
        }
        EmptyState::NoMatches(term) => {
            return format!("No collections found matching \"{}\"", term)
        }
        EmptyState::None => {}
    }

    let id_width = view
        .collections
        .iter()
        .map(|row| row.id.as_str().len())
        .max()
        .unwrap_or(0);

    let mut lines = Vec::with_capacity(view.collections.len() + 1);
    lines.push("Your collections:".to_string());
    for row in &view.collections {
        let marker = if row.active { '*' } else { ' ' };
        let busy = if row.busy { "  (working...)" } else { "" };
        lines.push(format!(
            "{} {:<width$}  {}{}",
            marker,
            row.id.as_str(),
            row.display_name,
            busy,
            width = id_width
        ));
    }
    if view.list_loading {
        lines.push("(refreshing...)".to_string());
    }
    lines.join("\n")
}

pub fn render_message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    format!("{:>9} > {}", speaker, message.content)
}

pub fn render_model(model: Option<AssistantModel>) -> String {
    match model {
        Some(model) => format!("Model: {}", model.display_name()),
        None => "Model: server default".to_string(),
    }
}

/// Tracks what part of the session has already been printed, so each change
/// notification prints only what is new.
#[derive(Debug, Default)]
pub struct TranscriptCursor {
    collection_id: Option<CollectionId>,
    state: SessionState,
    printed: usize,
}

impl TranscriptCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print to bring the screen up to date with `session`.
    /// `title` names the open collection.
    pub fn advance(&mut self, session: &SessionSnapshot, title: Option<&str>) -> Vec<String> {
        let mut lines = Vec::new();

        // A new Loading phase means the transcript is being replaced, even
        // when the same collection is opened again.
        let reloading =
            session.state == SessionState::Loading && self.state != SessionState::Loading;
        if session.collection_id != self.collection_id || reloading {
            match (&session.collection_id, &self.collection_id) {
                (Some(id), _) => {
                    let title = title.unwrap_or(id.as_str());
                    lines.push(format!("=== {} ===", title));
                }
                (None, Some(_)) => lines.push("Collection closed.".to_string()),
                (None, None) => {}
            }
            self.collection_id = session.collection_id.clone();
            self.printed = 0;
        }

        if session.state != self.state {
            match session.state {
                SessionState::Loading => lines.push("Loading history...".to_string()),
                SessionState::Ready if self.state == SessionState::Loading => {
                    if session.history.is_empty() {
                        lines.push("No messages yet. Say something!".to_string());
                    }
                }
                _ => {}
            }
            self.state = session.state;
        }

        // History only grows within one collection; a shorter one means it
        // was replaced.
        if session.history.len() < self.printed {
            self.printed = 0;
        }
        for message in &session.history[self.printed..] {
            lines.push(render_message(message));
        }
        self.printed = session.history.len();

        lines
    }
}
