//! Render-ready view state derived from registry and session snapshots.
//!
//! Pure functions of their inputs: nothing here calls the gateway or mutates
//! the registry or the session.

use crate::gateway::{CollectionId, Message};
use crate::session::controller::{SessionSnapshot, SessionState};
use crate::session::registry::RegistrySnapshot;
use crate::util::text::{truncate_display, MAX_NAME_COLUMNS};

/// One row of the collection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRow {
    pub id: CollectionId,
    /// Full, untruncated name
    pub name: String,
    /// Name truncated for display
    pub display_name: String,
    /// Row actions disabled while a delete/rename is outstanding
    pub busy: bool,
    /// This is the open collection
    pub active: bool,
}

/// What to show when the list has no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyState {
    None,
    NoCollections,
    NoMatches(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub collections: Vec<CollectionRow>,
    pub list_loading: bool,
    pub empty_state: EmptyState,
    pub session_state: SessionState,
    pub active_collection: Option<CollectionId>,
    /// Display title of the open collection
    pub active_title: Option<String>,
    pub transcript: Vec<Message>,
    pub input_disabled: bool,
}

impl ViewState {
    pub fn is_collection_busy(&self, id: &CollectionId) -> bool {
        self.collections.iter().any(|row| &row.id == id && row.busy)
    }
}

/// Holds the current search term and derives [`ViewState`].
#[derive(Debug, Clone, Default)]
pub struct ViewProjection {
    search_term: String,
}

impl ViewProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn clear_search(&mut self) {
        self.search_term.clear();
    }

    pub fn project(&self, registry: &RegistrySnapshot, session: &SessionSnapshot) -> ViewState {
        let active = session.collection_id.as_ref();

        let collections: Vec<CollectionRow> = registry
            .search(&self.search_term)
            .into_iter()
            .map(|c| CollectionRow {
                display_name: truncate_display(&c.name, MAX_NAME_COLUMNS),
                busy: registry.is_busy(&c.id),
                active: active == Some(&c.id),
                id: c.id,
                name: c.name,
            })
            .collect();

        let empty_state = if !collections.is_empty() || registry.loading {
            EmptyState::None
        } else if self.search_term.is_empty() {
            EmptyState::NoCollections
        } else {
            EmptyState::NoMatches(self.search_term.clone())
        };

        let active_title = active.map(|id| {
            registry
                .get(id)
                .map(|c| truncate_display(&c.name, MAX_NAME_COLUMNS))
                .unwrap_or_else(|| id.to_string())
        });

        ViewState {
            collections,
            list_loading: registry.loading,
            empty_state,
            session_state: session.state,
            active_collection: session.collection_id.clone(),
            active_title,
            transcript: session.history.clone(),
            input_disabled: input_disabled(session),
        }
    }
}

/// Input is disabled while a fetch or send is outstanding or nothing is open.
pub fn input_disabled(session: &SessionSnapshot) -> bool {
    session.state.is_pending() || session.collection_id.is_none()
}
