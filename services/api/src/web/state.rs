//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use review_portal_core::engine::ReviewEngine;
use review_portal_core::ports::{
    AccessControl, ArticleStore, AuthSessionStore, ContactDirectory, EditStore,
    TitleSuggestionService,
};
use std::sync::Arc;
use uuid::Uuid;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: ReviewEngine,
    pub articles: Arc<dyn ArticleStore>,
    pub edits: Arc<dyn EditStore>,
    pub access: Arc<dyn AccessControl>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub auth_sessions: Arc<dyn AuthSessionStore>,
    /// Absent when no OpenAI key is configured; the title-ideas endpoint
    /// answers 503 in that case.
    pub titles: Option<Arc<dyn TitleSuggestionService>>,
    pub config: Arc<Config>,
}

/// The authenticated caller, resolved by the session middleware and
/// inserted into request extensions.
#[derive(Debug, Clone)]
pub struct ReviewerIdentity {
    pub name: String,
    pub email: String,
    pub client_id: Uuid,
}
