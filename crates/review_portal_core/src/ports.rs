//! crates/review_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the workflow core.
//! These traits form the boundary of the hexagonal architecture, keeping
//! the engine independent of the concrete storage, directory, and AI
//! collaborators behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ArchivedFeedback, Article, Contact, DraftKey, EditSuggestion, ReviewDraft, ReviewFeedback,
};
use crate::status::{ArticleStatus, ReviewType};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The failure taxonomy every operation reports. Failures are always
/// returned as values; nothing in the core panics across this boundary.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The referenced article/draft/contact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The requesting identity lacks access to the campaign/article.
    /// Never downgraded to NotFound.
    #[error("Access denied: {0}")]
    AccessDenied(String),
    /// A concurrent submission won the race, or an edit baseline
    /// diverged. Carries enough detail for the UI to prompt a reload.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The underlying storage call failed. Never retried by this core.
    #[error("Store failure: {0}")]
    Store(String),
    /// The caller passed a structurally invalid request; rejected
    /// before any store call is made.
    #[error("Validation failure: {0}")]
    Validation(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Filter / Update Types
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub campaign_id: Option<Uuid>,
    pub status: Option<ArticleStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOrder {
    UpdatedDesc,
    CreatedAsc,
}

/// Every field a review submission mutates, applied as ONE combined
/// write. The store must condition the write on `expected_status` still
/// being the article's current status and report [`PortError::Conflict`]
/// when it is not — the optimistic check that stops two racing
/// submissions from silently overwriting each other.
#[derive(Debug, Clone)]
pub struct ReviewStateUpdate {
    pub expected_status: ArticleStatus,
    pub new_status: ArticleStatus,
    pub client_comments: ReviewFeedback,
    pub revision_history: Vec<ArchivedFeedback>,
    pub revision_round: u32,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn get_article(&self, id: Uuid) -> PortResult<Article>;

    /// Applies a submission's combined update atomically (see
    /// [`ReviewStateUpdate`]).
    async fn update_review_state(&self, id: Uuid, update: ReviewStateUpdate) -> PortResult<()>;

    /// Inserts a batch of new articles; all-or-nothing.
    async fn insert_articles(&self, articles: Vec<Article>) -> PortResult<()>;

    async fn delete_article(&self, id: Uuid) -> PortResult<()>;

    async fn list_articles(
        &self,
        filter: ArticleFilter,
        order: ArticleOrder,
    ) -> PortResult<Vec<Article>>;
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Upsert keyed by (article, reviewer email, review type); last
    /// write wins, never accumulates duplicate rows.
    async fn upsert_draft(&self, draft: ReviewDraft) -> PortResult<()>;

    /// `Ok(None)` when no draft exists — absence is not an error.
    async fn get_draft(&self, key: &DraftKey) -> PortResult<Option<ReviewDraft>>;

    /// Idempotent; deleting a non-existent draft succeeds.
    async fn delete_draft(&self, key: &DraftKey) -> PortResult<()>;

    /// Drafts for an article updated at or after `updated_after`.
    async fn list_drafts(
        &self,
        article_id: Uuid,
        updated_after: DateTime<Utc>,
    ) -> PortResult<Vec<ReviewDraft>>;
}

#[async_trait]
pub trait EditStore: Send + Sync {
    /// Persists suggestions under (article, review type); all-or-nothing.
    async fn insert_edits(
        &self,
        article_id: Uuid,
        review_type: ReviewType,
        edits: Vec<EditSuggestion>,
    ) -> PortResult<()>;

    /// Pending suggestions for one article and review type.
    async fn list_pending_edits(
        &self,
        article_id: Uuid,
        review_type: ReviewType,
    ) -> PortResult<Vec<EditSuggestion>>;
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Display name for an email, `None` when unknown.
    async fn resolve_name(&self, email: &str) -> PortResult<Option<String>>;

    async fn resolve_contact(&self, email: &str) -> PortResult<Option<Contact>>;
}

#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Whether the email is allow-listed for the campaign.
    async fn verify_access(&self, email: &str, campaign_id: Uuid) -> PortResult<bool>;
}

#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn create_auth_session(
        &self,
        session_id: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the email bound to a live session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait TitleSuggestionService: Send + Sync {
    /// Proposes up to `count` alternative titles for an article brief.
    async fn suggest_titles(&self, brief: &str, count: u8) -> PortResult<Vec<String>>;
}
