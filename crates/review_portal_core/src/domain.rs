//! crates/review_portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the review workflow.
//! These structs are independent of any database or transport format;
//! the serde derives exist because the same shapes travel as JSON
//! payloads and JSONB columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{ArticleStatus, ReviewType};

/// Identity of the person writing comments and edit suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub name: String,
    pub email: String,
}

/// A contact record from the client-side allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub client_id: Uuid,
    pub client_name: String,
}

/// Heading rank of an outline section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

/// One outline unit. Array position is document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub level: HeadingLevel,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_words: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Header,
    Paragraph,
    Quote,
    Image,
}

/// One content unit. Array position is document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub text: String,
}

/// An article outline: either structured sections or legacy markdown
/// text from before the structured editor existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OutlineContent {
    Structured { sections: Vec<Section> },
    Markdown { text: String },
}

/// An article body: structured blocks or legacy markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum BodyContent {
    Structured { blocks: Vec<Block> },
    Markdown { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Add,
    Modify,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A proposed modification to a Section or Block, created by a reviewer.
///
/// Persisted independently of the draft it was written in: it survives
/// draft deletion until the agency side resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSuggestion {
    pub id: Uuid,
    /// References a Section or Block id.
    pub target_id: String,
    pub action: EditAction,
    /// Snapshot of the target before the edit. Absent for `Add`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,
    /// Proposed new value. Absent for `Delete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_content: Option<String>,
    pub author: Reviewer,
    pub created_at: DateTime<Utc>,
    pub status: EditStatus,
}

/// A note attached to a Section or Block. Does not mutate its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub target_id: String,
    pub author: Reviewer,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

/// The decision a reviewer recorded on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approved,
    RevisionRequested,
    Rejected,
}

/// The feedback payload attached to an Article by one submission round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFeedback {
    pub action: ReviewAction,
    /// Email of the submitting reviewer.
    pub reviewer: String,
    pub submitted_at: DateTime<Utc>,
    pub round: u32,
    pub comments: Vec<Comment>,
    pub general_comment: String,
    /// Every edit suggestion that was pending at submission time.
    pub edits: Vec<EditSuggestion>,
}

/// A previous round's feedback, moved into `revision_history`.
/// The original round number is preserved inside `feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedFeedback {
    pub feedback: ReviewFeedback,
    pub archived_at: DateTime<Utc>,
}

/// The unit of review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    /// Access-control scope; reviewers are granted access per campaign.
    pub campaign_id: Uuid,
    pub title: String,
    pub status: ArticleStatus,
    pub proposed_titles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<OutlineContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<BodyContent>,
    /// The current round's feedback, if a review has been submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_comments: Option<ReviewFeedback>,
    /// Archived rounds, oldest first.
    pub revision_history: Vec<ArchivedFeedback>,
    /// Always `revision_history.len() + 1` after any submission.
    pub revision_round: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Key of the single live draft per reviewer and review phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftKey {
    pub article_id: Uuid,
    pub reviewer_email: String,
    pub review_type: ReviewType,
}

/// In-progress, unsubmitted reviewer state. Upserted on every autosave,
/// deleted on successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub key: DraftKey,
    pub edits: Vec<EditSuggestion>,
    pub comments: Vec<Comment>,
    /// Free-form selections (e.g. highlighted title texts); opaque here.
    pub selections: Vec<String>,
    pub general_comment: String,
    pub updated_at: DateTime<Utc>,
}

/// Derived record: a reviewer whose draft was touched recently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveReviewer {
    pub email: String,
    /// Resolved from the contact directory; falls back to the email.
    pub display_name: String,
    pub review_type: ReviewType,
    pub last_active_at: DateTime<Utc>,
}
