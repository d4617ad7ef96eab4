//! crates/review_portal_core/src/status.rs
//!
//! The article lifecycle state machine: a closed status enumeration,
//! the legal forward transitions, and the total mapping from a status
//! to the (phase, approval state) pair the portal renders.

use serde::{Deserialize, Serialize};

/// Every lifecycle state an article can be in.
///
/// Three parallel phase tracks (titles, outline, content/draft), a
/// terminal `Published`, and the deprecated catch-all `NeedsRevision`
/// kept only so pre-existing rows stay readable. New code must never
/// write `NeedsRevision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    NeedsTitles,
    AwaitingReviewTitles,
    TitlesApproved,
    NeedsTitlesRevision,
    NeedsOutline,
    AwaitingReviewOutline,
    OutlineApproved,
    NeedsOutlineRevision,
    NeedsDraft,
    AwaitingReviewDraft,
    DraftApproved,
    NeedsDraftRevision,
    Published,
    /// Deprecated pre-phase-track value. Read-only.
    NeedsRevision,
}

/// The complete enumeration, used by totality tests and by the DB
/// adapter's text decoding.
pub const ALL_STATUSES: [ArticleStatus; 14] = [
    ArticleStatus::NeedsTitles,
    ArticleStatus::AwaitingReviewTitles,
    ArticleStatus::TitlesApproved,
    ArticleStatus::NeedsTitlesRevision,
    ArticleStatus::NeedsOutline,
    ArticleStatus::AwaitingReviewOutline,
    ArticleStatus::OutlineApproved,
    ArticleStatus::NeedsOutlineRevision,
    ArticleStatus::NeedsDraft,
    ArticleStatus::AwaitingReviewDraft,
    ArticleStatus::DraftApproved,
    ArticleStatus::NeedsDraftRevision,
    ArticleStatus::Published,
    ArticleStatus::NeedsRevision,
];

impl ArticleStatus {
    /// Wire/database name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::NeedsTitles => "needs_titles",
            ArticleStatus::AwaitingReviewTitles => "awaiting_review_titles",
            ArticleStatus::TitlesApproved => "titles_approved",
            ArticleStatus::NeedsTitlesRevision => "needs_titles_revision",
            ArticleStatus::NeedsOutline => "needs_outline",
            ArticleStatus::AwaitingReviewOutline => "awaiting_review_outline",
            ArticleStatus::OutlineApproved => "outline_approved",
            ArticleStatus::NeedsOutlineRevision => "needs_outline_revision",
            ArticleStatus::NeedsDraft => "needs_draft",
            ArticleStatus::AwaitingReviewDraft => "awaiting_review_draft",
            ArticleStatus::DraftApproved => "draft_approved",
            ArticleStatus::NeedsDraftRevision => "needs_draft_revision",
            ArticleStatus::Published => "published",
            ArticleStatus::NeedsRevision => "needs_revision",
        }
    }

    /// Parses a wire/database name.
    pub fn parse(s: &str) -> Option<ArticleStatus> {
        ALL_STATUSES.iter().copied().find(|v| v.as_str() == s)
    }

    /// True for the three states a client reviewer can act on.
    pub fn is_client_actionable(&self) -> bool {
        matches!(
            self,
            ArticleStatus::AwaitingReviewTitles
                | ArticleStatus::AwaitingReviewOutline
                | ArticleStatus::AwaitingReviewDraft
        )
    }

    /// Derives what the portal should render for this status. Pure and
    /// total: every status value, including the deprecated one, maps to
    /// exactly one pair.
    pub fn phase_view(&self) -> (ReviewPhase, ApprovalState) {
        match self {
            ArticleStatus::NeedsTitles => (ReviewPhase::Titles, ApprovalState::InPreparation),
            ArticleStatus::AwaitingReviewTitles => {
                (ReviewPhase::Titles, ApprovalState::AwaitingReview)
            }
            ArticleStatus::TitlesApproved => (ReviewPhase::Titles, ApprovalState::Approved),
            ArticleStatus::NeedsTitlesRevision => {
                (ReviewPhase::Titles, ApprovalState::ChangesRequested)
            }
            ArticleStatus::NeedsOutline => (ReviewPhase::Outline, ApprovalState::InPreparation),
            ArticleStatus::AwaitingReviewOutline => {
                (ReviewPhase::Outline, ApprovalState::AwaitingReview)
            }
            ArticleStatus::OutlineApproved => (ReviewPhase::Outline, ApprovalState::Approved),
            ArticleStatus::NeedsOutlineRevision => {
                (ReviewPhase::Outline, ApprovalState::ChangesRequested)
            }
            ArticleStatus::NeedsDraft => (ReviewPhase::Content, ApprovalState::InPreparation),
            ArticleStatus::AwaitingReviewDraft => {
                (ReviewPhase::Content, ApprovalState::AwaitingReview)
            }
            ArticleStatus::DraftApproved => (ReviewPhase::Content, ApprovalState::Approved),
            ArticleStatus::NeedsDraftRevision => {
                (ReviewPhase::Content, ApprovalState::ChangesRequested)
            }
            ArticleStatus::Published => (ReviewPhase::Content, ApprovalState::Approved),
            // Legacy rows predate the phase tracks; render them as
            // content needing changes.
            ArticleStatus::NeedsRevision => {
                (ReviewPhase::Content, ApprovalState::ChangesRequested)
            }
        }
    }
}

/// Which review track a status belongs to, as rendered by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPhase {
    Titles,
    Outline,
    Content,
}

/// The approval state of the current phase, as rendered by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    InPreparation,
    AwaitingReview,
    Approved,
    ChangesRequested,
}

/// The kind of review a client session performs. Keys drafts and edit
/// suggestions, and selects which awaiting state is actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    Titles,
    Outline,
    Content,
}

impl ReviewType {
    /// Wire/database name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::Titles => "titles",
            ReviewType::Outline => "outline",
            ReviewType::Content => "content",
        }
    }

    /// Parses a wire/database name.
    pub fn parse(s: &str) -> Option<ReviewType> {
        match s {
            "titles" => Some(ReviewType::Titles),
            "outline" => Some(ReviewType::Outline),
            "content" => Some(ReviewType::Content),
            _ => None,
        }
    }

    /// The status an article must hold for this review to be submittable.
    pub fn awaiting_status(&self) -> ArticleStatus {
        match self {
            ReviewType::Titles => ArticleStatus::AwaitingReviewTitles,
            ReviewType::Outline => ArticleStatus::AwaitingReviewOutline,
            ReviewType::Content => ArticleStatus::AwaitingReviewDraft,
        }
    }

    /// Transition target when the reviewer approves.
    ///
    /// Title approval never reaches this: it fans out into new articles
    /// instead of advancing the original (see the engine).
    pub fn approved_status(&self) -> ArticleStatus {
        match self {
            ReviewType::Titles => ArticleStatus::TitlesApproved,
            ReviewType::Outline => ArticleStatus::OutlineApproved,
            ReviewType::Content => ArticleStatus::DraftApproved,
        }
    }

    /// Transition target when the reviewer requests changes.
    pub fn revision_status(&self) -> ArticleStatus {
        match self {
            ReviewType::Titles => ArticleStatus::NeedsTitlesRevision,
            ReviewType::Outline => ArticleStatus::NeedsOutlineRevision,
            ReviewType::Content => ArticleStatus::NeedsDraftRevision,
        }
    }
}
