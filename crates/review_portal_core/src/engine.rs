//! crates/review_portal_core/src/engine.rs
//!
//! The review submission engine: gathers pending edits, archives the
//! previous feedback round, advances the status machine, and clears the
//! submitter's draft. Also owns draft autosave semantics and the
//! active-reviewer signal. All effects go through the ports, so the
//! engine itself is storage-agnostic.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    ActiveReviewer, ArchivedFeedback, Article, Comment, DraftKey, EditSuggestion, ReviewAction,
    ReviewDraft, ReviewFeedback, Reviewer,
};
use crate::ports::{
    ArticleStore, ContactDirectory, DraftStore, EditStore, PortError, PortResult,
    ReviewStateUpdate,
};
use crate::status::{ArticleStatus, ReviewType};

/// Drafts older than this no longer count as "actively reviewing".
const ACTIVE_REVIEWER_WINDOW_HOURS: i64 = 24;

/// What a title reviewer decided.
#[derive(Debug, Clone, PartialEq)]
pub enum TitleDecision {
    /// Approve this subset of the proposed titles. Each approved title
    /// becomes its own downstream article.
    Approve { titles: Vec<String> },
    /// Reject the whole batch. The reason is mandatory and is recorded
    /// as the feedback's general comment.
    Reject { reason: String },
}

/// The decision carried by one review submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    Titles(TitleDecision),
    Outline { approved: bool },
    Content { approved: bool },
}

impl ReviewDecision {
    pub fn review_type(&self) -> ReviewType {
        match self {
            ReviewDecision::Titles(_) => ReviewType::Titles,
            ReviewDecision::Outline { .. } => ReviewType::Outline,
            ReviewDecision::Content { .. } => ReviewType::Content,
        }
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The article advanced in place.
    Updated {
        status: ArticleStatus,
        round: u32,
    },
    /// Title approval: one new article per approved title. When the
    /// follow-up delete of the original failed, the new articles are
    /// authoritative and the original is left as a flagged orphan.
    FannedOut {
        created: Vec<Uuid>,
        orphaned_original: bool,
    },
}

/// Orchestrates the multi-stage approval workflow over the ports.
#[derive(Clone)]
pub struct ReviewEngine {
    articles: Arc<dyn ArticleStore>,
    drafts: Arc<dyn DraftStore>,
    edits: Arc<dyn EditStore>,
    contacts: Arc<dyn ContactDirectory>,
}

impl ReviewEngine {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        drafts: Arc<dyn DraftStore>,
        edits: Arc<dyn EditStore>,
        contacts: Arc<dyn ContactDirectory>,
    ) -> Self {
        Self {
            articles,
            drafts,
            edits,
            contacts,
        }
    }

    //=====================================================================================
    // Review Submission
    //=====================================================================================

    /// Submits one reviewer's decision for an article.
    ///
    /// The article must currently sit in the awaiting state matching the
    /// decision's review type; anything else reports a conflict so the
    /// UI can prompt a reload. All mutated article fields are applied as
    /// a single guarded write — a racing second submitter gets
    /// [`PortError::Conflict`], never a silent overwrite. Draft cleanup
    /// after success is best-effort.
    pub async fn submit_review(
        &self,
        article_id: Uuid,
        reviewer: &Reviewer,
        decision: ReviewDecision,
        comments: Vec<Comment>,
        general_comment: String,
    ) -> PortResult<SubmitOutcome> {
        validate_decision(&decision)?;
        let review_type = decision.review_type();

        let article = self.articles.get_article(article_id).await?;
        let expected = review_type.awaiting_status();
        if article.status != expected {
            return Err(PortError::Conflict(format!(
                "article {} is {}, not {}; review already submitted, please reload",
                article_id,
                article.status.as_str(),
                expected.as_str()
            )));
        }

        if let ReviewDecision::Titles(TitleDecision::Approve { titles }) = &decision {
            if let Some(unknown) = titles.iter().find(|t| !article.proposed_titles.contains(t)) {
                return Err(PortError::Validation(format!(
                    "approved title {:?} is not among the proposed titles",
                    unknown
                )));
            }
        }

        let pending_edits = self
            .edits
            .list_pending_edits(article_id, review_type)
            .await?;

        let now = Utc::now();
        // First submission starts at round 1 with an empty history;
        // later rounds archive the previous payload verbatim.
        let mut history = article.revision_history.clone();
        let new_round = match article.client_comments.clone() {
            Some(previous) => {
                let round = previous.round + 1;
                history.push(ArchivedFeedback {
                    feedback: previous,
                    archived_at: now,
                });
                round
            }
            None => 1,
        };

        let outcome = match &decision {
            ReviewDecision::Titles(TitleDecision::Approve { titles }) => {
                // The claim write is the same guarded update the other
                // phases use; fan-out only proceeds once it lands.
                let claim = ReviewStateUpdate {
                    expected_status: expected,
                    new_status: ArticleStatus::TitlesApproved,
                    client_comments: ReviewFeedback {
                        action: ReviewAction::Approved,
                        reviewer: reviewer.email.clone(),
                        submitted_at: now,
                        round: new_round,
                        comments,
                        general_comment,
                        edits: pending_edits,
                    },
                    revision_history: history,
                    revision_round: new_round,
                };
                self.fan_out_titles(&article, titles, claim).await?
            }
            _ => {
                let (action, new_status) = match &decision {
                    ReviewDecision::Titles(TitleDecision::Reject { .. }) => {
                        (ReviewAction::Rejected, review_type.revision_status())
                    }
                    ReviewDecision::Outline { approved: true } => {
                        (ReviewAction::Approved, review_type.approved_status())
                    }
                    ReviewDecision::Content { approved: true } => {
                        (ReviewAction::Approved, review_type.approved_status())
                    }
                    _ => (
                        ReviewAction::RevisionRequested,
                        review_type.revision_status(),
                    ),
                };
                let general = match &decision {
                    ReviewDecision::Titles(TitleDecision::Reject { reason }) => reason.clone(),
                    _ => general_comment,
                };
                let feedback = ReviewFeedback {
                    action,
                    reviewer: reviewer.email.clone(),
                    submitted_at: now,
                    round: new_round,
                    comments,
                    general_comment: general,
                    edits: pending_edits,
                };
                self.articles
                    .update_review_state(
                        article_id,
                        ReviewStateUpdate {
                            expected_status: expected,
                            new_status,
                            client_comments: feedback,
                            revision_history: history,
                            revision_round: new_round,
                        },
                    )
                    .await?;
                SubmitOutcome::Updated {
                    status: new_status,
                    round: new_round,
                }
            }
        };

        let key = DraftKey {
            article_id,
            reviewer_email: reviewer.email.clone(),
            review_type,
        };
        if let Err(e) = self.drafts.delete_draft(&key).await {
            // The submission already landed; cleanup stays best-effort.
            warn!(
                article_id = %article_id,
                reviewer = %reviewer.email,
                error = %e,
                "failed to delete review draft after submission"
            );
        }

        Ok(outcome)
    }

    /// Title approval branches one review task into N downstream
    /// articles: one new article per approved title, each starting the
    /// outline phase with its own round-1 feedback payload. The original
    /// is claimed first through the same guarded write every submission
    /// uses, so a racing second approval gets a conflict instead of a
    /// duplicate fan-out. It is then deleted; if that delete fails the
    /// new articles are already authoritative and the original is
    /// reported as orphaned.
    async fn fan_out_titles(
        &self,
        original: &Article,
        approved_titles: &[String],
        claim: ReviewStateUpdate,
    ) -> PortResult<SubmitOutcome> {
        // The spawned articles share the claim's feedback payload, each
        // starting a fresh round-1 thread.
        let reviewer_email = claim.client_comments.reviewer.clone();
        let comments = claim.client_comments.comments.clone();
        let general_comment = claim.client_comments.general_comment.clone();
        let now = claim.client_comments.submitted_at;

        // Claim the original before creating anything: the guarded write
        // moves it out of the awaiting state, so whichever racing
        // submission loses sees Conflict and never inserts.
        self.articles.update_review_state(original.id, claim).await?;

        let mut created = Vec::with_capacity(approved_titles.len());
        let new_articles: Vec<Article> = approved_titles
            .iter()
            .map(|title| {
                let id = Uuid::new_v4();
                created.push(id);
                Article {
                    id,
                    campaign_id: original.campaign_id,
                    title: title.clone(),
                    status: ArticleStatus::NeedsOutline,
                    // The full proposed list is kept for reference; only
                    // this article's own title is selected.
                    proposed_titles: original.proposed_titles.clone(),
                    selected_title: Some(title.clone()),
                    outline: None,
                    content: None,
                    client_comments: Some(ReviewFeedback {
                        action: ReviewAction::Approved,
                        reviewer: reviewer_email.clone(),
                        submitted_at: now,
                        round: 1,
                        comments: comments.clone(),
                        general_comment: general_comment.clone(),
                        edits: Vec::new(),
                    }),
                    revision_history: Vec::new(),
                    revision_round: 1,
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect();

        // All-or-nothing: if this insert fails the whole submission
        // fails; the claimed original is no longer awaiting review, so
        // the batch is never duplicated by a retry racing this one.
        self.articles.insert_articles(new_articles).await?;

        let orphaned_original = match self.articles.delete_article(original.id).await {
            Ok(()) => false,
            Err(e) => {
                warn!(
                    article_id = %original.id,
                    error = %e,
                    "title fan-out created new articles but the original could not be deleted; leaving it orphaned"
                );
                true
            }
        };

        Ok(SubmitOutcome::FannedOut {
            created,
            orphaned_original,
        })
    }

    //=====================================================================================
    // Draft Autosave
    //=====================================================================================

    /// Upserts the caller's in-progress review state. Safe to call on a
    /// fixed autosave interval: the key is (article, reviewer, review
    /// type) and last write wins. The timer itself belongs to the UI.
    pub async fn save_draft(
        &self,
        key: DraftKey,
        edits: Vec<EditSuggestion>,
        comments: Vec<Comment>,
        selections: Vec<String>,
        general_comment: String,
    ) -> PortResult<()> {
        let draft = ReviewDraft {
            key,
            edits,
            comments,
            selections,
            general_comment,
            updated_at: Utc::now(),
        };
        self.drafts.upsert_draft(draft).await
    }

    /// `Ok(None)` when the reviewer has no saved draft for this article
    /// and review type.
    pub async fn load_draft(&self, key: &DraftKey) -> PortResult<Option<ReviewDraft>> {
        self.drafts.get_draft(key).await
    }

    /// Idempotent.
    pub async fn delete_draft(&self, key: &DraftKey) -> PortResult<()> {
        self.drafts.delete_draft(key).await
    }

    //=====================================================================================
    // Collaboration Tracker
    //=====================================================================================

    /// Who else touched a draft for this article in the last 24 hours,
    /// most recent first, one entry per (email, review type). A missing
    /// entry only means the draft is stale or was never saved; this is a
    /// best-effort signal, not presence tracking.
    pub async fn get_active_reviewers(&self, article_id: Uuid) -> PortResult<Vec<ActiveReviewer>> {
        let window_start = Utc::now() - Duration::hours(ACTIVE_REVIEWER_WINDOW_HOURS);
        let mut drafts = self.drafts.list_drafts(article_id, window_start).await?;
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut reviewers: Vec<ActiveReviewer> = Vec::new();
        for draft in drafts {
            let already_seen = reviewers.iter().any(|r| {
                r.email == draft.key.reviewer_email && r.review_type == draft.key.review_type
            });
            if already_seen {
                continue;
            }
            let display_name = match self.contacts.resolve_name(&draft.key.reviewer_email).await {
                Ok(Some(name)) => name,
                Ok(None) => draft.key.reviewer_email.clone(),
                Err(e) => {
                    warn!(
                        email = %draft.key.reviewer_email,
                        error = %e,
                        "contact lookup failed; falling back to the raw email"
                    );
                    draft.key.reviewer_email.clone()
                }
            };
            reviewers.push(ActiveReviewer {
                email: draft.key.reviewer_email,
                display_name,
                review_type: draft.key.review_type,
                last_active_at: draft.updated_at,
            });
        }
        Ok(reviewers)
    }
}

/// Structural checks that run before any store call.
fn validate_decision(decision: &ReviewDecision) -> PortResult<()> {
    match decision {
        ReviewDecision::Titles(TitleDecision::Approve { titles }) => {
            if titles.is_empty() {
                return Err(PortError::Validation(
                    "title approval requires at least one approved title".to_string(),
                ));
            }
            Ok(())
        }
        ReviewDecision::Titles(TitleDecision::Reject { reason }) => {
            if reason.trim().is_empty() {
                return Err(PortError::Validation(
                    "title rejection requires a reason".to_string(),
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
