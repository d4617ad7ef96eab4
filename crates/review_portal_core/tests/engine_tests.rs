//! Integration tests for the review submission engine, driven through
//! in-memory implementations of the storage ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use review_portal_core::{
    detect_conflict, merge_edits, new_edit, AccessControl, Article, ArticleFilter, ArticleOrder,
    ArticleStatus, ArticleStore, Comment, ContactDirectory, DraftKey, DraftStore, EditAction,
    EditStore, EditSuggestion, PortError, PortResult, ReviewAction, ReviewDecision, ReviewDraft,
    ReviewEngine, ReviewStateUpdate, ReviewType, Reviewer, SubmitOutcome, TitleDecision,
};

//=========================================================================================
// In-Memory Port Implementations
//=========================================================================================

#[derive(Default)]
struct MemoryStore {
    articles: Mutex<HashMap<Uuid, Article>>,
    drafts: Mutex<HashMap<DraftKey, ReviewDraft>>,
    edits: Mutex<Vec<(Uuid, ReviewType, EditSuggestion)>>,
    contacts: Mutex<HashMap<String, String>>,
    /// Fault injection: fail the next delete_article call.
    fail_delete_article: AtomicBool,
    /// Fault injection: fail every delete_draft call.
    fail_delete_draft: AtomicBool,
    /// Fault injection: flip the article to this status right before
    /// the guarded write checks it, simulating a racing submission
    /// landing between the engine's read and its write.
    race_status_to: Mutex<Option<ArticleStatus>>,
}

impl MemoryStore {
    fn insert_article(&self, article: Article) {
        self.articles
            .lock()
            .unwrap()
            .insert(article.id, article);
    }

    fn article(&self, id: Uuid) -> Option<Article> {
        self.articles.lock().unwrap().get(&id).cloned()
    }

    fn set_status(&self, id: Uuid, status: ArticleStatus) {
        self.articles
            .lock()
            .unwrap()
            .get_mut(&id)
            .expect("article present")
            .status = status;
    }

    fn add_contact(&self, email: &str, name: &str) {
        self.contacts
            .lock()
            .unwrap()
            .insert(email.to_string(), name.to_string());
    }

    fn insert_draft_raw(&self, draft: ReviewDraft) {
        self.drafts
            .lock()
            .unwrap()
            .insert(draft.key.clone(), draft);
    }

    fn draft_count(&self) -> usize {
        self.drafts.lock().unwrap().len()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn get_article(&self, id: Uuid) -> PortResult<Article> {
        self.article(id)
            .ok_or_else(|| PortError::NotFound(format!("article {} not found", id)))
    }

    async fn update_review_state(&self, id: Uuid, update: ReviewStateUpdate) -> PortResult<()> {
        let mut articles = self.articles.lock().unwrap();
        let article = articles
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("article {} not found", id)))?;
        if let Some(raced) = self.race_status_to.lock().unwrap().take() {
            article.status = raced;
        }
        if article.status != update.expected_status {
            return Err(PortError::Conflict(format!(
                "article {} is no longer {}",
                id,
                update.expected_status.as_str()
            )));
        }
        article.status = update.new_status;
        article.client_comments = Some(update.client_comments);
        article.revision_history = update.revision_history;
        article.revision_round = update.revision_round;
        article.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_articles(&self, articles: Vec<Article>) -> PortResult<()> {
        let mut map = self.articles.lock().unwrap();
        for article in articles {
            map.insert(article.id, article);
        }
        Ok(())
    }

    async fn delete_article(&self, id: Uuid) -> PortResult<()> {
        if self.fail_delete_article.swap(false, Ordering::SeqCst) {
            return Err(PortError::Store("simulated delete failure".to_string()));
        }
        self.articles.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn list_articles(
        &self,
        filter: ArticleFilter,
        order: ArticleOrder,
    ) -> PortResult<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .articles
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                filter.campaign_id.map_or(true, |c| a.campaign_id == c)
                    && filter.status.map_or(true, |s| a.status == s)
            })
            .cloned()
            .collect();
        match order {
            ArticleOrder::UpdatedDesc => articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            ArticleOrder::CreatedAsc => articles.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        Ok(articles)
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn upsert_draft(&self, draft: ReviewDraft) -> PortResult<()> {
        self.insert_draft_raw(draft);
        Ok(())
    }

    async fn get_draft(&self, key: &DraftKey) -> PortResult<Option<ReviewDraft>> {
        Ok(self.drafts.lock().unwrap().get(key).cloned())
    }

    async fn delete_draft(&self, key: &DraftKey) -> PortResult<()> {
        if self.fail_delete_draft.load(Ordering::SeqCst) {
            return Err(PortError::Store("simulated draft delete failure".to_string()));
        }
        self.drafts.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_drafts(
        &self,
        article_id: Uuid,
        updated_after: DateTime<Utc>,
    ) -> PortResult<Vec<ReviewDraft>> {
        Ok(self
            .drafts
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.key.article_id == article_id && d.updated_at >= updated_after)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EditStore for MemoryStore {
    async fn insert_edits(
        &self,
        article_id: Uuid,
        review_type: ReviewType,
        edits: Vec<EditSuggestion>,
    ) -> PortResult<()> {
        let mut store = self.edits.lock().unwrap();
        for edit in edits {
            store.push((article_id, review_type, edit));
        }
        Ok(())
    }

    async fn list_pending_edits(
        &self,
        article_id: Uuid,
        review_type: ReviewType,
    ) -> PortResult<Vec<EditSuggestion>> {
        Ok(self
            .edits
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, t, e)| {
                *a == article_id
                    && *t == review_type
                    && e.status == review_portal_core::EditStatus::Pending
            })
            .map(|(_, _, e)| e.clone())
            .collect())
    }
}

#[async_trait]
impl ContactDirectory for MemoryStore {
    async fn resolve_name(&self, email: &str) -> PortResult<Option<String>> {
        Ok(self.contacts.lock().unwrap().get(email).cloned())
    }

    async fn resolve_contact(
        &self,
        _email: &str,
    ) -> PortResult<Option<review_portal_core::Contact>> {
        Ok(None)
    }
}

#[async_trait]
impl AccessControl for MemoryStore {
    async fn verify_access(&self, _email: &str, _campaign_id: Uuid) -> PortResult<bool> {
        Ok(true)
    }
}

//=========================================================================================
// Test Fixtures
//=========================================================================================

fn reviewer() -> Reviewer {
    Reviewer {
        name: "Pat Client".to_string(),
        email: "pat@client.test".to_string(),
    }
}

fn article_awaiting(status: ArticleStatus) -> Article {
    let now = Utc::now();
    Article {
        id: Uuid::new_v4(),
        campaign_id: Uuid::new_v4(),
        title: "Draft article".to_string(),
        status,
        proposed_titles: vec![
            "Title A".to_string(),
            "Title B".to_string(),
            "Title C".to_string(),
        ],
        selected_title: None,
        outline: None,
        content: None,
        client_comments: None,
        revision_history: Vec::new(),
        revision_round: 1,
        created_at: now,
        updated_at: now,
    }
}

fn comment(target: &str, text: &str) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        target_id: target.to_string(),
        author: reviewer(),
        text: text.to_string(),
        created_at: Utc::now(),
        resolved: false,
    }
}

fn setup() -> (Arc<MemoryStore>, ReviewEngine) {
    let store = Arc::new(MemoryStore::default());
    let engine = ReviewEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    (store, engine)
}

fn draft_key(article_id: Uuid, review_type: ReviewType) -> DraftKey {
    DraftKey {
        article_id,
        reviewer_email: reviewer().email,
        review_type,
    }
}

//=========================================================================================
// Submission: rounds, archival, status transitions
//=========================================================================================

#[tokio::test]
async fn first_submission_starts_at_round_one_with_empty_history() {
    // Scenario A: no prior feedback means round 1, not 2, and nothing
    // to archive.
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewOutline);
    let id = article.id;
    store.insert_article(article);

    let outcome = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Outline { approved: false },
            vec![comment("h2-1", "too vague")],
            "needs more data".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Updated {
            status: ArticleStatus::NeedsOutlineRevision,
            round: 1,
        }
    );
    let stored = store.article(id).unwrap();
    assert_eq!(stored.status, ArticleStatus::NeedsOutlineRevision);
    assert_eq!(stored.revision_round, 1);
    assert!(stored.revision_history.is_empty());
    let feedback = stored.client_comments.unwrap();
    assert_eq!(feedback.action, ReviewAction::RevisionRequested);
    assert_eq!(feedback.round, 1);
    assert_eq!(feedback.general_comment, "needs more data");
    assert_eq!(feedback.comments.len(), 1);
    assert_eq!(feedback.comments[0].target_id, "h2-1");
}

#[tokio::test]
async fn rounds_increase_monotonically_and_archive_prior_feedback_verbatim() {
    // P2 + P3 over three submission rounds, with the agency resubmitting
    // in between.
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewOutline);
    let id = article.id;
    store.insert_article(article);

    for k in 1..=3u32 {
        let before = store.article(id).unwrap();
        let prior_feedback = before.client_comments.clone();

        let outcome = engine
            .submit_review(
                id,
                &reviewer(),
                ReviewDecision::Outline { approved: false },
                vec![],
                format!("round {} feedback", k),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Updated {
                status: ArticleStatus::NeedsOutlineRevision,
                round: k,
            }
        );

        let after = store.article(id).unwrap();
        assert_eq!(after.revision_round, k);
        assert_eq!(after.revision_history.len(), (k - 1) as usize);
        for (i, archived) in after.revision_history.iter().enumerate() {
            assert_eq!(archived.feedback.round, (i + 1) as u32);
        }
        // The payload archived this round is field-for-field the one
        // that was current before the submission.
        if let Some(prior) = prior_feedback {
            assert_eq!(after.revision_history.last().unwrap().feedback, prior);
        }

        // Agency resubmits the outline for the next round.
        store.set_status(id, ArticleStatus::AwaitingReviewOutline);
    }
}

#[tokio::test]
async fn approval_advances_to_the_approved_state() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewDraft);
    let id = article.id;
    store.insert_article(article);

    let outcome = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Content { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Updated {
            status: ArticleStatus::DraftApproved,
            round: 1,
        }
    );
    let feedback = store.article(id).unwrap().client_comments.unwrap();
    assert_eq!(feedback.action, ReviewAction::Approved);
}

#[tokio::test]
async fn submission_includes_the_pending_edit_suggestions() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewDraft);
    let id = article.id;
    store.insert_article(article);

    let edit = new_edit(
        "b3",
        EditAction::Modify,
        Some("foo".to_string()),
        Some("bar".to_string()),
        reviewer(),
    );
    store
        .insert_edits(id, ReviewType::Content, vec![edit.clone()])
        .await
        .unwrap();
    // Edits for a different review type must not leak in.
    store
        .insert_edits(
            id,
            ReviewType::Outline,
            vec![new_edit(
                "h1-1",
                EditAction::Delete,
                Some("old".to_string()),
                None,
                reviewer(),
            )],
        )
        .await
        .unwrap();

    engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Content { approved: false },
            vec![],
            String::new(),
        )
        .await
        .unwrap();

    let feedback = store.article(id).unwrap().client_comments.unwrap();
    assert_eq!(feedback.edits, vec![edit]);
}

//=========================================================================================
// Submission: preconditions, validation, concurrency
//=========================================================================================

#[tokio::test]
async fn submit_on_missing_article_is_not_found() {
    let (_store, engine) = setup();
    let err = engine
        .submit_review(
            Uuid::new_v4(),
            &reviewer(),
            ReviewDecision::Outline { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)));
}

#[tokio::test]
async fn submit_against_the_wrong_phase_is_a_conflict() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::NeedsOutline);
    let id = article.id;
    store.insert_article(article);

    let err = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Outline { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));
}

#[tokio::test]
async fn racing_second_submission_is_rejected_by_the_guarded_write() {
    // The engine read the awaiting status, but another submission lands
    // before its write. The combined write must notice and abort.
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewOutline);
    let id = article.id;
    store.insert_article(article);
    *store.race_status_to.lock().unwrap() = Some(ArticleStatus::NeedsOutlineRevision);

    let err = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Outline { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));

    // The losing submission must not have half-applied anything.
    let stored = store.article(id).unwrap();
    assert!(stored.client_comments.is_none());
    assert_eq!(stored.status, ArticleStatus::NeedsOutlineRevision);
}

#[tokio::test]
async fn structurally_invalid_decisions_are_rejected_before_any_store_call() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewTitles);
    let id = article.id;
    store.insert_article(article);

    let empty_approval = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Approve { titles: vec![] }),
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(empty_approval, PortError::Validation(_)));

    let blank_reason = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Reject {
                reason: "   ".to_string(),
            }),
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(blank_reason, PortError::Validation(_)));

    let stored = store.article(id).unwrap();
    assert_eq!(stored.status, ArticleStatus::AwaitingReviewTitles);
    assert!(stored.client_comments.is_none());
}

#[tokio::test]
async fn approving_an_unproposed_title_is_a_validation_failure() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewTitles);
    let id = article.id;
    store.insert_article(article);

    let err = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Approve {
                titles: vec!["Title Z".to_string()],
            }),
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));
}

//=========================================================================================
// Title fan-out
//=========================================================================================

#[tokio::test]
async fn approving_titles_fans_out_into_one_article_per_title() {
    // P4 + Scenario C: three proposed, two approved.
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewTitles);
    let original_id = article.id;
    let campaign_id = article.campaign_id;
    let full_list = article.proposed_titles.clone();
    store.insert_article(article);

    let outcome = engine
        .submit_review(
            original_id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Approve {
                titles: vec!["Title A".to_string(), "Title C".to_string()],
            }),
            vec![],
            "love these two".to_string(),
        )
        .await
        .unwrap();

    let (created, orphaned) = match outcome {
        SubmitOutcome::FannedOut {
            created,
            orphaned_original,
        } => (created, orphaned_original),
        other => panic!("expected fan-out, got {:?}", other),
    };
    assert_eq!(created.len(), 2);
    assert!(!orphaned);
    assert!(store.article(original_id).is_none());

    let mut selected: Vec<String> = Vec::new();
    for id in &created {
        let spawned = store.article(*id).unwrap();
        assert_eq!(spawned.status, ArticleStatus::NeedsOutline);
        assert_eq!(spawned.campaign_id, campaign_id);
        // Full proposed list kept for reference.
        assert_eq!(spawned.proposed_titles, full_list);
        assert_eq!(spawned.revision_round, 1);
        assert!(spawned.revision_history.is_empty());
        let feedback = spawned.client_comments.unwrap();
        assert_eq!(feedback.action, ReviewAction::Approved);
        assert_eq!(feedback.round, 1);
        selected.push(spawned.selected_title.unwrap());
    }
    selected.sort();
    assert_eq!(selected, vec!["Title A".to_string(), "Title C".to_string()]);
}

#[tokio::test]
async fn fan_out_reports_an_orphan_when_the_original_delete_fails() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewTitles);
    let original_id = article.id;
    store.insert_article(article);
    store.fail_delete_article.store(true, Ordering::SeqCst);

    let outcome = engine
        .submit_review(
            original_id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Approve {
                titles: vec!["Title B".to_string()],
            }),
            vec![],
            String::new(),
        )
        .await
        .unwrap();

    match outcome {
        SubmitOutcome::FannedOut {
            created,
            orphaned_original,
        } => {
            assert_eq!(created.len(), 1);
            assert!(orphaned_original);
            // New article is authoritative; the original lingers for
            // cleanup instead of failing the submission. The claim
            // already moved it out of the awaiting state, so it is no
            // longer actionable.
            assert!(store.article(created[0]).is_some());
            let orphan = store.article(original_id).unwrap();
            assert_eq!(orphan.status, ArticleStatus::TitlesApproved);
        }
        other => panic!("expected fan-out, got {:?}", other),
    }
}

#[tokio::test]
async fn racing_title_approvals_fan_out_only_once() {
    // Two reviewers approve the titles concurrently: both read the
    // awaiting article, but the fan-out claims the original through the
    // guarded write before inserting, so the loser gets a conflict and
    // creates nothing.
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewTitles);
    let original_id = article.id;
    store.insert_article(article);
    *store.race_status_to.lock().unwrap() = Some(ArticleStatus::TitlesApproved);

    let err = engine
        .submit_review(
            original_id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Approve {
                titles: vec!["Title A".to_string(), "Title B".to_string()],
            }),
            vec![],
            String::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Conflict(_)));

    // The losing approval must not have spawned a duplicate batch.
    assert_eq!(store.articles.lock().unwrap().len(), 1);
    assert!(store.article(original_id).is_some());
}

#[tokio::test]
async fn rejecting_titles_keeps_a_single_thread() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewTitles);
    let id = article.id;
    store.insert_article(article);

    let outcome = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Titles(TitleDecision::Reject {
                reason: "none of these fit the brand voice".to_string(),
            }),
            vec![],
            String::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SubmitOutcome::Updated {
            status: ArticleStatus::NeedsTitlesRevision,
            round: 1,
        }
    );
    let feedback = store.article(id).unwrap().client_comments.unwrap();
    assert_eq!(feedback.action, ReviewAction::Rejected);
    assert_eq!(feedback.general_comment, "none of these fit the brand voice");
}

//=========================================================================================
// Drafts
//=========================================================================================

#[tokio::test]
async fn saving_a_draft_twice_leaves_a_single_row_with_that_content() {
    // P7: repeated autosave is an upsert, never an accumulation.
    let (store, engine) = setup();
    let key = draft_key(Uuid::new_v4(), ReviewType::Content);
    let edits = vec![new_edit(
        "b1",
        EditAction::Modify,
        Some("foo".to_string()),
        Some("bar".to_string()),
        reviewer(),
    )];
    let comments = vec![comment("b1", "tighten this")];

    for _ in 0..2 {
        engine
            .save_draft(
                key.clone(),
                edits.clone(),
                comments.clone(),
                vec!["Title A".to_string()],
                "overall direction works".to_string(),
            )
            .await
            .unwrap();
    }

    assert_eq!(store.draft_count(), 1);
    let loaded = engine.load_draft(&key).await.unwrap().unwrap();
    assert_eq!(loaded.edits, edits);
    assert_eq!(loaded.comments, comments);
    assert_eq!(loaded.selections, vec!["Title A".to_string()]);
    assert_eq!(loaded.general_comment, "overall direction works");
}

#[tokio::test]
async fn loading_a_missing_draft_is_none_and_deleting_it_is_fine() {
    let (_store, engine) = setup();
    let key = draft_key(Uuid::new_v4(), ReviewType::Outline);
    assert!(engine.load_draft(&key).await.unwrap().is_none());
    engine.delete_draft(&key).await.unwrap();
    engine.delete_draft(&key).await.unwrap();
}

#[tokio::test]
async fn successful_submission_clears_the_submitters_draft() {
    // P8.
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewOutline);
    let id = article.id;
    store.insert_article(article);
    let key = draft_key(id, ReviewType::Outline);
    engine
        .save_draft(key.clone(), vec![], vec![], vec![], "wip".to_string())
        .await
        .unwrap();

    engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Outline { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap();

    assert!(engine.load_draft(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn draft_cleanup_failure_does_not_fail_the_submission() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewOutline);
    let id = article.id;
    store.insert_article(article);
    store.fail_delete_draft.store(true, Ordering::SeqCst);

    let outcome = engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Outline { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Updated { .. }));
}

//=========================================================================================
// Concurrent editors: stale baselines (Scenario B)
//=========================================================================================

#[tokio::test]
async fn stale_baseline_from_another_reviewer_is_recorded_not_overwritten() {
    // Reviewer X saved a modify on b3; reviewer Y loaded a stale
    // snapshot of b3 and produced a different baseline. Merging Y into
    // X must record the conflict and keep X's edit.
    let x = Reviewer {
        name: "X".to_string(),
        email: "x@client.test".to_string(),
    };
    let y = Reviewer {
        name: "Y".to_string(),
        email: "y@client.test".to_string(),
    };
    let local = vec![new_edit(
        "b3",
        EditAction::Modify,
        Some("foo (edited by agency)".to_string()),
        Some("local rewrite".to_string()),
        x,
    )];
    let remote = vec![new_edit(
        "b3",
        EditAction::Modify,
        Some("foo".to_string()),
        Some("remote rewrite".to_string()),
        y,
    )];
    assert!(detect_conflict(&local[0], &remote[0]));

    let outcome = merge_edits(local.clone(), remote.clone());
    assert_eq!(outcome.merged, local);
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].remote.id, remote[0].id);
}

//=========================================================================================
// Collaboration tracker
//=========================================================================================

#[tokio::test]
async fn active_reviewers_are_windowed_deduped_and_name_resolved() {
    let (store, engine) = setup();
    let article_id = Uuid::new_v4();
    store.add_contact("pat@client.test", "Pat Client");

    // Two fresh saves by Pat (same key, upserted), one fresh save by an
    // unknown email, one stale draft outside the 24h window.
    let key = draft_key(article_id, ReviewType::Outline);
    engine
        .save_draft(key, vec![], vec![], vec![], String::new())
        .await
        .unwrap();
    engine
        .save_draft(
            DraftKey {
                article_id,
                reviewer_email: "sam@client.test".to_string(),
                review_type: ReviewType::Outline,
            },
            vec![],
            vec![],
            vec![],
            String::new(),
        )
        .await
        .unwrap();
    store.insert_draft_raw(ReviewDraft {
        key: DraftKey {
            article_id,
            reviewer_email: "old@client.test".to_string(),
            review_type: ReviewType::Content,
        },
        edits: vec![],
        comments: vec![],
        selections: vec![],
        general_comment: String::new(),
        updated_at: Utc::now() - Duration::hours(25),
    });

    let active = engine.get_active_reviewers(article_id).await.unwrap();
    assert_eq!(active.len(), 2);
    // Most recent update first.
    assert!(active[0].last_active_at >= active[1].last_active_at);

    let pat = active
        .iter()
        .find(|r| r.email == "pat@client.test")
        .unwrap();
    assert_eq!(pat.display_name, "Pat Client");
    let sam = active
        .iter()
        .find(|r| r.email == "sam@client.test")
        .unwrap();
    // Unresolved contacts fall back to the raw email.
    assert_eq!(sam.display_name, "sam@client.test");
    assert!(!active.iter().any(|r| r.email == "old@client.test"));
}

#[tokio::test]
async fn one_entry_per_email_and_review_type_pair() {
    let (_store, engine) = setup();
    let article_id = Uuid::new_v4();

    for review_type in [ReviewType::Outline, ReviewType::Content] {
        engine
            .save_draft(
                draft_key(article_id, review_type),
                vec![],
                vec![],
                vec![],
                String::new(),
            )
            .await
            .unwrap();
    }

    let active = engine.get_active_reviewers(article_id).await.unwrap();
    assert_eq!(active.len(), 2);
    let types: Vec<ReviewType> = active.iter().map(|r| r.review_type).collect();
    assert!(types.contains(&ReviewType::Outline));
    assert!(types.contains(&ReviewType::Content));
}

//=========================================================================================
// Invariants over mixed sequences
//=========================================================================================

#[tokio::test]
async fn revision_round_always_equals_history_length_plus_one() {
    let (store, engine) = setup();
    let article = article_awaiting(ArticleStatus::AwaitingReviewOutline);
    let id = article.id;
    store.insert_article(article);

    // Outline goes through two revision rounds, then approval; the
    // article then moves to content review and gets one more round.
    for _ in 0..2 {
        engine
            .submit_review(
                id,
                &reviewer(),
                ReviewDecision::Outline { approved: false },
                vec![],
                String::new(),
            )
            .await
            .unwrap();
        store.set_status(id, ArticleStatus::AwaitingReviewOutline);
    }
    engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Outline { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap();
    store.set_status(id, ArticleStatus::AwaitingReviewDraft);
    engine
        .submit_review(
            id,
            &reviewer(),
            ReviewDecision::Content { approved: true },
            vec![],
            String::new(),
        )
        .await
        .unwrap();

    let stored = store.article(id).unwrap();
    assert_eq!(
        stored.revision_round as usize,
        stored.revision_history.len() + 1
    );
    assert_eq!(stored.revision_round, 4);
    for (i, archived) in stored.revision_history.iter().enumerate() {
        assert_eq!(archived.feedback.round, (i + 1) as u32);
    }
}
