//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the storage ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.
//!
//! Queries are runtime-bound (`sqlx::query_as::<_, T>`) so the crate
//! builds without a live database. Structured payloads (outline, content,
//! feedback, history, draft bodies) live in JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review_portal_core::domain::{
    ArchivedFeedback, Article, BodyContent, Comment, Contact, DraftKey, EditAction, EditStatus,
    EditSuggestion, OutlineContent, ReviewDraft, ReviewFeedback, Reviewer,
};
use review_portal_core::ports::{
    AccessControl, ArticleFilter, ArticleOrder, ArticleStore, AuthSessionStore, ContactDirectory,
    DraftStore, EditStore, PortError, PortResult, ReviewStateUpdate,
};
use review_portal_core::status::{ArticleStatus, ReviewType};
use sqlx::{FromRow, PgPool, QueryBuilder, Row};
use uuid::Uuid;

/// Column list for articles queries.
const ARTICLE_COLUMNS: &str = "id, campaign_id, title, status, proposed_titles, selected_title, \
    outline, content, client_comments, revision_history, revision_round, created_at, updated_at";

/// Column list for review_drafts queries.
const DRAFT_COLUMNS: &str = "article_id, reviewer_email, review_type, edits, comments, \
    selections, general_comment, updated_at";

/// Column list for edit_suggestions queries.
const EDIT_COLUMNS: &str = "id, target_id, action, original_content, suggested_content, \
    author_name, author_email, status, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the core's storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> PortError {
    PortError::Store(e.to_string())
}

fn decode_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> PortResult<T> {
    serde_json::from_value(value)
        .map_err(|e| PortError::Store(format!("corrupt {} payload: {}", what, e)))
}

fn encode_json<T: serde::Serialize>(value: &T, what: &str) -> PortResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| PortError::Store(format!("unencodable {} payload: {}", what, e)))
}

fn edit_action_str(action: EditAction) -> &'static str {
    match action {
        EditAction::Add => "add",
        EditAction::Modify => "modify",
        EditAction::Delete => "delete",
    }
}

fn parse_edit_action(s: &str) -> PortResult<EditAction> {
    match s {
        "add" => Ok(EditAction::Add),
        "modify" => Ok(EditAction::Modify),
        "delete" => Ok(EditAction::Delete),
        other => Err(PortError::Store(format!("unknown edit action '{}'", other))),
    }
}

fn edit_status_str(status: EditStatus) -> &'static str {
    match status {
        EditStatus::Pending => "pending",
        EditStatus::Accepted => "accepted",
        EditStatus::Rejected => "rejected",
    }
}

fn parse_edit_status(s: &str) -> PortResult<EditStatus> {
    match s {
        "pending" => Ok(EditStatus::Pending),
        "accepted" => Ok(EditStatus::Accepted),
        "rejected" => Ok(EditStatus::Rejected),
        other => Err(PortError::Store(format!("unknown edit status '{}'", other))),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ArticleRecord {
    id: Uuid,
    campaign_id: Uuid,
    title: String,
    status: String,
    proposed_titles: serde_json::Value,
    selected_title: Option<String>,
    outline: Option<serde_json::Value>,
    content: Option<serde_json::Value>,
    client_comments: Option<serde_json::Value>,
    revision_history: serde_json::Value,
    revision_round: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ArticleRecord {
    fn to_domain(self) -> PortResult<Article> {
        let status = ArticleStatus::parse(&self.status)
            .ok_or_else(|| PortError::Store(format!("unknown article status '{}'", self.status)))?;
        let outline: Option<OutlineContent> = match self.outline {
            Some(v) => Some(decode_json(v, "outline")?),
            None => None,
        };
        let content: Option<BodyContent> = match self.content {
            Some(v) => Some(decode_json(v, "content")?),
            None => None,
        };
        let client_comments: Option<ReviewFeedback> = match self.client_comments {
            Some(v) => Some(decode_json(v, "client_comments")?),
            None => None,
        };
        let revision_history: Vec<ArchivedFeedback> =
            decode_json(self.revision_history, "revision_history")?;
        Ok(Article {
            id: self.id,
            campaign_id: self.campaign_id,
            title: self.title,
            status,
            proposed_titles: decode_json(self.proposed_titles, "proposed_titles")?,
            selected_title: self.selected_title,
            outline,
            content,
            client_comments,
            revision_history,
            revision_round: self.revision_round as u32,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DraftRecord {
    article_id: Uuid,
    reviewer_email: String,
    review_type: String,
    edits: serde_json::Value,
    comments: serde_json::Value,
    selections: serde_json::Value,
    general_comment: String,
    updated_at: DateTime<Utc>,
}

impl DraftRecord {
    fn to_domain(self) -> PortResult<ReviewDraft> {
        let review_type = ReviewType::parse(&self.review_type).ok_or_else(|| {
            PortError::Store(format!("unknown review type '{}'", self.review_type))
        })?;
        let edits: Vec<EditSuggestion> = decode_json(self.edits, "draft edits")?;
        let comments: Vec<Comment> = decode_json(self.comments, "draft comments")?;
        let selections: Vec<String> = decode_json(self.selections, "draft selections")?;
        Ok(ReviewDraft {
            key: DraftKey {
                article_id: self.article_id,
                reviewer_email: self.reviewer_email,
                review_type,
            },
            edits,
            comments,
            selections,
            general_comment: self.general_comment,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EditRecord {
    id: Uuid,
    target_id: String,
    action: String,
    original_content: Option<String>,
    suggested_content: Option<String>,
    author_name: String,
    author_email: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl EditRecord {
    fn to_domain(self) -> PortResult<EditSuggestion> {
        Ok(EditSuggestion {
            id: self.id,
            target_id: self.target_id,
            action: parse_edit_action(&self.action)?,
            original_content: self.original_content,
            suggested_content: self.suggested_content,
            author: Reviewer {
                name: self.author_name,
                email: self.author_email,
            },
            created_at: self.created_at,
            status: parse_edit_status(&self.status)?,
        })
    }
}

#[derive(FromRow)]
struct ContactRecord {
    name: String,
    email: String,
    client_id: Uuid,
    client_name: String,
}

impl ContactRecord {
    fn to_domain(self) -> Contact {
        Contact {
            name: self.name,
            email: self.email,
            client_id: self.client_id,
            client_name: self.client_name,
        }
    }
}

//=========================================================================================
// `ArticleStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ArticleStore for DbAdapter {
    async fn get_article(&self, id: Uuid) -> PortResult<Article> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let record = sqlx::query_as::<_, ArticleRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| PortError::NotFound(format!("Article {} not found", id)))?;
        record.to_domain()
    }

    async fn update_review_state(&self, id: Uuid, update: ReviewStateUpdate) -> PortResult<()> {
        // One combined write covering every mutated field, guarded on
        // the status still being the value the engine read. A racing
        // submission that already advanced the article makes this touch
        // zero rows.
        let result = sqlx::query(
            "UPDATE articles
                SET status = $2,
                    client_comments = $3,
                    revision_history = $4,
                    revision_round = $5,
                    updated_at = now()
              WHERE id = $1 AND status = $6",
        )
        .bind(id)
        .bind(update.new_status.as_str())
        .bind(encode_json(&update.client_comments, "client_comments")?)
        .bind(encode_json(&update.revision_history, "revision_history")?)
        .bind(update.revision_round as i32)
        .bind(update.expected_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM articles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?
                .is_some();
            return Err(if exists {
                PortError::Conflict(format!(
                    "article {} is no longer {}; review already submitted, please reload",
                    id,
                    update.expected_status.as_str()
                ))
            } else {
                PortError::NotFound(format!("Article {} not found", id))
            });
        }
        Ok(())
    }

    async fn insert_articles(&self, articles: Vec<Article>) -> PortResult<()> {
        // All-or-nothing: a failed insert rolls the whole batch back.
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for article in &articles {
            sqlx::query(
                "INSERT INTO articles
                    (id, campaign_id, title, status, proposed_titles, selected_title,
                     outline, content, client_comments, revision_history, revision_round,
                     created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(article.id)
            .bind(article.campaign_id)
            .bind(&article.title)
            .bind(article.status.as_str())
            .bind(encode_json(&article.proposed_titles, "proposed_titles")?)
            .bind(&article.selected_title)
            .bind(match &article.outline {
                Some(o) => Some(encode_json(o, "outline")?),
                None => None,
            })
            .bind(match &article.content {
                Some(c) => Some(encode_json(c, "content")?),
                None => None,
            })
            .bind(match &article.client_comments {
                Some(f) => Some(encode_json(f, "client_comments")?),
                None => None,
            })
            .bind(encode_json(&article.revision_history, "revision_history")?)
            .bind(article.revision_round as i32)
            .bind(article.created_at)
            .bind(article.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)
    }

    async fn delete_article(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn list_articles(
        &self,
        filter: ArticleFilter,
        order: ArticleOrder,
    ) -> PortResult<Vec<Article>> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE true"));
        if let Some(campaign_id) = filter.campaign_id {
            builder.push(" AND campaign_id = ").push_bind(campaign_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder.push(match order {
            ArticleOrder::UpdatedDesc => " ORDER BY updated_at DESC",
            ArticleOrder::CreatedAsc => " ORDER BY created_at ASC",
        });

        let records = builder
            .build_query_as::<ArticleRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// `DraftStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DraftStore for DbAdapter {
    async fn upsert_draft(&self, draft: ReviewDraft) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO review_drafts
                (article_id, reviewer_email, review_type, edits, comments, selections,
                 general_comment, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (article_id, reviewer_email, review_type)
             DO UPDATE SET edits = EXCLUDED.edits,
                           comments = EXCLUDED.comments,
                           selections = EXCLUDED.selections,
                           general_comment = EXCLUDED.general_comment,
                           updated_at = EXCLUDED.updated_at",
        )
        .bind(draft.key.article_id)
        .bind(&draft.key.reviewer_email)
        .bind(draft.key.review_type.as_str())
        .bind(encode_json(&draft.edits, "draft edits")?)
        .bind(encode_json(&draft.comments, "draft comments")?)
        .bind(encode_json(&draft.selections, "draft selections")?)
        .bind(&draft.general_comment)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_draft(&self, key: &DraftKey) -> PortResult<Option<ReviewDraft>> {
        let query = format!(
            "SELECT {DRAFT_COLUMNS} FROM review_drafts
              WHERE article_id = $1 AND reviewer_email = $2 AND review_type = $3"
        );
        let record = sqlx::query_as::<_, DraftRecord>(&query)
            .bind(key.article_id)
            .bind(&key.reviewer_email)
            .bind(key.review_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn delete_draft(&self, key: &DraftKey) -> PortResult<()> {
        // Idempotent: deleting a missing row is not an error.
        sqlx::query(
            "DELETE FROM review_drafts
              WHERE article_id = $1 AND reviewer_email = $2 AND review_type = $3",
        )
        .bind(key.article_id)
        .bind(&key.reviewer_email)
        .bind(key.review_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_drafts(
        &self,
        article_id: Uuid,
        updated_after: DateTime<Utc>,
    ) -> PortResult<Vec<ReviewDraft>> {
        let query = format!(
            "SELECT {DRAFT_COLUMNS} FROM review_drafts
              WHERE article_id = $1 AND updated_at >= $2
              ORDER BY updated_at DESC"
        );
        let records = sqlx::query_as::<_, DraftRecord>(&query)
            .bind(article_id)
            .bind(updated_after)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// `EditStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl EditStore for DbAdapter {
    async fn insert_edits(
        &self,
        article_id: Uuid,
        review_type: ReviewType,
        edits: Vec<EditSuggestion>,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for edit in &edits {
            sqlx::query(
                "INSERT INTO edit_suggestions
                    (id, article_id, review_type, target_id, action, original_content,
                     suggested_content, author_name, author_email, status, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(edit.id)
            .bind(article_id)
            .bind(review_type.as_str())
            .bind(&edit.target_id)
            .bind(edit_action_str(edit.action))
            .bind(&edit.original_content)
            .bind(&edit.suggested_content)
            .bind(&edit.author.name)
            .bind(&edit.author.email)
            .bind(edit_status_str(edit.status))
            .bind(edit.created_at)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)
    }

    async fn list_pending_edits(
        &self,
        article_id: Uuid,
        review_type: ReviewType,
    ) -> PortResult<Vec<EditSuggestion>> {
        let query = format!(
            "SELECT {EDIT_COLUMNS} FROM edit_suggestions
              WHERE article_id = $1 AND review_type = $2 AND status = 'pending'
              ORDER BY created_at ASC"
        );
        let records = sqlx::query_as::<_, EditRecord>(&query)
            .bind(article_id)
            .bind(review_type.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// Directory / Access / Session Trait Implementations
//=========================================================================================

#[async_trait]
impl ContactDirectory for DbAdapter {
    async fn resolve_name(&self, email: &str) -> PortResult<Option<String>> {
        let row = sqlx::query("SELECT name FROM contacts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(|r| r.get::<String, _>("name")))
    }

    async fn resolve_contact(&self, email: &str) -> PortResult<Option<Contact>> {
        let record = sqlx::query_as::<_, ContactRecord>(
            "SELECT name, email, client_id, client_name FROM contacts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(record.map(|r| r.to_domain()))
    }
}

#[async_trait]
impl AccessControl for DbAdapter {
    async fn verify_access(&self, email: &str, campaign_id: Uuid) -> PortResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(
                SELECT 1 FROM campaign_access WHERE email = $1 AND campaign_id = $2
             ) AS allowed",
        )
        .bind(email)
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.get::<bool, _>("allowed"))
    }
}

#[async_trait]
impl AuthSessionStore for DbAdapter {
    async fn create_auth_session(
        &self,
        session_id: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, email, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(email)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let row = sqlx::query(
            "SELECT email FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or_else(|| PortError::NotFound("auth session not found or expired".to_string()))?;
        Ok(row.get::<String, _>("email"))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
