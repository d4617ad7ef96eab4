//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::markdown;
use crate::web::state::{AppState, ReviewerIdentity};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use review_portal_core::{
    merge_edits, new_edit, Article, ArticleFilter, ArticleOrder, ArticleStatus, ActiveReviewer,
    ApprovalState, Block, Comment, DraftKey, EditAction, EditConflict, EditSuggestion, PortError,
    ReviewDecision, ReviewDraft, ReviewPhase, ReviewType, Reviewer, Section, SubmitOutcome,
    TitleDecision,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        list_articles_handler,
        get_article_handler,
        active_reviewers_handler,
        save_draft_handler,
        load_draft_handler,
        delete_draft_handler,
        submit_review_handler,
        record_edits_handler,
        merge_edits_handler,
        suggest_titles_handler,
    ),
    components(
        schemas(
            crate::web::auth::LoginRequest,
            crate::web::auth::AuthResponse,
            ArticleSummary,
            ArticleView,
            SaveDraftRequest,
            DraftResponse,
            SubmitReviewRequest,
            NewEditRequest,
            MergeEditsRequest,
            MergeEditsResponse,
            TitleIdeasRequest,
            TitleIdeasResponse,
        )
    ),
    tags(
        (name = "Review Portal API", description = "Client-facing article review workflow.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a core port failure to the HTTP status it surfaces as.
fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::AccessDenied(_) => StatusCode::FORBIDDEN,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::Validation(_) => StatusCode::BAD_REQUEST,
        PortError::Store(_) => {
            error!("Store failure: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

/// Explicit denial, never downgraded to NotFound.
async fn ensure_access(
    state: &AppState,
    identity: &ReviewerIdentity,
    campaign_id: Uuid,
) -> Result<(), (StatusCode, String)> {
    let allowed = state
        .access
        .verify_access(&identity.email, campaign_id)
        .await
        .map_err(port_error_response)?;
    if !allowed {
        return Err((
            StatusCode::FORBIDDEN,
            format!("{} has no access to this campaign", identity.email),
        ));
    }
    Ok(())
}

fn reviewer_of(identity: &ReviewerIdentity) -> Reviewer {
    Reviewer {
        name: identity.name.clone(),
        email: identity.email.clone(),
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One row of the campaign's article list.
#[derive(Serialize, ToSchema)]
pub struct ArticleSummary {
    pub id: Uuid,
    pub title: String,
    #[schema(value_type = String)]
    pub status: ArticleStatus,
    #[schema(value_type = String)]
    pub phase: ReviewPhase,
    #[schema(value_type = String)]
    pub approval_state: ApprovalState,
    pub revision_round: u32,
    #[schema(value_type = String)]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        let (phase, approval_state) = article.status.phase_view();
        ArticleSummary {
            id: article.id,
            title: article.title.clone(),
            status: article.status,
            phase,
            approval_state,
            revision_round: article.revision_round,
            updated_at: article.updated_at,
        }
    }
}

/// Full article payload plus everything the portal derives for display.
#[derive(Serialize, ToSchema)]
pub struct ArticleView {
    #[schema(value_type = Object)]
    pub article: Article,
    #[schema(value_type = String)]
    pub phase: ReviewPhase,
    #[schema(value_type = String)]
    pub approval_state: ApprovalState,
    /// Structured rendering of a legacy markdown outline, when needed.
    #[schema(value_type = Vec<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_outline: Option<Vec<Section>>,
    /// Structured rendering of a legacy markdown body, when needed.
    #[schema(value_type = Vec<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_content: Option<Vec<Block>>,
    #[schema(value_type = Vec<Object>)]
    pub active_reviewers: Vec<ActiveReviewer>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListArticlesQuery {
    pub campaign_id: Uuid,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct DraftQuery {
    #[param(value_type = String)]
    pub review_type: ReviewType,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveDraftRequest {
    #[schema(value_type = String)]
    pub review_type: ReviewType,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub edits: Vec<EditSuggestion>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub selections: Vec<String>,
    #[serde(default)]
    pub general_comment: String,
}

#[derive(Serialize, ToSchema)]
pub struct DraftResponse {
    /// `null` when the reviewer has no saved draft — not an error.
    #[schema(value_type = Object)]
    pub draft: Option<ReviewDraft>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    #[schema(value_type = String)]
    pub review_type: ReviewType,
    /// Outline/content reviews: the approve-or-request-changes switch.
    pub approved: Option<bool>,
    /// Title reviews: the approved subset of the proposed titles.
    pub approved_titles: Option<Vec<String>>,
    /// Title reviews: the rejection reason, when nothing was approved.
    pub rejection_reason: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub general_comment: String,
}

/// A single proposed edit, authored by the calling reviewer.
#[derive(Deserialize, ToSchema)]
pub struct NewEditRequest {
    pub target_id: String,
    #[schema(value_type = String)]
    pub action: EditAction,
    pub original_content: Option<String>,
    pub suggested_content: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct MergeEditsRequest {
    #[schema(value_type = String)]
    pub review_type: ReviewType,
    /// Edits loaded from another reviewer's snapshot.
    #[schema(value_type = Vec<Object>)]
    pub remote: Vec<EditSuggestion>,
}

#[derive(Serialize, ToSchema)]
pub struct MergeEditsResponse {
    #[schema(value_type = Vec<Object>)]
    pub merged: Vec<EditSuggestion>,
    #[schema(value_type = Vec<Object>)]
    pub conflicts: Vec<EditConflict>,
}

#[derive(Deserialize, ToSchema)]
pub struct TitleIdeasRequest {
    /// Brief to riff on; defaults to the article's working title.
    pub brief: Option<String>,
    pub count: Option<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct TitleIdeasResponse {
    pub titles: Vec<String>,
}

//=========================================================================================
// Article Handlers
//=========================================================================================

/// List the campaign's articles, most recently updated first.
#[utoipa::path(
    get,
    path = "/articles",
    params(ListArticlesQuery),
    responses(
        (status = 200, description = "Articles for the campaign", body = Vec<ArticleSummary>),
        (status = 403, description = "No access to the campaign")
    )
)]
pub async fn list_articles_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    ensure_access(&state, &identity, query.campaign_id).await?;
    let articles = state
        .articles
        .list_articles(
            ArticleFilter {
                campaign_id: Some(query.campaign_id),
                status: None,
            },
            ArticleOrder::UpdatedDesc,
        )
        .await
        .map_err(port_error_response)?;
    let summaries: Vec<ArticleSummary> = articles.iter().map(ArticleSummary::from).collect();
    Ok(Json(summaries))
}

/// Fetch one article with its derived phase view and active reviewers.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "The article", body = ArticleView),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn get_article_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    let (phase, approval_state) = article.status.phase_view();
    // Legacy markdown articles get a best-effort structured rendering.
    let rendered_outline = match &article.outline {
        Some(review_portal_core::OutlineContent::Markdown { text }) => {
            Some(markdown::sections_from_markdown(text))
        }
        _ => None,
    };
    let rendered_content = match &article.content {
        Some(review_portal_core::BodyContent::Markdown { text }) => {
            Some(markdown::blocks_from_markdown(text))
        }
        _ => None,
    };
    let active_reviewers = state
        .engine
        .get_active_reviewers(id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(ArticleView {
        article,
        phase,
        approval_state,
        rendered_outline,
        rendered_content,
        active_reviewers,
    }))
}

/// Who else touched a draft for this article in the last 24 hours.
#[utoipa::path(
    get,
    path = "/articles/{id}/reviewers",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Active reviewers, most recent first"),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn active_reviewers_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;
    let reviewers = state
        .engine
        .get_active_reviewers(id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(reviewers))
}

//=========================================================================================
// Draft Handlers
//=========================================================================================

/// Autosave the caller's in-progress review state (upsert).
#[utoipa::path(
    put,
    path = "/articles/{id}/draft",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = SaveDraftRequest,
    responses(
        (status = 204, description = "Draft saved"),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn save_draft_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    state
        .engine
        .save_draft(
            DraftKey {
                article_id: id,
                reviewer_email: identity.email.clone(),
                review_type: req.review_type,
            },
            req.edits,
            req.comments,
            req.selections,
            req.general_comment,
        )
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Load the caller's saved draft; `draft` is null when none exists.
#[utoipa::path(
    get,
    path = "/articles/{id}/draft",
    params(("id" = Uuid, Path, description = "Article id"), DraftQuery),
    responses(
        (status = 200, description = "The draft, or null", body = DraftResponse),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn load_draft_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Query(query): Query<DraftQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    let draft = state
        .engine
        .load_draft(&DraftKey {
            article_id: id,
            reviewer_email: identity.email.clone(),
            review_type: query.review_type,
        })
        .await
        .map_err(port_error_response)?;
    Ok(Json(DraftResponse { draft }))
}

/// Discard the caller's saved draft. Idempotent.
#[utoipa::path(
    delete,
    path = "/articles/{id}/draft",
    params(("id" = Uuid, Path, description = "Article id"), DraftQuery),
    responses(
        (status = 204, description = "Draft deleted (or never existed)"),
        (status = 403, description = "No access to the campaign")
    )
)]
pub async fn delete_draft_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Query(query): Query<DraftQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    state
        .engine
        .delete_draft(&DraftKey {
            article_id: id,
            reviewer_email: identity.email.clone(),
            review_type: query.review_type,
        })
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Review Submission Handler
//=========================================================================================

/// Submit the caller's review decision for an article.
#[utoipa::path(
    post,
    path = "/articles/{id}/review",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = SubmitReviewRequest,
    responses(
        (status = 200, description = "Submission outcome"),
        (status = 400, description = "Structurally invalid decision"),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found"),
        (status = 409, description = "Review already submitted, please reload")
    )
)]
pub async fn submit_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    let decision = match req.review_type {
        ReviewType::Titles => match (req.approved_titles, req.rejection_reason) {
            (Some(titles), _) => ReviewDecision::Titles(TitleDecision::Approve { titles }),
            (None, Some(reason)) => ReviewDecision::Titles(TitleDecision::Reject { reason }),
            (None, None) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "title review requires approved_titles or rejection_reason".to_string(),
                ))
            }
        },
        ReviewType::Outline => ReviewDecision::Outline {
            approved: req.approved.ok_or((
                StatusCode::BAD_REQUEST,
                "outline review requires the approved flag".to_string(),
            ))?,
        },
        ReviewType::Content => ReviewDecision::Content {
            approved: req.approved.ok_or((
                StatusCode::BAD_REQUEST,
                "content review requires the approved flag".to_string(),
            ))?,
        },
    };

    let outcome: SubmitOutcome = state
        .engine
        .submit_review(
            id,
            &reviewer_of(&identity),
            decision,
            req.comments,
            req.general_comment,
        )
        .await
        .map_err(port_error_response)?;
    Ok(Json(outcome))
}

//=========================================================================================
// Edit Suggestion Handlers
//=========================================================================================

/// Persist finalized edit suggestions. Ids and the pending status are
/// assigned server-side; authorship comes from the session.
#[utoipa::path(
    post,
    path = "/articles/{id}/edits",
    params(("id" = Uuid, Path, description = "Article id"), DraftQuery),
    request_body = Vec<NewEditRequest>,
    responses(
        (status = 201, description = "Edit suggestions recorded"),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn record_edits_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Query(query): Query<DraftQuery>,
    Json(requests): Json<Vec<NewEditRequest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    let author = reviewer_of(&identity);
    let edits: Vec<EditSuggestion> = requests
        .into_iter()
        .map(|r| {
            new_edit(
                r.target_id,
                r.action,
                r.original_content,
                r.suggested_content,
                author.clone(),
            )
        })
        .collect();
    state
        .edits
        .insert_edits(id, query.review_type, edits.clone())
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(edits)))
}

/// Merge another reviewer's edit snapshot into the caller's draft,
/// reporting (not silently resolving) any conflicts. The caller's own
/// edits always win.
#[utoipa::path(
    post,
    path = "/articles/{id}/draft/merge",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = MergeEditsRequest,
    responses(
        (status = 200, description = "Merged edits and recorded conflicts", body = MergeEditsResponse),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn merge_edits_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<MergeEditsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    let local = state
        .engine
        .load_draft(&DraftKey {
            article_id: id,
            reviewer_email: identity.email.clone(),
            review_type: req.review_type,
        })
        .await
        .map_err(port_error_response)?
        .map(|d| d.edits)
        .unwrap_or_default();

    let outcome = merge_edits(local, req.remote);
    Ok(Json(MergeEditsResponse {
        merged: outcome.merged,
        conflicts: outcome.conflicts,
    }))
}

//=========================================================================================
// Title Suggestion Handler
//=========================================================================================

/// Ask the AI assistant for alternative titles. Best-effort leaf
/// utility; unavailable when no API key is configured.
#[utoipa::path(
    post,
    path = "/articles/{id}/title-ideas",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = TitleIdeasRequest,
    responses(
        (status = 200, description = "Suggested titles", body = TitleIdeasResponse),
        (status = 403, description = "No access to the campaign"),
        (status = 404, description = "Article not found"),
        (status = 503, description = "Title suggestions are not configured")
    )
)]
pub async fn suggest_titles_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<ReviewerIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<TitleIdeasRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let article = state
        .articles
        .get_article(id)
        .await
        .map_err(port_error_response)?;
    ensure_access(&state, &identity, article.campaign_id).await?;

    let titles_service = state.titles.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Title suggestions are not configured".to_string(),
    ))?;

    let brief = req.brief.unwrap_or_else(|| article.title.clone());
    let count = req.count.unwrap_or(5).clamp(1, 10);
    let titles = titles_service
        .suggest_titles(&brief, count)
        .await
        .map_err(port_error_response)?;
    Ok(Json(TitleIdeasResponse { titles }))
}
