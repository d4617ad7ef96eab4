pub mod auth;
pub mod markdown;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers the binary wires into the router.
pub use middleware::require_auth;
pub use rest::{
    active_reviewers_handler, delete_draft_handler, get_article_handler, list_articles_handler,
    load_draft_handler, merge_edits_handler, record_edits_handler, save_draft_handler,
    submit_review_handler, suggest_titles_handler,
};
