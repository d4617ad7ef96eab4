pub mod domain;
pub mod edits;
pub mod engine;
pub mod ports;
pub mod status;

pub use domain::{
    ActiveReviewer, ArchivedFeedback, Article, Block, BlockKind, BodyContent, Comment, Contact,
    DraftKey, EditAction, EditStatus, EditSuggestion, HeadingLevel, OutlineContent,
    ReviewAction, ReviewDraft, ReviewFeedback, Reviewer, Section,
};
pub use edits::{detect_conflict, merge_edits, new_edit, EditConflict, MergeOutcome};
pub use engine::{ReviewDecision, ReviewEngine, SubmitOutcome, TitleDecision};
pub use ports::{
    AccessControl, ArticleFilter, ArticleOrder, ArticleStore, AuthSessionStore, ContactDirectory,
    DraftStore, EditStore, PortError, PortResult, ReviewStateUpdate, TitleSuggestionService,
};
pub use status::{ApprovalState, ArticleStatus, ReviewPhase, ReviewType};
