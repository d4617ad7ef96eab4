//! crates/review_portal_core/src/edits.rs
//!
//! Edit-suggestion construction, conflict detection between concurrent
//! reviewers, and the one-sided merge used when a reviewer loads a
//! snapshot saved by someone else.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{EditAction, EditStatus, EditSuggestion, Reviewer};

/// Builds a fresh, pending edit suggestion. Pure: does not persist.
pub fn new_edit(
    target_id: impl Into<String>,
    action: EditAction,
    original_content: Option<String>,
    suggested_content: Option<String>,
    author: Reviewer,
) -> EditSuggestion {
    EditSuggestion {
        id: Uuid::new_v4(),
        target_id: target_id.into(),
        action,
        original_content,
        suggested_content,
        author,
        created_at: Utc::now(),
        status: EditStatus::Pending,
    }
}

/// Decides whether two edit suggestions contend for the same element.
///
/// Symmetric. Rules:
/// - different targets never conflict;
/// - modify vs modify conflicts iff their `original_content` baselines
///   differ (the reviewers started from different snapshots — a
///   lost-update signal);
/// - delete vs modify on the same target always conflicts;
/// - adds never collide: their target ids are freshly minted.
pub fn detect_conflict(a: &EditSuggestion, b: &EditSuggestion) -> bool {
    if a.target_id != b.target_id {
        return false;
    }
    match (a.action, b.action) {
        (EditAction::Modify, EditAction::Modify) => a.original_content != b.original_content,
        (EditAction::Delete, EditAction::Modify) | (EditAction::Modify, EditAction::Delete) => {
            true
        }
        _ => false,
    }
}

/// A conflicting pair recorded by [`merge_edits`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditConflict {
    pub local: EditSuggestion,
    pub remote: EditSuggestion,
}

/// Result of merging a remote edit set into a local one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub merged: Vec<EditSuggestion>,
    pub conflicts: Vec<EditConflict>,
}

/// Merges `remote` edits into `local`, one-sided: local edits are kept
/// verbatim, a remote edit that conflicts with any local edit is
/// recorded and dropped, and duplicates (same id) are skipped. The
/// submitting reviewer's own in-progress edits take precedence over a
/// concurrently loaded snapshot from another reviewer.
pub fn merge_edits(local: Vec<EditSuggestion>, remote: Vec<EditSuggestion>) -> MergeOutcome {
    let mut merged = local.clone();
    let mut conflicts = Vec::new();

    for remote_edit in remote {
        if let Some(local_edit) = local.iter().find(|l| detect_conflict(l, &remote_edit)) {
            conflicts.push(EditConflict {
                local: local_edit.clone(),
                remote: remote_edit,
            });
            continue;
        }
        if merged.iter().any(|e| e.id == remote_edit.id) {
            continue;
        }
        merged.push(remote_edit);
    }

    MergeOutcome { merged, conflicts }
}
