//! Request handling for the four issue operations.
//!
//! Each function validates its payload, delegates one call to the injected
//! [`IssueStore`] and shapes the outcome. Failures come back as
//! [`IssueError`]; turning them into response bodies is the caller's job.

use crate::error::{IssueError, Operation};
use crate::id::is_valid;
use crate::store::IssueStore;
use crate::types::{ActionResult, Issue, IssueFields, IssueFilter, NewIssue, non_empty};

pub fn create_issue<S: IssueStore + ?Sized>(
    store: &S,
    project: &str,
    fields: &IssueFields,
) -> Result<Issue, IssueError> {
    let (Some(issue_title), Some(issue_text), Some(created_by)) = (
        non_empty(&fields.issue_title),
        non_empty(&fields.issue_text),
        non_empty(&fields.created_by),
    ) else {
        return Err(IssueError::MissingRequiredFields);
    };

    let new_issue = NewIssue {
        project: project.to_string(),
        issue_title: issue_title.to_string(),
        issue_text: issue_text.to_string(),
        created_by: created_by.to_string(),
        assigned_to: fields.assigned_to.clone().unwrap_or_default(),
        status_text: fields.status_text.clone().unwrap_or_default(),
    };

    store.insert(&new_issue).map_err(|source| {
        tracing::warn!(project, error = %source, "failed to create issue");
        IssueError::Store {
            op: Operation::Create,
            id: None,
            source,
        }
    })
}

pub fn list_issues<S: IssueStore + ?Sized>(
    store: &S,
    project: &str,
    filter: &IssueFilter,
) -> Result<Vec<Issue>, IssueError> {
    store.find_many(project, filter).map_err(|source| {
        tracing::warn!(project, error = %source, "failed to list issues");
        IssueError::Store {
            op: Operation::List,
            id: None,
            source,
        }
    })
}

/// Partial update by id. The path project plays no part in matching: an id
/// from any project is updatable.
pub fn update_issue<S: IssueStore + ?Sized>(
    store: &S,
    id: Option<&str>,
    fields: &IssueFields,
) -> Result<ActionResult, IssueError> {
    let id = match id {
        Some(id) if is_valid(id) => id,
        _ => return Err(IssueError::MissingOrInvalidId),
    };

    let sparse = fields.sparse();
    if sparse.is_empty() {
        return Err(IssueError::NoUpdateFields { id: id.to_string() });
    }

    match store.find_and_update(id, &sparse) {
        Ok(Some(_)) => Ok(ActionResult::updated(id)),
        Ok(None) => Err(IssueError::NotFound {
            op: Operation::Update,
            id: id.to_string(),
        }),
        Err(source) => {
            tracing::warn!(id, error = %source, "failed to update issue");
            Err(IssueError::Store {
                op: Operation::Update,
                id: Some(id.to_string()),
                source,
            })
        }
    }
}

/// Deletes by id. Only presence is checked; a malformed id reaches the store
/// and comes back as not found.
pub fn delete_issue<S: IssueStore + ?Sized>(
    store: &S,
    id: Option<&str>,
) -> Result<ActionResult, IssueError> {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        return Err(IssueError::MissingOrInvalidId);
    };

    match store.find_and_delete(id) {
        Ok(Some(_)) => Ok(ActionResult::deleted(id)),
        Ok(None) => Err(IssueError::NotFound {
            op: Operation::Delete,
            id: id.to_string(),
        }),
        Err(source) => {
            tracing::warn!(id, error = %source, "failed to delete issue");
            Err(IssueError::Store {
                op: Operation::Delete,
                id: Some(id.to_string()),
                source,
            })
        }
    }
}
