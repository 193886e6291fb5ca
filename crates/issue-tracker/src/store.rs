use crate::error::StoreError;
use crate::types::{Issue, IssueFields, IssueFilter, NewIssue};

/// Document-store capability the request handler persists through.
///
/// Every method is a single atomic operation on one record (or one query);
/// implementations do not coordinate across calls.
pub trait IssueStore: Send + Sync {
    /// Stores a new open issue, assigning its id and both timestamps.
    fn insert(&self, issue: &NewIssue) -> Result<Issue, StoreError>;

    /// Issues in `project` matching every clause of `filter`.
    fn find_many(&self, project: &str, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError>;

    /// Applies the non-empty entries of `fields` and bumps `updated_on`.
    /// Returns `None` when no issue has that id.
    fn find_and_update(&self, id: &str, fields: &IssueFields)
    -> Result<Option<Issue>, StoreError>;

    /// Removes the issue, returning it, or `None` when no issue has that id.
    fn find_and_delete(&self, id: &str) -> Result<Option<Issue>, StoreError>;
}
