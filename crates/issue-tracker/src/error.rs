use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Failure reported by the backing document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError(err.to_string())
    }
}

#[derive(Debug)]
pub enum IssueError {
    MissingRequiredFields,
    MissingOrInvalidId,
    NoUpdateFields {
        id: String,
    },
    NotFound {
        op: Operation,
        id: String,
    },
    Store {
        op: Operation,
        id: Option<String>,
        source: StoreError,
    },
}

impl fmt::Display for IssueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueError::MissingRequiredFields => write!(f, "required field(s) missing"),
            IssueError::MissingOrInvalidId => write!(f, "missing _id"),
            IssueError::NoUpdateFields { id } => write!(f, "no update field(s) sent for {id}"),
            IssueError::NotFound { op, id } => {
                write!(f, "could not {}: no issue {id}", op.as_str())
            }
            IssueError::Store { op, id, source } => match id {
                Some(id) => write!(f, "could not {} {id}: {source}", op.as_str()),
                None => write!(f, "could not {}: {source}", op.as_str()),
            },
        }
    }
}

impl std::error::Error for IssueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IssueError::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Wire body for every failed operation. Exactly one of `error` / `message`
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ErrorResponse {
    fn error(text: &str, id: Option<&str>) -> Self {
        ErrorResponse {
            error: Some(text.to_string()),
            message: None,
            id: id.map(String::from),
        }
    }

    fn message(text: &str) -> Self {
        ErrorResponse {
            error: None,
            message: Some(text.to_string()),
            id: None,
        }
    }

    /// Human-readable text regardless of which key carried it.
    pub fn text(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("unknown error")
    }
}

impl From<&IssueError> for ErrorResponse {
    fn from(err: &IssueError) -> Self {
        match err {
            IssueError::MissingRequiredFields => Self::error("required field(s) missing", None),
            IssueError::MissingOrInvalidId => Self::error("missing _id", None),
            IssueError::NoUpdateFields { id } => {
                Self::error("no update field(s) sent", Some(id.as_str()))
            }
            // Not-found and store failures are reported identically.
            IssueError::NotFound { op, id } => collapsed(*op, Some(id.as_str())),
            IssueError::Store { op, id, .. } => collapsed(*op, id.as_deref()),
        }
    }
}

fn collapsed(op: Operation, id: Option<&str>) -> ErrorResponse {
    match op {
        Operation::Create => ErrorResponse::error("could not create", None),
        Operation::List => ErrorResponse::message("error retrieving issues"),
        Operation::Update => ErrorResponse::error("could not update", id),
        Operation::Delete => ErrorResponse::error("could not delete", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(err: IssueError) -> serde_json::Value {
        serde_json::to_value(ErrorResponse::from(&err)).unwrap()
    }

    #[test]
    fn validation_bodies() {
        assert_eq!(
            body(IssueError::MissingRequiredFields),
            serde_json::json!({"error": "required field(s) missing"})
        );
        assert_eq!(
            body(IssueError::MissingOrInvalidId),
            serde_json::json!({"error": "missing _id"})
        );
        assert_eq!(
            body(IssueError::NoUpdateFields { id: "abc".into() }),
            serde_json::json!({"error": "no update field(s) sent", "_id": "abc"})
        );
    }

    #[test]
    fn not_found_and_store_failure_share_a_body() {
        let not_found = body(IssueError::NotFound {
            op: Operation::Delete,
            id: "abc".into(),
        });
        let failed = body(IssueError::Store {
            op: Operation::Delete,
            id: Some("abc".into()),
            source: StoreError("disk full".into()),
        });
        assert_eq!(not_found, failed);
        assert_eq!(
            not_found,
            serde_json::json!({"error": "could not delete", "_id": "abc"})
        );
    }

    #[test]
    fn list_failure_uses_message_key() {
        let value = body(IssueError::Store {
            op: Operation::List,
            id: None,
            source: StoreError("boom".into()),
        });
        assert!(value.get("error").is_none());
        assert_eq!(value["message"], "error retrieving issues");
    }

    #[test]
    fn display_includes_store_detail() {
        let err = IssueError::Store {
            op: Operation::Update,
            id: Some("abc".into()),
            source: StoreError("locked".into()),
        };
        assert_eq!(err.to_string(), "could not update abc: store error: locked");
    }
}
