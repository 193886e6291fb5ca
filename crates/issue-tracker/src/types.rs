use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "_id")]
    pub id: String,
    pub project: String,
    pub issue_title: String,
    pub issue_text: String,
    pub created_by: String,
    pub assigned_to: String,
    pub status_text: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub open: bool,
}

/// A create payload that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project: String,
    pub issue_title: String,
    pub issue_text: String,
    pub created_by: String,
    pub assigned_to: String,
    pub status_text: String,
}

/// The five caller-editable text fields, each optional. Used both as the
/// create payload and as a sparse update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
}

impl IssueFields {
    /// Drops absent and empty values, leaving only what should be written.
    pub fn sparse(&self) -> IssueFields {
        IssueFields {
            issue_title: non_empty(&self.issue_title).map(String::from),
            issue_text: non_empty(&self.issue_text).map(String::from),
            created_by: non_empty(&self.created_by).map(String::from),
            assigned_to: non_empty(&self.assigned_to).map(String::from),
            status_text: non_empty(&self.status_text).map(String::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Present, non-empty fields in declaration order.
    pub fn entries(&self) -> Vec<(Field, &str)> {
        [
            (Field::IssueTitle, &self.issue_title),
            (Field::IssueText, &self.issue_text),
            (Field::CreatedBy, &self.created_by),
            (Field::AssignedTo, &self.assigned_to),
            (Field::StatusText, &self.status_text),
        ]
        .into_iter()
        .filter_map(|(field, value)| non_empty(value).map(|v| (field, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    IssueTitle,
    IssueText,
    CreatedBy,
    AssignedTo,
    StatusText,
    Open,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "_id",
            Field::IssueTitle => "issue_title",
            Field::IssueText => "issue_text",
            Field::CreatedBy => "created_by",
            Field::AssignedTo => "assigned_to",
            Field::StatusText => "status_text",
            Field::Open => "open",
        }
    }
}

/// Equality filters accepted by the list operation. Keys outside this set are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: IssueFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue<'a> {
    Text(&'a str),
    Bool(bool),
    /// A value that no stored issue can equal, e.g. `open=maybe`.
    Unmatchable,
}

impl IssueFilter {
    /// Builds a filter from raw query pairs. Unknown keys are dropped; when a
    /// key repeats, its last non-empty value wins.
    pub fn from_pairs<K, V, I>(pairs: I) -> IssueFilter
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut filter = IssueFilter::default();
        for (key, value) in pairs {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "_id" => &mut filter.id,
                "issue_title" => &mut filter.fields.issue_title,
                "issue_text" => &mut filter.fields.issue_text,
                "created_by" => &mut filter.fields.created_by,
                "assigned_to" => &mut filter.fields.assigned_to,
                "status_text" => &mut filter.fields.status_text,
                "open" => &mut filter.open,
                _ => continue,
            };
            *slot = Some(value);
        }
        filter
    }

    pub fn clauses(&self) -> Vec<(Field, FilterValue<'_>)> {
        let mut clauses = Vec::new();
        if let Some(id) = non_empty(&self.id) {
            clauses.push((Field::Id, FilterValue::Text(id)));
        }
        for (field, value) in self.fields.entries() {
            clauses.push((field, FilterValue::Text(value)));
        }
        if let Some(open) = non_empty(&self.open) {
            let value = match open {
                "true" => FilterValue::Bool(true),
                "false" => FilterValue::Bool(false),
                _ => FilterValue::Unmatchable,
            };
            clauses.push((Field::Open, value));
        }
        clauses
    }
}

/// Success body for update and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub result: String,
    #[serde(rename = "_id")]
    pub id: String,
}

impl ActionResult {
    pub fn updated(id: &str) -> Self {
        ActionResult {
            result: "successfully updated".to_string(),
            id: id.to_string(),
        }
    }

    pub fn deleted(id: &str) -> Self {
        ActionResult {
            result: "successfully deleted".to_string(),
            id: id.to_string(),
        }
    }
}

pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
