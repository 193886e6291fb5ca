use std::fmt;

use reqwest::Url;
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;

use crate::error::ErrorResponse;
use crate::types::{IssueFields, IssueFilter, non_empty};

pub const DEFAULT_DAEMON: &str = "http://localhost:3000";

#[derive(Debug)]
pub enum ClientError {
    /// The daemon could not be reached or answered with something unexpected.
    Transport(String),
    /// The daemon answered with an error body.
    Api(ErrorResponse),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "{msg}"),
            ClientError::Api(resp) => match &resp.id {
                Some(id) => write!(f, "{} ({id})", resp.text()),
                None => write!(f, "{}", resp.text()),
            },
        }
    }
}

impl std::error::Error for ClientError {}

pub struct Client {
    http: HttpClient,
    base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        let base_url = std::env::var("IT_DAEMON").unwrap_or_else(|_| DEFAULT_DAEMON.to_string());
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Client {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn check_reachable(&self) -> Result<(), String> {
        match self.http.get(format!("{}/health", self.base_url)).send() {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(format!("daemon returned status {}", resp.status())),
            Err(e) => Err(format!("cannot reach daemon at {}: {}", self.base_url, e)),
        }
    }

    /// The project is pushed as a single percent-encoded path segment.
    fn issues_url(&self, project: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Transport(format!("invalid daemon url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport(format!("invalid daemon url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "issues", project]);
        Ok(url)
    }

    /// Every issue route answers 200; failures are recognised by an `error`
    /// or `message` key in the body.
    fn parse(resp: reqwest::blocking::Response) -> Result<Value, ClientError> {
        if !resp.status().is_success() {
            return Err(ClientError::Transport(format!(
                "daemon returned status {}",
                resp.status()
            )));
        }

        let value: Value = resp
            .json()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let is_error = value
            .as_object()
            .is_some_and(|o| o.contains_key("error") || o.contains_key("message"));
        if is_error {
            let err = serde_json::from_value::<ErrorResponse>(value)
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            return Err(ClientError::Api(err));
        }

        Ok(value)
    }

    pub fn create_issue(&self, project: &str, fields: &IssueFields) -> Result<Value, ClientError> {
        let resp = self
            .http
            .post(self.issues_url(project)?)
            .json(fields)
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Self::parse(resp)
    }

    pub fn list_issues(&self, project: &str, filter: &IssueFilter) -> Result<Value, ClientError> {
        let mut params = Vec::new();
        if let Some(id) = non_empty(&filter.id) {
            params.push(("_id".to_string(), id.to_string()));
        }
        for (field, value) in filter.fields.entries() {
            params.push((field.as_str().to_string(), value.to_string()));
        }
        if let Some(open) = non_empty(&filter.open) {
            params.push(("open".to_string(), open.to_string()));
        }

        let resp = self
            .http
            .get(self.issues_url(project)?)
            .query(&params)
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Self::parse(resp)
    }

    pub fn update_issue(
        &self,
        project: &str,
        id: &str,
        fields: &IssueFields,
    ) -> Result<Value, ClientError> {
        let mut body = serde_json::to_value(fields.sparse())
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        body["_id"] = Value::String(id.to_string());

        let resp = self
            .http
            .put(self.issues_url(project)?)
            .json(&body)
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Self::parse(resp)
    }

    pub fn delete_issue(&self, project: &str, id: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .delete(self.issues_url(project)?)
            .json(&serde_json::json!({ "_id": id }))
            .send()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Self::parse(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = Client::with_base_url("http://localhost:4000/");
        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(
            client.issues_url("apitest").unwrap().as_str(),
            "http://localhost:4000/api/issues/apitest"
        );
    }

    #[test]
    fn project_is_one_encoded_segment() {
        let client = Client::with_base_url("http://localhost:4000");
        let url = client.issues_url("team?x #1/a").unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments, ["api", "issues", "team%3Fx%20%231%2Fa"]);
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        let client = Client::with_base_url("http://localhost:4000/tracker/");
        assert_eq!(
            client.issues_url("apitest").unwrap().as_str(),
            "http://localhost:4000/tracker/api/issues/apitest"
        );
    }

    #[test]
    fn unparseable_base_url_is_a_transport_error() {
        let client = Client::with_base_url("not a url");
        assert!(matches!(
            client.issues_url("apitest"),
            Err(ClientError::Transport(_))
        ));
    }

    #[test]
    fn api_error_display_includes_id() {
        let err = ClientError::Api(ErrorResponse {
            error: Some("could not delete".into()),
            message: None,
            id: Some("abc".into()),
        });
        assert_eq!(err.to_string(), "could not delete (abc)");
    }
}
