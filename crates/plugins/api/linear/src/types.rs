//! Linear GraphQL payload types and their mapping to normalized results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskbridge_core::{IssueDetails, IssueSummary, NormalizedComment};

// =============================================================================
// GraphQL envelope
// =============================================================================

/// Body POSTed to the GraphQL endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearState {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearUser {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl LinearUser {
    fn label(self) -> String {
        self.display_name
            .filter(|d| !d.is_empty())
            .unwrap_or(self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearIssue {
    pub id: String,
    #[serde(default)]
    pub identifier: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<LinearState>,
    /// 0 = none, 1 = urgent .. 4 = low
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub assignee: Option<LinearUser>,
    #[serde(default)]
    pub labels: Option<Connection<LinearLabel>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearComment {
    pub id: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// =============================================================================
// Operation payloads
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIssuesData {
    pub search_issues: Connection<LinearIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueData {
    pub issue: Option<LinearIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuePayload {
    pub success: bool,
    #[serde(default)]
    pub issue: Option<LinearIssue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateData {
    pub issue_update: IssuePayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentPayload {
    pub success: bool,
    #[serde(default)]
    pub comment: Option<LinearComment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateData {
    pub comment_create: CommentPayload,
}

/// `IssueUpdateInput`; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// `CommentCreateInput`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateInput {
    pub issue_id: String,
    pub body: String,
}

// =============================================================================
// Normalization
// =============================================================================

fn priority_level(raw: f64) -> u8 {
    raw.round().clamp(0.0, 4.0) as u8
}

impl From<LinearIssue> for IssueSummary {
    fn from(issue: LinearIssue) -> Self {
        Self {
            id: issue.id,
            title: issue.title,
            status: issue.state.map(|s| s.name).unwrap_or_default(),
            identifier: issue.identifier,
            url: issue.url,
            priority: issue.priority.map(priority_level),
            assignee: issue.assignee.map(LinearUser::label),
        }
    }
}

impl From<LinearIssue> for IssueDetails {
    fn from(issue: LinearIssue) -> Self {
        Self {
            identifier: issue.identifier.unwrap_or_else(|| issue.id.clone()),
            id: issue.id,
            title: issue.title,
            description: issue.description.filter(|d| !d.is_empty()),
            status: issue.state.map(|s| s.name).unwrap_or_default(),
            priority: issue.priority.map(priority_level),
            assignee: issue.assignee.map(LinearUser::label),
            labels: issue
                .labels
                .map(|c| c.nodes.into_iter().map(|l| l.name).collect())
                .unwrap_or_default(),
            url: issue.url,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

impl From<LinearComment> for NormalizedComment {
    fn from(comment: LinearComment) -> Self {
        Self {
            id: comment.id,
            body: comment.body,
            url: comment.url,
            created_at: comment.created_at,
        }
    }
}
