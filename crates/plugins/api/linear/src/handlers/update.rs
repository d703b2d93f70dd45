//! `update_issue`: change title, description, state, assignee or priority.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use taskbridge_core::{ActionMeta, Error, FieldSpec, Result, Schema, UpdateIssueResult};
use tracing::info;

use crate::context::LinearContext;
use crate::queries;
use crate::types::{IssueUpdateData, IssueUpdateInput};

pub const NAME: &str = "update_issue";

const UPDATE_FIELDS: &[&str] = &["title", "description", "stateId", "assigneeId", "priority"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueArgs {
    pub issue_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state_id: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
}

impl From<UpdateIssueArgs> for IssueUpdateInput {
    fn from(args: UpdateIssueArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            state_id: args.state_id,
            assignee_id: args.assignee_id,
            priority: args.priority,
        }
    }
}

pub fn meta() -> ActionMeta {
    ActionMeta::new(
        NAME,
        "Update a Linear issue; at least one of title, description, stateId, assigneeId or priority is required",
        Schema::new()
            .field(
                FieldSpec::string("issueId")
                    .required()
                    .min_length(1)
                    .describe("Issue UUID or identifier"),
            )
            .field(FieldSpec::string("title").min_length(1).describe("New title"))
            .field(FieldSpec::string("description").describe("New description (markdown)"))
            .field(
                FieldSpec::string("stateId")
                    .min_length(1)
                    .describe("Target workflow state id"),
            )
            .field(
                FieldSpec::string("assigneeId")
                    .min_length(1)
                    .describe("New assignee user id"),
            )
            .field(
                FieldSpec::integer("priority")
                    .range(0, 4)
                    .describe("0 = none, 1 = urgent, 2 = high, 3 = medium, 4 = low"),
            )
            .require_one_of(UPDATE_FIELDS),
    )
}

pub async fn update_issue(
    ctx: Arc<LinearContext>,
    args: UpdateIssueArgs,
) -> Result<UpdateIssueResult> {
    let id = args.issue_id.clone();
    let input = IssueUpdateInput::from(args);

    let data: IssueUpdateData = ctx
        .graphql(
            "IssueUpdate",
            queries::UPDATE_ISSUE,
            json!({ "id": id, "input": input }),
        )
        .await?;

    let payload = data.issue_update;
    if !payload.success {
        return Err(Error::GraphQl(format!("issueUpdate for {} was not successful", id)));
    }
    let issue = payload
        .issue
        .ok_or_else(|| Error::InvalidData(format!("issueUpdate for {} returned no issue", id)))?;

    info!(issue = %id, "Issue updated");

    Ok(UpdateIssueResult {
        success: true,
        issue: issue.into(),
    })
}
