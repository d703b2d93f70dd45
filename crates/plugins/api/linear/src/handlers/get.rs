//! `get_issue`: fetch one issue by id or identifier.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use taskbridge_core::{ActionMeta, Error, FieldSpec, IssueDetails, Result, Schema};

use crate::context::LinearContext;
use crate::queries;
use crate::types::IssueData;

pub const NAME: &str = "get_issue";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetIssueArgs {
    pub issue_id: String,
}

pub fn meta() -> ActionMeta {
    ActionMeta::new(
        NAME,
        "Get a Linear issue with its description, labels and assignee",
        Schema::new().field(
            FieldSpec::string("issueId")
                .required()
                .min_length(1)
                .describe("Issue UUID or identifier such as ENG-42"),
        ),
    )
}

pub async fn get_issue(ctx: Arc<LinearContext>, args: GetIssueArgs) -> Result<IssueDetails> {
    let data: IssueData = ctx
        .graphql("Issue", queries::GET_ISSUE, json!({ "id": args.issue_id }))
        .await?;

    data.issue
        .map(Into::into)
        .ok_or_else(|| Error::NotFound(format!("issue {}", args.issue_id)))
}
