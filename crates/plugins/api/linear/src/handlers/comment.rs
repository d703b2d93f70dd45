//! `add_comment`: post a markdown comment on an issue.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use taskbridge_core::{ActionMeta, CommentResult, Error, FieldSpec, Result, Schema};
use tracing::info;

use crate::context::LinearContext;
use crate::queries;
use crate::types::{CommentCreateData, CommentCreateInput};

pub const NAME: &str = "add_comment";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentArgs {
    pub issue_id: String,
    pub body: String,
}

pub fn meta() -> ActionMeta {
    ActionMeta::new(
        NAME,
        "Add a comment to a Linear issue",
        Schema::new()
            .field(
                FieldSpec::string("issueId")
                    .required()
                    .min_length(1)
                    .describe("Issue UUID or identifier"),
            )
            .field(
                FieldSpec::string("body")
                    .required()
                    .min_length(1)
                    .describe("Comment text (markdown)"),
            ),
    )
}

pub async fn add_comment(ctx: Arc<LinearContext>, args: AddCommentArgs) -> Result<CommentResult> {
    let input = CommentCreateInput {
        issue_id: args.issue_id,
        body: args.body,
    };
    let issue_id = input.issue_id.clone();

    let data: CommentCreateData = ctx
        .graphql(
            "CommentCreate",
            queries::CREATE_COMMENT,
            json!({ "input": input }),
        )
        .await?;

    let payload = data.comment_create;
    if !payload.success {
        return Err(Error::GraphQl(format!(
            "commentCreate on {} was not successful",
            issue_id
        )));
    }
    let comment = payload.comment.ok_or_else(|| {
        Error::InvalidData(format!("commentCreate on {} returned no comment", issue_id))
    })?;

    info!(issue = %issue_id, comment = %comment.id, "Comment added");

    Ok(CommentResult {
        success: true,
        comment: comment.into(),
    })
}
