//! `search_issues`: full-text issue search.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use taskbridge_core::{ActionMeta, FieldSpec, IssueSummary, Result, Schema, SearchResults};
use tracing::debug;

use crate::context::LinearContext;
use crate::queries;
use crate::types::SearchIssuesData;

pub const NAME: &str = "search_issues";

pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Priority,
    CreatedAt,
    UpdatedAt,
}

impl SortBy {
    fn field(self) -> &'static str {
        match self {
            SortBy::Priority => "priority",
            SortBy::CreatedAt => "createdAt",
            SortBy::UpdatedAt => "updatedAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    pub limit: u32,
    #[serde(default)]
    pub include_archived: bool,
}

pub fn meta() -> ActionMeta {
    ActionMeta::new(
        NAME,
        "Search Linear issues by text, optionally filtered by team, status, assignee and priority",
        Schema::new()
            .field(
                FieldSpec::string("query")
                    .required()
                    .describe("Search text; blank returns no results"),
            )
            .field(FieldSpec::string("teamId").describe("Only issues of this team"))
            .field(FieldSpec::string("status").describe("Workflow state name, case-insensitive"))
            .field(FieldSpec::string("assigneeId").describe("Only issues assigned to this user"))
            .field(
                FieldSpec::integer("priority")
                    .range(0, 4)
                    .describe("0 = none, 1 = urgent, 2 = high, 3 = medium, 4 = low"),
            )
            .field(
                FieldSpec::string("sortBy")
                    .one_of(&["priority", "createdAt", "updatedAt"])
                    .describe("Sort key"),
            )
            .field(
                FieldSpec::string("sortDirection")
                    .one_of(&["asc", "desc"])
                    .default_value(json!("desc")),
            )
            .field(
                FieldSpec::integer("limit")
                    .range(1, MAX_LIMIT)
                    .default_value(json!(DEFAULT_LIMIT))
                    .describe("Maximum number of results"),
            )
            .field(
                FieldSpec::boolean("includeArchived")
                    .default_value(json!(false))
                    .describe("Include archived issues"),
            ),
    )
}

/// Upstream order for a requested sort.
///
/// Linear ranks priority so that a lower number is more urgent, so the
/// direction is inverted for `priority`: `asc` asks for most urgent first.
pub fn sort_order(sort_by: SortBy, direction: SortDirection) -> &'static str {
    let ascending = match sort_by {
        SortBy::Priority => direction == SortDirection::Desc,
        SortBy::CreatedAt | SortBy::UpdatedAt => direction == SortDirection::Asc,
    };
    if ascending {
        "Ascending"
    } else {
        "Descending"
    }
}

fn filter(args: &SearchArgs) -> Option<Value> {
    let mut filter = Map::new();
    if let Some(team_id) = &args.team_id {
        filter.insert("team".into(), json!({"id": {"eq": team_id}}));
    }
    if let Some(status) = &args.status {
        filter.insert("state".into(), json!({"name": {"eqIgnoreCase": status}}));
    }
    if let Some(assignee_id) = &args.assignee_id {
        filter.insert("assignee".into(), json!({"id": {"eq": assignee_id}}));
    }
    if let Some(priority) = args.priority {
        filter.insert("priority".into(), json!({"eq": priority}));
    }
    (!filter.is_empty()).then_some(Value::Object(filter))
}

/// GraphQL variables for a search.
pub fn variables(args: &SearchArgs) -> Value {
    let mut vars = Map::new();
    vars.insert("term".into(), json!(args.query.trim()));
    vars.insert("first".into(), json!(args.limit));
    vars.insert("includeArchived".into(), json!(args.include_archived));
    if let Some(filter) = filter(args) {
        vars.insert("filter".into(), filter);
    }
    if let Some(sort_by) = args.sort_by {
        let mut sort = Map::new();
        sort.insert(
            sort_by.field().into(),
            json!({"order": sort_order(sort_by, args.sort_direction)}),
        );
        vars.insert("sort".into(), json!([sort]));
    }
    Value::Object(vars)
}

pub async fn search_issues(ctx: Arc<LinearContext>, args: SearchArgs) -> Result<SearchResults> {
    if args.query.trim().is_empty() {
        debug!("Blank search query, skipping request");
        return Ok(SearchResults::empty());
    }

    let data: SearchIssuesData = ctx
        .graphql("SearchIssues", queries::SEARCH_ISSUES, variables(&args))
        .await?;

    let results: Vec<IssueSummary> = data
        .search_issues
        .nodes
        .into_iter()
        .map(Into::into)
        .collect();
    debug!(count = results.len(), "Search returned issues");

    Ok(SearchResults { results })
}
