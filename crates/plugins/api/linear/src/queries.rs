//! GraphQL documents sent to Linear.

macro_rules! issue_fields {
    () => {
        "id identifier title description priority url createdAt updatedAt \
         state { name } assignee { name displayName } labels { nodes { name } }"
    };
}

pub const SEARCH_ISSUES: &str = concat!(
    "query SearchIssues($term: String!, $first: Int, $filter: IssueFilter, ",
    "$includeArchived: Boolean, $sort: [IssueSortInput!]) { ",
    "searchIssues(term: $term, first: $first, filter: $filter, ",
    "includeArchived: $includeArchived, sort: $sort) { nodes { ",
    issue_fields!(),
    " } } }"
);

pub const GET_ISSUE: &str = concat!(
    "query Issue($id: String!) { issue(id: $id) { ",
    issue_fields!(),
    " } }"
);

pub const UPDATE_ISSUE: &str = concat!(
    "mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) { ",
    "issueUpdate(id: $id, input: $input) { success issue { ",
    issue_fields!(),
    " } } }"
);

pub const CREATE_COMMENT: &str = concat!(
    "mutation CommentCreate($input: CommentCreateInput!) { ",
    "commentCreate(input: $input) { success comment { id body url createdAt } } }"
);
