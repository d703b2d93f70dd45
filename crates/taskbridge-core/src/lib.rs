//! Core abstractions for taskbridge: schema-validated actions, the registry
//! that dispatches them, effect interfaces, envelopes and error handling.
//!
//! This crate knows nothing about any transport or tracker. Provider plugins
//! build actions on top of it and hosts (MCP server, CLI) drive the
//! [`Registry`].

pub mod action;
pub mod config;
pub mod effect;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod schema;
pub mod types;

pub use action::{create_action, Action, ActionError, ActionMeta, FnAction};
pub use config::{Config, LinearConfig};
pub use effect::{
    HttpEffect, HttpMethod, HttpResponse, InMemoryHttp, RecordedRequest, RequestOptions,
};
pub use envelope::{codes, CallEnvelope, ErrorBody, ResponseEnvelope};
pub use error::{Error, Result};
pub use registry::{Discovery, OperationDescriptor, Registry};
pub use schema::{FieldError, FieldSpec, FieldType, Schema};
pub use types::{
    CommentResult, IssueDetails, IssueSummary, NormalizedComment, SearchResults,
    UpdateIssueResult,
};
