//! Linear provider for taskbridge.
//!
//! Exposes `search_issues`, `get_issue`, `update_issue` and `add_comment`
//! as schema-validated actions over Linear's GraphQL API.
//!
//! ```ignore
//! let http = Arc::new(ReqwestHttp::new(Duration::from_secs(30))?);
//! let ctx = Arc::new(LinearContext::new(http, LinearSettings::new(api_key)));
//! let registry = taskbridge_linear::build_registry(ctx)?;
//! ```

mod context;
pub mod handlers;
mod http;
mod queries;
mod types;

pub use context::{LinearContext, LinearSettings};
pub use handlers::{build_registry, register_actions};
pub use http::ReqwestHttp;
pub use taskbridge_core::config::DEFAULT_LINEAR_API_URL;
