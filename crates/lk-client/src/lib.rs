//! Client binding for the LiveKit media platform.
//!
//! The platform owns the hard parts (session orchestration, media routing,
//! token verification); this crate only speaks its fixed external contract:
//!
//! - `access_token` - signed access grants (HS256 JWT with the API key/secret)
//! - `grants` - the permission set embedded in a grant
//! - `dispatch` - the agent-dispatch RPC client and the [`AgentDispatcher`]
//!   seam that callers mock in tests

pub mod access_token;
pub mod dispatch;
pub mod grants;

pub use access_token::{AccessToken, Claims, TokenError};
pub use dispatch::{AgentDispatcher, DispatchClient, DispatchError};
pub use grants::VideoGrants;

// Re-exported so downstream crates handle secrets the same way without a
// direct secrecy dependency.
pub use secrecy::{ExposeSecret, SecretString};
