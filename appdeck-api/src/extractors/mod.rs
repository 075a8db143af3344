//! Request extractors for handlers.
//!
//! - `path_id`: typed application IDs from path parameters
//! - `principal`: the principal the request guard attached, plus client IP

mod path_id;
mod principal;

pub use path_id::AppId;
pub use principal::{ClientIp, SessionIdentity, TenantContext};
