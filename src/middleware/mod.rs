pub mod auth;
pub mod response;

pub use auth::{extract_token, session_auth_middleware};
pub use response::{ApiResponse, ApiResult};
