pub mod auth_service;
pub mod clients;
pub mod user_external_service;
pub mod user_service;

pub use auth_service::{AuthService, LoginCmd, LoginVo};
pub use user_external_service::UserExternalService;
pub use user_service::{CreateUserCmd, ListQuery, UpdateUserCmd, UserListVo, UserService, UserVo};
