pub mod access;
pub mod context;
pub mod identity;
pub mod session;

pub use access::{require_access, RouteAccess};
pub use context::{AuthContext, CurrentUser, MaybeUser};
pub use identity::SessionIdentity;
pub use session::{SessionError, SessionManager};
