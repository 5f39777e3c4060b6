pub mod session;

pub use session::{require_role, session_secret, CurrentUser, RoleGuard, SESSION_COOKIE};
