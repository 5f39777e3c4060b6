pub mod requests;
pub mod session;
pub mod signup;
pub mod verify;

pub use requests::{approve_user, get_user_request, list_user_requests};
pub use session::{login, logout, me};
pub use signup::signup;
pub use verify::verify;
