pub mod access_request;
pub mod contact;
pub mod diocese;
pub mod user;

pub use access_request::{AccessRequest, AccessStatus, InvalidTransition, StatusTransition};
pub use contact::{ContactFilter, ContactPerson, SearchScope};
pub use diocese::{Forane, Parish};
pub use user::{AuthenticatedUser, Role};
