pub mod password;
pub mod phone;
pub mod validation;

pub use password::{generate_temporary_password, TemporaryPassword};
pub use phone::normalize_phone;
pub use validation::ValidatedJson;
