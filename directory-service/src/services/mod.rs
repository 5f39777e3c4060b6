pub mod access_store;
pub mod access_workflow;
pub mod contact_store;
pub mod contacts;
pub mod database;
pub mod directory;
pub mod email;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod metrics;
pub mod notifier;
pub mod store;

pub use access_store::{AccessRequestStore, InMemoryAccessRequestStore, MongoAccessRequestStore};
pub use access_workflow::{AccessRequestWorkflow, NewAccessRequest, Resolution, ResolveOutcome};
pub use contact_store::{ContactStore, InMemoryContactStore, MongoContactStore};
pub use contacts::{ContactDirectory, NewContact};
pub use database::MongoDb;
pub use directory::Diocese;
pub use email::{EmailProvider, LogOnlyEmailProvider, MockEmailProvider, SmtpProvider};
pub use error::WorkflowError;
pub use gateway::{EstablishedSession, IdentityGateway};
pub use identity::{HttpIdentityProvider, IdentityProvider, MockIdentityProvider};
pub use notifier::Notifier;
