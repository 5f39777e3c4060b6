use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::time::Duration;

use crate::config::MongoConfig;

pub const ACCESS_REQUESTS: &str = "access_requests";
pub const CONTACT_PERSONS: &str = "contact_persons";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        tracing::info!(database = %config.database, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        let timeout = Duration::from_secs(config.timeout_seconds.max(1));
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.database);
        tracing::info!(database = %config.database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for directory-service");

        let requests = self.access_requests();

        self.create_index(
            &requests,
            doc! { "email": 1 },
            IndexOptions::builder()
                .name("email_lookup".to_string())
                .build(),
        )
        .await?;

        self.create_index(
            &requests,
            doc! { "status": 1, "created_at": -1 },
            IndexOptions::builder()
                .name("status_created_lookup".to_string())
                .build(),
        )
        .await?;

        // One access request per provisioned account
        self.create_index(
            &requests,
            doc! { "account_id": 1 },
            IndexOptions::builder()
                .name("account_id_unique".to_string())
                .unique(true)
                .sparse(true)
                .build(),
        )
        .await?;

        self.create_index(
            &self.contact_persons(),
            doc! { "forane": 1, "parish": 1 },
            IndexOptions::builder()
                .name("forane_parish_lookup".to_string())
                .build(),
        )
        .await?;

        Ok(())
    }

    async fn create_index(
        &self,
        collection: &Collection<Document>,
        keys: Document,
        options: IndexOptions,
    ) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(keys.clone())
            .options(options)
            .build();

        collection.create_index(index, None).await.map_err(|e| {
            tracing::error!(
                collection = %collection.name(),
                "Failed to create index {}: {}",
                keys,
                e
            );
            AppError::from(e)
        })?;
        tracing::info!(collection = %collection.name(), "Created index on {}", keys);
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn access_requests(&self) -> Collection<Document> {
        self.db.collection(ACCESS_REQUESTS)
    }

    pub fn contact_persons(&self) -> Collection<Document> {
        self.db.collection(CONTACT_PERSONS)
    }
}
