//! Connection handling and index setup.

use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use pulse_core::Result;

use crate::error::store_err;
use crate::schema::{MessageDoc, PropertyDoc, ReviewDoc, UserDoc};
use crate::{MESSAGES, PROPERTIES, REVIEWS, USERS};

/// MongoDB-backed store. Cloning shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Open the pool and check the server answers.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await.map_err(store_err)?;
        let store = Self::with_client(client, database);
        store.ping_server().await?;
        info!(database, "Connected to MongoDB");
        Ok(store)
    }

    pub fn with_client(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self { client, db }
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    pub(crate) async fn ping_server(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(store_err)?;
        Ok(())
    }

    pub(crate) fn properties(&self) -> Collection<PropertyDoc> {
        self.db.collection(PROPERTIES)
    }

    pub(crate) fn reviews(&self) -> Collection<ReviewDoc> {
        self.db.collection(REVIEWS)
    }

    pub(crate) fn users(&self) -> Collection<UserDoc> {
        self.db.collection(USERS)
    }

    pub(crate) fn messages(&self) -> Collection<MessageDoc> {
        self.db.collection(MESSAGES)
    }

    /// Create the indexes the service relies on. Safe to run repeatedly.
    ///
    /// The unique review index is what turns a concurrent double review into
    /// a `Conflict` instead of two rows.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = IndexOptions::builder()
            .unique(true)
            .name("user_property_unique".to_string())
            .build();
        self.reviews()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user": 1, "property": 1 })
                    .options(unique)
                    .build(),
            )
            .await
            .map_err(store_err)?;
        self.reviews()
            .create_index(IndexModel::builder().keys(doc! { "property": 1 }).build())
            .await
            .map_err(store_err)?;
        self.properties()
            .create_index(IndexModel::builder().keys(doc! { "owner": 1 }).build())
            .await
            .map_err(store_err)?;
        self.messages()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "recipient": 1, "read": 1 })
                    .build(),
            )
            .await
            .map_err(store_err)?;
        debug!("Indexes ensured");
        Ok(())
    }

    /// Close the pool. Pending operations finish first.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }
}
