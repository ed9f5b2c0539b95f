use crate::{
    domain::MemeRepository,
    errors::RepoError,
    models::{sort_newest_first, DeleteOutcome, MemeRecord, NewMeme},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoDbClient};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DynamoDbMemeRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbMemeRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbMemeRepository");
        Self { client, table_name }
    }

    async fn exists(&self, id: &str) -> Result<bool, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("meme_id", AttributeValue::S(id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get meme (id: {})", self.table_name, id))
            .map_err(RepoError::BackendError)?;
        Ok(resp.item.is_some())
    }
}

#[async_trait]
impl MemeRepository for DynamoDbMemeRepository {
    /// Stores a new meme with PutItem, refusing to overwrite an existing id.
    async fn insert(&self, meme: NewMeme) -> Result<MemeRecord, RepoError> {
        let record = MemeRecord {
            id: Uuid::new_v4(),
            title: meme.title,
            description: meme.description,
            image_url: meme.image_url,
            owner_id: meme.owner_id,
            created_at: Utc::now(),
        };

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(meme_to_item(&record)))
            .condition_expression("attribute_not_exists(meme_id)")
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put meme (id: {})", self.table_name, record.id))
            .map_err(RepoError::BackendError)?;

        tracing::debug!(meme_id = %record.id, table_name = %self.table_name, "DynamoDB: Inserted meme");
        Ok(record)
    }

    /// Lists all memes using DynamoDB Scan, newest first. Handles pagination.
    async fn list_newest_first(&self) -> Result<Vec<MemeRecord>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for all memes", self.table_name);
        let mut memes: Vec<MemeRecord> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let resp = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            for item in resp.items.unwrap_or_default() {
                match item_to_meme(&item) {
                    Some(meme) => memes.push(meme),
                    None => {
                        let item_id = item.get("meme_id").and_then(|v| v.as_s().ok());
                        tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into MemeRecord");
                        // Fail fast if data in the table is corrupt
                        return Err(RepoError::BackendError(anyhow::anyhow!(
                            "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                            item_id,
                            self.table_name
                        )));
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
            tracing::debug!("DynamoDB Scan (table: {}): Continuing with LastEvaluatedKey...", self.table_name);
        }

        sort_newest_first(&mut memes);
        tracing::debug!("DynamoDB (table: {}): Listed {} memes", self.table_name, memes.len());
        Ok(memes)
    }

    /// Deletes an item with DeleteItem, conditional on ownership.
    async fn delete(&self, id: Uuid, owner_id: &str) -> Result<DeleteOutcome, RepoError> {
        let id_str = id.to_string();
        tracing::debug!(meme_id = %id_str, table_name = %self.table_name, "DynamoDB: Deleting item");

        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("meme_id", AttributeValue::S(id_str.clone()))
            // Fails for a missing item as well as a foreign one
            .condition_expression("owner_id = :owner")
            .expression_attribute_values(":owner", AttributeValue::S(owner_id.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(sdk_err)
                if sdk_err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                if self.exists(&id_str).await? {
                    Err(RepoError::NotOwner(id))
                } else {
                    Ok(DeleteOutcome::NotFound)
                }
            }
            Err(sdk_err) => Err(RepoError::BackendError(
                anyhow::Error::new(sdk_err)
                    .context(format!("DynamoDB (table: {}): Failed to delete meme (id: {})", self.table_name, id_str)),
            )),
        }
    }
}

fn meme_to_item(meme: &MemeRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("meme_id".to_string(), AttributeValue::S(meme.id.to_string())),
        ("title".to_string(), AttributeValue::S(meme.title.clone())),
        ("description".to_string(), AttributeValue::S(meme.description.clone())),
        ("image_url".to_string(), AttributeValue::S(meme.image_url.clone())),
        ("owner_id".to_string(), AttributeValue::S(meme.owner_id.clone())),
        (
            "created_at".to_string(),
            AttributeValue::S(meme.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        ),
    ])
}

// Helper function to convert DynamoDB item map to MemeRecord
fn item_to_meme(item: &HashMap<String, AttributeValue>) -> Option<MemeRecord> {
    let id = item
        .get("meme_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let title = item.get("title")?.as_s().ok()?.to_string();
    let description = item.get("description")?.as_s().ok()?.to_string();
    // Empty string is stored as-is; it means "no image".
    let image_url = item.get("image_url")?.as_s().ok()?.to_string();
    let owner_id = item.get("owner_id")?.as_s().ok()?.to_string();
    let created_at = item
        .get("created_at")?
        .as_s()
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);

    Some(MemeRecord {
        id,
        title,
        description,
        image_url,
        owner_id,
        created_at,
    })
}
