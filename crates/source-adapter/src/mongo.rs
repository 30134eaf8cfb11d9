//! MongoDB-backed [`SourceAdapter`](crate::SourceAdapter), the only
//! concrete implementation shipped: the service's source databases are
//! always MongoDB-shaped (§3).

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document as BsonDocument};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::Client;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use search_types::{Document, SourceCollection};

use crate::error::{Error, Result};
use crate::timestamp::{parse_timestamp, timestamp_from_object_id, Timestamp};
use crate::{SourceAdapter, SourceDocument};

const INTRINSIC_ID_SENTINEL: &str = "_id";

pub struct MongoSourceAdapter {
    client: Client,
}

impl MongoSourceAdapter {
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(MongoSourceAdapter { client })
    }

    pub fn new(client: Client) -> Self {
        MongoSourceAdapter { client }
    }

    fn collection(&self, collection: &SourceCollection) -> mongodb::Collection<BsonDocument> {
        self.client
            .database(&collection.database)
            .collection(&collection.collection)
    }
}

/// The smallest ObjectId whose embedded creation timestamp is `>= ts`,
/// used to bound `_id`-ordered range queries (§3, §4.2) without requiring a
/// dedicated timestamp field.
fn object_id_floor(ts: Timestamp) -> ObjectId {
    let secs = ts.unix_timestamp().max(0) as u32;
    let mut bytes = [0u8; 12];
    bytes[0..4].copy_from_slice(&secs.to_be_bytes());
    ObjectId::from_bytes(bytes)
}

fn to_document(doc: &BsonDocument, id_field: &str, collection_key: &str) -> Result<SourceDocument> {
    let id_bson = doc
        .get(id_field)
        .ok_or_else(|| Error::MissingField(id_field.to_string(), collection_key.to_string()))?;
    let id = stringify_bson(id_bson);
    let timestamp = match id_bson {
        Bson::ObjectId(oid) if id_field == INTRINSIC_ID_SENTINEL => {
            Some(timestamp_from_object_id(oid))
        }
        _ => None,
    };
    let json = Bson::Document(doc.clone()).into_relaxed_extjson();
    let fields = match json {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok(SourceDocument { document: Document::new(id, fields), timestamp })
}

fn stringify_bson(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        other => other.into_relaxed_extjson().to_string(),
    }
}

fn json_filter_to_document(filter: Option<Value>) -> Result<BsonDocument> {
    match filter {
        None => Ok(doc! {}),
        Some(value) => bson::to_document(&value)
            .map_err(|e| Error::Unavailable(format!("invalid filter: {e}"))),
    }
}

#[async_trait]
impl SourceAdapter for MongoSourceAdapter {
    async fn find_all(
        &self,
        collection: &SourceCollection,
        limit: Option<u64>,
    ) -> Result<BoxStream<'_, Result<SourceDocument>>> {
        let coll = self.collection(collection);
        let mut options = mongodb::options::FindOptions::default();
        options.limit = limit.map(|n| n as i64);
        let cursor = coll.find(doc! {}).with_options(options).await?;
        let collection_key = collection.key();
        Ok(cursor
            .map_err(Error::from)
            .and_then(move |d| {
                let collection_key = collection_key.clone();
                async move { to_document(&d, "_id", &collection_key) }
            })
            .boxed())
    }

    async fn find_since(
        &self,
        collection: &SourceCollection,
        timestamp_field: &str,
        since: Timestamp,
        limit: Option<u64>,
    ) -> Result<BoxStream<'_, Result<SourceDocument>>> {
        let coll = self.collection(collection);
        let (filter, sort) = if timestamp_field == INTRINSIC_ID_SENTINEL {
            (doc! { "_id": { "$gt": object_id_floor(since) } }, doc! { "_id": 1 })
        } else {
            let since_bson = Bson::DateTime(bson::DateTime::from_time_0_3(since));
            (
                doc! { timestamp_field: { "$gt": since_bson } },
                doc! { timestamp_field: 1 },
            )
        };
        let mut options = mongodb::options::FindOptions::default();
        options.sort = Some(sort);
        options.limit = limit.map(|n| n as i64);
        let cursor = coll.find(filter).with_options(options).await?;
        let timestamp_field = timestamp_field.to_string();
        let collection_key = collection.key();
        Ok(cursor
            .map_err(Error::from)
            .and_then(move |d| {
                let timestamp_field = timestamp_field.clone();
                let collection_key = collection_key.clone();
                async move {
                    let mut source_doc = to_document(&d, "_id", &collection_key)?;
                    if timestamp_field != INTRINSIC_ID_SENTINEL {
                        if let Some(raw) = d.get(&timestamp_field) {
                            source_doc.timestamp = Some(parse_timestamp(raw)?);
                        }
                    }
                    Ok(source_doc)
                }
            })
            .boxed())
    }

    async fn max_timestamp(
        &self,
        collection: &SourceCollection,
        timestamp_field: &str,
    ) -> Result<Timestamp> {
        let coll = self.collection(collection);
        let sort_field = if timestamp_field == INTRINSIC_ID_SENTINEL { "_id" } else { timestamp_field };
        let mut options = mongodb::options::FindOneOptions::default();
        options.sort = Some(doc! { sort_field: -1 });
        let found = coll.find_one(doc! {}).with_options(options).await?;
        match found {
            None => Ok(OffsetDateTime::UNIX_EPOCH),
            Some(d) => {
                if timestamp_field == INTRINSIC_ID_SENTINEL {
                    match d.get("_id") {
                        Some(Bson::ObjectId(oid)) => Ok(timestamp_from_object_id(oid)),
                        _ => Ok(OffsetDateTime::UNIX_EPOCH),
                    }
                } else {
                    match d.get(timestamp_field) {
                        Some(raw) => parse_timestamp(raw),
                        None => Ok(OffsetDateTime::UNIX_EPOCH),
                    }
                }
            }
        }
    }

    async fn count(
        &self,
        collection: &SourceCollection,
        filter: Option<Value>,
    ) -> Result<u64> {
        let coll = self.collection(collection);
        let filter_doc = json_filter_to_document(filter)?;
        Ok(coll.count_documents(filter_doc).await?)
    }

    async fn has_field(&self, collection: &SourceCollection, field: &str) -> Result<bool> {
        let coll = self.collection(collection);
        let found = coll.find_one(doc! { field: { "$exists": true } }).await?;
        Ok(found.is_some())
    }

    async fn backfill_field(
        &self,
        collection: &SourceCollection,
        field: &str,
        value: Timestamp,
    ) -> Result<u64> {
        let coll = self.collection(collection);
        let bson_value = Bson::DateTime(bson::DateTime::from_time_0_3(value));
        let result = coll
            .update_many(
                doc! { field: { "$exists": false } },
                doc! { "$set": { field: bson_value } },
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_floor_embeds_the_timestamp() {
        let ts = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let oid = object_id_floor(ts);
        assert_eq!(oid.timestamp().timestamp_millis() / 1000, 1_700_000_000);
    }

    #[test]
    fn stringify_bson_uses_hex_for_object_ids() {
        let oid = ObjectId::new();
        assert_eq!(stringify_bson(&Bson::ObjectId(oid)), oid.to_hex());
    }

    #[test]
    fn to_document_extracts_intrinsic_timestamp() {
        let oid = ObjectId::new();
        let raw = doc! { "_id": oid, "name": "widget" };
        let source_doc = to_document(&raw, "_id", "db.coll").unwrap();
        assert_eq!(source_doc.document.id, oid.to_hex());
        assert!(source_doc.timestamp.is_some());
        assert_eq!(
            source_doc.document.fields.get("name").unwrap().as_str(),
            Some("widget")
        );
    }
}
