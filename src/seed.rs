//! Static Melbourne sample data for the `events` and `restaurants` collections.
//! Documents are written by id, so reseeding overwrites instead of duplicating.
//! The documents live in `data/*.json` and are compiled into the binary.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::storage::{DocumentStore, StoreError};

pub const EVENTS_COLLECTION: &str = "events";
pub const RESTAURANTS_COLLECTION: &str = "restaurants";

const EVENTS_JSON: &str = include_str!("../data/events.json");
const RESTAURANTS_JSON: &str = include_str!("../data/restaurants.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    /// `HH:MM`, stored as written.
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cuisine: String,
    pub organizer: String,
    pub organizer_email: String,
    pub participants: u32,
    pub max_participants: u32,
    pub price: u32,
    pub status: String,
    pub difficulty: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub monday: String,
    pub tuesday: String,
    pub wednesday: String,
    pub thursday: String,
    pub friday: String,
    pub saturday: String,
    pub sunday: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedPlace {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cuisine: String,
    pub description: String,
    pub address: String,
    pub location: GeoPoint,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub price_range: String,
    pub opening_hours: OpeningHours,
    pub features: Vec<String>,
    pub average_rating: f64,
    pub rating_count: u32,
    pub image_url: String,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn parse_rows<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, String> {
    serde_json::from_str(raw).map_err(|e| e.to_string())
}

static EVENTS: Lazy<Result<Vec<SeedEvent>, String>> = Lazy::new(|| parse_rows(EVENTS_JSON));
static RESTAURANTS: Lazy<Result<Vec<SeedPlace>, String>> = Lazy::new(|| parse_rows(RESTAURANTS_JSON));

/// The Melbourne cooking events and workshops.
pub fn events() -> Result<&'static [SeedEvent], StoreError> {
    EVENTS.as_deref().map_err(|e| StoreError::InvalidDocument(format!("events sample data: {}", e)))
}

/// The Melbourne restaurants, grocery stores and markets.
pub fn restaurants() -> Result<&'static [SeedPlace], StoreError> {
    RESTAURANTS.as_deref().map_err(|e| StoreError::InvalidDocument(format!("restaurants sample data: {}", e)))
}

/// Per-collection outcome. Individual write failures are counted, not fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub success: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub events: SeedReport,
    pub restaurants: SeedReport,
}

async fn seed_collection<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    docs: Result<&[T], StoreError>,
    id_of: impl Fn(&T) -> &str,
) -> SeedReport {
    let docs = match docs {
        Ok(d) => d,
        Err(e) => {
            error!(target: "seed", %collection, error = %e, "sample data unreadable");
            return SeedReport { success: 0, errors: 1 };
        }
    };
    let mut report = SeedReport::default();
    for doc in docs {
        let id = id_of(doc);
        let written = match serde_json::to_value(doc) {
            Ok(v) => store.set(collection, id, v).await,
            Err(e) => Err(StoreError::InvalidDocument(e.to_string())),
        };
        match written {
            Ok(()) => report.success += 1,
            Err(e) => {
                error!(target: "seed", %collection, id, error = %e, "seed write failed");
                report.errors += 1;
            }
        }
    }
    info!(target: "seed", %collection, success = report.success, errors = report.errors, "seeding finished");
    report
}

pub async fn seed_events(store: &dyn DocumentStore) -> SeedReport {
    seed_collection(store, EVENTS_COLLECTION, events(), |e| e.id.as_str()).await
}

pub async fn seed_restaurants(store: &dyn DocumentStore) -> SeedReport {
    seed_collection(store, RESTAURANTS_COLLECTION, restaurants(), |r| r.id.as_str()).await
}

/// Seed both collections. Fails only if nothing at all could be written.
pub async fn seed_all(store: &dyn DocumentStore) -> Result<SeedSummary, StoreError> {
    let summary = SeedSummary { events: seed_events(store).await, restaurants: seed_restaurants(store).await };
    if summary.events.success + summary.restaurants.success == 0 {
        return Err(StoreError::Unavailable("no sample documents could be written".into()));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn sample_data_parses() {
        assert_eq!(events().unwrap().len(), 10);
        assert_eq!(restaurants().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn seeds_every_event_and_place() {
        let store = MemoryStore::new();
        let s = seed_all(&store).await.unwrap();
        assert_eq!(s.events, SeedReport { success: 10, errors: 0 });
        assert_eq!(s.restaurants, SeedReport { success: 11, errors: 0 });
        assert_eq!(store.count(RESTAURANTS_COLLECTION).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn reseeding_does_not_duplicate() {
        let store = MemoryStore::new();
        seed_events(&store).await;
        seed_events(&store).await;
        assert_eq!(store.count(EVENTS_COLLECTION).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn event_documents_keep_source_values() {
        let store = MemoryStore::new();
        seed_events(&store).await;
        let doc = store.get(EVENTS_COLLECTION, "event_002").await.unwrap().unwrap();
        assert_eq!(doc["status"], "Almost Full");
        assert_eq!(doc["type"], "Cooking Class");
        assert_eq!(doc["participants"], 18);
        assert_eq!(doc["maxParticipants"], 20);
        assert_eq!(doc["startTime"], "18:00");
        assert_eq!(doc["date"], "2025-11-20");
        assert_eq!(doc["organizer"], "Chef Giovanni Rossi");
        assert_eq!(doc["createdAt"], "2025-09-28T09:00:00");
        assert_eq!(doc["updatedAt"], "2025-10-18T16:45:00");

        let doc = store.get(EVENTS_COLLECTION, "event_003").await.unwrap().unwrap();
        assert_eq!(doc["endTime"], "19:00");
        assert_eq!(doc["participants"], 450);
        assert_eq!(doc["type"], "Food Festival");
        assert_eq!(doc["tags"][4], "free");
    }

    #[tokio::test]
    async fn place_documents_keep_source_values() {
        let store = MemoryStore::new();
        seed_restaurants(&store).await;
        let doc = store.get(RESTAURANTS_COLLECTION, "rest_003").await.unwrap().unwrap();
        assert_eq!(doc["address"], "187 Lonsdale Street, Melbourne VIC 3000");
        assert_eq!(doc["averageRating"], 4.4);
        assert_eq!(doc["priceRange"], "$$");

        let doc = store.get(RESTAURANTS_COLLECTION, "rest_001").await.unwrap().unwrap();
        assert_eq!(doc["phone"], "+61 3 8663 2000");
        assert_eq!(doc["ratingCount"], 1523);
        assert_eq!(doc["openingHours"]["friday"], "11:00 AM - 12:00 AM");
        assert_eq!(doc["location"]["latitude"], -37.8179);
        assert_eq!(doc["features"][3], "No Reservations");
    }

    #[tokio::test]
    async fn outage_counts_errors_and_fails_seed_all() {
        let store = MemoryStore::new();
        store.set_unavailable(Some("offline".into()));
        assert_eq!(seed_restaurants(&store).await.errors, 11);
        assert!(seed_all(&store).await.is_err());
    }
}
