use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Bson, Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoCoachBookingDocument, MongoCoachSlotDocument, MongoGameDocument, bson_datetime,
        bson_uuid, date_key, doc_id, entity_uuid,
    },
};
use crate::dao::{
    game_store::{
        BookingFilter, BookingTransition, CoachStore, GameFilter, GameStore, SlotFilter, Stores,
    },
    models::{CoachBookingEntity, CoachBookingStatus, CoachSlotEntity, GameEntity},
    storage::StorageResult,
};

const GAME_COLLECTION: &str = "games";
const SLOT_COLLECTION: &str = "coach_slots";
const BOOKING_COLLECTION: &str = "coach_bookings";

/// MongoDB-backed store with a swappable client for reconnects.
#[derive(Clone)]
pub struct MongoStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Both store handles backed by this connection.
    pub fn stores(&self) -> Stores {
        Stores {
            games: Arc::new(self.clone()),
            coaching: Arc::new(self.clone()),
        }
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let indexes: [(&'static str, &'static str, Document, bool); 5] = [
            (
                GAME_COLLECTION,
                "venue.location",
                doc! { "venue.location": "2dsphere" },
                false,
            ),
            (
                GAME_COLLECTION,
                "approved_players,status",
                doc! { "approved_players": 1, "status": 1 },
                false,
            ),
            (
                SLOT_COLLECTION,
                "coach_id,date,start_time,end_time",
                doc! { "coach_id": 1, "date": 1, "start_time": 1, "end_time": 1 },
                true,
            ),
            (
                BOOKING_COLLECTION,
                "player_id,status",
                doc! { "player_id": 1, "status": 1 },
                false,
            ),
            (BOOKING_COLLECTION, "coach_id", doc! { "coach_id": 1 }, false),
        ];

        for (collection, index, keys, unique) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(Some(unique)).build())
                .build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION)
    }

    async fn slots(&self) -> Collection<MongoCoachSlotDocument> {
        self.database().await.collection(SLOT_COLLECTION)
    }

    async fn bookings(&self) -> Collection<MongoCoachBookingDocument> {
        self.database().await.collection(BOOKING_COLLECTION)
    }

    async fn insert_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document = MongoGameDocument::from(game);
        self.games()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                MongoDaoError::from_insert(GAME_COLLECTION, id, "game already exists", source)
            })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: GAME_COLLECTION,
                id,
                source,
            })?;
        document.map(decode_game).transpose()
    }

    async fn replace_game(&self, mut game: GameEntity) -> MongoResult<GameEntity> {
        let id = game.id;
        let expected = game.version;
        let mut filter = doc_id(id);
        filter.insert("version", i64::try_from(expected).unwrap_or(i64::MAX));

        game.version = expected + 1;
        let document = MongoGameDocument::from(game.clone());
        let result = self
            .games()
            .await
            .replace_one(filter, &document)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: GAME_COLLECTION,
                id,
                source,
            })?;

        if result.matched_count == 0 {
            debug!(game_id = %id, expected, "game replace lost a version race");
            return Err(MongoDaoError::VersionConflict { id, expected });
        }
        Ok(game)
    }

    async fn list_open_games(&self, filter: GameFilter) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(game_query(&filter))
            .sort(doc! { "slot.start_time": 1 })
            .await
            .map_err(game_query_error)?
            .try_collect()
            .await
            .map_err(game_query_error)?;

        // Sport matching and remaining capacity are evaluated on the decoded entity.
        let mut games = Vec::with_capacity(documents.len());
        for document in documents {
            let game = decode_game(document)?;
            if filter.matches(&game) {
                games.push(game);
            }
        }
        Ok(games)
    }

    async fn find_active_games_for_user(&self, user: Uuid) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(doc! {
                "approved_players": bson_uuid(user),
                "status": { "$in": ["Open", "Full"] },
            })
            .await
            .map_err(game_query_error)?
            .try_collect()
            .await
            .map_err(game_query_error)?;

        documents.into_iter().map(decode_game).collect()
    }

    async fn insert_slot(&self, slot: CoachSlotEntity) -> MongoResult<()> {
        let id = slot.id;
        let document = MongoCoachSlotDocument::from(slot);
        self.slots()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                MongoDaoError::from_insert(
                    SLOT_COLLECTION,
                    id,
                    "slot already exists for this coach at that time",
                    source,
                )
            })?;
        Ok(())
    }

    async fn find_slot(&self, id: Uuid) -> MongoResult<Option<CoachSlotEntity>> {
        let document = self
            .slots()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: SLOT_COLLECTION,
                id,
                source,
            })?;
        document.map(decode_slot).transpose()
    }

    async fn list_slots(&self, filter: SlotFilter) -> MongoResult<Vec<CoachSlotEntity>> {
        let mut query = Document::new();
        if let Some(coach) = filter.coach_id {
            query.insert("coach_id", bson_uuid(coach));
        }
        if let Some(date) = filter.date {
            query.insert("date", date_key(date));
        }
        if filter.available_only {
            query.insert("is_booked", false);
        }

        let documents: Vec<MongoCoachSlotDocument> = self
            .slots()
            .await
            .find(query)
            .sort(doc! { "start_time": 1 })
            .await
            .map_err(slot_query_error)?
            .try_collect()
            .await
            .map_err(slot_query_error)?;

        documents.into_iter().map(decode_slot).collect()
    }

    async fn delete_unbooked_slot(&self, id: Uuid) -> MongoResult<bool> {
        let mut filter = doc_id(id);
        filter.insert("is_booked", false);
        let result = self
            .slots()
            .await
            .delete_one(filter)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SLOT_COLLECTION,
                id,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn claim_slot(&self, id: Uuid, player: Uuid) -> MongoResult<bool> {
        let mut filter = doc_id(id);
        filter.insert("is_booked", false);
        self.update_slot(
            id,
            filter,
            doc! { "$set": { "is_booked": true, "booked_by": bson_uuid(player) } },
        )
        .await
    }

    async fn release_slot(&self, id: Uuid, player: Uuid) -> MongoResult<bool> {
        let mut filter = doc_id(id);
        filter.insert("is_booked", true);
        filter.insert("booked_by", bson_uuid(player));
        self.update_slot(
            id,
            filter,
            doc! { "$set": { "is_booked": false, "booked_by": Bson::Null } },
        )
        .await
    }

    async fn update_slot(&self, id: Uuid, filter: Document, update: Document) -> MongoResult<bool> {
        let result = self
            .slots()
            .await
            .update_one(filter, update)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SLOT_COLLECTION,
                id,
                source,
            })?;
        Ok(result.modified_count == 1)
    }

    async fn insert_booking(&self, booking: CoachBookingEntity) -> MongoResult<()> {
        let id = booking.id;
        let document = MongoCoachBookingDocument::from(booking);
        self.bookings()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                MongoDaoError::from_insert(BOOKING_COLLECTION, id, "booking already exists", source)
            })?;
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> MongoResult<Option<CoachBookingEntity>> {
        let document = self
            .bookings()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::Load {
                collection: BOOKING_COLLECTION,
                id,
                source,
            })?;
        document.map(decode_booking).transpose()
    }

    async fn list_bookings(&self, filter: BookingFilter) -> MongoResult<Vec<CoachBookingEntity>> {
        let query = match filter {
            BookingFilter::Coach(coach) => doc! { "coach_id": bson_uuid(coach) },
            BookingFilter::Player(player) => doc! { "player_id": bson_uuid(player) },
            BookingFilter::PlayerSlot { player, slot } => doc! {
                "player_id": bson_uuid(player),
                "slot_id": bson_uuid(slot),
            },
            BookingFilter::AcceptedForPlayer(player) => doc! {
                "player_id": bson_uuid(player),
                "status": CoachBookingStatus::Accepted.to_string(),
            },
        };

        let documents: Vec<MongoCoachBookingDocument> = self
            .bookings()
            .await
            .find(query)
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(booking_query_error)?
            .try_collect()
            .await
            .map_err(booking_query_error)?;

        documents.into_iter().map(decode_booking).collect()
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        transition: BookingTransition,
    ) -> MongoResult<bool> {
        let mut filter = doc_id(id);
        filter.insert("status", transition.from.to_string());

        let mut set = doc! {
            "status": transition.to.to_string(),
            "updated_at": bson_datetime(transition.at),
        };
        if let Some(reason) = transition.rejection_reason {
            set.insert("rejection_reason", reason);
        }

        let result = self
            .bookings()
            .await
            .update_one(filter, doc! { "$set": set })
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: BOOKING_COLLECTION,
                id,
                source,
            })?;
        Ok(result.modified_count == 1)
    }
}

/// Server-side part of the listing filter.
fn game_query(filter: &GameFilter) -> Document {
    let mut query = doc! { "status": "Open" };
    if let Some(venue_id) = &filter.venue_id {
        query.insert("venue.venue_id", venue_id.as_str());
    }

    let mut date_range = Document::new();
    if let Some(start) = filter.start_date {
        date_range.insert("$gte", date_key(start));
    }
    if let Some(end) = filter.end_date {
        date_range.insert("$lte", date_key(end));
    }
    if !date_range.is_empty() {
        query.insert("slot.date", date_range);
    }

    let mut price_range = Document::new();
    if let Some(min) = filter.min_price {
        price_range.insert("$gte", min);
    }
    if let Some(max) = filter.max_price {
        price_range.insert("$lte", max);
    }
    if !price_range.is_empty() {
        query.insert("slot.price", price_range);
    }

    if let Some(near) = &filter.near {
        query.insert(
            "venue.location",
            doc! {
                "$geoWithin": {
                    "$centerSphere": [[near.center.lng, near.center.lat], near.radius_radians()]
                }
            },
        );
    }
    query
}

fn decode_game(document: MongoGameDocument) -> MongoResult<GameEntity> {
    let id = entity_uuid(document.id);
    GameEntity::try_from(document).map_err(|reason| MongoDaoError::Corrupt {
        collection: GAME_COLLECTION,
        id,
        reason,
    })
}

fn decode_slot(document: MongoCoachSlotDocument) -> MongoResult<CoachSlotEntity> {
    let id = entity_uuid(document.id);
    CoachSlotEntity::try_from(document).map_err(|reason| MongoDaoError::Corrupt {
        collection: SLOT_COLLECTION,
        id,
        reason,
    })
}

fn decode_booking(document: MongoCoachBookingDocument) -> MongoResult<CoachBookingEntity> {
    let id = entity_uuid(document.id);
    CoachBookingEntity::try_from(document).map_err(|reason| MongoDaoError::Corrupt {
        collection: BOOKING_COLLECTION,
        id,
        reason,
    })
}

fn game_query_error(source: mongodb::error::Error) -> MongoDaoError {
    MongoDaoError::Query {
        collection: GAME_COLLECTION,
        source,
    }
}

fn slot_query_error(source: mongodb::error::Error) -> MongoDaoError {
    MongoDaoError::Query {
        collection: SLOT_COLLECTION,
        source,
    }
}

fn booking_query_error(source: mongodb::error::Error) -> MongoDaoError {
    MongoDaoError::Query {
        collection: BOOKING_COLLECTION,
        source,
    }
}

impl GameStore for MongoStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn replace_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move { store.replace_game(game).await.map_err(Into::into) })
    }

    fn list_open_games(
        &self,
        filter: GameFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_open_games(filter).await.map_err(Into::into) })
    }

    fn find_active_games_for_user(
        &self,
        user: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_active_games_for_user(user)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

impl CoachStore for MongoStore {
    fn insert_slot(&self, slot: CoachSlotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_slot(slot).await.map_err(Into::into) })
    }

    fn find_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CoachSlotEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_slot(id).await.map_err(Into::into) })
    }

    fn list_slots(
        &self,
        filter: SlotFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<CoachSlotEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_slots(filter).await.map_err(Into::into) })
    }

    fn delete_unbooked_slot(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_unbooked_slot(id).await.map_err(Into::into) })
    }

    fn claim_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.claim_slot(id, player).await.map_err(Into::into) })
    }

    fn release_slot(&self, id: Uuid, player: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.release_slot(id, player).await.map_err(Into::into) })
    }

    fn insert_booking(&self, booking: CoachBookingEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_booking(booking).await.map_err(Into::into) })
    }

    fn find_booking(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CoachBookingEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_booking(id).await.map_err(Into::into) })
    }

    fn list_bookings(
        &self,
        filter: BookingFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<CoachBookingEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_bookings(filter).await.map_err(Into::into) })
    }

    fn transition_booking(
        &self,
        id: Uuid,
        transition: BookingTransition,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .transition_booking(id, transition)
                .await
                .map_err(Into::into)
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::dao::{game_store::GeoQuery, models::GeoPoint};

    #[test]
    fn game_query_pushes_down_ranges_and_geo() {
        let filter = GameFilter {
            venue_id: Some("venue-1".into()),
            start_date: Some(date!(2026 - 05 - 01)),
            max_price: Some(40.0),
            near: Some(GeoQuery {
                center: GeoPoint { lng: 4.8, lat: 45.7 },
                radius_m: 6_378.1,
            }),
            ..GameFilter::default()
        };
        let query = game_query(&filter);

        assert_eq!(query.get_str("status").unwrap(), "Open");
        assert_eq!(query.get_str("venue.venue_id").unwrap(), "venue-1");
        let dates = query.get_document("slot.date").unwrap();
        assert_eq!(dates.get_str("$gte").unwrap(), "2026-05-01");
        assert!(dates.get("$lte").is_none());
        let prices = query.get_document("slot.price").unwrap();
        assert_eq!(prices.get_f64("$lte").unwrap(), 40.0);
        assert!(query.contains_key("venue.location"));
    }
}
