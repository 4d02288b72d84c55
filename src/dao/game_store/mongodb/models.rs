use mongodb::bson::{DateTime, Document, Uuid as BsonUuid, doc};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, macros::format_description};
use uuid::Uuid;

use crate::{
    dao::models::{
        BookingStatus, CoachBookingEntity, CoachBookingStatus, CoachSlotEntity, GameEntity,
        GameSlotEntity, GameStatus, GeoPoint, JoinRequestEntity, JoinRequestStatus, PlayersNeeded,
        VenueRefEntity,
    },
    state::sport::SportRef,
};

/// Failure converting a stored document back into an entity.
pub type DecodeResult<T> = Result<T, String>;

/// Stored shape of a game, with a GeoJSON venue location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    /// Game id.
    #[serde(rename = "_id")]
    pub id: BsonUuid,
    host: BsonUuid,
    sport: SportRef,
    description: String,
    venue: MongoVenueDocument,
    slot: MongoGameSlotDocument,
    players_needed: PlayersNeeded,
    approved_players: Vec<BsonUuid>,
    #[serde(default)]
    join_requests: Vec<MongoJoinRequestDocument>,
    status: GameStatus,
    booking_status: BookingStatus,
    #[serde(default)]
    version: i64,
    created_at: DateTime,
    updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoVenueDocument {
    venue_id: Option<String>,
    city: Option<String>,
    location: GeoJsonPoint,
    sub_venue_id: Option<String>,
    sub_venue_name: Option<String>,
}

/// GeoJSON point, indexed with `2dsphere`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoGameSlotDocument {
    time_slot_document_id: Option<String>,
    slot_id: Option<String>,
    date: String,
    start_time: DateTime,
    end_time: DateTime,
    price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoJoinRequestDocument {
    user: BsonUuid,
    status: JoinRequestStatus,
    requested_at: DateTime,
}

/// Stored shape of a coach slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCoachSlotDocument {
    /// Slot id.
    #[serde(rename = "_id")]
    pub id: BsonUuid,
    coach_id: BsonUuid,
    date: String,
    start_time: DateTime,
    end_time: DateTime,
    is_booked: bool,
    booked_by: Option<BsonUuid>,
    created_at: DateTime,
}

/// Stored shape of a coach booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCoachBookingDocument {
    /// Booking id.
    #[serde(rename = "_id")]
    pub id: BsonUuid,
    coach_id: BsonUuid,
    player_id: BsonUuid,
    slot_id: BsonUuid,
    status: CoachBookingStatus,
    date: String,
    start_time: DateTime,
    end_time: DateTime,
    rejection_reason: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            host: bson_uuid(value.host),
            sport: value.sport,
            description: value.description,
            venue: MongoVenueDocument {
                venue_id: value.venue.venue_id,
                city: value.venue.city,
                location: GeoJsonPoint {
                    kind: "Point".to_owned(),
                    coordinates: [value.venue.location.lng, value.venue.location.lat],
                },
                sub_venue_id: value.venue.sub_venue_id,
                sub_venue_name: value.venue.sub_venue_name,
            },
            slot: MongoGameSlotDocument {
                time_slot_document_id: value.slot.time_slot_document_id,
                slot_id: value.slot.slot_id,
                date: date_key(value.slot.date),
                start_time: bson_datetime(value.slot.start_time),
                end_time: bson_datetime(value.slot.end_time),
                price: value.slot.price,
            },
            players_needed: value.players_needed,
            approved_players: value.approved_players.into_iter().map(bson_uuid).collect(),
            join_requests: value
                .join_requests
                .into_iter()
                .map(|request| MongoJoinRequestDocument {
                    user: bson_uuid(request.user),
                    status: request.status,
                    requested_at: bson_datetime(request.requested_at),
                })
                .collect(),
            status: value.status,
            booking_status: value.booking_status,
            version: i64::try_from(value.version).unwrap_or(i64::MAX),
            created_at: bson_datetime(value.created_at),
            updated_at: bson_datetime(value.updated_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = String;

    fn try_from(value: MongoGameDocument) -> DecodeResult<Self> {
        let join_requests = value
            .join_requests
            .into_iter()
            .map(|request| {
                Ok(JoinRequestEntity {
                    user: entity_uuid(request.user),
                    status: request.status,
                    requested_at: offset_datetime(request.requested_at)?,
                })
            })
            .collect::<DecodeResult<Vec<_>>>()?;

        Ok(Self {
            id: entity_uuid(value.id),
            host: entity_uuid(value.host),
            sport: value.sport,
            description: value.description,
            venue: VenueRefEntity {
                venue_id: value.venue.venue_id,
                city: value.venue.city,
                location: GeoPoint {
                    lng: value.venue.location.coordinates[0],
                    lat: value.venue.location.coordinates[1],
                },
                sub_venue_id: value.venue.sub_venue_id,
                sub_venue_name: value.venue.sub_venue_name,
            },
            slot: GameSlotEntity {
                time_slot_document_id: value.slot.time_slot_document_id,
                slot_id: value.slot.slot_id,
                date: parse_date_key(&value.slot.date)?,
                start_time: offset_datetime(value.slot.start_time)?,
                end_time: offset_datetime(value.slot.end_time)?,
                price: value.slot.price,
            },
            players_needed: value.players_needed,
            approved_players: value
                .approved_players
                .into_iter()
                .map(entity_uuid)
                .collect(),
            join_requests,
            status: value.status,
            booking_status: value.booking_status,
            version: u64::try_from(value.version).unwrap_or_default(),
            created_at: offset_datetime(value.created_at)?,
            updated_at: offset_datetime(value.updated_at)?,
        })
    }
}

impl From<CoachSlotEntity> for MongoCoachSlotDocument {
    fn from(value: CoachSlotEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            coach_id: bson_uuid(value.coach_id),
            date: date_key(value.date),
            start_time: bson_datetime(value.start_time),
            end_time: bson_datetime(value.end_time),
            is_booked: value.is_booked,
            booked_by: value.booked_by.map(bson_uuid),
            created_at: bson_datetime(value.created_at),
        }
    }
}

impl TryFrom<MongoCoachSlotDocument> for CoachSlotEntity {
    type Error = String;

    fn try_from(value: MongoCoachSlotDocument) -> DecodeResult<Self> {
        Ok(Self {
            id: entity_uuid(value.id),
            coach_id: entity_uuid(value.coach_id),
            date: parse_date_key(&value.date)?,
            start_time: offset_datetime(value.start_time)?,
            end_time: offset_datetime(value.end_time)?,
            is_booked: value.is_booked,
            booked_by: value.booked_by.map(entity_uuid),
            created_at: offset_datetime(value.created_at)?,
        })
    }
}

impl From<CoachBookingEntity> for MongoCoachBookingDocument {
    fn from(value: CoachBookingEntity) -> Self {
        Self {
            id: bson_uuid(value.id),
            coach_id: bson_uuid(value.coach_id),
            player_id: bson_uuid(value.player_id),
            slot_id: bson_uuid(value.slot_id),
            status: value.status,
            date: date_key(value.date),
            start_time: bson_datetime(value.start_time),
            end_time: bson_datetime(value.end_time),
            rejection_reason: value.rejection_reason,
            created_at: bson_datetime(value.created_at),
            updated_at: bson_datetime(value.updated_at),
        }
    }
}

impl TryFrom<MongoCoachBookingDocument> for CoachBookingEntity {
    type Error = String;

    fn try_from(value: MongoCoachBookingDocument) -> DecodeResult<Self> {
        Ok(Self {
            id: entity_uuid(value.id),
            coach_id: entity_uuid(value.coach_id),
            player_id: entity_uuid(value.player_id),
            slot_id: entity_uuid(value.slot_id),
            status: value.status,
            date: parse_date_key(&value.date)?,
            start_time: offset_datetime(value.start_time)?,
            end_time: offset_datetime(value.end_time)?,
            rejection_reason: value.rejection_reason,
            created_at: offset_datetime(value.created_at)?,
            updated_at: offset_datetime(value.updated_at)?,
        })
    }
}

/// Binary BSON form of `id`.
pub fn bson_uuid(id: Uuid) -> BsonUuid {
    BsonUuid::from_bytes(id.into_bytes())
}

/// Inverse of [`bson_uuid`].
pub fn entity_uuid(id: BsonUuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

/// `_id` filter for `id`.
pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": bson_uuid(id) }
}

/// Millisecond precision, which is what BSON dates carry.
pub fn bson_datetime(value: OffsetDateTime) -> DateTime {
    let millis = value.unix_timestamp_nanos() / 1_000_000;
    DateTime::from_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

fn offset_datetime(value: DateTime) -> DecodeResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(value.timestamp_millis()) * 1_000_000)
        .map_err(|err| err.to_string())
}

/// `YYYY-MM-DD`, which sorts lexicographically in date order.
pub fn date_key(date: Date) -> String {
    date.to_string()
}

fn parse_date_key(value: &str) -> DecodeResult<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|err| err.to_string())
}
