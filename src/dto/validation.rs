//! Validation helpers for DTOs.

use time::{Date, OffsetDateTime, macros::format_description};
use validator::ValidationError;

use crate::dto::{
    coach::CreateSlotRequest,
    game::{PlayersNeededInput, TimeSlotInput, VenueLocationInput},
};

/// Validates that `min` does not exceed `max`.
pub fn validate_players_needed(input: &PlayersNeededInput) -> Result<(), ValidationError> {
    if input.min > input.max {
        let mut err = ValidationError::new("players_needed_range");
        err.message = Some(
            format!(
                "playersNeeded.min ({}) must not exceed playersNeeded.max ({})",
                input.min, input.max
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates that a game slot ends after it starts.
pub fn validate_time_slot(input: &TimeSlotInput) -> Result<(), ValidationError> {
    ensure_ordered(input.start_time, input.end_time)?;
    if let Some(date) = &input.date {
        validate_date(date)?;
    }
    Ok(())
}

/// Validates that a coach slot ends after it starts and carries a calendar date.
pub fn validate_slot_request(input: &CreateSlotRequest) -> Result<(), ValidationError> {
    ensure_ordered(input.start_time, input.end_time)?;
    validate_date(&input.date)
}

/// Validates a GeoJSON point: `type` is `Point` and coordinates are `[lng, lat]` in range.
pub fn validate_venue_location(input: &VenueLocationInput) -> Result<(), ValidationError> {
    if input.kind != "Point" {
        let mut err = ValidationError::new("venue_location_type");
        err.message = Some("venueLocation.type must be \"Point\"".into());
        return Err(err);
    }
    let [lng, lat] = input.coordinates;
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        let mut err = ValidationError::new("venue_location_range");
        err.message = Some(format!("coordinates [{lng}, {lat}] are out of range").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a `YYYY-MM-DD` calendar date.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_date(value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("date_format");
        err.message = Some(format!("`{value}` is not a YYYY-MM-DD date").into());
        err
    })
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<Date, time::error::Parse> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
}

fn ensure_ordered(start: OffsetDateTime, end: OffsetDateTime) -> Result<(), ValidationError> {
    if start >= end {
        let mut err = ValidationError::new("time_window");
        err.message = Some("endTime must be after startTime".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn dates_must_be_calendar_days() {
        assert_eq!(parse_date("2026-02-28").unwrap(), date!(2026 - 02 - 28));
        assert!(validate_date("2026-02-30").is_err());
        assert!(validate_date("28/02/2026").is_err());
    }

    #[test]
    fn players_needed_min_cannot_exceed_max() {
        assert!(validate_players_needed(&PlayersNeededInput { min: 2, max: 2 }).is_ok());
        assert!(validate_players_needed(&PlayersNeededInput { min: 5, max: 3 }).is_err());
    }

    #[test]
    fn venue_location_is_a_lng_lat_point() {
        let point = |kind: &str, coordinates| VenueLocationInput {
            kind: kind.into(),
            coordinates,
        };
        assert!(validate_venue_location(&point("Point", [4.83, 45.76])).is_ok());
        assert!(validate_venue_location(&point("Polygon", [4.83, 45.76])).is_err());
        assert!(validate_venue_location(&point("Point", [45.76, 190.0])).is_err());
    }
}
