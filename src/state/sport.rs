//! Sport references as they appear on games and venue price lists.
//!
//! Clients send a sport either as a bare name (`"Football"`) or as a keyed
//! object (`{"key": "football", "name": "Football"}`). Both shapes collapse to
//! one normalised key so comparisons never depend on the wire shape.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A sport given either by display name or by catalogue key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SportRef {
    /// Free-form display name.
    Name(String),
    /// Catalogue entry with a stable key and a display name.
    Keyed {
        /// Stable catalogue key.
        key: String,
        /// Display name.
        name: String,
    },
}

impl SportRef {
    /// Normalised key used for every comparison.
    pub fn normalized(&self) -> String {
        match self {
            SportRef::Name(name) => normalize(name),
            SportRef::Keyed { key, .. } => normalize(key),
        }
    }

    /// Human readable label.
    pub fn display_name(&self) -> &str {
        match self {
            SportRef::Name(name) => name.trim(),
            SportRef::Keyed { name, .. } => name.trim(),
        }
    }

    /// Whether the two references designate the same sport.
    pub fn same_sport(&self, other: &SportRef) -> bool {
        self.normalized() == other.normalized()
    }

    /// Case-insensitive substring match against the key and the display name.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = normalize(query);
        if needle.is_empty() {
            return true;
        }
        self.normalized().contains(&needle) || normalize(self.display_name()).contains(&needle)
    }

    /// Whether the reference carries a usable value.
    pub fn is_blank(&self) -> bool {
        self.normalized().is_empty()
    }
}

/// Price attached to one sport on a venue or sub-venue price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SportPrice {
    /// Priced sport.
    pub sport: SportRef,
    /// Price per game.
    pub price: f64,
}

/// Look up the price for `sport` in a sport-keyed price list.
pub fn price_for_sport(prices: &[SportPrice], sport: &SportRef) -> Option<f64> {
    prices
        .iter()
        .find(|entry| entry.sport.same_sport(sport))
        .map(|entry| entry.price)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_keyed_refs_compare_equal() {
        let name = SportRef::Name(" Football ".into());
        let keyed = SportRef::Keyed {
            key: "football".into(),
            name: "Football".into(),
        };
        assert!(name.same_sport(&keyed));
        assert_eq!(name.normalized(), "football");
    }

    #[test]
    fn deserializes_both_wire_shapes() {
        let name: SportRef = serde_json::from_str("\"Padel\"").unwrap();
        assert_eq!(name, SportRef::Name("Padel".into()));

        let keyed: SportRef =
            serde_json::from_str(r#"{"key":"padel","name":"Padel"}"#).unwrap();
        assert!(matches!(keyed, SportRef::Keyed { .. }));
    }

    #[test]
    fn query_matches_substring_case_insensitively() {
        let sport = SportRef::Keyed {
            key: "table_tennis".into(),
            name: "Table Tennis".into(),
        };
        assert!(sport.matches_query("TENNIS"));
        assert!(sport.matches_query("table t"));
        assert!(!sport.matches_query("cricket"));
    }

    #[test]
    fn price_lookup_ignores_wire_shape() {
        let prices = vec![
            SportPrice {
                sport: SportRef::Name("Cricket".into()),
                price: 40.0,
            },
            SportPrice {
                sport: SportRef::Keyed {
                    key: "football".into(),
                    name: "Football".into(),
                },
                price: 25.0,
            },
        ];

        assert_eq!(
            price_for_sport(&prices, &SportRef::Name("FOOTBALL".into())),
            Some(25.0)
        );
        assert_eq!(price_for_sport(&prices, &SportRef::Name("rugby".into())), None);
    }
}
