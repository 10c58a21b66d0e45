use crate::domain::values::data_source::DataSource;
use crate::domain::values::direction::ActivityType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Marker that precedes the source position id inside an activity comment.
///
/// The tracker has no custom fields, so the idempotency key lives in free
/// text. Existing deployments match on this exact substring.
pub const POSITION_ID_TOKEN: &str = "saxoPositionId=";

/// Build the comment carrying the idempotency key for `position_id`.
pub fn position_comment(position_id: &str) -> String {
    format!("{POSITION_ID_TOKEN}{position_id}")
}

/// Extract the position id from a comment. The id runs until the first
/// comma or whitespace. Returns `None` when the token is missing or empty.
pub fn extract_position_id(comment: &str) -> Option<&str> {
    let start = comment.find(POSITION_ID_TOKEN)? + POSITION_ID_TOKEN.len();
    let rest = &comment[start..];
    let end = rest
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(rest.len());
    let id = &rest[..end];
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Canonical activity ready for import into the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub account_id: String,
    pub symbol: String,
    pub data_source: DataSource,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub date: DateTime<Utc>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub comment: String,
    /// Carried for logging and symbol choice; not part of the import payload.
    #[serde(skip)]
    pub isin: Option<String>,
}

impl Activity {
    pub fn position_id(&self) -> Option<&str> {
        extract_position_id(&self.comment)
    }
}

/// An activity as the tracker currently holds it. Only `comment` matters
/// for deduplication; the rest is for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingActivity {
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ExistingActivity {
    pub fn position_id(&self) -> Option<&str> {
        self.comment.as_deref().and_then(extract_position_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_token() {
        assert_eq!(extract_position_id("saxoPositionId=100"), Some("100"));
    }

    #[test]
    fn test_extract_stops_at_separator() {
        assert_eq!(
            extract_position_id("note saxoPositionId=5023811, imported"),
            Some("5023811")
        );
        assert_eq!(extract_position_id("saxoPositionId=abc def"), Some("abc"));
    }

    #[test]
    fn test_extract_missing_or_empty() {
        assert_eq!(extract_position_id("manual entry"), None);
        assert_eq!(extract_position_id("saxoPositionId="), None);
        assert_eq!(extract_position_id(""), None);
    }

    #[test]
    fn test_comment_round_trip() {
        let c = position_comment("8a1f-22");
        assert_eq!(c, "saxoPositionId=8a1f-22");
        assert_eq!(extract_position_id(&c), Some("8a1f-22"));
    }

    #[test]
    fn test_activity_wire_format() {
        let a = Activity {
            account_id: "acc".into(),
            symbol: "QUBT".into(),
            data_source: DataSource::Yahoo,
            activity_type: ActivityType::Sell,
            date: "2024-03-01T10:00:00Z".parse().unwrap(),
            quantity: Decimal::new(25, 0),
            unit_price: Decimal::new(1250, 2),
            fee: Decimal::new(3, 0),
            currency: "USD".into(),
            comment: position_comment("1"),
            isin: Some("US74766W1080".into()),
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["accountId"], "acc");
        assert_eq!(json["dataSource"], "YAHOO");
        assert_eq!(json["type"], "SELL");
        assert_eq!(json["unitPrice"], 12.5);
        assert_eq!(json["comment"], "saxoPositionId=1");
        assert!(json.get("isin").is_none());
    }
}
