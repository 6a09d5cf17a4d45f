//! Domain DTOs for the marketplace data API.
//!
//! # Design
//! These types mirror the data-server's schema but are defined independently.
//! Keeping them separate avoids coupling the client surface to Axum
//! internals; the end-to-end tests catch any schema drift between the two
//! crates. Field names go over the wire in camelCase, which is what the
//! hosted data API speaks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by listings and the order items that reference
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Reserved,
    Sold,
    Removed,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Active, Status::Reserved, Status::Sold, Status::Removed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Reserved => "reserved",
            Status::Sold => "sold",
            Status::Removed => "removed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status `{0}` (expected one of: active, reserved, sold, removed)")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A fragrance offered for sale by a seller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_ml: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    pub status: Status,
}

/// A purchased line item. Always references exactly one listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub listing_id: String,
    pub quantity: u32,
    pub price_cents: u64,
    pub status: Status,
}

/// Demo entity kept from the backend scaffold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    pub content: String,
}

/// Request payload for creating a listing. New listings start out
/// `active` unless a status is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListing {
    pub seller_id: String,
    pub name: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_ml: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Request payload for creating an order item against a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub order_id: String,
    pub listing_id: String,
    pub quantity: u32,
    pub price_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTodo {
    pub content: String,
}

/// Partial update for a listing. Only the fields present in the JSON are
/// applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl UpdateListing {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Partial update for an order item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl UpdateOrderItem {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// One page of a list query. `next_token` is `None` on the last page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Paging cursor passed to list queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub next_token: Option<String>,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            next_token: None,
        }
    }
}

/// Equality filter for order item queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderItemFilter {
    pub listing_id: Option<String>,
}

impl OrderItemFilter {
    pub fn by_listing(listing_id: &str) -> Self {
        Self {
            listing_id: Some(listing_id.to_string()),
        }
    }

    pub fn matches(&self, item: &OrderItem) -> bool {
        self.listing_id
            .as_deref()
            .is_none_or(|listing_id| item.listing_id == listing_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("sold".parse::<Status>().unwrap(), Status::Sold);
        assert_eq!(" Reserved ".parse::<Status>().unwrap(), Status::Reserved);
    }

    #[test]
    fn status_rejects_unknown_and_empty() {
        assert_eq!(
            "shipped".parse::<Status>().unwrap_err(),
            ParseStatusError("shipped".to_string())
        );
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn listing_uses_camel_case_on_the_wire() {
        let listing = Listing {
            id: "L1".to_string(),
            seller_id: "S1".to_string(),
            name: "Aventus".to_string(),
            brand: "Creed".to_string(),
            description: None,
            price_cents: 21_500,
            size_ml: Some(50),
            image_key: None,
            status: Status::Active,
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["sellerId"], "S1");
        assert_eq!(json["priceCents"], 21_500);
        assert_eq!(json["sizeMl"], 50);
        assert_eq!(json["status"], "active");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn update_listing_status_only_serializes_status() {
        let body = serde_json::to_value(UpdateListing::status(Status::Sold)).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "sold" }));
    }

    #[test]
    fn page_without_next_token_deserializes() {
        let page: Page<Todo> = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn filter_matches_only_its_listing() {
        let item = OrderItem {
            id: "O1".to_string(),
            order_id: "R1".to_string(),
            listing_id: "L1".to_string(),
            quantity: 1,
            price_cents: 100,
            status: Status::Active,
        };
        assert!(OrderItemFilter::by_listing("L1").matches(&item));
        assert!(!OrderItemFilter::by_listing("L2").matches(&item));
        assert!(OrderItemFilter::default().matches(&item));
    }
}
