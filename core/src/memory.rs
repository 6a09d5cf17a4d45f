//! In-process `Repository` for tests and embedders.
//!
//! Records live in id-ordered maps, so paging is deterministic: a page's
//! `next_token` is the id of its last record and the next page starts just
//! after it. `Faults` lets tests make specific operations fail, and
//! `CallCounts` records every mutation or query that was attempted,
//! including rejected ones.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::auth::AuthMode;
use crate::error::ApiError;
use crate::repository::Repository;
use crate::types::{
    CreateListing, CreateOrderItem, Listing, OrderItem, OrderItemFilter, Page, PageRequest,
    UpdateListing, UpdateOrderItem,
};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Operations the fake should reject.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub reject_listing_updates: bool,
    pub reject_order_item_queries: bool,
    pub rejected_order_items: BTreeSet<String>,
    pub denied_modes: BTreeSet<AuthMode>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub listing_updates: usize,
    pub order_item_queries: usize,
    pub order_item_updates: usize,
}

#[derive(Debug, Default)]
struct State {
    listings: BTreeMap<String, Listing>,
    order_items: BTreeMap<String, OrderItem>,
    faults: Faults,
    calls: CallCounts,
}

#[derive(Debug)]
pub struct MemoryRepository {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    pub fn insert_listing(&self, listing: Listing) {
        self.state.lock().listings.insert(listing.id.clone(), listing);
    }

    pub fn insert_order_item(&self, item: OrderItem) {
        self.state.lock().order_items.insert(item.id.clone(), item);
    }

    pub fn listing(&self, id: &str) -> Option<Listing> {
        self.state.lock().listings.get(id).cloned()
    }

    pub fn order_item(&self, id: &str) -> Option<OrderItem> {
        self.state.lock().order_items.get(id).cloned()
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state.lock().faults = faults;
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    fn page_limit(&self, page: &PageRequest) -> usize {
        page.limit
            .map_or(self.page_size, |limit| limit as usize)
            .clamp(1, self.page_size)
    }
}

impl State {
    fn authorize(&self, auth: AuthMode) -> Result<(), ApiError> {
        if self.faults.denied_modes.contains(&auth) {
            return Err(ApiError::PermissionDenied {
                status: 403,
                body: format!("auth mode {auth} is not allowed"),
            });
        }
        Ok(())
    }
}

fn rejected(what: &str) -> ApiError {
    ApiError::HttpError {
        status: 500,
        body: format!("{what} rejected"),
    }
}

/// Collect up to `limit` records strictly after `token`, filtered by `keep`.
fn page_of<T: Clone>(
    records: &BTreeMap<String, T>,
    token: Option<&str>,
    limit: usize,
    keep: impl Fn(&T) -> bool,
) -> Page<T> {
    let start = token.map_or(Bound::Unbounded, |token| Bound::Excluded(token.to_string()));
    let mut matching = records
        .range((start, Bound::Unbounded))
        .filter(|(_, record)| keep(record));

    let mut items = Vec::new();
    let mut last_id = None;
    for (id, record) in matching.by_ref().take(limit) {
        items.push(record.clone());
        last_id = Some(id.clone());
    }
    let next_token = if matching.next().is_some() { last_id } else { None };
    Page { items, next_token }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_listing(&self, id: &str, auth: AuthMode) -> Result<Listing, ApiError> {
        let state = self.state.lock();
        state.authorize(auth)?;
        state.listings.get(id).cloned().ok_or(ApiError::NotFound)
    }

    async fn create_listing(&self, input: &CreateListing, auth: AuthMode) -> Result<Listing, ApiError> {
        let mut state = self.state.lock();
        state.authorize(auth)?;
        let listing = Listing {
            id: Uuid::new_v4().to_string(),
            seller_id: input.seller_id.clone(),
            name: input.name.clone(),
            brand: input.brand.clone(),
            description: input.description.clone(),
            price_cents: input.price_cents,
            size_ml: input.size_ml,
            image_key: input.image_key.clone(),
            status: input.status.unwrap_or_default(),
        };
        state.listings.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    async fn update_listing(
        &self,
        id: &str,
        input: &UpdateListing,
        auth: AuthMode,
    ) -> Result<Listing, ApiError> {
        let mut state = self.state.lock();
        state.calls.listing_updates += 1;
        state.authorize(auth)?;
        if state.faults.reject_listing_updates {
            return Err(rejected("listing update"));
        }
        let listing = state.listings.get_mut(id).ok_or(ApiError::NotFound)?;
        if let Some(name) = &input.name {
            listing.name = name.clone();
        }
        if let Some(description) = &input.description {
            listing.description = Some(description.clone());
        }
        if let Some(price_cents) = input.price_cents {
            listing.price_cents = price_cents;
        }
        if let Some(status) = input.status {
            listing.status = status;
        }
        Ok(listing.clone())
    }

    async fn list_listings(&self, page: &PageRequest, auth: AuthMode) -> Result<Page<Listing>, ApiError> {
        let limit = self.page_limit(page);
        let state = self.state.lock();
        state.authorize(auth)?;
        Ok(page_of(&state.listings, page.next_token.as_deref(), limit, |_| true))
    }

    async fn get_order_item(&self, id: &str, auth: AuthMode) -> Result<OrderItem, ApiError> {
        let state = self.state.lock();
        state.authorize(auth)?;
        state.order_items.get(id).cloned().ok_or(ApiError::NotFound)
    }

    async fn create_order_item(
        &self,
        input: &CreateOrderItem,
        auth: AuthMode,
    ) -> Result<OrderItem, ApiError> {
        let mut state = self.state.lock();
        state.authorize(auth)?;
        if !state.listings.contains_key(&input.listing_id) {
            return Err(ApiError::Validation(format!(
                "listing {} does not exist",
                input.listing_id
            )));
        }
        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: input.order_id.clone(),
            listing_id: input.listing_id.clone(),
            quantity: input.quantity,
            price_cents: input.price_cents,
            status: input.status.unwrap_or_default(),
        };
        state.order_items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn update_order_item(
        &self,
        id: &str,
        input: &UpdateOrderItem,
        auth: AuthMode,
    ) -> Result<OrderItem, ApiError> {
        let mut state = self.state.lock();
        state.calls.order_item_updates += 1;
        state.authorize(auth)?;
        if state.faults.rejected_order_items.contains(id) {
            return Err(rejected("order item update"));
        }
        let item = state.order_items.get_mut(id).ok_or(ApiError::NotFound)?;
        if let Some(quantity) = input.quantity {
            item.quantity = quantity;
        }
        if let Some(status) = input.status {
            item.status = status;
        }
        Ok(item.clone())
    }

    async fn list_order_items(
        &self,
        filter: &OrderItemFilter,
        page: &PageRequest,
        auth: AuthMode,
    ) -> Result<Page<OrderItem>, ApiError> {
        let limit = self.page_limit(page);
        let mut state = self.state.lock();
        state.calls.order_item_queries += 1;
        state.authorize(auth)?;
        if state.faults.reject_order_item_queries {
            return Err(rejected("order item query"));
        }
        Ok(page_of(&state.order_items, page.next_token.as_deref(), limit, |item| {
            filter.matches(item)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    fn item(id: &str, listing_id: &str) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            order_id: "R1".to_string(),
            listing_id: listing_id.to_string(),
            quantity: 1,
            price_cents: 1_000,
            status: Status::Active,
        }
    }

    #[tokio::test]
    async fn pages_follow_id_order_and_end_without_token() {
        let repo = MemoryRepository::with_page_size(2);
        for id in ["O3", "O1", "O2"] {
            repo.insert_order_item(item(id, "L1"));
        }
        let filter = OrderItemFilter::by_listing("L1");

        let first = repo
            .list_order_items(&filter, &PageRequest::default(), AuthMode::UserPool)
            .await
            .unwrap();
        let ids: Vec<_> = first.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["O1", "O2"]);
        assert_eq!(first.next_token.as_deref(), Some("O2"));

        let second = repo
            .list_order_items(
                &filter,
                &PageRequest {
                    limit: None,
                    next_token: first.next_token,
                },
                AuthMode::UserPool,
            )
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, "O3");
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn exact_page_fill_has_no_dangling_token() {
        let repo = MemoryRepository::with_page_size(2);
        repo.insert_order_item(item("O1", "L1"));
        repo.insert_order_item(item("O2", "L1"));
        repo.insert_order_item(item("O3", "L2"));

        let page = repo
            .list_order_items(
                &OrderItemFilter::by_listing("L1"),
                &PageRequest::default(),
                AuthMode::UserPool,
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn rejected_update_is_counted_but_not_applied() {
        let repo = MemoryRepository::new();
        repo.insert_order_item(item("O1", "L1"));
        repo.set_faults(Faults {
            rejected_order_items: BTreeSet::from(["O1".to_string()]),
            ..Faults::default()
        });

        let result = repo
            .update_order_item("O1", &UpdateOrderItem::status(Status::Sold), AuthMode::UserPool)
            .await;

        assert!(result.is_err());
        assert_eq!(repo.calls().order_item_updates, 1);
        assert_eq!(repo.order_item("O1").unwrap().status, Status::Active);
    }

    #[tokio::test]
    async fn denied_mode_gets_permission_error() {
        let repo = MemoryRepository::new();
        repo.set_faults(Faults {
            denied_modes: BTreeSet::from([AuthMode::ApiKey]),
            ..Faults::default()
        });

        let err = repo
            .list_listings(&PageRequest::default(), AuthMode::ApiKey)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied { status: 403, .. }));
    }

    #[tokio::test]
    async fn create_order_item_requires_existing_listing() {
        let repo = MemoryRepository::new();
        let input = CreateOrderItem {
            order_id: "R1".to_string(),
            listing_id: "missing".to_string(),
            quantity: 1,
            price_cents: 500,
            status: None,
        };
        let err = repo.create_order_item(&input, AuthMode::UserPool).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
