//! In-memory record store behind the data API.
//!
//! Records are kept in id-ordered maps so list pagination is a keyset walk:
//! `nextToken` is the id of the last record on the page.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::auth::{Profile, Session, SignUp};
use crate::error::AppError;
use crate::model::{
    CreateListing, CreateOrderItem, CreateTodo, Listing, OrderItem, Page, Todo, UpdateListing,
    UpdateOrderItem,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 1000;
const TODO_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Data {
    listings: BTreeMap<String, Listing>,
    order_items: BTreeMap<String, OrderItem>,
    todos: BTreeMap<String, Todo>,
    users: HashMap<String, Profile>,
    sessions: HashMap<String, String>,
}

#[derive(Debug)]
pub struct Store {
    data: RwLock<Data>,
    todo_events: broadcast::Sender<Todo>,
}

impl Default for Store {
    fn default() -> Self {
        let (todo_events, _) = broadcast::channel(TODO_EVENT_CAPACITY);
        Self {
            data: RwLock::new(Data::default()),
            todo_events,
        }
    }
}

fn page_of<T: Clone>(
    records: &BTreeMap<String, T>,
    next_token: Option<&str>,
    limit: Option<u32>,
    keep: impl Fn(&T) -> bool,
) -> Page<T> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT) as usize;
    let start = next_token.map_or(Bound::Unbounded, |token| Bound::Excluded(token.to_string()));
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

fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl Store {
    // --- listings ---

    pub async fn list_listings(&self, next_token: Option<&str>, limit: Option<u32>) -> Page<Listing> {
        let data = self.data.read().await;
        page_of(&data.listings, next_token, limit, |_| true)
    }

    pub async fn get_listing(&self, id: &str) -> Result<Listing, AppError> {
        let data = self.data.read().await;
        data.listings
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("listing {id}")))
    }

    pub async fn create_listing(&self, input: CreateListing) -> Result<Listing, AppError> {
        required("sellerId", &input.seller_id)?;
        required("name", &input.name)?;
        required("brand", &input.brand)?;
        if input.price_cents == 0 {
            return Err(AppError::Validation("priceCents must be positive".to_string()));
        }
        let listing = Listing {
            id: Uuid::new_v4().to_string(),
            seller_id: input.seller_id,
            name: input.name,
            brand: input.brand,
            description: input.description,
            price_cents: input.price_cents,
            size_ml: input.size_ml,
            image_key: input.image_key,
            status: input.status,
        };
        self.data
            .write()
            .await
            .listings
            .insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    pub async fn update_listing(&self, id: &str, input: UpdateListing) -> Result<Listing, AppError> {
        let mut data = self.data.write().await;
        let listing = data
            .listings
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
        if let Some(name) = input.name {
            required("name", &name)?;
            listing.name = name;
        }
        if let Some(description) = input.description {
            listing.description = Some(description);
        }
        if let Some(price_cents) = input.price_cents {
            listing.price_cents = price_cents;
        }
        if let Some(status) = input.status {
            listing.status = status;
        }
        Ok(listing.clone())
    }

    /// Insert a listing with a caller-chosen id. Used for seeding.
    pub async fn put_listing(&self, listing: Listing) {
        self.data
            .write()
            .await
            .listings
            .insert(listing.id.clone(), listing);
    }

    // --- order items ---

    pub async fn list_order_items(
        &self,
        listing_id: Option<&str>,
        next_token: Option<&str>,
        limit: Option<u32>,
    ) -> Page<OrderItem> {
        let data = self.data.read().await;
        page_of(&data.order_items, next_token, limit, |item| {
            listing_id.is_none_or(|listing_id| item.listing_id == listing_id)
        })
    }

    pub async fn get_order_item(&self, id: &str) -> Result<OrderItem, AppError> {
        let data = self.data.read().await;
        data.order_items
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("order item {id}")))
    }

    pub async fn create_order_item(&self, input: CreateOrderItem) -> Result<OrderItem, AppError> {
        required("orderId", &input.order_id)?;
        if input.quantity == 0 {
            return Err(AppError::Validation("quantity must be positive".to_string()));
        }
        let mut data = self.data.write().await;
        if !data.listings.contains_key(&input.listing_id) {
            return Err(AppError::Validation(format!(
                "listing {} does not exist",
                input.listing_id
            )));
        }
        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: input.order_id,
            listing_id: input.listing_id,
            quantity: input.quantity,
            price_cents: input.price_cents,
            status: input.status,
        };
        data.order_items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    pub async fn update_order_item(&self, id: &str, input: UpdateOrderItem) -> Result<OrderItem, AppError> {
        let mut data = self.data.write().await;
        let item = data
            .order_items
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("order item {id}")))?;
        if let Some(quantity) = input.quantity {
            if quantity == 0 {
                return Err(AppError::Validation("quantity must be positive".to_string()));
            }
            item.quantity = quantity;
        }
        if let Some(status) = input.status {
            item.status = status;
        }
        Ok(item.clone())
    }

    /// Insert an order item with a caller-chosen id. Used for seeding.
    pub async fn put_order_item(&self, item: OrderItem) {
        self.data
            .write()
            .await
            .order_items
            .insert(item.id.clone(), item);
    }

    // --- todos ---

    pub async fn list_todos(&self) -> Vec<Todo> {
        self.data.read().await.todos.values().cloned().collect()
    }

    pub async fn create_todo(&self, input: CreateTodo) -> Todo {
        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            content: input.content,
        };
        self.data
            .write()
            .await
            .todos
            .insert(todo.id.clone(), todo.clone());
        // No subscribers is not an error.
        let _ = self.todo_events.send(todo.clone());
        todo
    }

    pub fn subscribe_todos(&self) -> broadcast::Receiver<Todo> {
        self.todo_events.subscribe()
    }

    // --- users ---

    pub async fn sign_up(&self, sign_up: SignUp) -> Result<Session, AppError> {
        let email = sign_up.email.trim().to_ascii_lowercase();
        let mut data = self.data.write().await;
        if data.users.contains_key(&email) {
            return Err(AppError::Conflict(format!("user {email} already exists")));
        }
        let profile = Profile {
            user_id: Uuid::new_v4().to_string(),
            email: email.clone(),
            attributes: sign_up.attributes,
        };
        let token = Uuid::new_v4().simple().to_string();
        data.sessions.insert(token.clone(), email.clone());
        let session = Session {
            user_id: profile.user_id.clone(),
            token,
        };
        data.users.insert(email, profile);
        Ok(session)
    }

    /// The profile behind a session token, if the token is live.
    pub async fn session_profile(&self, token: &str) -> Option<Profile> {
        let data = self.data.read().await;
        data.sessions
            .get(token)
            .and_then(|email| data.users.get(email))
            .cloned()
    }
}
