//! Marketplace data client and listing status synchronization.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values for the
//! hosted data API without touching the network (host-does-IO pattern), and
//! layers a typed `Repository` capability on top of it. The status cascade
//! in [`sync`] runs against any `Repository`: the HTTP-backed one in
//! production, `MemoryRepository` in tests.
//!
//! # Design
//! - `DataClient` is stateless; it holds only `base_url` and credentials.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - Configuration is an explicit `BackendConfig` value, never a global.
//! - DTOs are defined independently from the data-server crate; end-to-end
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod repository;
pub mod sync;
pub mod types;

pub use auth::{AuthMode, Credentials};
pub use client::DataClient;
pub use config::{BackendConfig, ConfigError};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use memory::{CallCounts, Faults, MemoryRepository};
pub use repository::{all_order_items, HttpRepository, Repository, Transport};
pub use sync::{sync_listing_status, CascadeFailure, CascadeStage, FailedOrderItem, SyncError, SyncReport};
pub use types::{
    CreateListing, CreateOrderItem, CreateTodo, Listing, OrderItem, OrderItemFilter, Page,
    PageRequest, Status, Todo, UpdateListing, UpdateOrderItem,
};
