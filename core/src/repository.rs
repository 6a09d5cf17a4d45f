//! Capability seam between the marketplace logic and the data store.
//!
//! # Design
//! `Repository` exposes typed per-entity operations, each under an explicit
//! `AuthMode`. List operations return a single `Page`; callers follow
//! `next_token` until it runs out. `HttpRepository` implements the trait by
//! pairing the stateless `DataClient` with a host-supplied `Transport`, so
//! the only I/O in this crate happens behind that trait.

use async_trait::async_trait;

use crate::auth::AuthMode;
use crate::client::DataClient;
use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{
    CreateListing, CreateOrderItem, Listing, OrderItem, OrderItemFilter, Page, PageRequest,
    UpdateListing, UpdateOrderItem,
};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_listing(&self, id: &str, auth: AuthMode) -> Result<Listing, ApiError>;

    async fn create_listing(&self, input: &CreateListing, auth: AuthMode) -> Result<Listing, ApiError>;

    async fn update_listing(
        &self,
        id: &str,
        input: &UpdateListing,
        auth: AuthMode,
    ) -> Result<Listing, ApiError>;

    async fn list_listings(&self, page: &PageRequest, auth: AuthMode) -> Result<Page<Listing>, ApiError>;

    async fn get_order_item(&self, id: &str, auth: AuthMode) -> Result<OrderItem, ApiError>;

    async fn create_order_item(
        &self,
        input: &CreateOrderItem,
        auth: AuthMode,
    ) -> Result<OrderItem, ApiError>;

    async fn update_order_item(
        &self,
        id: &str,
        input: &UpdateOrderItem,
        auth: AuthMode,
    ) -> Result<OrderItem, ApiError>;

    async fn list_order_items(
        &self,
        filter: &OrderItemFilter,
        page: &PageRequest,
        auth: AuthMode,
    ) -> Result<Page<OrderItem>, ApiError>;
}

/// Every order item matching `filter`, following `next_token` across pages.
///
/// Fails with `StalledPagination` when a page returns the token it was
/// requested with.
pub async fn all_order_items<R>(
    repo: &R,
    filter: &OrderItemFilter,
    auth: AuthMode,
) -> Result<Vec<OrderItem>, ApiError>
where
    R: Repository + ?Sized,
{
    let mut page = PageRequest::default();
    let mut items = Vec::new();
    loop {
        let batch = repo.list_order_items(filter, &page, auth).await?;
        items.extend(batch.items);
        match batch.next_token {
            Some(token) if page.next_token.as_ref() == Some(&token) => {
                return Err(ApiError::StalledPagination(token));
            }
            Some(token) => page.next_token = Some(token),
            None => return Ok(items),
        }
    }
}

/// Executes an `HttpRequest` on behalf of the client.
///
/// Implementations must return 4xx/5xx responses as data rather than as
/// errors; `ApiError::Transport` is reserved for failed round-trips.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `Repository` backed by the remote data API.
#[derive(Debug, Clone)]
pub struct HttpRepository<T> {
    client: DataClient,
    transport: T,
    page_size: u32,
}

impl<T: Transport> HttpRepository<T> {
    pub fn new(config: &BackendConfig, transport: T) -> Self {
        Self {
            client: DataClient::from_config(config),
            transport,
            page_size: config.page_size,
        }
    }

    pub fn client(&self) -> &DataClient {
        &self.client
    }

    fn paged(&self, page: &PageRequest) -> PageRequest {
        PageRequest {
            limit: Some(page.limit.unwrap_or(self.page_size)),
            next_token: page.next_token.clone(),
        }
    }
}

#[async_trait]
impl<T: Transport> Repository for HttpRepository<T> {
    async fn get_listing(&self, id: &str, auth: AuthMode) -> Result<Listing, ApiError> {
        let request = self.client.build_get_listing(id, auth)?;
        self.client.parse_get_listing(self.transport.execute(request).await?)
    }

    async fn create_listing(&self, input: &CreateListing, auth: AuthMode) -> Result<Listing, ApiError> {
        let request = self.client.build_create_listing(input, auth)?;
        self.client.parse_create_listing(self.transport.execute(request).await?)
    }

    async fn update_listing(
        &self,
        id: &str,
        input: &UpdateListing,
        auth: AuthMode,
    ) -> Result<Listing, ApiError> {
        let request = self.client.build_update_listing(id, input, auth)?;
        self.client.parse_update_listing(self.transport.execute(request).await?)
    }

    async fn list_listings(&self, page: &PageRequest, auth: AuthMode) -> Result<Page<Listing>, ApiError> {
        let request = self.client.build_list_listings(&self.paged(page), auth)?;
        self.client.parse_list_listings(self.transport.execute(request).await?)
    }

    async fn get_order_item(&self, id: &str, auth: AuthMode) -> Result<OrderItem, ApiError> {
        let request = self.client.build_get_order_item(id, auth)?;
        self.client.parse_get_order_item(self.transport.execute(request).await?)
    }

    async fn create_order_item(
        &self,
        input: &CreateOrderItem,
        auth: AuthMode,
    ) -> Result<OrderItem, ApiError> {
        let request = self.client.build_create_order_item(input, auth)?;
        self.client.parse_create_order_item(self.transport.execute(request).await?)
    }

    async fn update_order_item(
        &self,
        id: &str,
        input: &UpdateOrderItem,
        auth: AuthMode,
    ) -> Result<OrderItem, ApiError> {
        let request = self.client.build_update_order_item(id, input, auth)?;
        self.client.parse_update_order_item(self.transport.execute(request).await?)
    }

    async fn list_order_items(
        &self,
        filter: &OrderItemFilter,
        page: &PageRequest,
        auth: AuthMode,
    ) -> Result<Page<OrderItem>, ApiError> {
        let request = self.client.build_list_order_items(filter, &self.paged(page), auth)?;
        self.client.parse_list_order_items(self.transport.execute(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::http::HttpMethod;
    use crate::types::Status;
    use parking_lot::Mutex;

    /// Replays canned responses and records every request it sees.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<Vec<HttpResponse>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn replying(responses: Vec<(u16, &str)>) -> Self {
            let mut responses: Vec<HttpResponse> = responses
                .into_iter()
                .map(|(status, body)| HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                })
                .collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().push(request);
            self.responses
                .lock()
                .pop()
                .ok_or_else(|| ApiError::Transport("no scripted response left".to_string()))
        }
    }

    fn config() -> BackendConfig {
        let mut config = BackendConfig::new("http://data.test");
        config.page_size = 2;
        config.with_credentials(Credentials {
            user_token: Some("tok".to_string()),
            ..Credentials::default()
        })
    }

    #[tokio::test]
    async fn list_order_items_applies_configured_page_size() {
        let transport = ScriptedTransport::replying(vec![(200, r#"{"items":[],"nextToken":null}"#)]);
        let repo = HttpRepository::new(&config(), transport);

        let page = repo
            .list_order_items(
                &OrderItemFilter::by_listing("L1"),
                &PageRequest::default(),
                AuthMode::UserPool,
            )
            .await
            .unwrap();

        assert!(page.items.is_empty());
        let seen = repo.transport.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].url, "http://data.test/order-items?listingId=L1&limit=2");
    }

    const ITEM: &str = r#"{"id":"ID","orderId":"R1","listingId":"L1","quantity":1,"priceCents":100,"status":"active"}"#;

    fn page_body(ids: &[&str], next_token: Option<&str>) -> String {
        let items: Vec<String> = ids.iter().map(|id| ITEM.replace("ID", id)).collect();
        let next_token = next_token.map_or("null".to_string(), |t| format!("\"{t}\""));
        format!(r#"{{"items":[{}],"nextToken":{next_token}}}"#, items.join(","))
    }

    #[tokio::test]
    async fn all_order_items_follows_next_token() {
        let first = page_body(&["O1", "O2"], Some("O2"));
        let last = page_body(&["O3"], None);
        let transport = ScriptedTransport::replying(vec![(200, first.as_str()), (200, last.as_str())]);
        let repo = HttpRepository::new(&config(), transport);

        let items = all_order_items(&repo, &OrderItemFilter::by_listing("L1"), AuthMode::UserPool)
            .await
            .unwrap();

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["O1", "O2", "O3"]);
        let seen = repo.transport.seen.lock();
        assert_eq!(
            seen[1].url,
            "http://data.test/order-items?listingId=L1&limit=2&nextToken=O2"
        );
    }

    #[tokio::test]
    async fn all_order_items_stops_when_the_token_does_not_advance() {
        let first = page_body(&["O1", "O2"], Some("O2"));
        let stuck = page_body(&["O3", "O4"], Some("O2"));
        let transport = ScriptedTransport::replying(vec![
            (200, first.as_str()),
            (200, stuck.as_str()),
            (200, stuck.as_str()),
        ]);
        let repo = HttpRepository::new(&config(), transport);

        let err = all_order_items(&repo, &OrderItemFilter::by_listing("L1"), AuthMode::UserPool)
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::StalledPagination("O2".to_string()));
        assert_eq!(repo.transport.seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn update_listing_maps_forbidden_to_permission_denied() {
        let transport = ScriptedTransport::replying(vec![(403, "denied")]);
        let repo = HttpRepository::new(&config(), transport);

        let err = repo
            .update_listing("L1", &UpdateListing::status(Status::Sold), AuthMode::UserPool)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::PermissionDenied { status: 403, .. }));
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_transport() {
        let transport = ScriptedTransport::replying(Vec::new());
        let repo = HttpRepository::new(&config(), transport);

        let err = repo.get_listing("L1", AuthMode::ApiKey).await.unwrap_err();

        assert!(matches!(err, ApiError::MissingCredential(AuthMode::ApiKey)));
        assert!(repo.transport.seen.lock().is_empty());
    }
}
