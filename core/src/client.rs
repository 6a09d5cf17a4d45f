//! Stateless HTTP request builder and response parser for the data API.
//!
//! # Design
//! `DataClient` holds only a `base_url` and the credentials for each auth
//! mode, and carries no mutable state between calls. Each operation is split
//! into a `build_*` method that produces an `HttpRequest` and a `parse_*`
//! method that consumes an `HttpResponse`. The caller executes the actual
//! HTTP round-trip, keeping the client deterministic and free of I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{AuthMode, Credentials};
use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    CreateListing, CreateOrderItem, CreateTodo, Listing, OrderItem, OrderItemFilter, Page,
    PageRequest, Todo, UpdateListing, UpdateOrderItem,
};

const LISTINGS: &str = "listings";
const ORDER_ITEMS: &str = "order-items";
const TODOS: &str = "todos";

/// Synchronous, stateless client for the data API.
#[derive(Debug, Clone)]
pub struct DataClient {
    base_url: String,
    credentials: Credentials,
}

impl DataClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.endpoint, config.credentials.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- listings ---

    pub fn build_list_listings(&self, page: &PageRequest, auth: AuthMode) -> Result<HttpRequest, ApiError> {
        let query = paging_query(page, Vec::new())?;
        self.request(HttpMethod::Get, &format!("/{LISTINGS}{query}"), auth, None)
    }

    pub fn build_get_listing(&self, id: &str, auth: AuthMode) -> Result<HttpRequest, ApiError> {
        let id = url_safe(id)?;
        self.request(HttpMethod::Get, &format!("/{LISTINGS}/{id}"), auth, None)
    }

    pub fn build_create_listing(&self, input: &CreateListing, auth: AuthMode) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, &format!("/{LISTINGS}"), auth, Some(to_json(input)?))
    }

    pub fn build_update_listing(
        &self,
        id: &str,
        input: &UpdateListing,
        auth: AuthMode,
    ) -> Result<HttpRequest, ApiError> {
        let id = url_safe(id)?;
        self.request(HttpMethod::Patch, &format!("/{LISTINGS}/{id}"), auth, Some(to_json(input)?))
    }

    pub fn parse_list_listings(&self, response: HttpResponse) -> Result<Page<Listing>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_get_listing(&self, response: HttpResponse) -> Result<Listing, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_create_listing(&self, response: HttpResponse) -> Result<Listing, ApiError> {
        parse_json(response, 201)
    }

    pub fn parse_update_listing(&self, response: HttpResponse) -> Result<Listing, ApiError> {
        parse_json(response, 200)
    }

    // --- order items ---

    pub fn build_list_order_items(
        &self,
        filter: &OrderItemFilter,
        page: &PageRequest,
        auth: AuthMode,
    ) -> Result<HttpRequest, ApiError> {
        let mut params = Vec::new();
        if let Some(listing_id) = &filter.listing_id {
            params.push(("listingId", url_safe(listing_id)?.to_string()));
        }
        let query = paging_query(page, params)?;
        self.request(HttpMethod::Get, &format!("/{ORDER_ITEMS}{query}"), auth, None)
    }

    pub fn build_get_order_item(&self, id: &str, auth: AuthMode) -> Result<HttpRequest, ApiError> {
        let id = url_safe(id)?;
        self.request(HttpMethod::Get, &format!("/{ORDER_ITEMS}/{id}"), auth, None)
    }

    pub fn build_create_order_item(
        &self,
        input: &CreateOrderItem,
        auth: AuthMode,
    ) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, &format!("/{ORDER_ITEMS}"), auth, Some(to_json(input)?))
    }

    pub fn build_update_order_item(
        &self,
        id: &str,
        input: &UpdateOrderItem,
        auth: AuthMode,
    ) -> Result<HttpRequest, ApiError> {
        let id = url_safe(id)?;
        self.request(HttpMethod::Patch, &format!("/{ORDER_ITEMS}/{id}"), auth, Some(to_json(input)?))
    }

    pub fn parse_list_order_items(&self, response: HttpResponse) -> Result<Page<OrderItem>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_get_order_item(&self, response: HttpResponse) -> Result<OrderItem, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_create_order_item(&self, response: HttpResponse) -> Result<OrderItem, ApiError> {
        parse_json(response, 201)
    }

    pub fn parse_update_order_item(&self, response: HttpResponse) -> Result<OrderItem, ApiError> {
        parse_json(response, 200)
    }

    // --- todos ---

    pub fn build_list_todos(&self, auth: AuthMode) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, &format!("/{TODOS}"), auth, None)
    }

    pub fn build_create_todo(&self, input: &CreateTodo, auth: AuthMode) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Post, &format!("/{TODOS}"), auth, Some(to_json(input)?))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 201)
    }

    fn request(
        &self,
        method: HttpMethod,
        path_and_query: &str,
        auth: AuthMode,
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = self.credentials.headers_for(auth)?;
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        Ok(HttpRequest {
            method,
            url: format!("{}{path_and_query}", self.base_url),
            headers,
            body,
        })
    }
}

fn to_json<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse, expected: u16) -> Result<T, ApiError> {
    check_status(&response, expected)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Identifiers and paging tokens are placed in URLs verbatim, so they are
/// restricted to characters that need no escaping.
fn url_safe(value: &str) -> Result<&str, ApiError> {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
    if safe {
        Ok(value)
    } else {
        Err(ApiError::InvalidId(value.to_string()))
    }
}

fn paging_query(page: &PageRequest, mut params: Vec<(&str, String)>) -> Result<String, ApiError> {
    if let Some(limit) = page.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(token) = &page.next_token {
        params.push(("nextToken", url_safe(token)?.to_string()));
    }
    if params.is_empty() {
        return Ok(String::new());
    }
    let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    Ok(format!("?{}", pairs.join("&")))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        status if status == expected => Ok(()),
        404 => Err(ApiError::NotFound),
        status @ (401 | 403) => Err(ApiError::PermissionDenied {
            status,
            body: response.body.clone(),
        }),
        400 | 422 => Err(ApiError::Validation(response.body.clone())),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    fn client() -> DataClient {
        DataClient::new(
            "http://localhost:3000",
            Credentials {
                user_token: Some("session-1".to_string()),
                api_key: Some("key-1".to_string()),
                infra_credential: None,
            },
        )
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_get_listing_produces_correct_request() {
        let req = client().build_get_listing("L1", AuthMode::UserPool).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/listings/L1");
        assert_eq!(req.header("x-auth-mode"), Some("userPool"));
        assert_eq!(req.header("authorization"), Some("Bearer session-1"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_update_listing_sends_patch_with_json_body() {
        let req = client()
            .build_update_listing("L1", &UpdateListing::status(Status::Sold), AuthMode::UserPool)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "sold" }));
    }

    #[test]
    fn build_list_order_items_carries_filter_and_cursor() {
        let page = PageRequest {
            limit: Some(25),
            next_token: Some("O7".to_string()),
        };
        let req = client()
            .build_list_order_items(&OrderItemFilter::by_listing("L1"), &page, AuthMode::UserPool)
            .unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/order-items?listingId=L1&limit=25&nextToken=O7"
        );
    }

    #[test]
    fn build_list_listings_without_paging_has_no_query() {
        let req = client()
            .build_list_listings(&PageRequest::default(), AuthMode::ApiKey)
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/listings");
        assert_eq!(req.header("x-api-key"), Some("key-1"));
    }

    #[test]
    fn unsafe_identifiers_are_rejected() {
        let err = client().build_get_order_item("a/b", AuthMode::UserPool).unwrap_err();
        assert!(matches!(err, ApiError::InvalidId(id) if id == "a/b"));
        assert!(client().build_get_listing("", AuthMode::UserPool).is_err());
    }

    #[test]
    fn unconfigured_auth_mode_fails_before_io() {
        let err = client().build_list_todos(AuthMode::Iam).unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential(AuthMode::Iam)));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = DataClient::new("http://localhost:3000/", Credentials::default());
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn parse_list_order_items_reads_next_token() {
        let body = r#"{"items":[{"id":"O1","orderId":"R1","listingId":"L1","quantity":1,"priceCents":900,"status":"active"}],"nextToken":"O1"}"#;
        let page = client().parse_list_order_items(response(200, body)).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].listing_id, "L1");
        assert_eq!(page.next_token.as_deref(), Some("O1"));
    }

    #[test]
    fn parse_create_todo_expects_201() {
        let todo = client()
            .parse_create_todo(response(201, r#"{"id":"T1","content":"hello"}"#))
            .unwrap();
        assert_eq!(todo.content, "hello");

        let err = client()
            .parse_create_todo(response(200, r#"{"id":"T1","content":"hello"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 200, .. }));
    }

    #[test]
    fn status_codes_map_to_error_variants() {
        let c = client();
        assert!(matches!(c.parse_get_listing(response(404, "")), Err(ApiError::NotFound)));
        assert!(matches!(
            c.parse_get_listing(response(403, "nope")),
            Err(ApiError::PermissionDenied { status: 403, .. })
        ));
        assert!(matches!(
            c.parse_update_listing(response(422, "bad")),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            c.parse_update_listing(response(500, "boom")),
            Err(ApiError::HttpError { status: 500, .. })
        ));
    }

    #[test]
    fn parse_get_listing_bad_json() {
        let err = client().parse_get_listing(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }
}
