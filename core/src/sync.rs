//! Listing → order item status synchronization.
//!
//! # Overview
//! When a listing changes status (a sale completes, a seller pulls it), every
//! order item that references the listing must carry the same status.
//! [`sync_listing_status`] updates the listing, pages through its order
//! items, then updates all of them concurrently.
//!
//! # Consistency
//! The cascade is not transactional. The listing update is never rolled
//! back, and order item updates that succeeded stay applied when a sibling
//! fails. Failures report exactly which ids were updated so callers can
//! reconcile or simply re-run the sync, which is idempotent.

use std::fmt;

use futures::future::join_all;
use tracing::{error, info};

use crate::auth::AuthMode;
use crate::error::ApiError;
use crate::repository::{all_order_items, Repository};
use crate::types::{Listing, OrderItemFilter, Status, UpdateListing, UpdateOrderItem};

/// Outcome of a fully successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub listing: Listing,
    pub updated_order_items: Vec<String>,
}

/// Where a cascade broke off.
#[derive(Debug, Clone)]
pub enum CascadeStage {
    /// Fetching the related order items failed; nothing was cascaded.
    Query(ApiError),
    /// At least one order item update was rejected.
    Update,
}

#[derive(Debug, Clone)]
pub struct FailedOrderItem {
    pub id: String,
    pub error: ApiError,
}

/// The listing was updated but its order items were not all brought in line.
#[derive(Debug, Clone)]
pub struct CascadeFailure {
    pub listing_id: String,
    pub stage: CascadeStage,
    pub updated: Vec<String>,
    pub failed: Vec<FailedOrderItem>,
}

impl fmt::Display for CascadeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stage {
            CascadeStage::Query(source) => write!(
                f,
                "querying order items of listing {} failed: {source}",
                self.listing_id
            ),
            CascadeStage::Update => write!(
                f,
                "{} of {} order item updates for listing {} failed",
                self.failed.len(),
                self.failed.len() + self.updated.len(),
                self.listing_id
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to update listing status: listing id must not be empty")]
    InvalidListingId,

    /// The listing itself was not updated; no order item was touched.
    #[error("failed to update listing status: listing {listing_id} rejected the update: {source}")]
    ListingUpdate {
        listing_id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to update listing status: {0}")]
    Cascade(CascadeFailure),
}

impl SyncError {
    /// Order items that did receive the new status before the failure.
    pub fn updated_order_items(&self) -> &[String] {
        match self {
            SyncError::Cascade(failure) => &failure.updated,
            SyncError::InvalidListingId | SyncError::ListingUpdate { .. } => &[],
        }
    }
}

/// Set `listing_id` to `status` and cascade the status to every order item
/// referencing it.
pub async fn sync_listing_status<R>(
    repo: &R,
    listing_id: &str,
    status: Status,
    auth: AuthMode,
) -> Result<SyncReport, SyncError>
where
    R: Repository + ?Sized,
{
    if listing_id.trim().is_empty() {
        error!("refusing to sync status for an empty listing id");
        return Err(SyncError::InvalidListingId);
    }

    let listing = repo
        .update_listing(listing_id, &UpdateListing::status(status), auth)
        .await
        .map_err(|source| {
            error!(listing_id, %status, %auth, error = %source, "listing status update failed");
            SyncError::ListingUpdate {
                listing_id: listing_id.to_string(),
                source,
            }
        })?;

    let filter = OrderItemFilter::by_listing(listing_id);
    let related = match all_order_items(repo, &filter, auth).await {
        Ok(items) => items,
        Err(source) => {
            error!(listing_id, %status, error = %source, "querying related order items failed");
            return Err(SyncError::Cascade(CascadeFailure {
                listing_id: listing_id.to_string(),
                stage: CascadeStage::Query(source),
                updated: Vec::new(),
                failed: Vec::new(),
            }));
        }
    };

    if related.is_empty() {
        info!(listing_id, %status, "listing status updated, no related order items");
        return Ok(SyncReport {
            listing,
            updated_order_items: Vec::new(),
        });
    }

    let patch = UpdateOrderItem::status(status);
    let outcomes = join_all(related.into_iter().map(|item| {
        let patch = &patch;
        async move {
            let outcome = repo.update_order_item(&item.id, patch, auth).await;
            (item.id, outcome)
        }
    }))
    .await;

    let mut updated = Vec::new();
    let mut failed = Vec::new();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(_) => updated.push(id),
            Err(error) => failed.push(FailedOrderItem { id, error }),
        }
    }

    if !failed.is_empty() {
        let failure = CascadeFailure {
            listing_id: listing_id.to_string(),
            stage: CascadeStage::Update,
            updated,
            failed,
        };
        error!(
            listing_id,
            %status,
            updated = failure.updated.len(),
            failed = failure.failed.len(),
            "order item status cascade partially failed"
        );
        return Err(SyncError::Cascade(failure));
    }

    info!(
        listing_id,
        %status,
        order_items = updated.len(),
        "listing status updated along with related order items"
    );
    Ok(SyncReport {
        listing,
        updated_order_items: updated,
    })
}
