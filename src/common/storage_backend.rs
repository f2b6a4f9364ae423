// StorageBackend trait
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use async_trait::async_trait;
use super::{
    BackendError,
    BucketNames,
    Listing,
    ListingRequest,
    ListingResult,
    Prefix,
};
use tracing::warn;

/// `StorageBackend` represents the required methods to enumerate buckets and
/// list a single level of a bucket's namespace.
///
/// This trait should be implemented by every provider `Client`. The size
/// task is written once against it.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns the names of every bucket visible to the current credentials.
    async fn buckets(&self) -> Result<BucketNames, BackendError>;

    /// Returns whether `bucket` exists and is visible to us.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Lists the objects and common prefixes directly under `prefix`,
    /// following pagination until the level is exhausted.
    async fn list_prefix(
        &self,
        bucket: &str,
        prefix: &Prefix,
    ) -> Result<Listing, BackendError>;

    /// Lists one level for `request`.
    ///
    /// Errors stop here: they're logged and turned into a failed
    /// `ListingResult`, which contributes nothing to the totals.
    async fn list_one_level(&self, request: ListingRequest) -> ListingResult {
        let listing = self.list_prefix(
            &request.bucket_name,
            &request.prefix,
        ).await;

        match listing {
            Ok(listing) => ListingResult::succeeded(request, listing),
            Err(e)      => {
                warn!(
                    bucket = %request.bucket_name,
                    prefix = %request.prefix,
                    error = %e,
                    "Listing failed, branch will not be counted",
                );

                ListingResult::failed(request)
            },
        }
    }
}
