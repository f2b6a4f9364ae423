// Implement the StorageBackend trait for the gcs::Client
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use async_trait::async_trait;
use crate::common::{
    BackendError,
    BucketNames,
    Listing,
    Prefix,
    StorageBackend,
};
use super::client::Client;
use tracing::debug;

#[async_trait]
impl StorageBackend for Client {
    /// Return the names of all buckets in the configured project.
    async fn buckets(&self) -> Result<BucketNames, BackendError> {
        debug!("buckets: Listing...");

        self.list_buckets().await
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.get_bucket(bucket).await
    }

    /// Return one level of `bucket` below `prefix`.
    async fn list_prefix(
        &self,
        bucket: &str,
        prefix: &Prefix,
    ) -> Result<Listing, BackendError> {
        self.list_level(bucket, prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{
        ListingRequest,
        ListingResult,
    };
    use crate::gcs::client::tests::{
        serve,
        test_client,
        LIST_BUCKETS,
        LIST_ROOT,
    };
    use pretty_assertions::assert_eq;

    fn root_request() -> ListingRequest {
        ListingRequest {
            bucket_name: "test-bucket".into(),
            prefix:      Prefix::Root,
        }
    }

    #[tokio::test]
    async fn test_buckets() {
        let (base_url, _requests) = serve(vec![(200, LIST_BUCKETS)]).await;
        let client = test_client(&base_url);

        let mut buckets = client.buckets().await.unwrap();
        buckets.sort();

        let expected = vec![
            "a-bucket-name",
            "another-bucket-name",
        ];

        assert_eq!(buckets, expected);
    }

    #[tokio::test]
    async fn test_list_one_level() {
        let (base_url, _requests) = serve(vec![(200, LIST_ROOT)]).await;
        let client = test_client(&base_url);

        let ret = client.list_one_level(root_request()).await;

        let expected = ListingResult {
            bucket_name:  "test-bucket".into(),
            prefix:       Prefix::Root,
            object_sizes: vec![10, 20],
            sub_prefixes: vec!["logs/".into(), "photos/".into()],
            failed:       false,
        };

        assert_eq!(ret, expected);
    }

    #[tokio::test]
    async fn test_list_one_level_server_error() {
        let (base_url, _requests) = serve(vec![
            (500, r#"{"error": {"code": 500, "message": "Backend Error"}}"#),
        ]).await;

        let client = test_client(&base_url);

        let ret = client.list_one_level(root_request()).await;

        assert_eq!(ret, ListingResult::failed(root_request()));
    }
}
