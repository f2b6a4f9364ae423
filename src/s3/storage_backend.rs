// Implement the StorageBackend trait for the s3::Client
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
    /// Return the names of all buckets discovered in S3.
    ///
    /// ListBuckets returns buckets from every region, so each bucket's
    /// region is looked up here, before any listing is dispatched.
    async fn buckets(&self) -> Result<BucketNames, BackendError> {
        debug!("buckets: Listing...");

        let bucket_names = self.list_buckets().await?;

        for bucket in &bucket_names {
            debug!("Retrieving client for '{}'", bucket);

            self.bucket_client(bucket).await?;
        }

        Ok(bucket_names)
    }

    /// A bucket exists as far as we're concerned if we can `HeadBucket` it.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.head_bucket(bucket).await
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
    use crate::s3::client::tests::{
        mock_client,
        mock_client_with_connection,
        request_hosts,
        ResponseType,
        ACCESS_DENIED,
        LIST_BUCKETS,
        LIST_ROOT,
        LOCATION_EU_WEST_1,
        LOCATION_US_WEST_2,
    };
    use pretty_assertions::assert_eq;

    fn root_request(bucket: &str) -> ListingRequest {
        ListingRequest {
            bucket_name: bucket.into(),
            prefix:      Prefix::Root,
        }
    }

    #[tokio::test]
    async fn test_buckets() {
        let expected = vec![
            "a-bucket-name",
            "another-bucket-name",
        ];

        let client = mock_client(vec![
            ResponseType::Body(LIST_BUCKETS),
            ResponseType::Body(LOCATION_EU_WEST_1),
            ResponseType::Body(LOCATION_EU_WEST_1),
        ]);

        let mut buckets = client.buckets().await.unwrap();
        buckets.sort();

        assert_eq!(buckets, expected);
    }

    #[tokio::test]
    async fn test_buckets_in_two_regions() {
        let (client, conn) = mock_client_with_connection(vec![
            ResponseType::Body(LIST_BUCKETS),
            ResponseType::Body(LOCATION_EU_WEST_1),
            ResponseType::Body(LOCATION_US_WEST_2),
            ResponseType::Body(LIST_ROOT),
            ResponseType::Body(LIST_ROOT),
        ]);

        let buckets = client.buckets().await.unwrap();

        assert_eq!(buckets, vec!["a-bucket-name", "another-bucket-name"]);

        // Both buckets count, wherever they live.
        for bucket in &buckets {
            let ret = client.list_one_level(root_request(bucket)).await;

            assert!(!ret.failed, "{} failed", bucket);
            assert_eq!(ret.object_sizes, vec![10, 20]);
        }

        let hosts = request_hosts(&conn);

        assert_eq!(hosts.len(), 5);
        assert!(hosts[3].starts_with("a-bucket-name.s3.eu-west-1."), "{:?}", hosts);
        assert!(hosts[4].starts_with("another-bucket-name.s3.us-west-2."), "{:?}", hosts);
    }

    #[tokio::test]
    async fn test_buckets_location_denied() {
        let client = mock_client(vec![
            ResponseType::Body(LIST_BUCKETS),
            ResponseType::StatusBody(403, ACCESS_DENIED),
        ]);

        let ret = client.buckets().await;

        assert!(matches!(ret, Err(BackendError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_bucket_exists() {
        let tests = vec![
            (200, true),
            (403, false),
            (404, false),
        ];

        for test in tests {
            let status   = test.0;
            let expected = test.1;

            let client = mock_client(vec![ResponseType::WithStatus(status)]);
            let ret    = client.bucket_exists("test-bucket").await.unwrap();

            assert_eq!(ret, expected);
        }
    }

    #[tokio::test]
    async fn test_bucket_exists_server_error() {
        let client = mock_client(vec![
            ResponseType::WithStatus(500),
            ResponseType::WithStatus(500),
            ResponseType::WithStatus(500),
        ]);

        let ret = client.bucket_exists("test-bucket").await;

        assert!(matches!(ret, Err(BackendError::Transport(_))));
    }

    #[tokio::test]
    async fn test_bucket_in_other_region_is_sized() {
        let (client, conn) = mock_client_with_connection(vec![
            ResponseType::WithStatus(301),
            ResponseType::Body(LOCATION_US_WEST_2),
            ResponseType::WithStatus(200),
            ResponseType::Body(LIST_ROOT),
        ]);

        assert!(client.bucket_exists("test-bucket").await.unwrap());

        let ret = client.list_one_level(root_request("test-bucket")).await;

        let expected = ListingResult {
            bucket_name:  "test-bucket".into(),
            prefix:       Prefix::Root,
            object_sizes: vec![10, 20],
            sub_prefixes: vec!["logs/".into(), "photos/".into()],
            failed:       false,
        };

        assert_eq!(ret, expected);

        let hosts = request_hosts(&conn);

        assert!(hosts[3].contains("us-west-2"), "{:?}", hosts);
    }

    #[tokio::test]
    async fn test_list_one_level() {
        let client = mock_client(vec![
            ResponseType::Body(LOCATION_EU_WEST_1),
            ResponseType::Body(LIST_ROOT),
        ]);

        let ret = client.list_one_level(root_request("test-bucket")).await;

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
    async fn test_list_one_level_access_denied() {
        let client = mock_client(vec![
            ResponseType::Body(LOCATION_EU_WEST_1),
            ResponseType::StatusBody(403, ACCESS_DENIED),
        ]);

        let ret = client.list_one_level(root_request("test-bucket")).await;

        assert_eq!(ret, ListingResult::failed(root_request("test-bucket")));
    }
}
