// Implements the GCS Client
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use anyhow::{
    Context,
    Result,
};
use crate::common::{
    BackendError,
    BucketNames,
    ClientConfig,
    Listing,
    Prefix,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

// Public JSON API endpoint.
const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/storage/v1";

// Delimiter used to split object names into levels.
const DELIMITER: &str = "/";

// Largest page the JSON API will return.
const MAX_RESULTS: &str = "1000";

// Only fetch the parts of each response that we use.
const BUCKET_FIELDS: &str = "nextPageToken,items/name";
const OBJECT_FIELDS: &str = "prefixes,nextPageToken,items/size";

// Any single request gives up after this long and the listing is counted as
// failed.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::from_status(
        err.status().map(|status| status.as_u16()),
        err.to_string(),
    )
}

/// One page of a bucket listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketsPage {
    #[serde(default)]
    items:           Vec<BucketItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BucketItem {
    name: String,
}

/// One page of an object listing with the `/` delimiter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectsPage {
    #[serde(default)]
    items:           Vec<ObjectItem>,
    #[serde(default)]
    prefixes:        Vec<String>,
    next_page_token: Option<String>,
}

// The JSON API encodes uint64 values as strings.
#[derive(Debug, Deserialize)]
struct ObjectItem {
    size: String,
}

impl ObjectsPage {
    /// Add this page's objects and prefixes to `listing`, returning the
    /// token for the next page, if any.
    fn append_to(self, listing: &mut Listing) -> Result<Option<String>, BackendError> {
        for item in self.items {
            let size = item.size.parse::<u64>()
                .map_err(|e| BackendError::Transport(
                    format!("invalid object size '{}': {}", item.size, e),
                ))?;

            listing.object_sizes.push(size);
        }

        listing.sub_prefixes.extend(
            self.prefixes
                .into_iter()
                .map(Prefix::Path)
        );

        Ok(self.next_page_token)
    }
}

/// The GCS `Client`.
pub struct Client {
    /// HTTP client used for every request.
    client: reqwest::Client,

    /// Base URL of the JSON API.
    base_url: String,

    /// OAuth2 access token sent as a bearer token, if any.
    access_token: Option<String>,

    /// Project whose buckets are enumerated.
    project: Option<String>,
}

impl Client {
    /// Return a new GCS `Client` with the given `ClientConfig`.
    ///
    /// The access token is expected to already be valid, it is never
    /// refreshed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure base URL doesn't have trailing slash
        let base_url = config.endpoint
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        debug!("new: Creating GCS client for '{}'", base_url);

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
            project:      config.project.clone(),
        })
    }

    // GET `url` with `query`, attaching our credentials.
    async fn get(
        &self,
        url:   &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, BackendError> {
        debug!("get: {} {:?}", url, query);

        let mut request = self.client.get(url).query(query);

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(transport_error)
    }

    // GET `url` and decode a successful JSON response.
    async fn get_json<T>(
        &self,
        url:   &str,
        query: &[(&str, &str)],
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let response = self.get(url, query).await?;
        let status   = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(BackendError::from_status(
                Some(status.as_u16()),
                format!("{}: {}", status, body.trim()),
            ));
        }

        response.json().await.map_err(transport_error)
    }

    /// Returns a list of bucket names in the configured project.
    pub async fn list_buckets(&self) -> Result<BucketNames, BackendError> {
        let project = self.project.as_deref().ok_or_else(|| {
            BackendError::Configuration(
                "a project is required to list GCS buckets".into(),
            )
        })?;

        debug!("list_buckets: Listing project '{}'", project);

        let url = format!("{}/b", self.base_url);

        let mut bucket_names = BucketNames::new();
        let mut page_token   = None;

        loop {
            let mut query = vec![
                ("project", project),
                ("fields", BUCKET_FIELDS),
                ("maxResults", MAX_RESULTS),
            ];

            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: BucketsPage = self.get_json(&url, &query).await?;

            bucket_names.extend(page.items.into_iter().map(|b| b.name));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None        => break,
            }
        }

        Ok(bucket_names)
    }

    /// Returns whether `bucket` exists.
    ///
    /// Only a 404 means the bucket is missing, any other failure is an
    /// error.
    pub async fn get_bucket(&self, bucket: &str) -> Result<bool, BackendError> {
        debug!("get_bucket for '{}'", bucket);

        let url      = format!("{}/b/{}", self.base_url, bucket);
        let response = self.get(&url, &[("fields", "name")]).await?;
        let status   = response.status();

        debug!("get_bucket status for '{}' -> '{}'", bucket, status);

        if status.is_success() {
            return Ok(true);
        }

        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        Err(BackendError::from_status(
            Some(status.as_u16()),
            format!("checking bucket '{}': {}", bucket, status),
        ))
    }

    /// List the objects and common prefixes directly under `prefix`.
    pub async fn list_level(
        &self,
        bucket: &str,
        prefix: &Prefix,
    ) -> Result<Listing, BackendError> {
        debug!("list_level: '{}' in '{}'", prefix, bucket);

        let url = format!("{}/b/{}/o", self.base_url, bucket);

        let mut listing    = Listing::default();
        let mut page_token = None;

        loop {
            let mut query = vec![
                ("delimiter", DELIMITER),
                ("fields", OBJECT_FIELDS),
                ("maxResults", MAX_RESULTS),
            ];

            if let Some(prefix) = prefix.as_str() {
                query.push(("prefix", prefix));
            }

            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ObjectsPage = self.get_json(&url, &query).await?;

            match page.append_to(&mut listing)? {
                Some(token) => page_token = Some(token),
                None        => break,
            }
        }

        Ok(listing)
    }
}
