// Implements the S3 Client
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::client::Client as S3Client;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::{
    DisplayErrorContext,
    SdkError,
};
use aws_sdk_s3::types::BucketLocationConstraint;
use aws_types::region::Region;
use crate::common::{
    BackendError,
    BucketNames,
    ClientConfig,
    Listing,
    Prefix,
};
use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};
use std::time::Duration;
use tracing::debug;

// Used when neither the CLI nor the environment provide a region.
const DEFAULT_REGION: &str = "us-east-1";

// Delimiter used to split keys into levels.
const DELIMITER: &str = "/";

// A single attempt at any S3 call gives up after this long and the listing
// is counted as failed.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

// Returned by HeadBucket when the bucket lives in another region.
const STATUS_MOVED_PERMANENTLY: u16 = 301;

// HeadBucket statuses that mean the bucket isn't there for us.
const STATUS_FORBIDDEN: u16 = 403;
const STATUS_NOT_FOUND: u16 = 404;

/// Builds an `S3Client` for the given region.
pub type RegionalClientBuilder = Arc<dyn Fn(&str) -> S3Client + Send + Sync>;

/// HTTP status of the response behind `err`, if one was received.
fn status<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response()
        .map(|response| response.http().status().as_u16())
}

/// Turn an SDK error into a `BackendError`, keeping the HTTP status if we
/// got as far as receiving a response.
fn backend_error<E>(err: SdkError<E>) -> BackendError
where
    E: std::error::Error + Send + Sync + 'static,
{
    BackendError::from_status(
        status(&err),
        DisplayErrorContext(&err).to_string(),
    )
}

/// Map a `GetBucketLocation` constraint to a region name.
///
/// Buckets in `us-east-1` report no constraint and some old `eu-west-1`
/// buckets report `EU`.
fn location_region(location: Option<&BucketLocationConstraint>) -> String {
    let region = match location.map(BucketLocationConstraint::as_str) {
        None | Some("") => "us-east-1",
        Some("EU")      => "eu-west-1",
        Some(region)    => region,
    };

    region.to_string()
}

// Clients for other regions, and the client each bucket should be listed
// with.
#[derive(Default)]
struct RegionalClients {
    buckets: HashMap<String, S3Client>,
    regions: HashMap<String, S3Client>,
}

/// The S3 `Client`.
///
/// S3 only serves a bucket from the region it lives in, so each bucket is
/// listed through a client for its own region.
pub struct Client {
    /// The AWS SDK `S3Client` for the region we were configured with.
    pub client: S3Client,

    // Region `client` was created in.
    region: String,

    // Custom endpoints are a single region as far as we're concerned.
    custom_endpoint: bool,

    regional_client: RegionalClientBuilder,
    regional_clients: Mutex<RegionalClients>,
}

impl Client {
    /// Return a new S3 `Client` with the given `ClientConfig`.
    ///
    /// Credentials come from the SDK's usual provider chain.
    pub async fn new(config: &ClientConfig) -> Self {
        let region = RegionProviderChain::first_try(
                config.region.clone().map(Region::new),
            )
            .or_default_provider()
            .or_else(Region::from_static(DEFAULT_REGION));

        let timeouts = TimeoutConfig::builder()
            .operation_attempt_timeout(ATTEMPT_TIMEOUT)
            .build();

        let sdk_config = aws_config::from_env()
            .region(region)
            .timeout_config(timeouts)
            .load()
            .await;

        let region = sdk_config.region()
            .map_or_else(|| DEFAULT_REGION.to_string(), |r| r.to_string());

        debug!("new: Creating S3Client in region '{}'", region);

        let endpoint = config.endpoint.clone();

        let regional_client: RegionalClientBuilder = Arc::new(move |region: &str| {
            let mut builder = S3ConfigBuilder::from(&sdk_config)
                .region(Region::new(region.to_string()));

            // S3 compatible stores rarely support virtual hosted buckets.
            if let Some(endpoint) = &endpoint {
                debug!("new: Using custom endpoint '{}'", endpoint);

                builder = builder
                    .endpoint_url(endpoint)
                    .force_path_style(true);
            }

            S3Client::from_conf(builder.build())
        });

        Self::with_regional_client(
            region,
            config.endpoint.is_some(),
            regional_client,
        )
    }

    /// Return a new `Client` in `region`, using `regional_client` to create
    /// the SDK clients for every region we need to talk to.
    pub fn with_regional_client(
        region:          String,
        custom_endpoint: bool,
        regional_client: RegionalClientBuilder,
    ) -> Self {
        let client = regional_client(&region);

        Self {
            client,
            region,
            custom_endpoint,
            regional_client,
            regional_clients: Mutex::new(RegionalClients::default()),
        }
    }

    fn regional_clients(&self) -> MutexGuard<'_, RegionalClients> {
        self.regional_clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a list of bucket names.
    pub async fn list_buckets(&self) -> Result<BucketNames, BackendError> {
        debug!("list_buckets: Listing...");

        let output = self.client.list_buckets()
            .send()
            .await
            .map_err(backend_error)?;

        let bucket_names = output.buckets()
            .unwrap_or_default()
            .iter()
            .filter_map(|b| b.name())
            .map(String::from)
            .collect();

        Ok(bucket_names)
    }

    /// Return the region that `bucket` lives in.
    pub async fn get_bucket_location(
        &self,
        bucket: &str,
    ) -> Result<String, BackendError> {
        debug!("get_bucket_location for '{}'", bucket);

        let output = self.client.get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(backend_error)?;

        let region = location_region(output.location_constraint());

        debug!("get_bucket_location: '{}' is in '{}'", bucket, region);

        Ok(region)
    }

    /// Return the client that `bucket` should be accessed with, looking up
    /// its region the first time we see it.
    pub async fn bucket_client(
        &self,
        bucket: &str,
    ) -> Result<S3Client, BackendError> {
        if self.custom_endpoint {
            return Ok(self.client.clone());
        }

        let cached = self.regional_clients().buckets.get(bucket).cloned();
        if let Some(client) = cached {
            return Ok(client);
        }

        let region = self.get_bucket_location(bucket).await?;

        let mut clients = self.regional_clients();

        let client = if region == self.region {
            self.client.clone()
        }
        else {
            clients.regions
                .entry(region)
                .or_insert_with_key(|region| {
                    debug!("bucket_client: Creating S3Client in '{}'", region);

                    (self.regional_client)(region.as_str())
                })
                .clone()
        };

        clients.buckets.insert(bucket.to_string(), client.clone());

        Ok(client)
    }

    /// Returns a `bool` indicating if we have access to the given `bucket` or
    /// not.
    ///
    /// Both 403 and 404 mean the bucket isn't there for us. Any other
    /// failure is returned as an error.
    pub async fn head_bucket(&self, bucket: &str) -> Result<bool, BackendError> {
        debug!("head_bucket for '{}'", bucket);

        let output = self.client.head_bucket()
            .bucket(bucket)
            .send()
            .await;

        debug!("head_bucket output for '{}' -> '{:?}'", bucket, output);

        match output {
            Ok(_) => Ok(true),
            Err(err) => {
                if status(&err) == Some(STATUS_MOVED_PERMANENTLY)
                    && !self.custom_endpoint
                {
                    debug!("head_bucket: '{}' is in another region", bucket);

                    let client = self.bucket_client(bucket).await?;

                    return head_bucket_in(&client, bucket).await;
                }

                missing_or_error(err)
            },
        }
    }

    /// List the objects and common prefixes directly under `prefix`.
    pub async fn list_level(
        &self,
        bucket: &str,
        prefix: &Prefix,
    ) -> Result<Listing, BackendError> {
        debug!("list_level: '{}' in '{}'", prefix, bucket);

        let client = self.bucket_client(bucket).await?;

        let mut continuation_token = None;
        let mut listing            = Listing::default();

        // Loop until the whole level is processed.
        loop {
            let output = client.list_objects_v2()
                .bucket(bucket)
                .delimiter(DELIMITER)
                .set_prefix(prefix.as_str().map(String::from))
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(backend_error)?;

            // S3 never reports negative sizes, but the SDK models them as
            // i64.
            if let Some(contents) = output.contents() {
                listing.object_sizes.extend(
                    contents
                        .iter()
                        .map(|o| u64::try_from(o.size()).unwrap_or(0))
                );
            }

            if let Some(prefixes) = output.common_prefixes() {
                listing.sub_prefixes.extend(
                    prefixes
                        .iter()
                        .filter_map(|p| p.prefix())
                        .map(Prefix::from)
                );
            }

            if !output.is_truncated() {
                break;
            }

            // A truncated page must tell us where to carry on from.
            match output.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None        => {
                    return Err(BackendError::Transport(format!(
                        "truncated listing of '{}' in '{}' has no continuation token",
                        prefix,
                        bucket,
                    )));
                },
            }
        }

        debug!(
            "list_level: '{}' in '{}' has {} objects and {} prefixes",
            prefix,
            bucket,
            listing.object_sizes.len(),
            listing.sub_prefixes.len(),
        );

        Ok(listing)
    }
}

// HeadBucket through a client already in the bucket's region.
async fn head_bucket_in(
    client: &S3Client,
    bucket: &str,
) -> Result<bool, BackendError> {
    let output = client.head_bucket()
        .bucket(bucket)
        .send()
        .await;

    debug!("head_bucket_in output for '{}' -> '{:?}'", bucket, output);

    match output {
        Ok(_)    => Ok(true),
        Err(err) => missing_or_error(err),
    }
}

fn missing_or_error<E>(err: SdkError<E>) -> Result<bool, BackendError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match status(&err) {
        Some(STATUS_FORBIDDEN) | Some(STATUS_NOT_FOUND) => Ok(false),
        _                                               => Err(backend_error(err)),
    }
}
