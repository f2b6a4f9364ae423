// ClientConfig
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use super::{
    Provider,
    SizeUnit,
};

/// Concurrency used when zero or a negative value is requested.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Upper bound on concurrent listing operations.
pub const MAX_CONCURRENCY_LIMIT: usize = 1000;

/// Clamp a requested concurrency into `1..=MAX_CONCURRENCY_LIMIT`, replacing
/// non-positive values with `DEFAULT_MAX_CONCURRENCY`.
pub fn clamp_concurrency(requested: i64) -> usize {
    if requested <= 0 {
        return DEFAULT_MAX_CONCURRENCY;
    }

    usize::try_from(requested)
        .unwrap_or(MAX_CONCURRENCY_LIMIT)
        .min(MAX_CONCURRENCY_LIMIT)
}

/// Client configuration.
#[derive(Debug)]
pub struct ClientConfig {
    /// The bucket name that should be sized.
    ///
    /// If this isn't given, every bucket visible to the credentials is
    /// sized and the results are added together.
    pub bucket_name: Option<String>,

    /// Maximum number of listing operations in flight at once.
    pub max_concurrency: usize,

    /// The provider that bucketdu will talk to.
    pub provider: Provider,

    /// The GCS project whose buckets should be enumerated.
    ///
    /// Only used by the GCS provider.
    pub project: Option<String>,

    /// Suppress progress output after each round.
    pub quiet: bool,

    /// How sizes should be displayed in progress output.
    pub size_unit: SizeUnit,

    /// The AWS region our S3 client should be created in.
    ///
    /// `None` defers to the SDK's region provider chain.
    #[cfg(feature = "s3")]
    pub region: Option<String>,

    /// Custom endpoint URL, for S3 compatible stores or a GCS emulator.
    pub endpoint: Option<String>,

    /// OAuth2 access token used to authenticate against GCS.
    #[cfg(feature = "gcs")]
    pub access_token: Option<String>,
}

impl Default for ClientConfig {
    /// Returns a default `ClientConfig`.
    ///
    /// If compiled with the `s3` feature, `S3` will be the default
    /// `Provider`, otherwise `Gcs` will be the default.
    fn default() -> Self {
        #[cfg(feature = "s3")]
        let provider = Provider::S3;

        #[cfg(all(feature = "gcs", not(feature = "s3")))]
        let provider = Provider::Gcs;

        Self {
            bucket_name:     None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            provider,
            project:         None,
            quiet:           false,
            size_unit:       SizeUnit::default(),
            #[cfg(feature = "s3")]
            region:          None,
            endpoint:        None,
            #[cfg(feature = "gcs")]
            access_token:    None,
        }
    }
}
