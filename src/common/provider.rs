// Storage providers that bucketdu can size
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use anyhow::Result;
use std::str::FromStr;

/// Valid providers that bucketdu can operate against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Provider {
    /// Google Cloud Storage, through the JSON API.
    #[cfg(feature = "gcs")]
    Gcs,

    /// AWS S3 or an S3 compatible store.
    #[cfg(feature = "s3")]
    S3,
}

// This is used to work out which provider we're using after parsing the CLI.
// We shouldn't ever hit the error condition here.
impl FromStr for Provider {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            #[cfg(feature = "gcs")]
            "gcs" => Ok(Self::Gcs),
            #[cfg(feature = "s3")]
            "s3"  => Ok(Self::S3),
            _     => Err("no match"),
        }
    }
}
