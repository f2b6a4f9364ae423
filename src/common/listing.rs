// Units of traversal work and their results
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use std::fmt;

/// A position in a bucket's delimiter hierarchy.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Prefix {
    /// The top level of the bucket.
    Root,

    /// A common prefix returned by the provider, including its trailing
    /// delimiter, e.g. `photos/2020/`.
    Path(String),
}

impl Prefix {
    /// Returns the prefix string to send to the provider, `None` for `Root`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Root       => None,
            Self::Path(path) => Some(path),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root       => write!(f, "<root>"),
            Self::Path(path) => write!(f, "{}", path),
        }
    }
}

impl From<&str> for Prefix {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

/// One unit of dispatched work.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListingRequest {
    /// Bucket to list.
    pub bucket_name: String,

    /// Level within the bucket to list.
    pub prefix: Prefix,
}

/// The contents of exactly one level of a bucket, as returned by a provider.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Listing {
    /// Sizes of objects directly under the listed prefix.
    pub object_sizes: Vec<u64>,

    /// Common prefixes directly under the listed prefix.
    pub sub_prefixes: Vec<Prefix>,
}

/// The outcome of one dispatched `ListingRequest`.
///
/// A `failed` result carries no sizes and no sub-prefixes, the branch it
/// would have described is simply not counted.
#[derive(Debug, Eq, PartialEq)]
pub struct ListingResult {
    /// Bucket that was listed.
    pub bucket_name: String,

    /// Level that was listed.
    pub prefix: Prefix,

    /// Sizes of objects directly under `prefix`.
    pub object_sizes: Vec<u64>,

    /// Common prefixes directly under `prefix`.
    pub sub_prefixes: Vec<Prefix>,

    /// Whether the provider call failed.
    pub failed: bool,
}

impl ListingResult {
    /// Successful result for `request`.
    pub fn succeeded(request: ListingRequest, listing: Listing) -> Self {
        Self {
            bucket_name:  request.bucket_name,
            prefix:       request.prefix,
            object_sizes: listing.object_sizes,
            sub_prefixes: listing.sub_prefixes,
            failed:       false,
        }
    }

    /// Empty, failed result for `request`.
    pub fn failed(request: ListingRequest) -> Self {
        Self {
            bucket_name:  request.bucket_name,
            prefix:       request.prefix,
            object_sizes: Vec::new(),
            sub_prefixes: Vec::new(),
            failed:       true,
        }
    }
}
