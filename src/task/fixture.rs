// In-memory StorageBackend used by the task tests
use async_trait::async_trait;
use crate::common::{
    BackendError,
    BucketNames,
    Listing,
    ListingRequest,
    ListingResult,
    Prefix,
    StorageBackend,
};
use std::collections::{
    BTreeMap,
    BTreeSet,
    HashSet,
};
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

/// A flat key namespace per bucket, listed with `/` as the delimiter.
#[derive(Debug, Default)]
pub struct FixtureBackend {
    // bucket -> key -> size
    objects: BTreeMap<String, BTreeMap<String, u64>>,

    // Prefixes whose listing fails, "" being the root.
    failing: HashSet<String>,

    // Listings of this prefix come back labelled with another bucket.
    misrouted: Option<(String, String)>,

    // Listings of this prefix panic.
    panicking: Option<String>,

    // Fail bucket enumeration with an authorization error.
    deny_buckets: bool,

    active: AtomicUsize,
    peak:   AtomicUsize,
    calls:  AtomicUsize,
}

impl FixtureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.objects.entry(bucket.into()).or_default();
        self
    }

    pub fn with_object(mut self, bucket: &str, key: &str, size: u64) -> Self {
        self.objects
            .entry(bucket.into())
            .or_default()
            .insert(key.into(), size);

        self
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.insert(prefix.into());
        self
    }

    pub fn misrouted(mut self, prefix: &str, bucket: &str) -> Self {
        self.misrouted = Some((prefix.into(), bucket.into()));
        self
    }

    pub fn panicking(mut self, prefix: &str) -> Self {
        self.panicking = Some(prefix.into());
        self
    }

    pub fn deny_buckets(mut self) -> Self {
        self.deny_buckets = true;
        self
    }

    /// Most listings that were ever running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of listings performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    // Delimiter listing over the flat key set.
    fn list(&self, bucket: &str, prefix: &str) -> Option<Listing> {
        let keys = self.objects.get(bucket)?;

        let mut object_sizes = Vec::new();
        let mut sub_prefixes = BTreeSet::new();

        for (key, size) in keys.range(prefix.to_string()..) {
            let rest = match key.strip_prefix(prefix) {
                Some(rest) => rest,
                None       => break,
            };

            match rest.find('/') {
                Some(idx) => {
                    sub_prefixes.insert(format!("{}{}", prefix, &rest[..=idx]));
                },
                None => object_sizes.push(*size),
            }
        }

        Some(Listing {
            object_sizes,
            sub_prefixes: sub_prefixes.into_iter().map(Prefix::Path).collect(),
        })
    }
}

#[async_trait]
impl StorageBackend for FixtureBackend {
    async fn buckets(&self) -> Result<BucketNames, BackendError> {
        if self.deny_buckets {
            return Err(BackendError::Authorization("denied".into()));
        }

        Ok(self.objects.keys().cloned().collect())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        Ok(self.objects.contains_key(bucket))
    }

    async fn list_prefix(
        &self,
        bucket: &str,
        prefix: &Prefix,
    ) -> Result<Listing, BackendError> {
        let prefix = prefix.as_str().unwrap_or_default();

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        // Give other listings a chance to overlap with this one.
        tokio::task::yield_now().await;

        if self.panicking.as_deref() == Some(prefix) {
            panic!("listing of '{}' exploded", prefix);
        }

        let ret = if self.failing.contains(prefix) {
            Err(BackendError::Transport(format!("{} is unreachable", prefix)))
        }
        else {
            self.list(bucket, prefix)
                .ok_or_else(|| BackendError::Transport("no such bucket".into()))
        };

        self.active.fetch_sub(1, Ordering::SeqCst);

        ret
    }

    async fn list_one_level(&self, request: ListingRequest) -> ListingResult {
        let misrouted = match &self.misrouted {
            Some((prefix, bucket)) => {
                let prefix = Prefix::from(prefix.as_str());

                (request.prefix == prefix).then(|| bucket.clone())
            },
            None => None,
        };

        let listing = self.list_prefix(&request.bucket_name, &request.prefix)
            .await;

        let mut result = match listing {
            Ok(listing) => ListingResult::succeeded(request, listing),
            Err(_)      => ListingResult::failed(request),
        };

        if let Some(bucket) = misrouted {
            result.bucket_name = bucket;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_delimiter_listing() {
        let backend = FixtureBackend::new()
            .with_object("b1", "a", 1)
            .with_object("b1", "p/b", 2)
            .with_object("b1", "p/q/c", 3)
            .with_object("b1", "pz", 4);

        let ret = backend.list_prefix("b1", &Prefix::Root).await.unwrap();

        let expected = Listing {
            object_sizes: vec![1, 4],
            sub_prefixes: vec!["p/".into()],
        };

        assert_eq!(ret, expected);

        let ret = backend.list_prefix("b1", &"p/".into()).await.unwrap();

        let expected = Listing {
            object_sizes: vec![2],
            sub_prefixes: vec!["p/q/".into()],
        };

        assert_eq!(ret, expected);
    }
}
