// HumanSize trait and implementations
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use crate::common::SizeUnit;
use humansize::format_size;
use tracing::debug;

// Units used by `scaled_size`, each a factor of 1024 larger than the last.
const SCALED_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Scale `bytes` down by 1024 until it's below 1024 or we run out of units,
/// formatted with three decimal places, e.g. `45.000 B` or `1.500 KB`.
pub fn scaled_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size / 1024.0 >= 1.0 && unit < SCALED_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.3} {}", size, SCALED_UNITS[unit])
}

/// `HumanSize` trait.
pub trait HumanSize {
    /// Return `self` formatted as requested by `unit`.
    fn humansize(&self, unit: &SizeUnit) -> String;
}

/// `HumanSize` trait implementation for `u64`.
impl HumanSize for u64 {
    /// Return `self` as a human friendly size if requested by `unit`.
    fn humansize(&self, unit: &SizeUnit) -> String {
        debug!("humansize: size {}, unit {:?}", self, unit);

        match unit {
            SizeUnit::Binary(opts)  => format_size(*self, opts),
            SizeUnit::Bytes         => self.to_string(),
            SizeUnit::Decimal(opts) => format_size(*self, opts),
            SizeUnit::Scaled        => scaled_size(*self),
        }
    }
}
