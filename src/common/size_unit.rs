// SizeUnit
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use anyhow::Result;
use humansize::{
    FormatSizeOptions,
    BINARY,
    DECIMAL,
};
use std::str::FromStr;

// We remove the space from the humansize output so that our own output is
// sortable by `sort -h`.
/// The same as `humansize::BINARY` with `space_after_value` set to `false`.
fn size_unit_binary() -> FormatSizeOptions {
    FormatSizeOptions::from(BINARY).space_after_value(false)
}

/// The same as `humansize::DECIMAL` with `space_after_value` set to `false`.
fn size_unit_decimal() -> FormatSizeOptions {
    FormatSizeOptions::from(DECIMAL).space_after_value(false)
}

/// `SizeUnit` represents how we want sizes to be displayed.
#[derive(Debug)]
pub enum SizeUnit {
    /// Represent sizes as human readable using IEC units (multiples of
    /// 1024).
    Binary(FormatSizeOptions),

    /// Represent sizes as the number of bytes.
    Bytes,

    /// Represent sizes as human readable using SI units (multiples of 1000).
    Decimal(FormatSizeOptions),

    /// Represent sizes scaled by 1024 with three decimal places, e.g.
    /// `1.500 KB`.
    Scaled,
}

impl Default for SizeUnit {
    fn default() -> Self {
        Self::Scaled
    }
}

/// This converts from the string arguments we receive on the command line to
/// our enum type.
impl FromStr for SizeUnit {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary"  => Ok(Self::Binary(size_unit_binary())),
            "bytes"   => Ok(Self::Bytes),
            "decimal" => Ok(Self::Decimal(size_unit_decimal())),
            "scaled"  => Ok(Self::Scaled),
            _         => Err("no match"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humansize::format_size;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_size_unit_from_str() {
        let tests = vec![
            ("binary",  1024u64,   "1KiB"),
            ("decimal", 1_000_000, "1MB"),
        ];

        for test in tests {
            let unit     = test.0;
            let size     = test.1;
            let expected = test.2;

            let opts = match SizeUnit::from_str(unit).unwrap() {
                SizeUnit::Binary(opts)  => opts,
                SizeUnit::Decimal(opts) => opts,
                other                   => panic!("unexpected {:?}", other),
            };

            assert!(!opts.space_after_value);
            assert_eq!(format_size(size, opts), expected);
        }

        assert!(matches!(SizeUnit::from_str("bytes"), Ok(SizeUnit::Bytes)));
        assert!(matches!(SizeUnit::from_str("scaled"), Ok(SizeUnit::Scaled)));
        assert!(SizeUnit::from_str("furlongs").is_err());
    }
}
