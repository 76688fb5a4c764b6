//! Fixed-width big-endian encoding.
//!
//! Downstream wire encoding assumes every coordinate and scalar of a curve
//! occupies exactly `ceil(bit_size / 8)` bytes. Short values are left-padded
//! with zeros; values that do not fit are an error, never truncated.

use crate::error::WidthError;

/// Strip leading zero bytes from a big-endian integer.
///
/// The empty slice and all-zero slices both strip to the empty slice (the
/// integer zero).
pub fn strip_leading_zeros(value: &[u8]) -> &[u8] {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    &value[start..]
}

/// Encode a big-endian unsigned integer into exactly `width` bytes.
///
/// Leading zeros already present in `value` do not count against the
/// width; only significant bytes do.
///
/// # Errors
///
/// - `WidthError` if the integer needs more than `width` bytes
pub fn encode_fixed_width(value: &[u8], width: usize) -> Result<Vec<u8>, WidthError> {
    let significant = strip_leading_zeros(value);
    if significant.len() > width {
        return Err(WidthError { significant: significant.len(), width });
    }

    let mut out = vec![0u8; width];
    out[width - significant.len()..].copy_from_slice(significant);
    Ok(out)
}
