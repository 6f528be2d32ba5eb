//! Formatting helpers

/// Format bytes as upper-case hex, separated by spaces
///
/// This is the usual way ATRs are printed, e.g. `3B 16 94 20 02 01`.
pub fn to_hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
