/// Hex-encoded BLAKE3 digest of generated output.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Short digest used in reports: the first 16 hex digits of the BLAKE3 hash.
#[must_use]
pub fn short_digest(data: &[u8]) -> String {
    let mut hex = blake3_bytes(data);
    hex.truncate(16);
    hex
}
