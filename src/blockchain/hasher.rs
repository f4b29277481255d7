use sha2::{Digest, Sha256};

/// Tag prepended to every block preimage.
pub const DOMAIN_TAG: &[u8] = b"pow-ledger/block";

/// Version of the canonical block encoding. Bump it whenever the field
/// order or the framing below changes.
pub const ENCODING_VERSION: u8 = 1;

/// Borrowed view of every block field that feeds the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preimage<'a> {
    pub index: u64,
    pub timestamp: &'a str,
    pub payload: &'a str,
    pub prev_hash: &'a str,
    pub difficulty: u32,
    pub nonce: &'a str,
}

impl Preimage<'_> {
    /// Canonical byte encoding:
    /// tag | version | index (u64 BE) | timestamp | payload | prev_hash | difficulty (u32 BE) | nonce,
    /// with every string framed as `len (u64 BE) | utf8 bytes`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let strings = self.timestamp.len() + self.payload.len() + self.prev_hash.len() + self.nonce.len();
        let mut buf = Vec::with_capacity(DOMAIN_TAG.len() + 1 + 8 + 4 + 4 * 8 + strings);

        buf.extend_from_slice(DOMAIN_TAG);
        buf.push(ENCODING_VERSION);
        buf.extend_from_slice(&self.index.to_be_bytes());
        put_str(&mut buf, self.timestamp);
        put_str(&mut buf, self.payload);
        put_str(&mut buf, self.prev_hash);
        buf.extend_from_slice(&self.difficulty.to_be_bytes());
        put_str(&mut buf, self.nonce);
        buf
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// SHA-256 of the canonical encoding, lowercase hex.
pub fn digest(preimage: &Preimage<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(preimage.canonical_bytes());
    hex::encode(hasher.finalize())
}
