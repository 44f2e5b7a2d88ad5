use sha2::{Digest, Sha256};

use crate::constants::matching::{SYNTHETIC_ID_HEX_LEN, SYNTHETIC_ID_PREFIX};
use crate::types::PaperId;

/// Derive the synthetic id for a record lacking a native one.
///
/// Pure function of the normalized title: `site_` followed by the first ten
/// hex characters of the title's SHA-256 digest. Two distinct titles
/// colliding is accepted rather than corrected.
pub fn synthetic_id(normalized_title: &str) -> PaperId {
    let digest = Sha256::digest(normalized_title.as_bytes());
    let mut hex = String::with_capacity(SYNTHETIC_ID_HEX_LEN);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
        if hex.len() >= SYNTHETIC_ID_HEX_LEN {
            break;
        }
    }
    hex.truncate(SYNTHETIC_ID_HEX_LEN);
    format!("{SYNTHETIC_ID_PREFIX}{hex}")
}
