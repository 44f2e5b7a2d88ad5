//! Run-length codec for sparse integer arrays.
//!
//! Histograms and transfer matrices travel to external consumers as
//! `;`-joined decimal strings in which long zero runs collapse to a single
//! `0*<count>` token. The encoding is lossless: decompressing a compressed
//! array reproduces it exactly, for every threshold.

use crate::constants::codec::{TOKEN_DELIMITER, ZERO_RUN_PREFIX};
use crate::errors::MergeError;

/// Compress `values`, collapsing runs of more than `zero_run_threshold`
/// consecutive zeros into `0*<count>` tokens. Shorter runs stay literal.
pub fn compress(values: &[u64], zero_run_threshold: usize) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut zero_run = 0usize;

    let mut flush_zeros = |tokens: &mut Vec<String>, run: usize| {
        if run == 0 {
            return;
        }
        if run > zero_run_threshold {
            tokens.push(format!("{ZERO_RUN_PREFIX}{run}"));
        } else {
            tokens.extend(std::iter::repeat_n("0".to_string(), run));
        }
    };

    for &value in values {
        if value == 0 {
            zero_run += 1;
        } else {
            flush_zeros(&mut tokens, zero_run);
            zero_run = 0;
            tokens.push(value.to_string());
        }
    }
    flush_zeros(&mut tokens, zero_run);

    let mut out = String::new();
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            out.push(TOKEN_DELIMITER);
        }
        out.push_str(token);
    }
    out
}

/// Exact inverse of [`compress`]. `len` is the expected element count; a
/// decoded array of any other length is a malformed-input error.
pub fn decompress(text: &str, len: usize) -> Result<Vec<u64>, MergeError> {
    let mut values = Vec::with_capacity(len);
    if !text.is_empty() {
        for token in text.split(TOKEN_DELIMITER) {
            if let Some(count) = token.strip_prefix(ZERO_RUN_PREFIX) {
                let count: usize = count
                    .parse()
                    .map_err(|_| MergeError::Codec(format!("bad zero-run token '{token}'")))?;
                values.resize(values.len() + count, 0);
            } else {
                let value: u64 = token
                    .parse()
                    .map_err(|_| MergeError::Codec(format!("bad token '{token}'")))?;
                values.push(value);
            }
        }
    }
    if values.len() != len {
        return Err(MergeError::Codec(format!(
            "decoded {} elements, expected {len}",
            values.len()
        )));
    }
    Ok(values)
}

/// Compress a matrix row-major with the same token stream as [`compress`],
/// so zero runs collapse across row boundaries.
pub fn compress_matrix(rows: &[Vec<u64>], zero_run_threshold: usize) -> String {
    let flat: Vec<u64> = rows.iter().flatten().copied().collect();
    compress(&flat, zero_run_threshold)
}

/// Inverse of [`compress_matrix`] against a `rows × cols` shape.
pub fn decompress_matrix(
    text: &str,
    rows: usize,
    cols: usize,
) -> Result<Vec<Vec<u64>>, MergeError> {
    let flat = decompress(text, rows * cols)?;
    Ok(flat.chunks(cols).map(<[u64]>::to_vec).collect())
}
