//! Vector codec and cosine similarity.
//!
//! Vectors are stored as little-endian f32 bytes so that similarities computed
//! from stored rows are exact, not approximations of a quantized copy.

use ndarray::Array1;

use supermatch_core::{Error, Result};

/// Encode a vector as little-endian f32 bytes.
pub fn encode_vector(embedding: &Array1<f32>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for v in embedding.iter() {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a stored blob, checking it holds exactly `dim` floats.
pub fn decode_vector(bytes: &[u8], dim: usize) -> Result<Array1<f32>> {
    if bytes.len() != dim * 4 {
        return Err(Error::Storage(format!(
            "stored vector has {} bytes, expected {} for dim={}",
            bytes.len(),
            dim * 4,
            dim
        )));
    }
    Ok(Array1::from_iter(bytes.chunks_exact(4).map(|c| {
        f32::from_le_bytes([c[0], c[1], c[2], c[3]])
    })))
}

/// Unit-length copy of `v`, or None for a (near) zero vector.
pub fn normalize(v: &Array1<f32>) -> Option<Array1<f32>> {
    let norm = v.dot(v).sqrt();
    if norm < 1e-9 {
        return None;
    }
    Some(v / norm)
}

/// Cosine similarity (1 - cosine distance). None if either vector is zero.
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let a = normalize(a)?;
    let b = normalize(b)?;
    Some(a.dot(&b) as f64)
}
