//! 8x8 average perceptual hash and distance over stored hash encodings.
//!
//! Stored hashes come in three shapes (old records predate the canonical
//! hex form): 16 hex chars, 64-char binary strings, or free-form text.
//! Distance is total over all of them so a corrupt row can never abort a
//! duplicate scan.

use cashup_types::{Result, RewardError};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HASH_BITS: usize = 64;
pub const HASH_HEX_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Compute the 8x8 average hash of an encoded image.
    ///
    /// Grayscale, resize to 8x8, threshold each pixel against the mean,
    /// pack row-major with the top-left pixel in the most significant bit.
    pub fn compute(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| RewardError::InvalidImage(e.to_string()))?;
        let small = img.resize_exact(8, 8, FilterType::Lanczos3).to_luma8();

        let pixels: Vec<u64> = small.pixels().map(|p| p.0[0] as u64).collect();
        let mean = pixels.iter().sum::<u64>() / pixels.len() as u64;

        let mut bits = 0u64;
        for (i, &px) in pixels.iter().enumerate() {
            if px > mean {
                bits |= 1 << (HASH_BITS - 1 - i);
            }
        }
        Ok(Self(bits))
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn hamming(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A stored hash string classified by encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedHash {
    Structured(PerceptualHash),
    Raw(String),
    Unparseable,
}

/// Classify a stored hash string. 16 hex chars and 64-char binary strings
/// parse to the structured form; any other non-empty string stays raw;
/// empty input is unparseable.
pub fn parse_hash(stored: &str) -> ParsedHash {
    if stored.is_empty() {
        return ParsedHash::Unparseable;
    }
    if stored.len() == HASH_HEX_LEN && stored.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(bits) = u64::from_str_radix(stored, 16) {
            return ParsedHash::Structured(PerceptualHash(bits));
        }
    }
    if stored.len() == HASH_BITS && stored.chars().all(|c| c == '0' || c == '1') {
        if let Ok(bits) = u64::from_str_radix(stored, 2) {
            return ParsedHash::Structured(PerceptualHash(bits));
        }
    }
    ParsedHash::Raw(stored.to_string())
}

fn char_distance(a: &str, b: &str) -> u32 {
    if a.len() != b.len() {
        return a.len().max(b.len()) as u32;
    }
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() as u32
}

/// Distance between a freshly computed hash and a stored hash string.
/// Total over every stored encoding; never panics.
pub fn distance(candidate: &PerceptualHash, stored: &str) -> u32 {
    match parse_hash(stored) {
        ParsedHash::Structured(hash) => candidate.hamming(&hash),
        ParsedHash::Raw(s) => char_distance(&candidate.to_hex(), &s),
        ParsedHash::Unparseable => char_distance(&candidate.to_hex(), ""),
    }
}
