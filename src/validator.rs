//! Indonesian plate grammar: region code, 1-4 digits, up to three letters.
//!
//! Parsing is a strict left to right pass. Each stage takes the longest
//! prefix it accepts and hands the remainder to the next one, so the first
//! stage that cannot match decides the rejection reason.

use lazy_static::lazy_static;
use serde::Serialize;

use std::collections::HashSet;
use std::fmt;

use crate::config::NoiseConfig;

const REGION_CODES: [&str; 55] = ["B", "A", "AA", "AD", "K", "R", "G", "H", "AG", "AE", "L", "M", "N", "S", "W", "P", "AB",
             "KU", "KT", "KH", "KB", "DA", "BA", "BD", "BB", "BE", "BG", "BH", "BK", "BL", "BM", "BN",
             "BP", "D", "F", "E", "Z", "T", "DC", "DD", "DN", "DT", "DL", "DM", "DB", "DK", "ED", "EA",
             "EB", "DH", "DR", "DE", "DG", "PA", "PB"
             ];

const MAX_REGION_LEN: usize = 2;
const MAX_NUMERIC_LEN: usize = 4;
const MAX_SUFFIX_LEN: usize = 3;

lazy_static! {
    static ref DEFAULT_REGIONS: RegionCodes = RegionCodes::new(REGION_CODES.iter().copied());
}

/// Closed set of region codes, fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCodes(HashSet<String>);

impl RegionCodes {

    pub fn new<I, S>(codes: I) -> Self
    where I: IntoIterator<Item = S>,
          S: Into<String>
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    /// The built-in Indonesian table.
    pub fn indonesian() -> &'static RegionCodes {
        &DEFAULT_REGIONS
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedPlate {
    pub region: String,
    pub numeric: String,
    pub suffix: String,
}

impl fmt::Display for ValidatedPlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.region, self.numeric, self.suffix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    InvalidRegion,
    InvalidNumeric,
    InvalidSuffix,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::InvalidRegion => "invalid region",
            RejectReason::InvalidNumeric => "invalid numeric part",
            RejectReason::InvalidSuffix => "invalid letter part",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub original: String,
}

/// Byte length of the longest prefix of `s`, at most `max_chars` characters,
/// that `accept` takes. Shorter prefixes are only tried after longer ones fail.
pub fn longest_prefix<F>(s: &str, max_chars: usize, accept: F) -> Option<usize>
where F: Fn(&str) -> bool
{
    let ends: Vec<usize> = s.char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take(max_chars)
        .collect();
    ends.into_iter().rev().find(|end| accept(&s[..*end]))
}

/// Maps digits the recognizer confuses with letters back to those letters.
pub fn digits_to_letters(s: &str) -> String {
    s.chars().map(|c| match c {
        '0' => 'O',
        '1' => 'I',
        '2' => 'Z',
        '3' => 'B',
        '4' => 'A',
        '5' => 'S',
        '6' => 'G',
        '7' => 'Z',
        '8' => 'B',
        '9' => 'G',
        other => other,
    }).collect()
}

#[derive(Debug, Clone)]
pub struct PlateValidator {
    regions: RegionCodes,
    trailing_noise: Vec<char>,
}

impl Default for PlateValidator {
    fn default() -> Self {
        Self::new(RegionCodes::indonesian().clone(), &NoiseConfig::default())
    }
}

impl PlateValidator {

    pub fn new(regions: RegionCodes, noise: &NoiseConfig) -> Self {
        Self { regions, trailing_noise: noise.trailing_suffix.clone() }
    }

    pub fn regions(&self) -> &RegionCodes {
        &self.regions
    }

    pub fn validate(&self, plate: &str) -> Result<ValidatedPlate, Rejection> {
        let reject = |reason| Rejection { reason, original: plate.to_string() };

        let (region, rest) = self.match_region(plate).ok_or_else(|| reject(RejectReason::InvalidRegion))?;
        let (numeric, rest) = match_numeric(rest).ok_or_else(|| reject(RejectReason::InvalidNumeric))?;
        let suffix = self.match_suffix(rest).ok_or_else(|| reject(RejectReason::InvalidSuffix))?;

        Ok(ValidatedPlate {
            region: region.to_string(),
            numeric: numeric.to_string(),
            suffix,
        })
    }

    /// Splits off the region code, two letter codes first.
    pub fn match_region<'a>(&self, plate: &'a str) -> Option<(&'a str, &'a str)> {
        longest_prefix(plate, MAX_REGION_LEN, |prefix| self.regions.contains(prefix))
            .map(|end| plate.split_at(end))
    }

    /// Corrected letter part, or `None` when it is not 1-3 letters.
    pub fn match_suffix(&self, rest: &str) -> Option<String> {
        let mut suffix = digits_to_letters(rest.trim());
        if let Some(last) = suffix.chars().last() {
            if self.trailing_noise.contains(&last) {
                suffix.pop();
            }
        }
        let len = suffix.chars().count();
        if len > 0 && len <= MAX_SUFFIX_LEN && suffix.chars().all(char::is_alphabetic) {
            Some(suffix)
        } else {
            None
        }
    }
}

/// Splits off up to four leading digits, as many as there are.
/// Only ASCII `0-9` count: a fullwidth or other non-ASCII digit ends the
/// numeric part, so `B１２３` is rejected here rather than at the suffix.
pub fn match_numeric(rest: &str) -> Option<(&str, &str)> {
    longest_prefix(rest, MAX_NUMERIC_LEN, |prefix| prefix.chars().all(|c| c.is_ascii_digit()))
        .map(|end| rest.split_at(end))
}
