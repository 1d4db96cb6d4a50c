//! Tactical motif tagging for engine-suggested lines.
//!
//! A training position is labeled with the tactical themes its solution exploits, so
//! that a player's success rate can be tracked per theme ("I keep missing pins").
//!
//! # Pipeline
//!
//! ```text
//! position + principal line
//!        │
//!        ▼
//! MoveAnalysis (first move only; skipped if illegal)
//!        │
//!        ▼
//! MotifDetector × N  ──►  MotifSet  ──►  (empty? → hanging_piece)
//! ```
//!
//! Each [`MotifDetector`] inspects one [`MoveAnalysis`] (the board before and after the
//! first move of the line) and answers whether its motif is present. Detectors may look
//! at motifs already found, which is how `back_rank` depends on `check` / `mate`.
//!
//! # Design Rationale and Limitations
//!
//! Detection is deliberately shallow: only the first move is considered and every rule
//! is a static board predicate. This keeps tagging cheap and deterministic but misses
//! motifs that only appear deeper in the line. `deflection` and `attraction` are part of
//! the taxonomy but have no detector, since both need the opponent's reply to be
//! recognized.
//!
//! A position where no rule fires still gets a tag: [`MotifTag::HangingPiece`] is the
//! default, so every item stays visible in per-tag statistics.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use self::{analysis::*, detector::*, tagger::*};

mod analysis;
mod detector;
mod tagger;

/// Tactical theme, declared in priority order (strongest evidence first).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MotifTag {
    Mate,
    BackRank,
    Check,
    Fork,
    Pin,
    Skewer,
    DiscoveredAttack,
    Deflection,
    Attraction,
    HangingPiece,
}

impl MotifTag {
    pub const LEN: usize = 10;

    pub const ALL: [Self; Self::LEN] = [
        Self::Mate,
        Self::BackRank,
        Self::Check,
        Self::Fork,
        Self::Pin,
        Self::Skewer,
        Self::DiscoveredAttack,
        Self::Deflection,
        Self::Attraction,
        Self::HangingPiece,
    ];

    /// Tag assigned when no detector fires.
    pub const DEFAULT: Self = Self::HangingPiece;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier used in storage and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mate => "mate",
            Self::BackRank => "back_rank",
            Self::Check => "check",
            Self::Fork => "fork",
            Self::Pin => "pin",
            Self::Skewer => "skewer",
            Self::DiscoveredAttack => "discovered_attack",
            Self::Deflection => "deflection",
            Self::Attraction => "attraction",
            Self::HangingPiece => "hanging_piece",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mate => "Mate",
            Self::BackRank => "Back Rank",
            Self::Check => "Check",
            Self::Fork => "Fork",
            Self::Pin => "Pin",
            Self::Skewer => "Skewer",
            Self::DiscoveredAttack => "Discovered Attack",
            Self::Deflection => "Deflection",
            Self::Attraction => "Attraction",
            Self::HangingPiece => "Hanging Piece",
        }
    }
}

impl fmt::Display for MotifTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown motif tag: {_0:?}")]
pub struct ParseMotifTagError(#[error(not(source))] pub String);

impl FromStr for MotifTag {
    type Err = ParseMotifTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ParseMotifTagError(s.to_owned()))
    }
}

/// Set of motif tags, iterated in priority order.
///
/// Serialized as a list of tag identifiers; displayed and parsed as a comma-separated
/// string (the storage form).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MotifSet(u16);

impl MotifSet {
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn contains(self, tag: MotifTag) -> bool {
        self.0 & (1 << tag.index()) != 0
    }

    #[must_use]
    pub const fn with(self, tag: MotifTag) -> Self {
        Self(self.0 | (1 << tag.index()))
    }

    pub fn insert(&mut self, tag: MotifTag) {
        *self = self.with(tag);
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Highest-priority tag in the set.
    #[must_use]
    pub fn primary(self) -> Option<MotifTag> {
        self.iter().next()
    }

    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn iter(self) -> impl Iterator<Item = MotifTag> {
        MotifTag::ALL.into_iter().filter(move |tag| self.contains(*tag))
    }
}

impl fmt::Debug for MotifSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for MotifSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(tag.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for MotifSet {
    type Err = ParseMotifTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<MotifTag>)
            .collect()
    }
}

impl FromIterator<MotifTag> for MotifSet {
    fn from_iter<I: IntoIterator<Item = MotifTag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl From<MotifTag> for MotifSet {
    fn from(tag: MotifTag) -> Self {
        Self::EMPTY.with(tag)
    }
}

impl Serialize for MotifSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for MotifSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<MotifTag>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_identifiers_roundtrip() {
        for tag in MotifTag::ALL {
            assert_eq!(tag.as_str().parse::<MotifTag>().unwrap(), tag);
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
        assert!("zwischenzug".parse::<MotifTag>().is_err());
    }

    #[test]
    fn test_set_iterates_in_priority_order() {
        let set: MotifSet = [MotifTag::HangingPiece, MotifTag::Check, MotifTag::Mate]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "mate,check,hanging_piece");
        assert_eq!(set.primary(), Some(MotifTag::Mate));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_set_storage_form() {
        let set: MotifSet = "pin, fork".parse().unwrap();
        assert!(set.contains(MotifTag::Pin) && set.contains(MotifTag::Fork));
        assert_eq!(set.to_string(), "fork,pin");
        assert_eq!("".parse::<MotifSet>().unwrap(), MotifSet::EMPTY);
        assert!("pin,bogus".parse::<MotifSet>().is_err());
    }

    #[test]
    fn test_set_serializes_as_list() {
        let set = MotifSet::from(MotifTag::BackRank).with(MotifTag::Check);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["back_rank","check"]"#);
        let back: MotifSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
