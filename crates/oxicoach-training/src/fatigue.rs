use serde::{Deserialize, Serialize};

/// Self-reported (or inferred) fatigue, 0 = fresh, 10 = exhausted.
///
/// Out-of-range values are clamped to 10 on construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(from = "u8", into = "u8")]
#[display("{_0}/10")]
pub struct Fatigue(u8);

impl Fatigue {
    pub const MAX: u8 = 10;
    /// Assumed when nothing better is known.
    pub const NEUTRAL: Self = Self(5);

    #[must_use]
    pub fn new(level: u8) -> Self {
        Self(level.min(Self::MAX))
    }

    #[must_use]
    pub fn level(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn tier(self) -> FatigueTier {
        match self.0 {
            8.. => FatigueTier::Exhausted,
            4..=7 => FatigueTier::Steady,
            _ => FatigueTier::Fresh,
        }
    }

    /// Estimates fatigue from the attempt and solve totals of recent items.
    ///
    /// | solve rate | min attempts | fatigue |
    /// |------------|--------------|---------|
    /// | < 0.10     | 8            | 8       |
    /// | < 0.20     | 6            | 7       |
    /// | < 0.35     | 5            | 6       |
    /// | otherwise  |              | 5       |
    #[must_use]
    pub fn infer(attempts: u32, solved: u32) -> Self {
        if attempts == 0 {
            return Self::NEUTRAL;
        }
        let rate = f64::from(solved) / f64::from(attempts);
        let level = if rate < 0.10 && attempts >= 8 {
            8
        } else if rate < 0.20 && attempts >= 6 {
            7
        } else if rate < 0.35 && attempts >= 5 {
            6
        } else {
            5
        };
        Self(level)
    }
}

impl From<u8> for Fatigue {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<Fatigue> for u8 {
    fn from(fatigue: Fatigue) -> Self {
        fatigue.0
    }
}

/// Intensity band a fatigue level falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueTier {
    /// 0 to 3
    Fresh,
    /// 4 to 7
    Steady,
    /// 8 to 10
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(Fatigue::new(0).tier(), FatigueTier::Fresh);
        assert_eq!(Fatigue::new(3).tier(), FatigueTier::Fresh);
        assert_eq!(Fatigue::new(4).tier(), FatigueTier::Steady);
        assert_eq!(Fatigue::new(7).tier(), FatigueTier::Steady);
        assert_eq!(Fatigue::new(8).tier(), FatigueTier::Exhausted);
        assert_eq!(Fatigue::new(200).level(), 10);
    }

    #[test]
    fn test_infer_from_performance() {
        assert_eq!(Fatigue::infer(0, 0), Fatigue::NEUTRAL);
        assert_eq!(Fatigue::infer(10, 0).level(), 8);
        assert_eq!(Fatigue::infer(7, 0).level(), 7);
        assert_eq!(Fatigue::infer(5, 1).level(), 6);
        assert_eq!(Fatigue::infer(4, 0).level(), 5);
        assert_eq!(Fatigue::infer(10, 5).level(), 5);
    }

    #[test]
    fn test_serde_clamps() {
        let fatigue: Fatigue = serde_json::from_str("42").unwrap();
        assert_eq!(fatigue.level(), 10);
        assert_eq!(serde_json::to_string(&Fatigue::new(3)).unwrap(), "3");
    }
}
