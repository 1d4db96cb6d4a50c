use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::core::{Role, Square};

/// A move in coordinate form: origin, destination and optional promotion.
///
/// Castling is encoded as the king moving two files (`e1g1`), matching UCI. Whether a
/// move is a capture, an en passant capture or castling depends on the position it is
/// played in; see [`Position::is_capture`](crate::Position::is_capture).
///
/// # Example
///
/// ```
/// use oxicoach_board::Move;
///
/// let mv: Move = "e7e8q".parse().unwrap();
/// assert_eq!(mv.to_string(), "e7e8q");
/// assert!(mv.promotion().is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    promotion: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid UCI move: {_0:?}")]
pub struct ParseMoveError(#[error(not(source))] pub String);

impl Move {
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    #[must_use]
    pub const fn with_promotion(from: Square, to: Square, promotion: Role) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    #[must_use]
    pub const fn from(self) -> Square {
        self.from
    }

    #[must_use]
    pub const fn to(self) -> Square {
        self.to
    }

    #[must_use]
    pub const fn promotion(self) -> Option<Role> {
        self.promotion
    }

    /// Parses UCI long algebraic notation (`e2e4`, `a7a8q`).
    pub fn from_uci(uci: &str) -> Result<Self, ParseMoveError> {
        let err = || ParseMoveError(uci.to_owned());
        if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
            return Err(err());
        }
        let from = uci[0..2].parse().map_err(|_| err())?;
        let to = uci[2..4].parse().map_err(|_| err())?;
        let promotion = match uci[4..].chars().next() {
            None => None,
            Some(c) => match Role::from_char(c) {
                Some(role @ (Role::Knight | Role::Bishop | Role::Rook | Role::Queen))
                    if c.is_ascii_lowercase() =>
                {
                    Some(role)
                }
                _ => return Err(err()),
            },
        };
        if from == to {
            return Err(err());
        }
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl Serialize for Move {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Move {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_uci(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uci_roundtrip() {
        for uci in ["e2e4", "g1f3", "e1g1", "a7a8q", "h2h1n"] {
            let mv = Move::from_uci(uci).unwrap();
            assert_eq!(mv.to_string(), uci);
        }
    }

    #[test]
    fn test_uci_rejects_malformed() {
        for uci in ["", "e2", "e2e", "e2e4k", "e2e4Q", "e2e2", "i2i4", "e2e4qq"] {
            assert!(Move::from_uci(uci).is_err(), "{uci} should be rejected");
        }
    }

    #[test]
    fn test_serde_as_uci_string() {
        let mv = Move::from_uci("b7b8r").unwrap();
        let json = serde_json::to_string(&mv).unwrap();
        assert_eq!(json, "\"b7b8r\"");
        assert_eq!(serde_json::from_str::<Move>(&json).unwrap(), mv);
    }
}
