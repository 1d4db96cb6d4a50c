use std::{fmt, str::FromStr};

use crate::core::{Color, Piece, Role, Square};

use super::{CastlingRights, CastlingSide, Position};

/// FEN of the standard initial position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FenError {
    #[display("FEN must have 4 to 6 fields, found {count}")]
    FieldCount { count: usize },
    #[display("invalid piece placement: {placement:?}")]
    Placement {
        #[error(not(source))]
        placement: String,
    },
    #[display("invalid side to move: {field:?}")]
    Turn {
        #[error(not(source))]
        field: String,
    },
    #[display("invalid castling rights: {field:?}")]
    Castling {
        #[error(not(source))]
        field: String,
    },
    #[display("invalid en passant square: {field:?}")]
    EnPassant {
        #[error(not(source))]
        field: String,
    },
    #[display("invalid move counter: {field:?}")]
    Counter {
        #[error(not(source))]
        field: String,
    },
    #[display("each side must have exactly one king")]
    KingCount,
    #[display("{color} has more material than promotions allow")]
    Material {
        #[error(not(source))]
        color: Color,
    },
}

impl Position {
    /// Parses a position from Forsyth-Edwards Notation.
    ///
    /// The two move counters may be omitted and default to `0 1`. Castling rights are
    /// accepted in any order and re-emitted canonically (`KQkq`) by [`Self::to_fen`].
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(FenError::FieldCount {
                count: fields.len(),
            });
        }

        let mut pos = Self::EMPTY;
        parse_placement(&mut pos, fields[0])?;

        pos.turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::Turn {
                    field: other.to_owned(),
                });
            }
        };

        pos.castling = parse_castling(fields[2])?;

        pos.ep_square = match fields[3] {
            "-" => None,
            field => {
                let square: Square = field.parse().map_err(|_| FenError::EnPassant {
                    field: field.to_owned(),
                })?;
                if square.relative_rank(pos.turn) != 5 {
                    return Err(FenError::EnPassant {
                        field: field.to_owned(),
                    });
                }
                Some(square)
            }
        };

        let counter = |field: &str| {
            field.parse::<u32>().map_err(|_| FenError::Counter {
                field: field.to_owned(),
            })
        };
        pos.halfmove_clock = fields.get(4).copied().map_or(Ok(0), counter)?;
        pos.fullmove_number = fields.get(5).copied().map_or(Ok(1), counter)?.max(1);

        for color in Color::ALL {
            if pos.pieces(color, Role::King).count() != 1 {
                return Err(FenError::KingCount);
            }
            if !material_is_possible(&pos, color) {
                return Err(FenError::Material { color });
            }
        }

        Ok(pos)
    }

    /// Emits the position as a six-field FEN string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        fen.push(piece.as_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(self.turn.as_char());
        fen.push(' ');
        fen.push_str(&castling_field(self.castling));
        fen.push(' ');
        match self.ep_square {
            Some(square) => fen.push_str(&square.to_string()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(
            " {} {}",
            self.halfmove_clock, self.fullmove_number
        ));
        fen
    }
}

fn parse_placement(pos: &mut Position, placement: &str) -> Result<(), FenError> {
    let err = || FenError::Placement {
        placement: placement.to_owned(),
    };
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != 8 {
        return Err(err());
    }
    for (row, rank) in rows.iter().zip((0..8u8).rev()) {
        let mut file = 0u8;
        for c in row.chars() {
            if let Some(skip) = c.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(err());
                }
                #[expect(clippy::cast_possible_truncation)]
                let skip = skip as u8;
                file += skip;
            } else {
                let piece = Piece::from_char(c).ok_or_else(err)?;
                if file >= 8 {
                    return Err(err());
                }
                pos.put(Square::new(file, rank), piece);
                file += 1;
            }
            if file > 8 {
                return Err(err());
            }
        }
        if file != 8 {
            return Err(err());
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> Result<CastlingRights, FenError> {
    if field == "-" {
        return Ok(CastlingRights::NONE);
    }
    let mut rights = CastlingRights::NONE;
    for c in field.chars() {
        let (color, side) = match c {
            'K' => (Color::White, CastlingSide::KingSide),
            'Q' => (Color::White, CastlingSide::QueenSide),
            'k' => (Color::Black, CastlingSide::KingSide),
            'q' => (Color::Black, CastlingSide::QueenSide),
            _ => {
                return Err(FenError::Castling {
                    field: field.to_owned(),
                });
            }
        };
        rights = rights.with(color, side);
    }
    Ok(rights)
}

fn castling_field(rights: CastlingRights) -> String {
    if rights.is_empty() {
        return "-".to_owned();
    }
    [
        (Color::White, CastlingSide::KingSide, 'K'),
        (Color::White, CastlingSide::QueenSide, 'Q'),
        (Color::Black, CastlingSide::KingSide, 'k'),
        (Color::Black, CastlingSide::QueenSide, 'q'),
    ]
    .into_iter()
    .filter(|&(color, side, _)| rights.has(color, side))
    .map(|(_, _, c)| c)
    .collect()
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

/// At most 16 men and 8 pawns, and every piece beyond the initial set must be a
/// promoted pawn.
fn material_is_possible(pos: &Position, color: Color) -> bool {
    let count = |role| pos.pieces(color, role).count();
    let pawns = count(Role::Pawn);
    let promoted = count(Role::Queen).saturating_sub(1)
        + count(Role::Rook).saturating_sub(2)
        + count(Role::Bishop).saturating_sub(2)
        + count(Role::Knight).saturating_sub(2);
    pos.by_color(color).count() <= 16 && pawns <= 8 && promoted <= 8 - pawns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_fen_matches_starting_position() {
        let parsed = Position::from_fen(STARTING_FEN).unwrap();
        assert_eq!(parsed, Position::starting());
        assert_eq!(Position::starting().to_fen(), STARTING_FEN);
    }

    #[test]
    fn test_fen_roundtrip_is_byte_identical() {
        for fen in [
            STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 b - - 12 57",
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w Kq - 4 4",
        ] {
            assert_eq!(Position::from_fen(fen).unwrap().to_fen(), fen);
        }
    }

    #[test]
    fn test_castling_is_canonicalized() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w qkQK - 0 1").unwrap();
        assert!(pos.to_fen().contains(" KQkq "));
    }

    #[test]
    fn test_missing_counters_default() {
        let err = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b -").unwrap_err();
        assert_eq!(err, FenError::FieldCount { count: 3 });
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - -").unwrap();
        assert_eq!(pos.to_fen(), "4k3/8/8/8/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn test_accepts_fully_promoted_material() {
        let pos = Position::from_fen("QQQQ1QQQ/QQ6/k7/8/8/8/8/RRBBNNK1 w - - 0 1");
        assert!(pos.is_ok());
        let err = Position::from_fen("QQQQQQQQ/QQ6/k7/8/8/8/8/RRBBNNK1 w - - 0 1").unwrap_err();
        assert_eq!(err, FenError::Material { color: Color::White });
    }

    #[test]
    fn test_rejects_invalid_fen() {
        for fen in [
            "",
            "8/8/8/8/8/8/8/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/4K3 x - - 0 1",
            "4k3/8/8/8/8/8/8/4K3 w X - 0 1",
            "4k3/8/8/8/8/8/8/4K3 w - e4 0 1",
            "4k3/8/8/8/8/8/8/4K3 w - - a 1",
            "4k3/9/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/ppppppppp/8/8/8/8/8/4K3 w - - 0 1",
            "nQQ4Q/1Q1QQQ1Q/QQ5Q/Q5Qn/Q6Q/Q6Q/Q6Q/KQQQQQQk w - - 0 1",
            "4k3/8/8/8/8/8/PPPPPPPP/QQ2K3 w - - 0 1",
        ] {
            assert!(Position::from_fen(fen).is_err(), "{fen:?} should be rejected");
        }
    }
}
