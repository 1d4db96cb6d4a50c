//! Motif detectors: one static board predicate per tactical theme.
//!
//! Detectors run in the order returned by [`all_motif_detectors`]; later detectors see
//! the motifs found by earlier ones.

use std::fmt;

use oxicoach_board::{Piece, Role, core::attacks};

use super::{MotifSet, MotifTag, MoveAnalysis, TaggerConfig};

#[must_use]
pub fn all_motif_detectors(config: &TaggerConfig) -> Vec<BoxedMotifDetector> {
    vec![
        // forcing
        Box::new(Checkmate),
        Box::new(GivesCheck),
        Box::new(BackRank {
            min_pawn_cover: config.back_rank_min_pawn_cover,
        }),
        // geometry
        Box::new(Fork),
        Box::new(AbsolutePin),
        Box::new(Skewer),
        Box::new(DiscoveredAttack),
        // material
        Box::new(HangingCapture),
    ]
}

pub trait MotifDetector: fmt::Debug + Send + Sync {
    #[must_use]
    fn motif(&self) -> MotifTag;
    #[must_use]
    fn name(&self) -> &str;
    #[must_use]
    fn clone_boxed(&self) -> BoxedMotifDetector;
    /// Whether the motif is present, given the motifs `found` so far.
    #[must_use]
    fn detect(&self, analysis: &MoveAnalysis, found: MotifSet) -> bool;
}

pub type BoxedMotifDetector = Box<dyn MotifDetector>;

impl Clone for BoxedMotifDetector {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl MotifDetector for BoxedMotifDetector {
    fn motif(&self) -> MotifTag {
        self.as_ref().motif()
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn clone_boxed(&self) -> BoxedMotifDetector {
        self.as_ref().clone_boxed()
    }

    fn detect(&self, analysis: &MoveAnalysis, found: MotifSet) -> bool {
        self.as_ref().detect(analysis, found)
    }
}

/// The move delivers checkmate.
#[derive(Debug, Clone)]
pub struct Checkmate;

impl MotifDetector for Checkmate {
    fn motif(&self) -> MotifTag {
        MotifTag::Mate
    }
    fn name(&self) -> &'static str {
        "Checkmate"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        analysis.after().is_checkmate()
    }
}

/// The move gives check.
#[derive(Debug, Clone)]
pub struct GivesCheck;

impl MotifDetector for GivesCheck {
    fn motif(&self) -> MotifTag {
        MotifTag::Check
    }
    fn name(&self) -> &'static str {
        "Gives Check"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        analysis.after().is_check()
    }
}

/// Check or mate against a king boxed in on its home rank by its own pawns.
///
/// # Rule
///
/// - `check` or `mate` was already found
/// - The defending king stands on its home rank
/// - At least `min_pawn_cover` of the three squares in front of it (king file ±1)
///   hold the defender's own pawns
#[derive(Debug, Clone)]
pub struct BackRank {
    pub min_pawn_cover: usize,
}

impl MotifDetector for BackRank {
    fn motif(&self) -> MotifTag {
        MotifTag::BackRank
    }
    fn name(&self) -> &'static str {
        "Back Rank"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, found: MotifSet) -> bool {
        if !found.contains(MotifTag::Check) && !found.contains(MotifTag::Mate) {
            return false;
        }
        let defender = analysis.defender();
        let after = analysis.after();
        let Some(king) = after.king(defender) else {
            return false;
        };
        if king.rank() != defender.home_rank() {
            return false;
        }
        let Some(front) = king.offset(0, defender.forward()) else {
            return false;
        };
        let own_pawn = Piece::new(defender, Role::Pawn);
        let cover = (-1..=1)
            .filter_map(|df| front.offset(df, 0))
            .filter(|square| after.piece_at(*square) == Some(own_pawn))
            .count();
        cover >= self.min_pawn_cover
    }
}

/// The moved piece attacks two or more enemy rooks or queens. The king does not count.
#[derive(Debug, Clone)]
pub struct Fork;

impl MotifDetector for Fork {
    fn motif(&self) -> MotifTag {
        MotifTag::Fork
    }
    fn name(&self) -> &'static str {
        "Fork"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        let after = analysis.after();
        let targets = after.attacks_from(analysis.mv().to()) & after.by_color(analysis.defender());
        let valuable = targets
            .iter()
            .filter_map(|square| after.piece_at(square))
            .filter(|piece| matches!(piece.role, Role::Rook | Role::Queen))
            .count();
        valuable >= 2
    }
}

/// After the move, some enemy piece is absolutely pinned to its king.
#[derive(Debug, Clone)]
pub struct AbsolutePin;

impl MotifDetector for AbsolutePin {
    fn motif(&self) -> MotifTag {
        MotifTag::Pin
    }
    fn name(&self) -> &'static str {
        "Absolute Pin"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        analysis.after().pinned(analysis.defender()).any()
    }
}

/// The moved slider attacks a valuable enemy piece with a cheaper enemy piece behind it.
///
/// # Rule
///
/// - The moved piece is a bishop, rook or queen
/// - It attacks an enemy piece worth at least a rook (king included)
/// - The first piece further along the same line is an enemy piece of lower value
#[derive(Debug, Clone)]
pub struct Skewer;

impl MotifDetector for Skewer {
    fn motif(&self) -> MotifTag {
        MotifTag::Skewer
    }
    fn name(&self) -> &'static str {
        "Skewer"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        if !analysis.moved().role.is_slider() {
            return false;
        }
        let after = analysis.after();
        let defender = analysis.defender();
        let origin = analysis.mv().to();
        let occupied = after.occupied();

        (after.attacks_from(origin) & after.by_color(defender))
            .iter()
            .any(|front| {
                let Some(front_piece) = after.piece_at(front) else {
                    return false;
                };
                if front_piece.role.value() < Role::Rook.value() {
                    return false;
                }
                let Some(step) = attacks::direction(origin, front) else {
                    return false;
                };
                attacks::ray(front, step)
                    .find(|square| occupied.contains(*square))
                    .and_then(|square| after.piece_at(square))
                    .is_some_and(|back| {
                        back.color == defender && back.role.value() < front_piece.role.value()
                    })
            })
    }
}

/// Moving the piece uncovers an attack by another friendly slider.
///
/// The unmasked slider must now attack an enemy piece worth at least a minor piece, with
/// the vacated square lying between the two.
#[derive(Debug, Clone)]
pub struct DiscoveredAttack;

impl MotifDetector for DiscoveredAttack {
    fn motif(&self) -> MotifTag {
        MotifTag::DiscoveredAttack
    }
    fn name(&self) -> &'static str {
        "Discovered Attack"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        let after = analysis.after();
        let mover = analysis.mover();
        let vacated = analysis.mv().from();
        let enemies = after.by_color(analysis.defender());
        let sliders = (after.pieces(mover, Role::Bishop)
            | after.pieces(mover, Role::Rook)
            | after.pieces(mover, Role::Queen))
        .without(analysis.mv().to());

        sliders.iter().any(|slider| {
            (after.attacks_from(slider) & enemies).iter().any(|target| {
                after
                    .piece_at(target)
                    .is_some_and(|piece| piece.role.value() >= Role::Knight.value())
                    && attacks::between(slider, target).contains(vacated)
            })
        })
    }
}

/// The move captures a piece that had no defenders.
#[derive(Debug, Clone)]
pub struct HangingCapture;

impl MotifDetector for HangingCapture {
    fn motif(&self) -> MotifTag {
        MotifTag::HangingPiece
    }
    fn name(&self) -> &'static str {
        "Hanging Capture"
    }
    fn clone_boxed(&self) -> BoxedMotifDetector {
        Box::new(self.clone())
    }
    fn detect(&self, analysis: &MoveAnalysis, _found: MotifSet) -> bool {
        let before = analysis.before();
        let Some(square) = before.captured_square(analysis.mv()) else {
            return false;
        };
        before
            .piece_at(square)
            .is_some_and(|victim| before.attackers(square, victim.color).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use oxicoach_board::{Move, Position};

    use super::*;

    fn analysis(fen: &str, uci: &str) -> MoveAnalysis {
        let pos: Position = fen.parse().unwrap();
        MoveAnalysis::new(&pos, Move::from_uci(uci).unwrap()).unwrap()
    }

    fn fires(detector: &dyn MotifDetector, analysis: &MoveAnalysis, found: MotifSet) -> bool {
        detector.detect(analysis, found)
    }

    #[test]
    fn test_check_on_king_and_rook_is_not_a_fork() {
        let a = analysis("r3k3/8/8/1N6/8/8/8/4K3 w - - 0 1", "b5c7");
        assert!(!fires(&Fork, &a, MotifSet::EMPTY));
        assert!(fires(&GivesCheck, &a, MotifSet::EMPTY));
        assert!(!fires(&Checkmate, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_knight_fork_on_rook_and_queen() {
        let a = analysis("r3q1k1/8/8/1N6/8/8/8/4K3 w - - 0 1", "b5c7");
        assert!(fires(&Fork, &a, MotifSet::EMPTY));
        assert!(!fires(&GivesCheck, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_fork_ignores_minor_pieces() {
        // knight on c7 hits a8 (bishop) and e8 (king): only one valuable target
        let a = analysis("b3k3/8/8/1N6/8/8/8/4K3 w - - 0 1", "b5c7");
        assert!(!fires(&Fork, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_bishop_pins_knight_to_king() {
        let a = analysis("4k3/8/2n5/8/8/8/8/4KB2 w - - 0 1", "f1b5");
        assert!(fires(&AbsolutePin, &a, MotifSet::EMPTY));
        assert!(!fires(&Skewer, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_rook_skewers_king_and_queen() {
        let a = analysis("4q3/8/8/4k3/8/8/8/R5K1 w - - 0 1", "a1e1");
        assert!(fires(&Skewer, &a, MotifSet::EMPTY));
        assert!(fires(&GivesCheck, &a, MotifSet::EMPTY));
        assert!(!fires(&Fork, &a, MotifSet::EMPTY));
        assert!(!fires(&AbsolutePin, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_knight_unmasks_rook_on_queen() {
        let a = analysis("4q1k1/8/8/8/4N3/8/8/4R1K1 w - - 0 1", "e4c5");
        assert!(fires(&DiscoveredAttack, &a, MotifSet::EMPTY));
        assert!(!fires(&GivesCheck, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_hanging_capture_requires_no_defender() {
        let free = analysis("4k3/8/8/3n4/8/8/8/3RK3 w - - 0 1", "d1d5");
        assert!(fires(&HangingCapture, &free, MotifSet::EMPTY));

        let defended = analysis("4k3/8/4p3/3n4/8/8/8/3RK3 w - - 0 1", "d1d5");
        assert!(!fires(&HangingCapture, &defended, MotifSet::EMPTY));
    }

    #[test]
    fn test_en_passant_capture_of_undefended_pawn() {
        let a = analysis("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2", "e5d6");
        assert!(fires(&HangingCapture, &a, MotifSet::EMPTY));
    }

    #[test]
    fn test_back_rank_mate() {
        let a = analysis("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", "a1a8");
        assert!(fires(&Checkmate, &a, MotifSet::EMPTY));
        let found = MotifSet::from(MotifTag::Mate).with(MotifTag::Check);
        let rule = BackRank { min_pawn_cover: 2 };
        assert!(fires(&rule, &a, found));
        // without a forcing motif the rule never fires
        assert!(!fires(&rule, &a, MotifSet::EMPTY));
        // a stricter threshold than the available cover
        assert!(!fires(&BackRank { min_pawn_cover: 4 }, &a, found));
    }

    #[test]
    fn test_boxed_detectors_keep_identity() {
        let detectors = all_motif_detectors(&TaggerConfig::default());
        let cloned: Vec<BoxedMotifDetector> = detectors.clone();
        let motifs: Vec<_> = cloned.iter().map(|d| d.motif()).collect();
        assert_eq!(motifs[..3], [MotifTag::Mate, MotifTag::Check, MotifTag::BackRank]);
        assert!(!motifs.contains(&MotifTag::Deflection));
        assert!(!motifs.contains(&MotifTag::Attraction));
    }
}
