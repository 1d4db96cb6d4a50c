use oxicoach_board::{FenError, Move, Position};
use serde::{Deserialize, Serialize};

use super::{BoxedMotifDetector, MotifDetector as _, MotifSet, MotifTag, MoveAnalysis, all_motif_detectors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Own pawns in front of the king needed for a check to count as a back-rank motif.
    pub back_rank_min_pawn_cover: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            back_rank_min_pawn_cover: 2,
        }
    }
}

/// Labels a position and its principal line with motif tags.
#[derive(Debug, Clone)]
pub struct MotifTagger {
    detectors: Vec<BoxedMotifDetector>,
}

impl Default for MotifTagger {
    fn default() -> Self {
        Self::new(&TaggerConfig::default())
    }
}

impl MotifTagger {
    #[must_use]
    pub fn new(config: &TaggerConfig) -> Self {
        Self::with_detectors(all_motif_detectors(config))
    }

    #[must_use]
    pub fn with_detectors(detectors: Vec<BoxedMotifDetector>) -> Self {
        Self { detectors }
    }

    #[must_use]
    pub fn detectors(&self) -> &[BoxedMotifDetector] {
        &self.detectors
    }

    /// Tags `position` given the suggested line `pv`.
    ///
    /// Only the first move of the line is inspected. An empty line or an illegal first
    /// move skips detection. The result is never empty.
    #[must_use]
    pub fn tag(&self, position: &Position, pv: &[Move]) -> MotifSet {
        let mut found = MotifSet::EMPTY;
        let analysis = pv
            .first()
            .and_then(|&mv| MoveAnalysis::new(position, mv));
        match analysis {
            Some(analysis) => {
                for detector in &self.detectors {
                    if !found.contains(detector.motif()) && detector.detect(&analysis, found) {
                        found.insert(detector.motif());
                    }
                }
            }
            None => {
                tracing::debug!(fen = %position, "no playable first move, using default tag");
            }
        }
        if found.is_empty() {
            found.insert(MotifTag::DEFAULT);
        }
        found
    }

    /// Like [`Self::tag`], starting from a FEN string.
    pub fn tag_fen(&self, fen: &str, pv: &[Move]) -> Result<MotifSet, FenError> {
        let position = Position::from_fen(fen)?;
        Ok(self.tag(&position, pv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(uci: &[&str]) -> Vec<Move> {
        uci.iter().map(|s| Move::from_uci(s).unwrap()).collect()
    }

    #[test]
    fn test_scholars_mate_is_mate_and_check_only() {
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        let tags = MotifTagger::default().tag_fen(fen, &line(&["h5f7"])).unwrap();
        // the king keeps a single pawn (d7) in front of it, below the back-rank cover
        assert_eq!(tags.to_string(), "mate,check");
    }

    #[test]
    fn test_back_rank_mate_tags() {
        let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
        let tags = MotifTagger::default()
            .tag_fen(fen, &line(&["a1a8", "g8h8"]))
            .unwrap();
        assert_eq!(tags.to_string(), "mate,back_rank,check");
    }

    #[test]
    fn test_back_rank_threshold_is_configurable() {
        let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
        let strict = MotifTagger::new(&TaggerConfig {
            back_rank_min_pawn_cover: 4,
        });
        let tags = strict.tag_fen(fen, &line(&["a1a8"])).unwrap();
        assert_eq!(tags.to_string(), "mate,check");
    }

    #[test]
    fn test_empty_or_illegal_line_gets_default_tag() {
        let tagger = MotifTagger::default();
        let start = Position::starting();
        assert_eq!(tagger.tag(&start, &[]), MotifSet::from(MotifTag::HangingPiece));
        assert_eq!(
            tagger.tag(&start, &line(&["e2e5"])),
            MotifSet::from(MotifTag::HangingPiece)
        );
    }

    #[test]
    fn test_quiet_move_gets_default_tag() {
        let tags = MotifTagger::default().tag(&Position::starting(), &line(&["g1f3"]));
        assert_eq!(tags, MotifSet::from(MotifTag::HangingPiece));
    }

    #[test]
    fn test_knight_check_with_rook_is_check_only() {
        let fen = "r3k3/8/8/1N6/8/8/8/4K3 w - - 0 1";
        let tags = MotifTagger::default().tag_fen(fen, &line(&["b5c7"])).unwrap();
        assert_eq!(tags.to_string(), "check");
    }

    #[test]
    fn test_impossible_material_is_rejected_before_tagging() {
        let fen = "nQQ4Q/1Q1QQQ1Q/QQ5Q/Q5Qn/Q6Q/Q6Q/Q6Q/KQQQQQQk w - - 0 1";
        assert!(MotifTagger::default().tag_fen(fen, &line(&["b1a2"])).is_err());
    }

    #[test]
    fn test_invalid_fen_is_an_error() {
        assert!(MotifTagger::default().tag_fen("not a fen", &[]).is_err());
    }

    #[test]
    fn test_custom_detector_list() {
        let tagger = MotifTagger::with_detectors(vec![]);
        let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
        let tags = tagger.tag_fen(fen, &line(&["a1a8"])).unwrap();
        assert_eq!(tags, MotifSet::from(MotifTag::HangingPiece));
    }
}
