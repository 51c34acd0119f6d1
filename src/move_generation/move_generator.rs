//! Legal move generation entry point.
//!
//! `generate_moves` takes a runtime `GenerationMode` and dispatches once to a
//! generator monomorphized over a zero-sized `GenerationKind`, so the inner
//! loops see the mode as constants.
//!
//! Captures mode covers every capture plus every promotion; Quiets covers
//! the remaining moves, castling included. When the side to move is in check
//! every mode is restricted to evasions (so `Captures` and
//! `EvasionCaptures` produce the same list), and when it is not the evasion
//! modes behave like their plain counterparts.

use crate::game_state::chess_types::*;
use crate::move_generation::legal_moves_king::{generate_castling_moves, generate_king_moves};
use crate::move_generation::legal_moves_pawn::generate_pawn_moves;
use crate::move_generation::legal_moves_pieces::generate_piece_moves;
use crate::move_generation::move_list::MoveList;
use crate::moves::bitboard::Bitboard;
use crate::moves::move_descriptions::Move;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    All,
    Captures,
    Quiets,
    /// Quiet moves that give check.
    ChecksOnly,
    Evasions,
    EvasionCaptures,
    EvasionQuiets,
}

/// Compile-time description of which moves a generation pass emits.
pub trait GenerationKind {
    const CAPTURES: bool;
    const QUIETS: bool;
    const CHECKS_ONLY: bool;
}

pub struct AllMoves;
pub struct CaptureMoves;
pub struct QuietMoves;
pub struct QuietChecks;

impl GenerationKind for AllMoves {
    const CAPTURES: bool = true;
    const QUIETS: bool = true;
    const CHECKS_ONLY: bool = false;
}

impl GenerationKind for CaptureMoves {
    const CAPTURES: bool = true;
    const QUIETS: bool = false;
    const CHECKS_ONLY: bool = false;
}

impl GenerationKind for QuietMoves {
    const CAPTURES: bool = false;
    const QUIETS: bool = true;
    const CHECKS_ONLY: bool = false;
}

impl GenerationKind for QuietChecks {
    const CAPTURES: bool = false;
    const QUIETS: bool = true;
    const CHECKS_ONLY: bool = true;
}

pub fn generate_moves(position: &Position<'_>, mode: GenerationMode) -> MoveList {
    let mut list = MoveList::new();
    generate_into(position, mode, &mut list);
    list
}

/// Appends the legal moves of `mode` to `list`.
pub fn generate_into(position: &Position<'_>, mode: GenerationMode, list: &mut MoveList) {
    match mode {
        GenerationMode::All | GenerationMode::Evasions => generate::<AllMoves>(position, list),
        GenerationMode::Captures | GenerationMode::EvasionCaptures => {
            generate::<CaptureMoves>(position, list)
        }
        GenerationMode::Quiets | GenerationMode::EvasionQuiets => {
            generate::<QuietMoves>(position, list)
        }
        GenerationMode::ChecksOnly => generate::<QuietChecks>(position, list),
    }
}

/// Per-call data shared by the piece generators.
pub(crate) struct GenContext<'a, 't> {
    pub position: &'a Position<'t>,
    pub us: Color,
    pub them: Color,
    pub king: Square,
    pub pinned: Bitboard,
    pub occupancy: Bitboard,
    /// Destinations that resolve the current check; every square otherwise.
    pub check_mask: Bitboard,
}

impl GenContext<'_, '_> {
    #[inline]
    pub fn capture_targets(&self) -> Bitboard {
        self.position.occupancy_of(self.them) & self.check_mask
    }

    #[inline]
    pub fn quiet_targets(&self) -> Bitboard {
        !self.occupancy & self.check_mask
    }

    /// Pin filter for non-king moves: a pinned piece must stay on the line
    /// through its king.
    #[inline]
    pub fn keeps_pin_line(&self, from: Square, to: Square) -> bool {
        !self.pinned.contains(from) || self.position.tables().aligned(from, to, self.king)
    }

    /// Pushes a move already known to be legal. Quiet moves in checks-only
    /// passes are confirmed with a full check test.
    #[inline]
    pub fn emit<K: GenerationKind>(&self, list: &mut MoveList, mv: Move, quiet: bool) {
        if K::CHECKS_ONLY && quiet && !self.position.move_gives_check(mv) {
            return;
        }
        list.push(mv);
    }
}

fn generate<K: GenerationKind>(position: &Position<'_>, list: &mut MoveList) {
    let us = position.side_to_move();
    let king = position.king_square(us);
    let checkers = position.checkers();

    let mut ctx = GenContext {
        position,
        us,
        them: us.opposite(),
        king,
        pinned: position.pinned(),
        occupancy: position.occupancy(),
        check_mask: Bitboard::FULL,
    };

    if checkers.more_than_one() {
        generate_king_moves::<K>(&ctx, list);
        return;
    }
    if checkers.is_not_empty() {
        let checker = checkers.lsb();
        ctx.check_mask = checkers | position.tables().between(king, checker);
    }

    generate_pawn_moves::<K>(&ctx, list);
    generate_piece_moves::<K>(&ctx, list);
    generate_king_moves::<K>(&ctx, list);
    if checkers.is_empty() {
        generate_castling_moves::<K>(&ctx, list);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::test_support::tables;

    const POSITIONS: [&str; 6] = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    ];

    fn as_set(list: &MoveList) -> HashSet<Move> {
        list.iter().copied().collect()
    }

    #[test]
    fn start_position_has_twenty_moves() {
        let position = Position::start(tables()).expect("start");
        assert_eq!(generate_moves(&position, GenerationMode::All).len(), 20);
        assert!(generate_moves(&position, GenerationMode::Captures).is_empty());
        assert!(generate_moves(&position, GenerationMode::ChecksOnly).is_empty());
    }

    #[test]
    fn captures_and_quiets_partition_all_moves() {
        for fen in POSITIONS {
            let position = Position::from_fen(tables(), fen).expect("valid fen");
            let all = generate_moves(&position, GenerationMode::All);
            let captures = generate_moves(&position, GenerationMode::Captures);
            let quiets = generate_moves(&position, GenerationMode::Quiets);

            let all_set = as_set(&all);
            assert_eq!(all_set.len(), all.len(), "duplicates in {fen}");
            assert_eq!(captures.len() + quiets.len(), all.len(), "overlap in {fen}");
            let union: HashSet<Move> = as_set(&captures).union(&as_set(&quiets)).copied().collect();
            assert_eq!(union, all_set, "{fen}");
            for mv in captures.iter() {
                assert!(position.is_capture(*mv) || mv.is_promotion());
            }
        }
    }

    #[test]
    fn evasion_modes_partition_all_moves_in_check() {
        let checks = [
            "rnbqkbnr/ppp2ppp/8/1B1pp3/4P3/8/PPPP1PPP/RNBQK1NR b KQkq - 1 3",
            "4k3/8/8/8/8/3n4/8/R3K3 w Q - 0 1",
            "8/8/8/2k5/3Pp3/8/8/4K3 b - d3 0 1",
        ];
        for fen in checks {
            let position = Position::from_fen(tables(), fen).expect("valid fen");
            assert!(position.in_check(), "{fen}");
            let all = as_set(&generate_moves(&position, GenerationMode::All));
            let evasions = as_set(&generate_moves(&position, GenerationMode::Evasions));
            let captures = as_set(&generate_moves(&position, GenerationMode::EvasionCaptures));
            let quiets = as_set(&generate_moves(&position, GenerationMode::EvasionQuiets));
            assert_eq!(all, evasions);
            let union: HashSet<Move> = captures.union(&quiets).copied().collect();
            assert_eq!(union, all, "{fen}");
            assert!(captures.is_disjoint(&quiets));
        }
    }

    #[test]
    fn no_generated_move_leaves_king_attacked() {
        for fen in POSITIONS {
            let mut position = Position::from_fen(tables(), fen).expect("valid fen");
            let us = position.side_to_move();
            for mv in generate_moves(&position, GenerationMode::All).iter().copied() {
                position.make_move(mv).expect("legal move applies");
                let king = position.king_square(us);
                assert!(
                    !position.is_square_attacked(king, us.opposite(), position.occupancy()),
                    "{mv} leaves the king attacked in {fen}"
                );
                position.unmake_move().expect("undo");
            }
        }
    }

    #[test]
    fn double_check_allows_only_king_moves() {
        // Knight on f6 and bishop on b5 both check the e8 king.
        let position = Position::from_fen(
            tables(),
            "r1bqk2r/ppp2ppp/5N2/1B6/8/8/PPPP1PPP/R1BQK2R b KQkq - 0 1",
        )
        .expect("valid fen");
        assert!(position.checkers().more_than_one());
        let moves = generate_moves(&position, GenerationMode::All);
        assert!(!moves.is_empty());
        for mv in moves.iter() {
            assert_eq!(mv.from(), position.king_square(Color::Dark), "{mv}");
        }
    }

    #[test]
    fn en_passant_exposing_king_on_rank_is_rejected() {
        // Capturing d3 would clear the fourth rank between king and rook.
        let position =
            Position::from_fen(tables(), "8/8/8/8/k2Pp2Q/8/8/4K3 b - d3 0 1").expect("valid fen");
        let moves = generate_moves(&position, GenerationMode::All);
        assert!(moves.iter().all(|mv| !mv.is_en_passant()));

        let free =
            Position::from_fen(tables(), "8/8/8/8/3Pp3/8/8/k3K3 b - d3 0 1").expect("valid fen");
        let moves = generate_moves(&free, GenerationMode::All);
        assert_eq!(moves.iter().filter(|mv| mv.is_en_passant()).count(), 1);
    }

    #[test]
    fn castling_through_attacked_square_is_rejected() {
        // Rook on f8 covers f1, so kingside castling is illegal.
        let position =
            Position::from_fen(tables(), "4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1").expect("valid fen");
        let castles: Vec<String> = generate_moves(&position, GenerationMode::All)
            .iter()
            .filter(|mv| mv.is_castle())
            .map(|mv| mv.to_string())
            .collect();
        assert_eq!(castles, vec!["e1c1".to_string()]);
    }

    #[test]
    fn checks_only_matches_filtered_quiets() {
        for fen in POSITIONS {
            let position = Position::from_fen(tables(), fen).expect("valid fen");
            let checks = as_set(&generate_moves(&position, GenerationMode::ChecksOnly));
            let expected: HashSet<Move> = generate_moves(&position, GenerationMode::Quiets)
                .iter()
                .copied()
                .filter(|mv| position.move_gives_check(*mv))
                .collect();
            assert_eq!(checks, expected, "{fen}");
        }
    }

    #[test]
    fn promotions_enumerate_four_kinds() {
        let position =
            Position::from_fen(tables(), "4k3/P7/8/8/8/8/8/4K3 w - - 0 1").expect("valid fen");
        let promotions: Vec<PieceKind> = generate_moves(&position, GenerationMode::Captures)
            .iter()
            .filter_map(|mv| mv.promotion_kind())
            .collect();
        assert_eq!(
            promotions,
            vec![PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight]
        );
    }
}
