//! King steps and castling.

use crate::game_state::chess_rules::castling_moves_for;
use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{GenContext, GenerationKind};
use crate::move_generation::move_list::MoveList;
use crate::moves::bitboard::Bitboard;
use crate::moves::leaper_attacks::king_attacks;
use crate::moves::move_descriptions::{Move, MoveFlag};

/// King destinations are tested with the king lifted off the board so a
/// slider cannot be "blocked" by the king it is attacking.
pub(crate) fn generate_king_moves<K: GenerationKind>(
    ctx: &GenContext<'_, '_>,
    list: &mut MoveList,
) {
    let from = ctx.king;
    let attacks = king_attacks(from);
    let without_king = ctx.occupancy ^ Bitboard::from_square(from);
    let safe = |to: Square| !ctx.position.is_square_attacked(to, ctx.them, without_king);

    if K::CAPTURES {
        for to in attacks & ctx.position.occupancy_of(ctx.them) {
            if safe(to) {
                list.push(Move::new(from, to));
            }
        }
    }
    if K::QUIETS {
        for to in attacks & !ctx.occupancy {
            if safe(to) {
                ctx.emit::<K>(list, Move::new(from, to), true);
            }
        }
    }
}

/// Castling: right held, path between king and rook empty, and no square the
/// king crosses attacked. Only called when not in check.
pub(crate) fn generate_castling_moves<K: GenerationKind>(
    ctx: &GenContext<'_, '_>,
    list: &mut MoveList,
) {
    if !K::QUIETS {
        return;
    }
    let rights = ctx.position.castling_rights();
    for castle in castling_moves_for(ctx.us) {
        if rights & castle.right == 0 || (castle.empty_path & ctx.occupancy).is_not_empty() {
            continue;
        }
        let mut path = castle.king_path;
        if path.any(|square| ctx.position.is_square_attacked(square, ctx.them, ctx.occupancy)) {
            continue;
        }
        ctx.emit::<K>(
            list,
            Move::with_flag(castle.king_from, castle.king_to, MoveFlag::Castle),
            true,
        );
    }
}
