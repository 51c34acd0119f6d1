//! Pawn moves: single push, double push and the two diagonal captures, each
//! with a promotion variant, followed by en-passant.

use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{GenContext, GenerationKind};
use crate::move_generation::move_list::MoveList;
use crate::moves::bitboard::{Bitboard, FILE_A, FILE_H, RANK_2, RANK_3, RANK_6, RANK_7};
use crate::moves::leaper_attacks::pawn_attacks;
use crate::moves::move_descriptions::{Move, MoveFlag, PROMOTION_KINDS};

#[inline]
fn shift(bb: Bitboard, delta: i8) -> Bitboard {
    if delta > 0 {
        bb << delta as u32
    } else {
        bb >> (-delta) as u32
    }
}

#[inline]
fn origin(to: Square, delta: i8) -> Square {
    (to as i8 - delta) as Square
}

pub(crate) fn generate_pawn_moves<K: GenerationKind>(
    ctx: &GenContext<'_, '_>,
    list: &mut MoveList,
) {
    let us = ctx.us;
    let pawns = ctx.position.pieces(us, PieceKind::Pawn);
    let (seventh, third) = match us {
        Color::Light => (RANK_7, RANK_3),
        Color::Dark => (RANK_2, RANK_6),
    };
    let up = us.pawn_push();
    // West captures leave the a-file, east captures leave the h-file.
    let (west, east) = match us {
        Color::Light => (7i8, 9i8),
        Color::Dark => (-9i8, -7i8),
    };

    let promoting = pawns & seventh;
    let others = pawns & !seventh;
    let empty = !ctx.occupancy;
    let enemies = ctx.position.occupancy_of(ctx.them);

    if K::QUIETS {
        let single = shift(others, up) & empty;
        let double = shift(single & third, up) & empty & ctx.check_mask;
        for to in single & ctx.check_mask {
            let from = origin(to, up);
            if ctx.keeps_pin_line(from, to) {
                ctx.emit::<K>(list, Move::new(from, to), true);
            }
        }
        for to in double {
            let from = origin(to, 2 * up);
            if ctx.keeps_pin_line(from, to) {
                ctx.emit::<K>(list, Move::new(from, to), true);
            }
        }
    }

    if K::CAPTURES {
        for (delta, edge) in [(west, FILE_A), (east, FILE_H)] {
            for to in shift(others & !edge, delta) & enemies & ctx.check_mask {
                let from = origin(to, delta);
                if ctx.keeps_pin_line(from, to) {
                    list.push(Move::new(from, to));
                }
            }
        }

        if promoting.is_not_empty() {
            for to in shift(promoting, up) & empty & ctx.check_mask {
                push_promotions(ctx, list, origin(to, up), to);
            }
            for (delta, edge) in [(west, FILE_A), (east, FILE_H)] {
                for to in shift(promoting & !edge, delta) & enemies & ctx.check_mask {
                    push_promotions(ctx, list, origin(to, delta), to);
                }
            }
        }

        if let Some(ep) = ctx.position.en_passant_square() {
            for from in others & pawn_attacks(ctx.them, ep) {
                if en_passant_is_legal(ctx, from, ep) {
                    list.push(Move::with_flag(from, ep, MoveFlag::EnPassant));
                }
            }
        }
    }
}

#[inline]
fn push_promotions(ctx: &GenContext<'_, '_>, list: &mut MoveList, from: Square, to: Square) {
    if ctx.keeps_pin_line(from, to) {
        for kind in PROMOTION_KINDS {
            list.push(Move::promotion(from, to, kind));
        }
    }
}

/// Removing both pawns can open a rank (or diagonal) onto the king, which
/// the pin filter cannot see, so the king's attackers are recomputed on the
/// resulting occupancy. This also settles whether the capture answers a check.
fn en_passant_is_legal(ctx: &GenContext<'_, '_>, from: Square, to: Square) -> bool {
    let captured = origin(to, ctx.us.pawn_push());
    let mut occupancy = ctx.occupancy;
    occupancy.remove(from);
    occupancy.remove(captured);
    occupancy.insert(to);

    let attackers = ctx.position.attackers_to(ctx.king, occupancy)
        & ctx.position.occupancy_of(ctx.them)
        & !Bitboard::from_square(captured);
    attackers.is_empty()
}
