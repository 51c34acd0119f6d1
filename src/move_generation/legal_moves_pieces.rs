//! Knight, bishop, rook and queen moves.

use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{GenContext, GenerationKind};
use crate::move_generation::move_list::MoveList;
use crate::moves::move_descriptions::Move;

const PIECE_ORDER: [PieceKind; 4] = [
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
];

pub(crate) fn generate_piece_moves<K: GenerationKind>(
    ctx: &GenContext<'_, '_>,
    list: &mut MoveList,
) {
    let tables = ctx.position.tables();
    let captures = ctx.capture_targets();
    let quiets = ctx.quiet_targets();

    for kind in PIECE_ORDER {
        for from in ctx.position.pieces(ctx.us, kind) {
            // A pinned knight can never stay on its pin line.
            if kind == PieceKind::Knight && ctx.pinned.contains(from) {
                continue;
            }
            let attacks = tables.attacks_from(kind, from, ctx.occupancy);

            if K::CAPTURES {
                for to in attacks & captures {
                    if ctx.keeps_pin_line(from, to) {
                        list.push(Move::new(from, to));
                    }
                }
            }
            if K::QUIETS {
                for to in attacks & quiets {
                    if ctx.keeps_pin_line(from, to) {
                        ctx.emit::<K>(list, Move::new(from, to), true);
                    }
                }
            }
        }
    }
}
