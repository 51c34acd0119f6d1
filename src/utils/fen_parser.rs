//! FEN-to-position parser.
//!
//! Handles the syntax of a Forsyth-Edwards Notation string. Semantic checks
//! (king count, pawn ranks, castling and en-passant consistency) happen in
//! `Position::from_parts`.

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_types::*;
use crate::game_state::position::PositionParts;
use crate::utils::algebraic::algebraic_to_square;

/// Parses the six FEN fields. All six are required.
pub fn parse_fen(fen: &str) -> ChessResult<PositionParts> {
    let mut parts = fen.split_whitespace();

    let board_part = parts
        .next()
        .ok_or_else(|| ChessError::malformed("missing board layout in FEN".to_owned()))?;
    let side_part = parts
        .next()
        .ok_or_else(|| ChessError::malformed("missing side-to-move in FEN".to_owned()))?;
    let castling_part = parts
        .next()
        .ok_or_else(|| ChessError::malformed("missing castling rights in FEN".to_owned()))?;
    let en_passant_part = parts
        .next()
        .ok_or_else(|| ChessError::malformed("missing en-passant square in FEN".to_owned()))?;
    let halfmove_part = parts
        .next()
        .ok_or_else(|| ChessError::malformed("missing halfmove clock in FEN".to_owned()))?;
    let fullmove_part = parts
        .next()
        .ok_or_else(|| ChessError::malformed("missing fullmove number in FEN".to_owned()))?;

    if parts.next().is_some() {
        return Err(ChessError::malformed("FEN has extra trailing fields".to_owned()));
    }

    Ok(PositionParts {
        board: parse_board(board_part)?,
        side_to_move: parse_side_to_move(side_part)?,
        castling_rights: parse_castling_rights(castling_part)?,
        en_passant_square: parse_en_passant_square(en_passant_part)?,
        halfmove_clock: halfmove_part.parse::<u16>().map_err(|_| {
            ChessError::malformed(format!("invalid halfmove clock: {halfmove_part}"))
        })?,
        fullmove_number: fullmove_part.parse::<u16>().map_err(|_| {
            ChessError::malformed(format!("invalid fullmove number: {fullmove_part}"))
        })?,
    })
}

fn parse_board(board_part: &str) -> ChessResult<[Option<Piece>; 64]> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err(ChessError::malformed(
            "board layout must contain 8 ranks".to_owned(),
        ));
    }

    let mut board = [None; 64];
    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx as u8;
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(ChessError::malformed(format!(
                        "invalid empty-square count '{ch}'"
                    )));
                }
                file += empty_count as u8;
                if file > 8 {
                    return Err(ChessError::malformed(
                        "board rank has too many files".to_owned(),
                    ));
                }
                continue;
            }

            let piece = Piece::from_fen_char(ch).ok_or_else(|| {
                ChessError::malformed(format!("invalid piece character '{ch}' in board layout"))
            })?;
            if file >= 8 {
                return Err(ChessError::malformed(
                    "board rank has too many files".to_owned(),
                ));
            }
            board[square_of(file, board_rank) as usize] = Some(piece);
            file += 1;
        }

        if file != 8 {
            return Err(ChessError::malformed(
                "board rank does not sum to 8 files".to_owned(),
            ));
        }
    }

    Ok(board)
}

fn parse_side_to_move(side_part: &str) -> ChessResult<Color> {
    match side_part {
        "w" => Ok(Color::Light),
        "b" => Ok(Color::Dark),
        _ => Err(ChessError::malformed(format!(
            "invalid side-to-move field: {side_part}"
        ))),
    }
}

fn parse_castling_rights(castling_part: &str) -> ChessResult<CastlingRights> {
    if castling_part == "-" {
        return Ok(0);
    }

    let mut rights: CastlingRights = 0;
    for ch in castling_part.chars() {
        match ch {
            'K' => rights |= CASTLE_LIGHT_KINGSIDE,
            'Q' => rights |= CASTLE_LIGHT_QUEENSIDE,
            'k' => rights |= CASTLE_DARK_KINGSIDE,
            'q' => rights |= CASTLE_DARK_QUEENSIDE,
            _ => {
                return Err(ChessError::malformed(format!(
                    "invalid castling rights character: {ch}"
                )))
            }
        }
    }
    Ok(rights)
}

fn parse_en_passant_square(en_passant_part: &str) -> ChessResult<Option<Square>> {
    if en_passant_part == "-" {
        return Ok(None);
    }
    Ok(Some(algebraic_to_square(en_passant_part)?))
}
