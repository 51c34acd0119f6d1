//! Bitboard chess engine core: position representation, staged legal move
//! generation and a parallel alpha-beta search.
//!
//! The public surface is organised by subsystem so binaries, benches and
//! embedding front ends import stable module paths.

pub mod errors;

pub mod game_state {
    pub mod chess_rules;
    pub mod chess_types;
    pub mod position;
    pub mod undo_state;
}

pub mod moves {
    pub mod bitboard;
    pub mod leaper_attacks;
    pub mod move_descriptions;
    pub mod slider_rays;
}

pub mod tables {
    pub mod engine_tables;
    pub mod magic;
    pub mod zobrist;
}

pub mod move_generation {
    pub mod legal_moves_king;
    pub mod legal_moves_pawn;
    pub mod legal_moves_pieces;
    pub mod move_generator;
    pub mod move_list;
    pub mod perft;
}

pub mod search {
    pub mod alpha_beta;
    pub mod board_scoring;
    pub mod config;
    pub mod iterative_deepening;
    pub mod move_ordering;
    pub mod reporting;
    pub mod root_move;
    pub mod score;
    pub mod search_limits;
    pub mod tablebase;
    pub mod threading;
    pub mod time_management;
    pub mod transposition_table;
}

pub mod utils {
    pub mod algebraic;
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod long_algebraic;
}

#[cfg(test)]
mod test_support;
