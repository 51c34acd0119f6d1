//! Packed move representation.
//!
//! Layout of the 16-bit word:
//! - bits 0-5: from-square
//! - bits 6-11: to-square
//! - bits 12-13: promotion kind (knight, bishop, rook, queen)
//! - bits 14-15: special flag (none, promotion, en-passant, castle)
//!
//! Castling is encoded as the king's own two-square move.

use std::fmt;

use crate::game_state::chess_types::{PieceKind, Square};
use crate::utils::algebraic::square_name;

const FROM_SHIFT: u16 = 0;
const TO_SHIFT: u16 = 6;
const PROMOTION_SHIFT: u16 = 12;
const FLAG_SHIFT: u16 = 14;

const SQUARE_MASK: u16 = 0x3F;
const PROMOTION_MASK: u16 = 0x3;
const FLAG_MASK: u16 = 0x3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveFlag {
    Normal,
    Promotion,
    EnPassant,
    Castle,
}

impl MoveFlag {
    #[inline]
    const fn code(self) -> u16 {
        match self {
            MoveFlag::Normal => 0,
            MoveFlag::Promotion => 1,
            MoveFlag::EnPassant => 2,
            MoveFlag::Castle => 3,
        }
    }

    #[inline]
    const fn from_code(code: u16) -> Self {
        match code & FLAG_MASK {
            0 => MoveFlag::Normal,
            1 => MoveFlag::Promotion,
            2 => MoveFlag::EnPassant,
            _ => MoveFlag::Castle,
        }
    }
}

/// Promotion kinds in the order generation emits them.
pub const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move(u16);

impl Move {
    /// Sentinel for "no move". a1a1 can never be generated.
    pub const NONE: Move = Move(0);

    #[inline]
    pub const fn new(from: Square, to: Square) -> Self {
        Move(((from as u16) << FROM_SHIFT) | ((to as u16) << TO_SHIFT))
    }

    #[inline]
    pub const fn with_flag(from: Square, to: Square, flag: MoveFlag) -> Self {
        Move(Self::new(from, to).0 | (flag.code() << FLAG_SHIFT))
    }

    #[inline]
    pub const fn promotion(from: Square, to: Square, kind: PieceKind) -> Self {
        let code = match kind {
            PieceKind::Knight => 0,
            PieceKind::Bishop => 1,
            PieceKind::Rook => 2,
            _ => 3,
        };
        Move(Self::with_flag(from, to, MoveFlag::Promotion).0 | (code << PROMOTION_SHIFT))
    }

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Move(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn from(self) -> Square {
        ((self.0 >> FROM_SHIFT) & SQUARE_MASK) as Square
    }

    #[inline]
    pub const fn to(self) -> Square {
        ((self.0 >> TO_SHIFT) & SQUARE_MASK) as Square
    }

    #[inline]
    pub const fn flag(self) -> MoveFlag {
        MoveFlag::from_code(self.0 >> FLAG_SHIFT)
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        matches!(self.flag(), MoveFlag::Promotion)
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        matches!(self.flag(), MoveFlag::EnPassant)
    }

    #[inline]
    pub const fn is_castle(self) -> bool {
        matches!(self.flag(), MoveFlag::Castle)
    }

    /// Promotion kind, or `None` for non-promotions.
    #[inline]
    pub const fn promotion_kind(self) -> Option<PieceKind> {
        if !self.is_promotion() {
            return None;
        }
        Some(match (self.0 >> PROMOTION_SHIFT) & PROMOTION_MASK {
            0 => PieceKind::Knight,
            1 => PieceKind::Bishop,
            2 => PieceKind::Rook,
            _ => PieceKind::Queen,
        })
    }
}

impl fmt::Display for Move {
    /// Four or five character coordinate text, e.g. `e2e4`, `e7e8q`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "0000");
        }
        write!(f, "{}{}", square_name(self.from()), square_name(self.to()))?;
        if let Some(kind) = self.promotion_kind() {
            write!(f, "{}", kind.to_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({self}, {:?})", self.flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_unpack_to_what_was_packed() {
        let mv = Move::promotion(52, 60, PieceKind::Rook);
        assert_eq!(mv.from(), 52);
        assert_eq!(mv.to(), 60);
        assert_eq!(mv.flag(), MoveFlag::Promotion);
        assert_eq!(mv.promotion_kind(), Some(PieceKind::Rook));

        let ep = Move::with_flag(36, 43, MoveFlag::EnPassant);
        assert!(ep.is_en_passant());
        assert_eq!(ep.promotion_kind(), None);
    }

    #[test]
    fn text_form_uses_coordinates_and_lowercase_promotion() {
        assert_eq!(Move::new(12, 28).to_string(), "e2e4");
        assert_eq!(Move::promotion(48, 56, PieceKind::Knight).to_string(), "a7a8n");
        assert_eq!(Move::with_flag(4, 6, MoveFlag::Castle).to_string(), "e1g1");
        assert_eq!(Move::NONE.to_string(), "0000");
    }

    #[test]
    fn none_is_distinct_from_every_real_move() {
        assert!(Move::NONE.is_none());
        assert!(Move::new(0, 1).is_some());
    }
}
