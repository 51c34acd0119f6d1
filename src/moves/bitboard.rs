//! 64-square bit-set.
//!
//! Bit `i` is set exactly when square `i` has the property the set describes
//! (occupied by a white knight, attacked by black, ...). All operations are
//! plain integer instructions.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr};

use crate::game_state::chess_types::{file_of, rank_of, Square};

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitboard(pub u64);

pub const RANK_1: Bitboard = Bitboard(0x0000_0000_0000_00FF);
pub const RANK_2: Bitboard = Bitboard(0x0000_0000_0000_FF00);
pub const RANK_3: Bitboard = Bitboard(0x0000_0000_00FF_0000);
pub const RANK_6: Bitboard = Bitboard(0x0000_FF00_0000_0000);
pub const RANK_7: Bitboard = Bitboard(0x00FF_0000_0000_0000);
pub const RANK_8: Bitboard = Bitboard(0xFF00_0000_0000_0000);
pub const FILE_A: Bitboard = Bitboard(0x0101_0101_0101_0101);
pub const FILE_H: Bitboard = Bitboard(0x8080_8080_8080_8080);

impl Bitboard {
    pub const EMPTY: Bitboard = Bitboard(0);
    pub const FULL: Bitboard = Bitboard(u64::MAX);

    #[inline]
    pub const fn from_square(square: Square) -> Self {
        Bitboard(1u64 << square)
    }

    #[inline]
    pub const fn rank_mask(rank: u8) -> Self {
        Bitboard(0xFFu64 << (rank * 8))
    }

    #[inline]
    pub const fn file_mask(file: u8) -> Self {
        Bitboard(FILE_A.0 << file)
    }

    /// Rank containing `square`.
    #[inline]
    pub const fn rank_of_square(square: Square) -> Self {
        Self::rank_mask(rank_of(square))
    }

    /// File containing `square`.
    #[inline]
    pub const fn file_of_square(square: Square) -> Self {
        Self::file_mask(file_of(square))
    }

    #[inline]
    pub const fn contains(self, square: Square) -> bool {
        self.0 & (1u64 << square) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_not_empty(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn more_than_one(self) -> bool {
        self.0 & self.0.wrapping_sub(1) != 0
    }

    /// Lowest set square. Must not be called on an empty set.
    #[inline]
    pub const fn lsb(self) -> Square {
        debug_assert!(self.0 != 0);
        self.0.trailing_zeros() as Square
    }

    /// Remove and return the lowest set square.
    #[inline]
    pub fn pop_lsb(&mut self) -> Square {
        let square = self.lsb();
        self.0 &= self.0 - 1;
        square
    }

    #[inline]
    pub fn insert(&mut self, square: Square) {
        self.0 |= 1u64 << square;
    }

    #[inline]
    pub fn remove(&mut self, square: Square) {
        self.0 &= !(1u64 << square);
    }

    #[inline]
    pub fn toggle(&mut self, square: Square) {
        self.0 ^= 1u64 << square;
    }
}

impl Iterator for Bitboard {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Some(self.pop_lsb())
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Bitboard {}

macro_rules! impl_bit_op {
    ($tr:ident, $method:ident, $assign_tr:ident, $assign_method:ident, $op:tt) => {
        impl $tr for Bitboard {
            type Output = Bitboard;
            #[inline]
            fn $method(self, rhs: Bitboard) -> Bitboard {
                Bitboard(self.0 $op rhs.0)
            }
        }

        impl $assign_tr for Bitboard {
            #[inline]
            fn $assign_method(&mut self, rhs: Bitboard) {
                self.0 = self.0 $op rhs.0;
            }
        }
    };
}

impl_bit_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_bit_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_bit_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

impl Not for Bitboard {
    type Output = Bitboard;
    #[inline]
    fn not(self) -> Bitboard {
        Bitboard(!self.0)
    }
}

impl Shl<u32> for Bitboard {
    type Output = Bitboard;
    #[inline]
    fn shl(self, rhs: u32) -> Bitboard {
        Bitboard(self.0 << rhs)
    }
}

impl Shr<u32> for Bitboard {
    type Output = Bitboard;
    #[inline]
    fn shr(self, rhs: u32) -> Bitboard {
        Bitboard(self.0 >> rhs)
    }
}

impl fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitboard({:#018x})", self.0)
    }
}

impl fmt::Display for Bitboard {
    /// Eight rows of `x`/`.` with rank 8 first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let ch = if self.contains(rank * 8 + file) { 'x' } else { '.' };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
