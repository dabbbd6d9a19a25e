//! Core chess enums and aliases shared by the board, move, and search layers.
//!
//! Squares are numbered rank-major from White's side: a1 = 0, h1 = 7,
//! a8 = 56, h8 = 63.

use std::fmt;

/// Board square index in `0..=63`.
pub type Square = u8;

#[inline]
pub const fn square_file(square: Square) -> u8 {
    square % 8
}

#[inline]
pub const fn square_rank(square: Square) -> u8 {
    square / 8
}

#[inline]
pub const fn square_at(file: u8, rank: u8) -> Square {
    rank * 8 + file
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White = 0,
    Black = 1,
    /// Sentinel used only to index the combined occupancy board.
    Both = 2,
}

impl Side {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Opponent of a playing side. `Both` has no opponent and maps to itself.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
            Side::Both => Side::Both,
        }
    }

    /// Score multiplier turning a White-positive score into this side's view.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Side::Black => -1,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Promotion targets, strongest first.
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase letter used by FEN and long algebraic promotions.
    pub const fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

/// One of the twelve colored pieces. The discriminant indexes the piece boards
/// of a `Position`: White pieces occupy `0..6`, Black pieces `6..12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    WhitePawn = 0,
    WhiteKnight = 1,
    WhiteBishop = 2,
    WhiteRook = 3,
    WhiteQueen = 4,
    WhiteKing = 5,
    BlackPawn = 6,
    BlackKnight = 7,
    BlackBishop = 8,
    BlackRook = 9,
    BlackQueen = 10,
    BlackKing = 11,
}

impl Piece {
    pub const ALL: [Piece; 12] = [
        Piece::WhitePawn,
        Piece::WhiteKnight,
        Piece::WhiteBishop,
        Piece::WhiteRook,
        Piece::WhiteQueen,
        Piece::WhiteKing,
        Piece::BlackPawn,
        Piece::BlackKnight,
        Piece::BlackBishop,
        Piece::BlackRook,
        Piece::BlackQueen,
        Piece::BlackKing,
    ];

    /// Colored piece for a playing side. `Side::Both` is treated as White.
    #[inline]
    pub const fn new(side: Side, kind: PieceKind) -> Self {
        let offset = match side {
            Side::Black => 6,
            _ => 0,
        };
        Self::ALL[offset + kind.index()]
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 12 {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    #[inline]
    pub const fn kind(self) -> PieceKind {
        PieceKind::ALL[self.index() % 6]
    }

    #[inline]
    pub const fn side(self) -> Side {
        if self.index() < 6 {
            Side::White
        } else {
            Side::Black
        }
    }

    /// FEN letter: uppercase for White, lowercase for Black.
    pub fn to_fen_char(self) -> char {
        let c = self.kind().to_char();
        match self.side() {
            Side::White => c.to_ascii_uppercase(),
            _ => c,
        }
    }

    pub fn from_fen_char(c: char) -> Option<Self> {
        let kind = PieceKind::from_char(c)?;
        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };
        Some(Self::new(side, kind))
    }
}

/// Castling rights as four independent bits.
///
/// Bit layout: 1 = White king side, 2 = White queen side, 4 = Black king side,
/// 8 = Black queen side. No other bit is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: Self = Self(0);
    pub const WHITE_KING_SIDE: Self = Self(1 << 0);
    pub const WHITE_QUEEN_SIDE: Self = Self(1 << 1);
    pub const BLACK_KING_SIDE: Self = Self(1 << 2);
    pub const BLACK_QUEEN_SIDE: Self = Self(1 << 3);
    pub const ALL: Self = Self(0b1111);

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds rights from raw bits, dropping anything outside the four-bit layout.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// King-side right for a playing side.
    #[inline]
    pub const fn king_side(side: Side) -> Self {
        match side {
            Side::Black => Self::BLACK_KING_SIDE,
            _ => Self::WHITE_KING_SIDE,
        }
    }

    /// Queen-side right for a playing side.
    #[inline]
    pub const fn queen_side(side: Side) -> Self {
        match side {
            Side::Black => Self::BLACK_QUEEN_SIDE,
            _ => Self::WHITE_QUEEN_SIDE,
        }
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        let letters = [
            (Self::WHITE_KING_SIDE, 'K'),
            (Self::WHITE_QUEEN_SIDE, 'Q'),
            (Self::BLACK_KING_SIDE, 'k'),
            (Self::BLACK_QUEEN_SIDE, 'q'),
        ];
        for (right, letter) in letters {
            if self.contains(right) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}
