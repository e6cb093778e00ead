//! Packed per-vertex state.
//!
//! One byte per vertex:
//!
//! ```text
//! bit  7          6        5..3        2..0
//!      classified visited  back side   front side
//! ```
//!
//! A side code is 0 for no extension, 1..=4 for a unique extension by base
//! A/C/G/T, and 5 for two or more extensions. Sides refer to the canonical
//! orientation: front = predecessors, back = successors.

use std::fmt;

const SIDE_MASK: u8 = 0b111;
const BACK_SHIFT: u8 = 3;
pub(crate) const VISITED_BIT: u8 = 1 << 6;
const CLASSIFIED_BIT: u8 = 1 << 7;

const CODE_NONE: u8 = 0;
const CODE_BRANCHING: u8 = 5;

/// Which end of the canonical k-mer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

/// Extension class of one side of a vertex
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideClass {
    /// No neighbour shares the (k-1)-overlap
    None,
    /// Exactly one neighbour, reached by adding this base code
    Unique(u8),
    Branching,
}

impl SideClass {
    /// Classify from the number of present candidates and the last one seen
    pub fn from_count(count: usize, base: u8) -> Self {
        match count {
            0 => SideClass::None,
            1 => SideClass::Unique(base),
            _ => SideClass::Branching,
        }
    }

    #[inline]
    fn code(self) -> u8 {
        match self {
            SideClass::None => CODE_NONE,
            SideClass::Unique(base) => 1 + (base & 0b11),
            SideClass::Branching => CODE_BRANCHING,
        }
    }

    #[inline]
    fn from_code(code: u8) -> Self {
        match code {
            CODE_NONE => SideClass::None,
            1..=4 => SideClass::Unique(code - 1),
            _ => SideClass::Branching,
        }
    }

    pub fn is_unique(self) -> bool {
        matches!(self, SideClass::Unique(_))
    }
}

/// Decoded snapshot of a vertex's state byte
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VertexState(u8);

impl VertexState {
    pub fn classified(front: SideClass, back: SideClass) -> Self {
        VertexState(front.code() | (back.code() << BACK_SHIFT) | CLASSIFIED_BIT)
    }

    #[inline]
    pub(crate) fn from_bits(bits: u8) -> Self {
        VertexState(bits)
    }

    #[inline]
    pub(crate) fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn side(self, side: Side) -> SideClass {
        match side {
            Side::Front => SideClass::from_code(self.0 & SIDE_MASK),
            Side::Back => SideClass::from_code((self.0 >> BACK_SHIFT) & SIDE_MASK),
        }
    }

    #[inline]
    pub fn is_visited(self) -> bool {
        self.0 & VISITED_BIT != 0
    }

    #[inline]
    pub fn is_classified(self) -> bool {
        self.0 & CLASSIFIED_BIT != 0
    }

    /// Both axes unique: a unitig-interior or cycle candidate
    pub fn both_unique(self) -> bool {
        self.side(Side::Front).is_unique() && self.side(Side::Back).is_unique()
    }

    /// No extension on either side
    pub fn is_isolated(self) -> bool {
        self.side(Side::Front) == SideClass::None && self.side(Side::Back) == SideClass::None
    }
}

impl fmt::Debug for VertexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexState")
            .field("front", &self.side(Side::Front))
            .field("back", &self.side(Side::Back))
            .field("visited", &self.is_visited())
            .field("classified", &self.is_classified())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_every_combination() {
        let classes: Vec<SideClass> = std::iter::once(SideClass::None)
            .chain((0..4).map(SideClass::Unique))
            .chain(std::iter::once(SideClass::Branching))
            .collect();

        for &front in &classes {
            for &back in &classes {
                let state = VertexState::classified(front, back);
                assert_eq!(state.side(Side::Front), front);
                assert_eq!(state.side(Side::Back), back);
                assert!(state.is_classified());
                assert!(!state.is_visited());

                let visited = VertexState::from_bits(state.bits() | VISITED_BIT);
                assert!(visited.is_visited());
                assert_eq!(visited.side(Side::Back), back);
            }
        }
    }

    #[test]
    fn test_from_count() {
        assert_eq!(SideClass::from_count(0, 2), SideClass::None);
        assert_eq!(SideClass::from_count(1, 2), SideClass::Unique(2));
        assert_eq!(SideClass::from_count(3, 2), SideClass::Branching);
    }

    #[test]
    fn test_vertex_kinds() {
        let isolated = VertexState::classified(SideClass::None, SideClass::None);
        assert!(isolated.is_isolated());
        assert!(!isolated.both_unique());

        let interior = VertexState::classified(SideClass::Unique(0), SideClass::Unique(3));
        assert!(interior.both_unique());
        assert_eq!(Side::Front.opposite(), Side::Back);
    }
}
