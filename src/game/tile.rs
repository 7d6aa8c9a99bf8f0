//! Tile Types and Behavior Table
//!
//! Every physical rule is keyed off `BehaviorFlags`, never off the tile
//! identity. A tile carrying several flags behaves as the union of each
//! flag's rules (Thin Ice = slippery + breakable + unstable).

use bitflags::bitflags;
use serde::{Serialize, Deserialize};

bitflags! {
    /// Physical behaviors a tile can carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BehaviorFlags: u8 {
        /// Blocks movement on both axes
        const SOLID = 1 << 0;
        /// Touching it kills the player
        const KILL = 1 << 1;
        /// Collapses a short while after being stood on
        const UNSTABLE = 1 << 2;
        /// Low traction surface
        const SLIPPERY = 1 << 3;
        /// Shatters when struck from below
        const BREAKABLE = 1 << 4;
    }
}

impl BehaviorFlags {
    /// Flags that stop horizontal movement.
    pub const HORIZONTAL_BLOCKERS: Self = Self::SOLID
        .union(Self::UNSTABLE)
        .union(Self::SLIPPERY);

    /// Flags that stop vertical movement (a breakable tile can be stood on).
    pub const VERTICAL_BLOCKERS: Self = Self::HORIZONTAL_BLOCKERS.union(Self::BREAKABLE);

    /// Does this set stop horizontal movement?
    #[inline]
    pub fn blocks_horizontal(self) -> bool {
        self.intersects(Self::HORIZONTAL_BLOCKERS)
    }

    /// Does this set stop vertical movement?
    #[inline]
    pub fn blocks_vertical(self) -> bool {
        self.intersects(Self::VERTICAL_BLOCKERS)
    }
}

/// Display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Tile type identifier. The discriminant is the digit used in level text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum TileType {
    /// Empty space
    #[default]
    Void = 0,
    /// Plain ground
    Dirt = 1,
    /// Deadly hazard
    Lava = 2,
    /// Collapses after landing
    Crumble = 3,
    /// Slippery ground
    Ice = 4,
    /// Breaks when hit from below
    Breakable = 5,
    /// Slippery, breakable and unstable
    ThinIce = 6,
}

impl TileType {
    /// All tile types in digit order.
    pub const ALL: [TileType; 7] = [
        TileType::Void,
        TileType::Dirt,
        TileType::Lava,
        TileType::Crumble,
        TileType::Ice,
        TileType::Breakable,
        TileType::ThinIce,
    ];

    /// Tile for a level-text digit, `None` for anything else.
    pub fn from_digit(ch: char) -> Option<Self> {
        let index = ch.to_digit(10)? as usize;
        Self::ALL.get(index).copied()
    }

    /// Level-text digit for this tile.
    #[inline]
    pub fn digit(self) -> char {
        char::from(b'0' + self as u8)
    }

    /// Behavior flags (see `behaviors_of`).
    #[inline]
    pub fn behaviors(self) -> BehaviorFlags {
        behaviors_of(self)
    }

    /// Is this the empty tile?
    #[inline]
    pub fn is_void(self) -> bool {
        self == TileType::Void
    }
}

/// Static properties of one tile type.
#[derive(Clone, Copy, Debug)]
pub struct TileProperties {
    /// Display color, `None` for nothing drawn
    pub color: Option<Rgb>,
    /// Physical behaviors
    pub behaviors: BehaviorFlags,
}

/// Property table, indexed by `TileType as usize`.
static TILE_TABLE: [TileProperties; 7] = [
    // Void
    TileProperties { color: None, behaviors: BehaviorFlags::empty() },
    // Dirt
    TileProperties { color: Some(Rgb(100, 140, 30)), behaviors: BehaviorFlags::SOLID },
    // Lava
    TileProperties { color: Some(Rgb(150, 60, 60)), behaviors: BehaviorFlags::KILL },
    // Crumble
    TileProperties { color: Some(Rgb(60, 60, 60)), behaviors: BehaviorFlags::UNSTABLE },
    // Ice
    TileProperties { color: Some(Rgb(150, 180, 240)), behaviors: BehaviorFlags::SLIPPERY },
    // Breakable
    TileProperties { color: Some(Rgb(132, 76, 59)), behaviors: BehaviorFlags::BREAKABLE },
    // ThinIce
    TileProperties {
        color: Some(Rgb(180, 150, 240)),
        behaviors: BehaviorFlags::SLIPPERY
            .union(BehaviorFlags::BREAKABLE)
            .union(BehaviorFlags::UNSTABLE),
    },
];

/// Look up the static properties of a tile.
#[inline]
pub fn properties_of(tile: TileType) -> &'static TileProperties {
    &TILE_TABLE[tile as usize]
}

/// Behavior flags of a tile.
#[inline]
pub fn behaviors_of(tile: TileType) -> BehaviorFlags {
    properties_of(tile).behaviors
}

/// Display color of a tile.
#[inline]
pub fn color_of(tile: TileType) -> Option<Rgb> {
    properties_of(tile).color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_mapping() {
        for tile in TileType::ALL {
            assert_eq!(TileType::from_digit(tile.digit()), Some(tile));
        }
        assert_eq!(TileType::from_digit('7'), None);
        assert_eq!(TileType::from_digit('x'), None);
        assert_eq!(TileType::from_digit(' '), None);
    }

    #[test]
    fn test_void_has_no_behavior() {
        assert!(behaviors_of(TileType::Void).is_empty());
        assert_eq!(color_of(TileType::Void), None);
        assert!(!TileType::Void.behaviors().blocks_vertical());
    }

    #[test]
    fn test_thin_ice_is_union() {
        let flags = behaviors_of(TileType::ThinIce);
        assert_eq!(
            flags,
            behaviors_of(TileType::Ice) | behaviors_of(TileType::Breakable) | behaviors_of(TileType::Crumble)
        );
        assert!(!flags.contains(BehaviorFlags::KILL));
        assert!(!flags.contains(BehaviorFlags::SOLID));
    }

    #[test]
    fn test_blocking_sets() {
        assert!(BehaviorFlags::SOLID.blocks_horizontal());
        assert!(BehaviorFlags::UNSTABLE.blocks_horizontal());
        assert!(BehaviorFlags::SLIPPERY.blocks_horizontal());
        // Breakable tiles only stop vertical motion
        assert!(!BehaviorFlags::BREAKABLE.blocks_horizontal());
        assert!(BehaviorFlags::BREAKABLE.blocks_vertical());
        // Lava is deadly, not solid
        assert!(!BehaviorFlags::KILL.blocks_horizontal());
        assert!(!BehaviorFlags::KILL.blocks_vertical());
    }

    #[test]
    fn test_every_non_void_tile_has_color() {
        for tile in TileType::ALL.iter().skip(1) {
            assert!(color_of(*tile).is_some(), "{:?} should be drawable", tile);
        }
    }
}
