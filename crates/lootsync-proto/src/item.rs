//! Item snapshots carried by drops.
//!
//! A drop never references a live inventory slot. It owns an immutable
//! [`ItemSnapshot`] taken at the moment the drop was created, so the host can
//! grant exactly that value back to whoever claims it.

/// Host-assigned drop identifier. Strictly increasing, never reused.
pub type DropId = u64;

/// Hero/player identity. `0` means "no owner" (monster loot).
pub type PlayerId = u64;

/// Owner id used for drops nobody caused.
pub const NO_OWNER: PlayerId = 0;

/// Item category.
///
/// All type-dependent eligibility is answered here, so validation code asks
/// a capability instead of comparing kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Weapons, armour, trinkets.
    Equipment,
    /// Potions, food, scrolls.
    Consumable,
    /// Crafting materials.
    Material,
    /// Quest items. Bound to the finder.
    Quest,
}

impl ItemKind {
    /// Whether the item can be broken down into currency.
    pub const fn can_dismantle(self) -> bool {
        matches!(self, Self::Equipment)
    }

    /// Whether several units share one slot.
    pub const fn can_stack(self) -> bool {
        matches!(self, Self::Consumable | Self::Material)
    }

    /// Whether the owner may open the drop to other players.
    pub const fn can_share(self) -> bool {
        !matches!(self, Self::Quest)
    }

    /// Single-character wire code.
    pub const fn code(self) -> char {
        match self {
            Self::Equipment => 'E',
            Self::Consumable => 'C',
            Self::Material => 'M',
            Self::Quest => 'Q',
        }
    }

    /// Parse a wire code. `None` for unknown codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(Self::Equipment),
            "C" => Some(Self::Consumable),
            "M" => Some(Self::Material),
            "Q" => Some(Self::Quest),
            _ => None,
        }
    }
}

/// Item rarity, ordered from least to most valuable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rarity {
    /// Grey.
    Common,
    /// Green.
    Uncommon,
    /// Blue.
    Rare,
    /// Purple.
    Epic,
    /// Orange.
    Legendary,
}

impl Rarity {
    /// All rarities in ascending order.
    pub const ALL: [Self; 5] =
        [Self::Common, Self::Uncommon, Self::Rare, Self::Epic, Self::Legendary];

    /// Numeric wire code (`0..=4`).
    pub const fn code(self) -> u8 {
        match self {
            Self::Common => 0,
            Self::Uncommon => 1,
            Self::Rare => 2,
            Self::Epic => 3,
            Self::Legendary => 4,
        }
    }

    /// Parse a numeric wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

/// A single numeric stat modifier rolled on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatBonus {
    /// Stat identifier (game data table key).
    pub stat: u16,
    /// Signed modifier value.
    pub value: i32,
}

impl StatBonus {
    /// Create a bonus.
    pub const fn new(stat: u16, value: i32) -> Self {
        Self { stat, value }
    }
}

/// Immutable value copy of an item at drop time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemSnapshot {
    /// Item definition id.
    pub item_id: u32,
    /// Category.
    pub kind: ItemKind,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Units in the stack. Always 1 for non-stackable kinds.
    pub stack: u32,
    /// Upgrade level applied by the owner.
    pub upgrade_level: u8,
    /// Rolled stat bonuses.
    pub bonuses: Vec<StatBonus>,
}

impl ItemSnapshot {
    /// Create a single-unit item with no bonuses.
    pub fn new(item_id: u32, kind: ItemKind, rarity: Rarity) -> Self {
        Self { item_id, kind, rarity, stack: 1, upgrade_level: 0, bonuses: Vec::new() }
    }

    /// Set the stack size.
    #[must_use]
    pub fn with_stack(mut self, stack: u32) -> Self {
        self.stack = stack;
        self
    }

    /// Set the upgrade level.
    #[must_use]
    pub fn with_upgrade_level(mut self, level: u8) -> Self {
        self.upgrade_level = level;
        self
    }

    /// Append a stat bonus.
    #[must_use]
    pub fn with_bonus(mut self, stat: u16, value: i32) -> Self {
        self.bonuses.push(StatBonus::new(stat, value));
        self
    }
}

/// World position captured at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// East-west.
    pub x: f32,
    /// Up-down.
    pub y: f32,
    /// North-south.
    pub z: f32,
}

impl Position {
    /// World origin.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a position.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Whether every coordinate is finite, and so survives the wire.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
