//! Packed octant path identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{CullError, Result};

/// Deepest level an [`OctantId`] can address.
pub const MAX_LEVEL: u8 = 19;

const LEVEL_SHIFT: u32 = 57;
const PATH_MASK: u64 = (1 << LEVEL_SHIFT) - 1;

/// Path from the root to an octant, packed into 64 bits.
///
/// Layout: the level lives in the top 7 bits; below it each level stores the
/// child position (0..8) in three bits, level 1 in bits 54..57 down to level
/// 19 in bits 0..3. Bit 0 of a position selects +x, bit 1 +z and bit 2 +y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct OctantId(u64);

impl OctantId {
    pub const fn root() -> Self {
        Self(0)
    }

    /// Rebuild from [`OctantId::raw`], rejecting invalid levels or stray bits.
    pub fn from_raw(raw: u64) -> Result<Self> {
        let level = (raw >> LEVEL_SHIFT) as u8;
        if level > MAX_LEVEL {
            return Err(CullError::Input(format!(
                "octant id level {level} exceeds {MAX_LEVEL}"
            )));
        }
        let used = PATH_MASK & !((1u64 << shift(level)) - 1);
        if raw & PATH_MASK & !used != 0 {
            return Err(CullError::Input(format!(
                "octant id {raw:#x} has path bits below level {level}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn level(self) -> u8 {
        (self.0 >> LEVEL_SHIFT) as u8
    }

    pub fn is_root(self) -> bool {
        self.level() == 0
    }

    /// Id of the child at `pos` (0..8).
    pub fn child(self, pos: u8) -> Result<Self> {
        if pos > 7 {
            return Err(CullError::Contract(format!(
                "child position {pos} out of range 0..8"
            )));
        }
        let level = self.level() + 1;
        if level > MAX_LEVEL {
            return Err(CullError::Contract(format!(
                "octant {self} is at the maximum level {MAX_LEVEL}"
            )));
        }
        let path = (self.0 & PATH_MASK) | (u64::from(pos) << shift(level));
        Ok(Self((u64::from(level) << LEVEL_SHIFT) | path))
    }

    pub fn parent(self) -> Option<Self> {
        let level = self.level();
        if level == 0 {
            return None;
        }
        let path = self.0 & PATH_MASK & !(0b111 << shift(level));
        Some(Self((u64::from(level - 1) << LEVEL_SHIFT) | path))
    }

    /// Child position taken at `level` (1-based), `None` past this id's level.
    pub fn position_at(self, level: u8) -> Option<u8> {
        if level == 0 || level > self.level() {
            return None;
        }
        Some(((self.0 >> shift(level)) & 0b111) as u8)
    }

    /// Position of this octant within its parent; `None` for the root.
    pub fn last_position(self) -> Option<u8> {
        self.position_at(self.level())
    }

    /// Child positions from the root downwards.
    pub fn positions(self) -> impl Iterator<Item = u8> {
        (1..=self.level()).filter_map(move |l| self.position_at(l))
    }

    /// Whether `self` lies on the path from the root to `other` (or equals it).
    pub fn is_ancestor_of(self, other: OctantId) -> bool {
        let level = self.level();
        if level > other.level() {
            return false;
        }
        (1..=level).all(|l| self.position_at(l) == other.position_at(l))
    }
}

fn shift(level: u8) -> u32 {
    u32::from(MAX_LEVEL - level) * 3
}

impl fmt::Display for OctantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("r")?;
        for pos in self.positions() {
            write!(f, "{pos}")?;
        }
        Ok(())
    }
}

impl FromStr for OctantId {
    type Err = CullError;

    /// Parse the `r0123` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix('r')
            .ok_or_else(|| CullError::Input(format!("octant id '{s}' must start with 'r'")))?;
        digits.chars().try_fold(Self::root(), |id, c| {
            let pos = c
                .to_digit(8)
                .ok_or_else(|| CullError::Input(format!("invalid octant digit '{c}' in '{s}'")))?;
            id.child(pos as u8)
                .map_err(|_| CullError::Input(format!("octant id '{s}' is too deep")))
        })
    }
}

impl Serialize for OctantId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_path() {
        let root = OctantId::root();
        assert_eq!(root.level(), 0);
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.last_position(), None);
        assert_eq!(root.to_string(), "r");
    }

    #[test]
    fn child_extends_path() {
        let id = OctantId::root().child(3).unwrap().child(0).unwrap().child(7).unwrap();
        assert_eq!(id.level(), 3);
        assert_eq!(id.position_at(1), Some(3));
        assert_eq!(id.position_at(2), Some(0));
        assert_eq!(id.position_at(3), Some(7));
        assert_eq!(id.position_at(4), None);
        assert_eq!(id.last_position(), Some(7));
        assert_eq!(id.to_string(), "r307");
        assert_eq!(id.positions().collect::<Vec<_>>(), vec![3, 0, 7]);
    }

    #[test]
    fn parent_undoes_child() {
        let a = OctantId::root().child(5).unwrap();
        let b = a.child(2).unwrap();
        assert_eq!(b.parent(), Some(a));
        assert_eq!(a.parent(), Some(OctantId::root()));
        assert!(a.is_ancestor_of(b));
        assert!(!b.is_ancestor_of(a));
        assert!(OctantId::root().is_ancestor_of(b));
    }

    #[test]
    fn siblings_differ() {
        let root = OctantId::root();
        let ids: Vec<_> = (0..8).map(|p| root.child(p).unwrap()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn invalid_position_is_contract_error() {
        assert!(matches!(
            OctantId::root().child(8),
            Err(CullError::Contract(_))
        ));
    }

    #[test]
    fn max_level_is_enforced() {
        let mut id = OctantId::root();
        for _ in 0..MAX_LEVEL {
            id = id.child(1).unwrap();
        }
        assert_eq!(id.level(), MAX_LEVEL);
        assert_eq!(id.position_at(MAX_LEVEL), Some(1));
        assert!(matches!(id.child(0), Err(CullError::Contract(_))));
    }

    #[test]
    fn raw_round_trip() {
        let id: OctantId = "r0421".parse().unwrap();
        assert_eq!(OctantId::from_raw(id.raw()).unwrap(), id);
        assert!(OctantId::from_raw(u64::MAX).is_err());
        // level 1 with a bit in the level 19 slot
        let stray = (1u64 << LEVEL_SHIFT) | 0b1;
        assert!(OctantId::from_raw(stray).is_err());
    }

    #[test]
    fn parse_display_form() {
        let id: OctantId = "r16".parse().unwrap();
        assert_eq!(id, OctantId::root().child(1).unwrap().child(6).unwrap());
        assert!("16".parse::<OctantId>().is_err());
        assert!("r18".parse::<OctantId>().is_err());
        assert!("r00000000000000000000".parse::<OctantId>().is_err());
        assert_eq!("r".parse::<OctantId>().unwrap(), OctantId::root());
    }

    #[test]
    fn serializes_as_display_string() {
        let id: OctantId = "r705".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"r705\"");
    }
}
