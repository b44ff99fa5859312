//! Hbar: a signed count of tinybars (spec §3).

use crate::error::{Error, Result};

pub type Tinybar = i64;

const TINYBARS_PER_HBAR: i64 = 100_000_000;

/// A currency unit, used only to convert whole/fractional hbars into
/// tinybars at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HbarUnit {
    Tinybar,
    Microbar,
    Millibar,
    Hbar,
    Kilobar,
    Megabar,
    Gigabar,
}

impl HbarUnit {
    /// Tinybars per one unit.
    fn tinybars_per_unit(self) -> i64 {
        match self {
            HbarUnit::Tinybar => 1,
            HbarUnit::Microbar => 100,
            HbarUnit::Millibar => 100_000,
            HbarUnit::Hbar => TINYBARS_PER_HBAR,
            HbarUnit::Kilobar => TINYBARS_PER_HBAR * 1_000,
            HbarUnit::Megabar => TINYBARS_PER_HBAR * 1_000_000,
            HbarUnit::Gigabar => TINYBARS_PER_HBAR * 1_000_000_000,
        }
    }
}

/// A signed count of tinybars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hbar(Tinybar);

impl Hbar {
    pub const ZERO: Hbar = Hbar(0);

    /// Construct from a whole number of hbars.
    pub fn new(hbars: i64) -> Self {
        Self(hbars * TINYBARS_PER_HBAR)
    }

    /// Construct directly from a tinybar count.
    pub fn from_tinybars(tinybars: Tinybar) -> Self {
        Self(tinybars)
    }

    /// Construct from a count in the given unit, failing on overflow.
    pub fn from_unit(amount: i64, unit: HbarUnit) -> Result<Self> {
        amount
            .checked_mul(unit.tinybars_per_unit())
            .map(Hbar)
            .ok_or_else(|| Error::BasicParse(format!("hbar amount {amount} {unit:?} overflows tinybars")))
    }

    pub fn to_tinybars(self) -> Tinybar {
        self.0
    }

    pub fn checked_add(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_add(other.0).map(Hbar)
    }

    pub fn checked_neg(self) -> Option<Hbar> {
        self.0.checked_neg().map(Hbar)
    }
}

impl std::fmt::Display for Hbar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / TINYBARS_PER_HBAR;
        let frac = (self.0 % TINYBARS_PER_HBAR).abs();
        if frac == 0 {
            write!(f, "{whole} ℏ")
        } else {
            write!(f, "{whole}.{frac:08} ℏ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_converts_to_tinybars() {
        assert_eq!(Hbar::new(1).to_tinybars(), 100_000_000);
        assert_eq!(Hbar::new(-2).to_tinybars(), -200_000_000);
    }

    #[test]
    fn from_unit_exact_conversion() {
        let h = Hbar::from_unit(5, HbarUnit::Microbar).unwrap();
        assert_eq!(h.to_tinybars(), 500);
    }

    #[test]
    fn from_unit_overflow_errors() {
        let result = Hbar::from_unit(i64::MAX, HbarUnit::Gigabar);
        assert!(result.is_err());
    }

    #[test]
    fn checked_add_detects_overflow() {
        let max = Hbar::from_tinybars(i64::MAX);
        assert!(max.checked_add(Hbar::from_tinybars(1)).is_none());
        assert_eq!(
            Hbar::new(1).checked_add(Hbar::new(2)),
            Some(Hbar::new(3))
        );
    }

    #[test]
    fn ordering_compares_tinybars() {
        assert!(Hbar::new(1) < Hbar::new(2));
        assert!(Hbar::from_tinybars(-1) < Hbar::ZERO);
    }

    #[test]
    fn display_whole_hbar() {
        assert_eq!(Hbar::new(3).to_string(), "3 ℏ");
    }
}
