//! The fixed catalog of purchasable tiers.

use std::fmt;

use crate::BtcAmount;

/// Something the store sells.
///
/// Status tiers replace the buyer's `status`; [`StatusTier::Prestige`]
/// instead adds to `prestige` and can be bought repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTier {
    Greyhat,
    Dev,
    Blackhat,
    Prestige,
}

impl StatusTier {
    /// Every item, cheapest first.
    pub const ALL: [Self; 4] = [Self::Greyhat, Self::Dev, Self::Blackhat, Self::Prestige];

    /// Stable id used by clients.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Greyhat => "greyhat",
            Self::Dev => "dev",
            Self::Blackhat => "blackhat",
            Self::Prestige => "prestige",
        }
    }

    /// Name shown in the store and written to `status`.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Greyhat => "Greyhat 💻",
            Self::Dev => "Dev 🔏",
            Self::Blackhat => "Blackhat 🎩",
            Self::Prestige => "+1 Prestige",
        }
    }

    pub fn cost(self) -> BtcAmount {
        match self {
            Self::Greyhat => BtcAmount::from_btc(1),
            Self::Dev => BtcAmount::from_btc(10),
            Self::Blackhat => BtcAmount::from_btc(50),
            Self::Prestige => BtcAmount::from_btc(100),
        }
    }

    /// Prestige granted per purchase, for prestige items.
    pub fn prestige_delta(self) -> Option<u32> {
        match self {
            Self::Prestige => Some(1),
            _ => None,
        }
    }

    /// Finds an item by slug or by exact display name.
    pub fn lookup(item_id: &str) -> Option<Self> {
        let id = item_id.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.slug().eq_ignore_ascii_case(id) || tier.display_name() == id)
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_slug_and_display_name() {
        assert_eq!(StatusTier::lookup("dev"), Some(StatusTier::Dev));
        assert_eq!(StatusTier::lookup("Blackhat 🎩"), Some(StatusTier::Blackhat));
        assert_eq!(StatusTier::lookup("+1 Prestige"), Some(StatusTier::Prestige));
    }

    #[test]
    fn test_lookup_unknown_item_is_none() {
        assert_eq!(StatusTier::lookup("Whitehat"), None);
        assert_eq!(StatusTier::lookup(""), None);
    }

    #[test]
    fn test_only_prestige_has_delta() {
        for tier in StatusTier::ALL {
            assert_eq!(tier.prestige_delta().is_some(), tier == StatusTier::Prestige);
        }
    }

    #[test]
    fn test_catalog_prices() {
        let prices: Vec<u64> = StatusTier::ALL
            .iter()
            .map(|t| t.cost().as_sats() / BtcAmount::SATS_PER_BTC)
            .collect();
        assert_eq!(prices, vec![1, 10, 50, 100]);
    }
}
