//! User profiles and the `$BTC` amount type.

use std::fmt;

use breachline_protocol::Uid;
use breachline_store::DocKey;
use serde::{Deserialize, Serialize};

/// Collection holding one [`UserProfile`] per uid.
pub const USERS: &str = "users";

/// Status every new account starts with.
pub const DEFAULT_STATUS: &str = "Skid 🎓";

/// Store key of a user's profile.
pub fn profile_key(uid: &Uid) -> DocKey {
    DocKey::new(USERS, uid.as_str())
}

// ---------------------------------------------------------------------------
// BtcAmount
// ---------------------------------------------------------------------------

/// A non-negative `$BTC` amount, held as an integer number of satoshis.
///
/// Serialized as the bare satoshi count. Displayed with eight decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BtcAmount(u64);

impl BtcAmount {
    pub const SATS_PER_BTC: u64 = 100_000_000;
    pub const ZERO: Self = Self(0);

    pub const fn from_sats(sats: u64) -> Self {
        Self(sats)
    }

    /// Whole coins. Saturates at `u64::MAX` satoshis.
    pub const fn from_btc(btc: u64) -> Self {
        Self(btc.saturating_mul(Self::SATS_PER_BTC))
    }

    pub const fn as_sats(self) -> u64 {
        self.0
    }

    /// `self - other`, or `None` if that would go below zero.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Display for BtcAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:08}",
            self.0 / Self::SATS_PER_BTC,
            self.0 % Self::SATS_PER_BTC
        )
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// A user's persisted profile (`users/<uid>`).
///
/// Created by the identity provider when an account is made; the core
/// only ever changes `status`, `prestige` and `btcBalance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: Uid,
    pub username: String,
    pub status: String,
    pub prestige: u64,
    pub btc_balance: BtcAmount,
    pub is_guest: bool,
    /// Unix milliseconds. Absent on profiles written by older clients.
    #[serde(default)]
    pub created_at: u64,
}

impl UserProfile {
    /// A fresh profile with the default status and an empty wallet.
    pub fn new(uid: Uid, username: impl Into<String>, is_guest: bool) -> Self {
        Self {
            uid,
            username: username.into(),
            status: DEFAULT_STATUS.to_string(),
            prestige: 0,
            btc_balance: BtcAmount::ZERO,
            is_guest,
            created_at: 0,
        }
    }

    pub fn with_balance(mut self, balance: BtcAmount) -> Self {
        self.btc_balance = balance;
        self
    }

    pub fn key(&self) -> DocKey {
        profile_key(&self.uid)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_btc_amount_display_has_eight_decimals() {
        assert_eq!(BtcAmount::from_btc(5).to_string(), "5.00000000");
        assert_eq!(BtcAmount::from_sats(1).to_string(), "0.00000001");
        assert_eq!(BtcAmount::from_sats(150_000_000).to_string(), "1.50000000");
    }

    #[test]
    fn test_btc_amount_checked_sub_refuses_negative() {
        let five = BtcAmount::from_btc(5);
        let ten = BtcAmount::from_btc(10);
        assert_eq!(ten.checked_sub(five), Some(five));
        assert_eq!(five.checked_sub(ten), None);
        assert_eq!(five.checked_sub(five), Some(BtcAmount::ZERO));
    }

    #[test]
    fn test_user_profile_new_defaults() {
        let profile = UserProfile::new(Uid::new("alice").unwrap(), "Alice", false);
        assert_eq!(profile.status, "Skid 🎓");
        assert_eq!(profile.prestige, 0);
        assert_eq!(profile.btc_balance, BtcAmount::ZERO);
        assert_eq!(profile.key().to_string(), "users/alice");
    }

    #[test]
    fn test_user_profile_json_is_camel_case() {
        let profile = UserProfile::new(Uid::new("alice").unwrap(), "Alice", true)
            .with_balance(BtcAmount::from_sats(42));
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["btcBalance"], json!(42));
        assert_eq!(value["isGuest"], json!(true));
        assert_eq!(value["uid"], json!("alice"));
    }
}
