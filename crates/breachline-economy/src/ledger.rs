//! Balance-debiting purchases.

use std::sync::Arc;

use breachline_protocol::Uid;
use breachline_store::{FieldPath, Store, Update, to_value};
use serde_json::Value;

use crate::{BtcAmount, EconomyError, StatusTier, UserProfile, profile_key};

/// A committed purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub item: StatusTier,
    /// Balance after the debit.
    pub balance: BtcAmount,
}

impl Purchase {
    /// The confirmation shown to the buyer.
    pub fn message(&self) -> String {
        format!("Successfully purchased {}!", self.item.display_name())
    }
}

/// Sells catalog items against users' `$BTC` balances.
pub struct Ledger<S> {
    store: Arc<S>,
}

impl<S> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> Ledger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Buys `item_id` for `uid`.
    ///
    /// Runs as one transaction: the profile is read, checked, and written
    /// back with the debited balance plus the item's effect (prestige
    /// increment or new status), or nothing is written at all.
    ///
    /// # Errors
    /// - [`EconomyError::UnknownItem`] if `item_id` is not in the catalog.
    /// - [`EconomyError::ProfileNotFound`] if `uid` has no profile.
    /// - [`EconomyError::GuestPurchase`] for guest accounts.
    /// - [`EconomyError::InsufficientBalance`] if the balance is below the
    ///   price.
    pub async fn purchase(&self, uid: &Uid, item_id: &str) -> Result<Purchase, EconomyError> {
        let item = StatusTier::lookup(item_id)
            .ok_or_else(|| EconomyError::UnknownItem(item_id.to_string()))?;
        let key = profile_key(uid);

        let purchase: Result<Purchase, EconomyError> = self
            .store
            .run_transaction(|tx| {
                let profile: UserProfile = tx
                    .get_as(&key)?
                    .ok_or_else(|| EconomyError::ProfileNotFound(uid.clone()))?;
                if profile.is_guest {
                    return Err(EconomyError::GuestPurchase);
                }
                let cost = item.cost();
                let balance = profile.btc_balance.checked_sub(cost).ok_or(
                    EconomyError::InsufficientBalance {
                        balance: profile.btc_balance,
                        cost,
                    },
                )?;

                let update = Update::new().set(FieldPath::field("btcBalance"), to_value(&balance)?);
                let update = match item.prestige_delta() {
                    Some(delta) => update.increment(FieldPath::field("prestige"), i64::from(delta)),
                    None => update.set(
                        FieldPath::field("status"),
                        Value::from(item.display_name()),
                    ),
                };
                tx.update(&key, update);
                Ok(Purchase { item, balance })
            })
            .await;

        match &purchase {
            Ok(p) => tracing::info!(%uid, item = item.slug(), balance = %p.balance, "purchase applied"),
            Err(e) => tracing::debug!(%uid, item = item.slug(), error = %e, "purchase rejected"),
        }
        purchase
    }

    /// Reads a profile outside any transaction.
    pub async fn profile(&self, uid: &Uid) -> Result<Option<UserProfile>, EconomyError> {
        let snapshot = self.store.get(&profile_key(uid)).await?;
        Ok(snapshot.map(|s| s.decode()).transpose()?)
    }
}
