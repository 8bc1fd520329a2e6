//! Reference Breachline server: in-memory store, development tokens.
//!
//! Any well-formed uid is accepted as its own token, and the users listed
//! in `BREACHLINE_SEED_USERS` get a fresh profile with a starting balance.
//! Not for production use.

use std::sync::Arc;

use breachline::prelude::*;
use breachline_store::to_value;

/// Balance given to seeded users.
const SEED_BALANCE_BTC: u64 = 100;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    // Logging comes up first so config warnings are not lost.
    init_logging(LogFormat::from_env(), &ServerConfig::default().log_level);
    let config = ServerConfig::from_env();
    tracing::debug!(
        log_format = %config.log_format,
        log_level = %config.log_level,
        seed_users = config.seed_users.len(),
        "configuration loaded"
    );

    let store = Arc::new(MemoryStore::new());
    for uid in &config.seed_users {
        let profile = UserProfile::new(uid.clone(), uid.as_str(), false)
            .with_balance(BtcAmount::from_btc(SEED_BALANCE_BTC));
        store.set(&profile.key(), to_value(&profile)?).await?;
        tracing::info!(%uid, "seeded user profile");
    }

    let auth = TokenAuthenticator::new().insecure_uid_tokens();
    let server = ServerBuilder::new()
        .config(config)
        .build(store, auth)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await
}
