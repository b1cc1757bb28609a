//! Seeding of the demo accounts, one per role.

use keeper_core::{
  demo::{DEMO_ACCOUNTS, DEMO_PASSWORD},
  profile::Profile,
};
use tracing::{debug, info};

use crate::{Error, Result, SqliteStore};

impl SqliteStore {
  /// Make sure every demo account exists with its fixed profile. Safe to run
  /// on every start: existing accounts keep their password and have their
  /// profile overwritten.
  pub async fn seed_demo_accounts(&self) -> Result<Vec<Profile>> {
    let mut profiles = Vec::with_capacity(DEMO_ACCOUNTS.len());
    for account in &DEMO_ACCOUNTS {
      let user = match self.register(account.email, DEMO_PASSWORD).await {
        Ok(user) => user,
        Err(Error::EmailTaken(_)) => {
          debug!(email = account.email, "demo account already registered");
          self
            .find_user_by_email(account.email)
            .await?
            .ok_or_else(|| Error::EmailTaken(account.email.to_owned()))?
        }
        Err(e) => return Err(e),
      };
      profiles.push(self.upsert_profile(account.profile(user.id)).await?);
    }
    info!(count = profiles.len(), "seeded demo accounts");
    Ok(profiles)
  }
}
