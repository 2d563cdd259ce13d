use tracing::{debug, info};

use crate::config::SimulatorConfig;
use crate::directory::ContactDirectory;
use crate::identity::SessionProfile;
use crate::wallet::Wallet;
use crate::wallet_backend::{LedgerStore, WalletError};

/// Outcome of [`start_session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStart {
    pub wallet: Wallet,
    /// `true` on the owner's first session.
    pub created: bool,
}

/// Get-or-create the wallet for `profile` and, on first use, seed the
/// configured default contacts. Calling it again for the same owner changes
/// nothing.
pub fn start_session<S>(
    store: &S,
    config: &SimulatorConfig,
    profile: &SessionProfile,
) -> Result<SessionStart, WalletError>
where
    S: LedgerStore + ContactDirectory + ?Sized,
{
    let owner = &profile.owner_id;
    let (wallet, created) = store.open_wallet(owner, config.starting_balance)?;
    if created {
        for seed in &config.default_contacts {
            store.add_contact(owner, &seed.name, &seed.phone)?;
        }
        info!(
            %owner,
            name = %profile.display_name,
            balance = %wallet.balance,
            contacts = config.default_contacts.len(),
            "new simulator account"
        );
    } else {
        debug!(%owner, "resumed session");
    }
    Ok(SessionStart { wallet, created })
}
