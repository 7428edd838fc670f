use async_trait::async_trait;

use super::{Announcement, IssuerWallet, TokenAnnouncement, WalletCredential, WalletError};

pub(crate) const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub(crate) const TEST_FUNDING_ADDRESS: &str = "bcrt1qw508d6qejxtdg4y5r3zarvary0c5xw7kygt080";

/// In-memory issuer wallet. Remembers the announced token across cycles the
/// way a real issuing layer would.
#[derive(Debug, Default)]
pub(crate) struct MockIssuerWallet {
    pub initialized: bool,
    pub init_calls: usize,
    pub announced: Option<TokenAnnouncement>,
    pub announce_calls: usize,
    pub mints: Vec<u128>,
    /// `(status, body)` returned as a rejection from the named step.
    pub reject_init: Option<(u16, String)>,
    pub reject_announce: Option<(u16, String)>,
    pub reject_mint: Option<(u16, String)>,
}

impl MockIssuerWallet {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

fn rejection(reject: &Option<(u16, String)>) -> Option<WalletError> {
    reject.as_ref().map(|(status, body)| WalletError::Rejected {
        status: *status,
        body: body.clone(),
    })
}

#[async_trait]
impl IssuerWallet for MockIssuerWallet {
    async fn initialize(&mut self, _credential: &WalletCredential) -> Result<String, WalletError> {
        self.init_calls += 1;
        if let Some(err) = rejection(&self.reject_init) {
            return Err(err);
        }
        self.initialized = true;
        Ok(TEST_FUNDING_ADDRESS.to_string())
    }

    async fn announce_token(
        &mut self,
        announcement: &TokenAnnouncement,
    ) -> Result<Announcement, WalletError> {
        if !self.initialized {
            return Err(WalletError::NotInitialized);
        }
        self.announce_calls += 1;
        if let Some(err) = rejection(&self.reject_announce) {
            return Err(err);
        }
        match &self.announced {
            Some(existing) if existing == announcement => Ok(Announcement::AlreadyAnnounced),
            Some(_) => Err(WalletError::Rejected {
                status: 409,
                body: "token already announced with different parameters".to_string(),
            }),
            None => {
                self.announced = Some(announcement.clone());
                Ok(Announcement::Announced {
                    announcement_id: format!("ann-{}", announcement.token_ticker),
                })
            }
        }
    }

    async fn mint_tokens(&mut self, amount: u128) -> Result<String, WalletError> {
        if !self.initialized {
            return Err(WalletError::NotInitialized);
        }
        if let Some(err) = rejection(&self.reject_mint) {
            return Err(err);
        }
        self.mints.push(amount);
        Ok(format!("mint-tx-{}", self.mints.len()))
    }
}
