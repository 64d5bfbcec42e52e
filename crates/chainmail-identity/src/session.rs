//! The per-login session key cache.
//!
//! The only plaintext private-key material in the whole system lives here,
//! for the lifetime of one login session. The cache is an explicit context
//! object handed to the operations that need it - there is no global
//! state - with clear creation (first successful decrypt) and teardown
//! (logout) rules.
//!
//! Population is guarded by an async mutex held across the wallet prompt:
//! a second decrypt request arriving while the first is still waiting on
//! the wallet awaits the in-flight population instead of re-prompting the
//! user. That de-duplication is required behavior, not an optimization.

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use chainmail_wallet::WalletSigner;

use crate::vault::{recover_private_key, StorageWrappedPrivateKey};
use crate::{IdentityKeyPair, Result};

/// In-memory cache of the current account's decrypted identity key.
///
/// Never persisted to durable storage. Dropping the session (or calling
/// [`Session::clear`]) zeroizes the key material.
#[derive(Default)]
pub struct Session {
    slot: Mutex<Option<IdentityKeyPair>>,
}

impl Session {
    /// Create a locked session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the decrypted identity key, unlocking on first use.
    ///
    /// The returned guard borrows the cached keypair; concurrent callers
    /// serialize on it, so at most one wallet prompt is ever in flight.
    ///
    /// # Errors
    ///
    /// Propagates recovery errors. A rejected wallet prompt leaves the
    /// session unchanged: still locked if it was locked, and an already
    /// cached key stays cached.
    pub async fn unlocked<'a, W: WalletSigner + ?Sized>(
        &'a self,
        wrapped: &StorageWrappedPrivateKey,
        wallet: &W,
    ) -> Result<MappedMutexGuard<'a, IdentityKeyPair>> {
        let mut guard = self.slot.lock().await;
        if guard.is_none() {
            let keypair = recover_private_key(wrapped, wallet).await?;
            *guard = Some(keypair);
        }
        Ok(MutexGuard::map(guard, |slot| {
            slot.as_mut().expect("slot populated above")
        }))
    }

    /// Whether the identity key is currently cached.
    pub async fn is_unlocked(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Drop the cached key (logout / session end).
    ///
    /// The key material is zeroized by drop.
    pub async fn clear(&self) {
        self.slot.lock().await.take();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::protect_private_key;
    use crate::IdentityError;
    use async_trait::async_trait;
    use chainmail_wallet::{
        Address, LocalWallet, Result as WalletResult, TypedData, WalletError, WalletSignature,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Wallet wrapper that counts signature prompts.
    struct CountingWallet {
        inner: LocalWallet,
        prompts: AtomicUsize,
    }

    impl CountingWallet {
        fn new(inner: LocalWallet) -> Self {
            Self {
                inner,
                prompts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WalletSigner for CountingWallet {
        fn address(&self) -> Address {
            self.inner.address()
        }

        async fn sign_typed_data(&self, typed: &TypedData) -> WalletResult<WalletSignature> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            // Let the other task reach the session while this prompt is open.
            tokio::task::yield_now().await;
            self.inner.sign_typed_data(typed).await
        }
    }

    /// Wallet that always declines the prompt.
    struct RejectingWallet {
        address: Address,
    }

    #[async_trait]
    impl WalletSigner for RejectingWallet {
        fn address(&self) -> Address {
            self.address
        }

        async fn sign_typed_data(&self, _typed: &TypedData) -> WalletResult<WalletSignature> {
            Err(WalletError::Rejected)
        }
    }

    #[tokio::test]
    async fn test_unlock_populates_lazily() {
        let wallet = LocalWallet::generate();
        let keypair = IdentityKeyPair::generate();
        let wrapped = protect_private_key(&keypair, &wallet).await.unwrap();

        let session = Session::new();
        assert!(!session.is_unlocked().await);

        {
            let unlocked = session.unlocked(&wrapped, &wallet).await.unwrap();
            assert_eq!(unlocked.public_key(), keypair.public_key());
        }
        assert!(session.is_unlocked().await);
    }

    #[tokio::test]
    async fn test_concurrent_unlock_prompts_once() {
        let wallet = Arc::new(CountingWallet::new(LocalWallet::generate()));
        let keypair = IdentityKeyPair::generate();
        let wrapped = protect_private_key(&keypair, wallet.as_ref()).await.unwrap();
        let prompts_before = wallet.prompts.load(Ordering::SeqCst);

        let session = Arc::new(Session::new());
        let mut handles = Vec::new();
        for _ in 0..2 {
            let session = Arc::clone(&session);
            let wallet = Arc::clone(&wallet);
            let wrapped = wrapped.clone();
            handles.push(tokio::spawn(async move {
                let unlocked = session.unlocked(&wrapped, wallet.as_ref()).await.unwrap();
                unlocked.public_key().clone()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Exactly one Sign_Salt prompt for the two concurrent requests; the
        // second awaited the in-flight population.
        assert_eq!(wallet.prompts.load(Ordering::SeqCst) - prompts_before, 1);
    }

    #[tokio::test]
    async fn test_rejection_leaves_session_locked() {
        let wallet = LocalWallet::generate();
        let keypair = IdentityKeyPair::generate();
        let wrapped = protect_private_key(&keypair, &wallet).await.unwrap();

        let session = Session::new();
        let rejecting = RejectingWallet {
            address: wallet.address(),
        };

        let result = session.unlocked(&wrapped, &rejecting).await;
        assert!(matches!(
            result,
            Err(IdentityError::Wallet(WalletError::Rejected))
        ));
        assert!(!session.is_unlocked().await);

        // Retry with the real wallet succeeds; no state was lost.
        assert!(session.unlocked(&wrapped, &wallet).await.is_ok());
    }

    #[tokio::test]
    async fn test_cached_key_survives_later_rejection() {
        let wallet = LocalWallet::generate();
        let keypair = IdentityKeyPair::generate();
        let wrapped = protect_private_key(&keypair, &wallet).await.unwrap();

        let session = Session::new();
        session.unlocked(&wrapped, &wallet).await.unwrap();

        // Once cached, even a rejecting wallet gets the key without a prompt.
        let rejecting = RejectingWallet {
            address: wallet.address(),
        };
        assert!(session.unlocked(&wrapped, &rejecting).await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_locks_session() {
        let wallet = LocalWallet::generate();
        let keypair = IdentityKeyPair::generate();
        let wrapped = protect_private_key(&keypair, &wallet).await.unwrap();

        let session = Session::new();
        session.unlocked(&wrapped, &wallet).await.unwrap();
        session.clear().await;
        assert!(!session.is_unlocked().await);
    }
}
