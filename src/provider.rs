//! External collaborators: chain data, event network, publisher, wallet
//!
//! The lottery core never performs I/O. These traits are the seams where a
//! deployment plugs in a block explorer, a relay pool and a Lightning
//! wallet. `memory` holds in-process implementations for tests and dry runs.

use crate::messages::LotteryMessage;
use crate::payout::ProfileMetadata;
use crate::receipt::Receipt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out")]
    Timeout,
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    /// Transient failures worth polling again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::Timeout)
    }
}

/// Public chain data. Both calls are idempotent reads.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn current_height(&self) -> Result<u64, ProviderError>;

    /// Hash at `height` as 64 hex chars; `None` while the block is not mined.
    async fn block_hash(&self, height: u64) -> Result<Option<String>, ProviderError>;
}

/// Pub-sub event network holding receipts and buyer profiles.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Receipts paying toward `note_id`. May be partial on timeout.
    async fn receipts(&self, note_id: &str) -> Result<Vec<Receipt>, ProviderError>;

    async fn profile(&self, pubkey: &str) -> Result<Option<ProfileMetadata>, ProviderError>;
}

/// Signs and distributes lottery messages; returns the event id.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &LotteryMessage) -> Result<String, ProviderError>;
}

/// Proof that a payout went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub preimage: String,
    pub invoice: String,
}

#[async_trait]
pub trait PaymentSender: Send + Sync {
    async fn pay(
        &self,
        address: &str,
        amount_sats: u64,
        comment: &str,
    ) -> Result<PaymentProof, ProviderError>;
}

pub mod memory {
    //! In-memory collaborators

    use super::*;
    use crate::crypto::sha3_hex;
    use std::collections::{BTreeMap, HashMap};
    use tokio::sync::RwLock;

    /// Chain with a settable tip.
    #[derive(Default)]
    pub struct MemoryChain {
        height: RwLock<u64>,
        hashes: RwLock<BTreeMap<u64, String>>,
    }

    impl MemoryChain {
        pub fn new(height: u64) -> Self {
            Self { height: RwLock::new(height), hashes: RwLock::new(BTreeMap::new()) }
        }

        /// Mine up to `height`, recording `hash` for that block.
        pub async fn mine(&self, height: u64, hash: impl Into<String>) {
            self.hashes.write().await.insert(height, hash.into());
            let mut tip = self.height.write().await;
            *tip = (*tip).max(height);
        }

        pub async fn set_height(&self, height: u64) {
            *self.height.write().await = height;
        }
    }

    #[async_trait]
    impl BlockSource for MemoryChain {
        async fn current_height(&self) -> Result<u64, ProviderError> {
            Ok(*self.height.read().await)
        }

        async fn block_hash(&self, height: u64) -> Result<Option<String>, ProviderError> {
            if height > *self.height.read().await {
                return Ok(None);
            }
            Ok(self.hashes.read().await.get(&height).cloned())
        }
    }

    /// Event store keyed by target note.
    #[derive(Default)]
    pub struct MemoryEvents {
        receipts: RwLock<HashMap<String, Vec<Receipt>>>,
        profiles: RwLock<HashMap<String, ProfileMetadata>>,
        profile_failure: RwLock<Option<ProviderError>>,
    }

    impl MemoryEvents {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_receipt(&self, note_id: &str, receipt: Receipt) {
            self.receipts
                .write()
                .await
                .entry(note_id.to_string())
                .or_default()
                .push(receipt);
        }

        pub async fn set_profile(&self, pubkey: &str, profile: ProfileMetadata) {
            self.profiles.write().await.insert(pubkey.to_string(), profile);
        }

        /// Make every profile lookup fail with `error` until cleared.
        pub async fn set_profile_failure(&self, error: Option<ProviderError>) {
            *self.profile_failure.write().await = error;
        }
    }

    #[async_trait]
    impl EventSource for MemoryEvents {
        async fn receipts(&self, note_id: &str) -> Result<Vec<Receipt>, ProviderError> {
            Ok(self.receipts.read().await.get(note_id).cloned().unwrap_or_default())
        }

        async fn profile(&self, pubkey: &str) -> Result<Option<ProfileMetadata>, ProviderError> {
            if let Some(e) = self.profile_failure.read().await.clone() {
                return Err(e);
            }
            Ok(self.profiles.read().await.get(pubkey).cloned())
        }
    }

    /// Publisher that records messages; event id = SHA3 of the content.
    #[derive(Default)]
    pub struct MemoryPublisher {
        published: RwLock<Vec<(String, LotteryMessage)>>,
        fail: RwLock<bool>,
    }

    impl MemoryPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn published(&self) -> Vec<(String, LotteryMessage)> {
            self.published.read().await.clone()
        }

        pub async fn set_failing(&self, fail: bool) {
            *self.fail.write().await = fail;
        }
    }

    #[async_trait]
    impl Publisher for MemoryPublisher {
        async fn publish(&self, message: &LotteryMessage) -> Result<String, ProviderError> {
            if *self.fail.read().await {
                return Err(ProviderError::Unavailable("relays unreachable".into()));
            }
            let id = sha3_hex(message.content().as_bytes());
            self.published.write().await.push((id.clone(), message.clone()));
            Ok(id)
        }
    }

    /// Wallet that settles instantly, or fails on demand.
    #[derive(Default)]
    pub struct MemoryWallet {
        payments: RwLock<Vec<(String, u64)>>,
        fail: RwLock<bool>,
    }

    impl MemoryWallet {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn payments(&self) -> Vec<(String, u64)> {
            self.payments.read().await.clone()
        }

        pub async fn set_failing(&self, fail: bool) {
            *self.fail.write().await = fail;
        }
    }

    #[async_trait]
    impl PaymentSender for MemoryWallet {
        async fn pay(
            &self,
            address: &str,
            amount_sats: u64,
            comment: &str,
        ) -> Result<PaymentProof, ProviderError> {
            if *self.fail.read().await {
                return Err(ProviderError::Rejected("no route".into()));
            }
            let mut payments = self.payments.write().await;
            payments.push((address.to_string(), amount_sats));
            let preimage = sha3_hex(format!("{}:{}:{}", address, amount_sats, payments.len()).as_bytes());
            Ok(PaymentProof {
                invoice: format!("memory:{}:{}:{}", address, amount_sats, comment),
                preimage,
            })
        }
    }
}
