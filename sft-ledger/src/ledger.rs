//! Main ledger orchestration layer
//!
//! This module ties together state, actor, snapshot and metrics components
//! into the public API. Mutations go through the single-writer actor;
//! queries read the shared state directly.
//!
//! The caller identity on every mutation is whatever the hosting
//! environment authenticated. The ledger trusts it as given.
//!
//! # Example
//!
//! ```no_run
//! use sft_ledger::{Config, Ledger, Principal, Slot};
//!
//! #[tokio::main]
//! async fn main() -> sft_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!     let alice = Principal::new("alice");
//!     let bob = Principal::new("bob");
//!
//!     let id = ledger.mint(alice.clone(), Slot::new(1), 10_000).await?;
//!     let split = ledger.transfer_value(&alice, id, bob, 2_500).await?;
//!     assert_eq!(ledger.value_of(split)?, 2_500);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    snapshot,
    state::LedgerState,
    types::{EventRecord, Principal, Slot, Token, TokenId, Value},
    Config, Result,
};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct state access (for reads)
    state: Arc<RwLock<LedgerState>>,

    /// Metrics (if enabled)
    metrics: Option<Arc<Metrics>>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration.
    ///
    /// Restores from `config.snapshot_path` when that file exists, otherwise
    /// starts empty.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let state = match &config.snapshot_path {
            Some(path) if path.exists() => snapshot::load(path)?,
            _ => LedgerState::new(),
        };
        let live_tokens = state.total_supply();
        let state = Arc::new(RwLock::new(state));

        let metrics = if config.metrics_enabled {
            let metrics = Arc::new(Metrics::new()?);
            metrics.set_live_tokens(live_tokens);
            Some(metrics)
        } else {
            None
        };

        let handle = spawn_ledger_actor(
            state.clone(),
            config.mailbox_capacity,
            config.event_channel_capacity,
            metrics.clone(),
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            live_tokens,
            "Ledger opened"
        );

        Ok(Self {
            handle,
            state,
            metrics,
            config,
        })
    }

    /// Cloneable handle for issuing mutations from other tasks
    pub fn handle(&self) -> LedgerHandle {
        self.handle.clone()
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_deref()
    }

    // Mutations

    /// Mint a token for `recipient`. Fails `InvalidRecipient` on the null principal.
    pub async fn mint(&self, recipient: Principal, slot: Slot, value: Value) -> Result<TokenId> {
        self.handle.mint(recipient, slot, value).await
    }

    /// Destroy a token (owner, operator or approved principal only)
    pub async fn burn(&self, caller: &Principal, token_id: TokenId) -> Result<()> {
        self.handle.burn(caller.clone(), token_id).await
    }

    /// Split `amount` off `token_id` into a brand-new token owned by `to`.
    ///
    /// Authorized for the owner, the owner's operators, the token's single
    /// approved principal (for any amount, no allowance needed) and spenders
    /// whose value allowance covers `amount` (the allowance is drawn down).
    pub async fn transfer_value(
        &self,
        caller: &Principal,
        token_id: TokenId,
        to: Principal,
        amount: Value,
    ) -> Result<TokenId> {
        self.handle
            .transfer_value(caller.clone(), token_id, to, amount)
            .await
    }

    /// Move `amount` from one token into another token of the same slot
    pub async fn transfer_value_to_token(
        &self,
        caller: &Principal,
        from_token: TokenId,
        to_token: TokenId,
        amount: Value,
    ) -> Result<()> {
        self.handle
            .transfer_value_to_token(caller.clone(), from_token, to_token, amount)
            .await
    }

    /// Give `token_id`, whole value included, to `to`.
    ///
    /// A value allowance alone does not authorize this.
    pub async fn transfer_ownership(
        &self,
        caller: &Principal,
        token_id: TokenId,
        to: Principal,
    ) -> Result<()> {
        self.handle
            .transfer_ownership(caller.clone(), token_id, to)
            .await
    }

    /// Set (or clear, with the null principal) the single approved principal.
    ///
    /// Watch out: the approved principal can also spend the token's entire
    /// value, independent of any value allowance.
    pub async fn approve_token(
        &self,
        caller: &Principal,
        token_id: TokenId,
        approved: Principal,
    ) -> Result<()> {
        self.handle
            .approve_token(caller.clone(), token_id, approved)
            .await
    }

    /// Set `spender`'s allowance on `token_id` to exactly `amount`
    pub async fn approve_value(
        &self,
        caller: &Principal,
        token_id: TokenId,
        spender: Principal,
        amount: Value,
    ) -> Result<()> {
        self.handle
            .approve_value(caller.clone(), token_id, spender, amount)
            .await
    }

    /// Enable or disable `operator` for all of the caller's tokens
    pub async fn set_operator_approval(
        &self,
        caller: &Principal,
        operator: Principal,
        enabled: bool,
    ) -> Result<()> {
        self.handle
            .set_operator_approval(caller.clone(), operator, enabled)
            .await
    }

    // Queries

    /// Slot of a token
    pub fn slot_of(&self, token_id: TokenId) -> Result<Slot> {
        self.state.read().slot_of(token_id)
    }

    /// Owner of a token
    pub fn owner_of(&self, token_id: TokenId) -> Result<Principal> {
        self.state.read().owner_of(token_id)
    }

    /// Value of a token
    pub fn value_of(&self, token_id: TokenId) -> Result<Value> {
        self.state.read().value_of(token_id)
    }

    /// Full token record
    pub fn token(&self, token_id: TokenId) -> Result<Token> {
        self.state.read().token(token_id)
    }

    /// Number of tokens owned by `principal` (not a value sum)
    pub fn owned_count(&self, principal: &Principal) -> u64 {
        self.state.read().owned_count(principal)
    }

    /// Ids owned by `principal`, ascending
    pub fn tokens_of(&self, principal: &Principal) -> Vec<TokenId> {
        self.state.read().tokens_of(principal)
    }

    /// Number of live tokens
    pub fn total_supply(&self) -> usize {
        self.state.read().total_supply()
    }

    /// Single approved principal of a token
    pub fn get_approved(&self, token_id: TokenId) -> Result<Option<Principal>> {
        self.state.read().get_approved(token_id)
    }

    /// Remaining allowance of `spender` on a token
    pub fn allowance_of(&self, token_id: TokenId, spender: &Principal) -> Result<Value> {
        self.state.read().allowance_of(token_id, spender)
    }

    /// Whether `operator` acts for `owner`
    pub fn is_operator(&self, owner: &Principal, operator: &Principal) -> bool {
        self.state.read().is_operator(owner, operator)
    }

    /// Display decimals of token values
    pub fn value_decimals(&self) -> u8 {
        self.config.value_decimals
    }

    /// Consistent copy of the whole state
    pub fn state_snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    // Events and persistence

    /// Stream of committed events from now on. Records missed by a lagging
    /// subscriber are skipped.
    pub fn subscribe(&self) -> impl Stream<Item = EventRecord> {
        BroadcastStream::new(self.handle.subscribe()).filter_map(|record| match record {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Event subscriber lagged: {}", e);
                None
            }
        })
    }

    /// Write a snapshot to `path`, ordered after every mutation already queued
    pub async fn save_snapshot(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.handle.save_snapshot(path.into()).await
    }

    /// Shutdown ledger, writing the configured snapshot first if requested
    pub async fn shutdown(self) -> Result<()> {
        if self.config.snapshot_on_shutdown {
            if let Some(path) = self.config.snapshot_path.clone() {
                self.handle.save_snapshot(path).await?;
            }
        }
        tracing::info!("Shutting down ledger");
        self.handle.shutdown().await
    }
}
