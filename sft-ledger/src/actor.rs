//! Single-writer actor for ledger mutations
//!
//! Every mutation is funneled through one Tokio task:
//! - One logical writer eliminates races on shared principals (ownership
//!   counts and approvals are touched by operations on different token ids)
//! - Each mutation runs under the state write lock from first check to last
//!   write, so readers never see a half-applied transfer
//! - Async message passing with backpressure (bounded mailbox)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │   caller identity + operation -> actor mailbox       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │  write lock -> validate -> mutate -> unlock           │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ broadcast::channel
//!                       ▼
//!              EventRecord subscribers
//! ```

use crate::{
    metrics::Metrics,
    snapshot,
    state::{LedgerState, Outcome},
    types::{EventRecord, Principal, Slot, TokenId, Value},
    Error, Result,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

/// Kind of mutation, used for metrics and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Token creation
    Mint,
    /// Token destruction
    Burn,
    /// Split into a new token
    TransferValue,
    /// Merge into an existing token
    TransferValueToToken,
    /// Ownership move
    TransferOwnership,
    /// Single-token approval change
    ApproveToken,
    /// Value allowance change
    ApproveValue,
    /// Operator approval change
    SetOperatorApproval,
}

impl Operation {
    /// Every mutation kind
    pub const ALL: [Operation; 8] = [
        Operation::Mint,
        Operation::Burn,
        Operation::TransferValue,
        Operation::TransferValueToToken,
        Operation::TransferOwnership,
        Operation::ApproveToken,
        Operation::ApproveValue,
        Operation::SetOperatorApproval,
    ];

    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Mint => "mint",
            Operation::Burn => "burn",
            Operation::TransferValue => "transfer_value",
            Operation::TransferValueToToken => "transfer_value_to_token",
            Operation::TransferOwnership => "transfer_ownership",
            Operation::ApproveToken => "approve_token",
            Operation::ApproveValue => "approve_value",
            Operation::SetOperatorApproval => "set_operator_approval",
        }
    }
}

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Mint a new token
    Mint {
        recipient: Principal,
        slot: Slot,
        value: Value,
        response: oneshot::Sender<Result<TokenId>>,
    },

    /// Burn a token
    Burn {
        caller: Principal,
        token_id: TokenId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Split value into a new token
    TransferValue {
        caller: Principal,
        token_id: TokenId,
        to: Principal,
        amount: Value,
        response: oneshot::Sender<Result<TokenId>>,
    },

    /// Merge value into an existing token
    TransferValueToToken {
        caller: Principal,
        from_token: TokenId,
        to_token: TokenId,
        amount: Value,
        response: oneshot::Sender<Result<()>>,
    },

    /// Move token ownership
    TransferOwnership {
        caller: Principal,
        token_id: TokenId,
        to: Principal,
        response: oneshot::Sender<Result<()>>,
    },

    /// Set single-token approval
    ApproveToken {
        caller: Principal,
        token_id: TokenId,
        approved: Principal,
        response: oneshot::Sender<Result<()>>,
    },

    /// Set value allowance
    ApproveValue {
        caller: Principal,
        token_id: TokenId,
        spender: Principal,
        amount: Value,
        response: oneshot::Sender<Result<()>>,
    },

    /// Set operator approval
    SetOperatorApproval {
        caller: Principal,
        operator: Principal,
        enabled: bool,
        response: oneshot::Sender<Result<()>>,
    },

    /// Write a snapshot between two mutations
    SaveSnapshot {
        path: PathBuf,
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that applies ledger mutations one at a time
pub struct LedgerActor {
    /// Shared state (readers take the read lock directly)
    state: Arc<RwLock<LedgerState>>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Committed event fan-out
    events: broadcast::Sender<EventRecord>,

    /// Last published event sequence
    sequence: u64,

    /// Optional metrics sink
    metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for LedgerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerActor")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        state: Arc<RwLock<LedgerState>>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        events: broadcast::Sender<EventRecord>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            state,
            mailbox,
            events,
            sequence: 0,
            metrics,
        }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                break;
            }
            self.handle_message(msg);
        }
        tracing::info!(events = self.sequence, "Ledger actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Mint {
                recipient,
                slot,
                value,
                response,
            } => {
                let result =
                    self.apply(Operation::Mint, |state| state.mint(recipient, slot, value));
                let _ = response.send(result);
            }

            LedgerMessage::Burn {
                caller,
                token_id,
                response,
            } => {
                let result = self.apply(Operation::Burn, |state| state.burn(&caller, token_id));
                let _ = response.send(result);
            }

            LedgerMessage::TransferValue {
                caller,
                token_id,
                to,
                amount,
                response,
            } => {
                let result = self.apply(Operation::TransferValue, |state| {
                    state.transfer_value(&caller, token_id, to, amount)
                });
                let _ = response.send(result);
            }

            LedgerMessage::TransferValueToToken {
                caller,
                from_token,
                to_token,
                amount,
                response,
            } => {
                let result = self.apply(Operation::TransferValueToToken, |state| {
                    state.transfer_value_to_token(&caller, from_token, to_token, amount)
                });
                let _ = response.send(result);
            }

            LedgerMessage::TransferOwnership {
                caller,
                token_id,
                to,
                response,
            } => {
                let result = self.apply(Operation::TransferOwnership, |state| {
                    state.transfer_ownership(&caller, token_id, to)
                });
                let _ = response.send(result);
            }

            LedgerMessage::ApproveToken {
                caller,
                token_id,
                approved,
                response,
            } => {
                let result = self.apply(Operation::ApproveToken, |state| {
                    state.approve_token(&caller, token_id, approved)
                });
                let _ = response.send(result);
            }

            LedgerMessage::ApproveValue {
                caller,
                token_id,
                spender,
                amount,
                response,
            } => {
                let result = self.apply(Operation::ApproveValue, |state| {
                    state.approve_value(&caller, token_id, spender, amount)
                });
                let _ = response.send(result);
            }

            LedgerMessage::SetOperatorApproval {
                caller,
                operator,
                enabled,
                response,
            } => {
                let result = self.apply(Operation::SetOperatorApproval, |state| {
                    state.set_operator_approval(&caller, operator, enabled)
                });
                let _ = response.send(result);
            }

            LedgerMessage::SaveSnapshot { path, response } => {
                let result = snapshot::save(&self.state.read(), &path);
                if let Err(ref e) = result {
                    tracing::error!(path = %path.display(), "Snapshot failed: {}", e);
                }
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }

    /// Apply one mutation atomically and publish its events on success
    fn apply<T>(
        &mut self,
        operation: Operation,
        mutation: impl FnOnce(&mut LedgerState) -> Result<Outcome<T>>,
    ) -> Result<T> {
        let (result, live_tokens) = {
            let mut state = self.state.write();
            let result = mutation(&mut state);
            (result, state.total_supply())
        };

        match result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_commit(operation);
                    metrics.set_live_tokens(live_tokens);
                }
                tracing::debug!(
                    operation = operation.name(),
                    events = outcome.events.len(),
                    "Committed"
                );
                self.publish(outcome.events);
                Ok(outcome.value)
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection();
                }
                tracing::warn!(operation = operation.name(), "Rejected: {}", e);
                Err(e)
            }
        }
    }

    fn publish(&mut self, events: Vec<crate::types::LedgerEvent>) {
        let recorded_at = Utc::now();
        for event in events {
            self.sequence += 1;
            let record = EventRecord {
                sequence: self.sequence,
                event_id: Uuid::now_v7(),
                recorded_at,
                event,
            };
            // No subscribers is not an error
            let _ = self.events.send(record);
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    events: broadcast::Sender<EventRecord>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(
        sender: mpsc::Sender<LedgerMessage>,
        events: broadcast::Sender<EventRecord>,
    ) -> Self {
        Self { sender, events }
    }

    /// Subscribe to committed events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Send a message and wait for the actor's reply
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Mint a token
    pub async fn mint(&self, recipient: Principal, slot: Slot, value: Value) -> Result<TokenId> {
        self.request(|response| LedgerMessage::Mint {
            recipient,
            slot,
            value,
            response,
        })
        .await
    }

    /// Burn a token
    pub async fn burn(&self, caller: Principal, token_id: TokenId) -> Result<()> {
        self.request(|response| LedgerMessage::Burn {
            caller,
            token_id,
            response,
        })
        .await
    }

    /// Split value into a new token for `to`
    pub async fn transfer_value(
        &self,
        caller: Principal,
        token_id: TokenId,
        to: Principal,
        amount: Value,
    ) -> Result<TokenId> {
        self.request(|response| LedgerMessage::TransferValue {
            caller,
            token_id,
            to,
            amount,
            response,
        })
        .await
    }

    /// Merge value into an existing token
    pub async fn transfer_value_to_token(
        &self,
        caller: Principal,
        from_token: TokenId,
        to_token: TokenId,
        amount: Value,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::TransferValueToToken {
            caller,
            from_token,
            to_token,
            amount,
            response,
        })
        .await
    }

    /// Move token ownership
    pub async fn transfer_ownership(
        &self,
        caller: Principal,
        token_id: TokenId,
        to: Principal,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::TransferOwnership {
            caller,
            token_id,
            to,
            response,
        })
        .await
    }

    /// Set single-token approval
    pub async fn approve_token(
        &self,
        caller: Principal,
        token_id: TokenId,
        approved: Principal,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::ApproveToken {
            caller,
            token_id,
            approved,
            response,
        })
        .await
    }

    /// Set value allowance
    pub async fn approve_value(
        &self,
        caller: Principal,
        token_id: TokenId,
        spender: Principal,
        amount: Value,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::ApproveValue {
            caller,
            token_id,
            spender,
            amount,
            response,
        })
        .await
    }

    /// Set operator approval
    pub async fn set_operator_approval(
        &self,
        caller: Principal,
        operator: Principal,
        enabled: bool,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::SetOperatorApproval {
            caller,
            operator,
            enabled,
            response,
        })
        .await
    }

    /// Write a snapshot
    pub async fn save_snapshot(&self, path: PathBuf) -> Result<()> {
        self.request(|response| LedgerMessage::SaveSnapshot { path, response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    state: Arc<RwLock<LedgerState>>,
    mailbox_capacity: usize,
    event_capacity: usize,
    metrics: Option<Arc<Metrics>>,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let (events, _) = broadcast::channel(event_capacity);
    let actor = LedgerActor::new(state, rx, events.clone(), metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx, events)
}
