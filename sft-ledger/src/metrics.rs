//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `sft_tokens_minted_total` - Tokens created (mints and splits)
//! - `sft_tokens_burned_total` - Tokens destroyed
//! - `sft_value_transfers_total` - Committed split and merge transfers
//! - `sft_ownership_transfers_total` - Committed ownership moves
//! - `sft_approvals_total` - Committed approval changes (all three layers)
//! - `sft_rejected_operations_total` - Mutations rejected by a precondition
//! - `sft_live_tokens` - Tokens currently in the ledger

use crate::actor::Operation;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Tokens created
    pub tokens_minted: IntCounter,

    /// Tokens destroyed
    pub tokens_burned: IntCounter,

    /// Split and merge transfers
    pub value_transfers: IntCounter,

    /// Ownership moves
    pub ownership_transfers: IntCounter,

    /// Approval changes
    pub approvals: IntCounter,

    /// Rejected mutations
    pub rejected_operations: IntCounter,

    /// Live tokens
    pub live_tokens: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("live_tokens", &self.live_tokens.get())
            .field("rejected_operations", &self.rejected_operations.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let tokens_minted = IntCounter::new("sft_tokens_minted_total", "Tokens created")?;
        registry.register(Box::new(tokens_minted.clone()))?;

        let tokens_burned = IntCounter::new("sft_tokens_burned_total", "Tokens destroyed")?;
        registry.register(Box::new(tokens_burned.clone()))?;

        let value_transfers = IntCounter::new(
            "sft_value_transfers_total",
            "Committed split and merge value transfers",
        )?;
        registry.register(Box::new(value_transfers.clone()))?;

        let ownership_transfers = IntCounter::new(
            "sft_ownership_transfers_total",
            "Committed ownership transfers",
        )?;
        registry.register(Box::new(ownership_transfers.clone()))?;

        let approvals = IntCounter::new("sft_approvals_total", "Committed approval changes")?;
        registry.register(Box::new(approvals.clone()))?;

        let rejected_operations = IntCounter::new(
            "sft_rejected_operations_total",
            "Mutations rejected by a precondition",
        )?;
        registry.register(Box::new(rejected_operations.clone()))?;

        let live_tokens = IntGauge::new("sft_live_tokens", "Tokens currently in the ledger")?;
        registry.register(Box::new(live_tokens.clone()))?;

        Ok(Self {
            tokens_minted,
            tokens_burned,
            value_transfers,
            ownership_transfers,
            approvals,
            rejected_operations,
            live_tokens,
            registry,
        })
    }

    /// Record a committed mutation
    pub fn record_commit(&self, operation: Operation) {
        match operation {
            Operation::Mint => self.tokens_minted.inc(),
            Operation::Burn => self.tokens_burned.inc(),
            Operation::TransferValue => {
                self.value_transfers.inc();
                self.tokens_minted.inc();
            }
            Operation::TransferValueToToken => self.value_transfers.inc(),
            Operation::TransferOwnership => self.ownership_transfers.inc(),
            Operation::ApproveToken | Operation::ApproveValue | Operation::SetOperatorApproval => {
                self.approvals.inc()
            }
        }
    }

    /// Record a rejected mutation
    pub fn record_rejection(&self) {
        self.rejected_operations.inc();
    }

    /// Update live token gauge
    pub fn set_live_tokens(&self, count: usize) {
        self.live_tokens.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.tokens_minted.get(), 0);
        assert_eq!(metrics.live_tokens.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_commit(Operation::Mint);
        assert_eq!(first.tokens_minted.get(), 1);
        assert_eq!(second.tokens_minted.get(), 0);
    }

    #[test]
    fn test_split_counts_as_mint_and_transfer() {
        let metrics = Metrics::new().unwrap();
        metrics.record_commit(Operation::TransferValue);
        assert_eq!(metrics.value_transfers.get(), 1);
        assert_eq!(metrics.tokens_minted.get(), 1);

        metrics.record_commit(Operation::TransferValueToToken);
        assert_eq!(metrics.value_transfers.get(), 2);
        assert_eq!(metrics.tokens_minted.get(), 1);
    }

    #[test]
    fn test_every_operation_is_counted() {
        let metrics = Metrics::new().unwrap();
        for operation in Operation::ALL {
            metrics.record_commit(operation);
        }

        assert_eq!(metrics.tokens_minted.get(), 2);
        assert_eq!(metrics.tokens_burned.get(), 1);
        assert_eq!(metrics.value_transfers.get(), 2);
        assert_eq!(metrics.ownership_transfers.get(), 1);
        assert_eq!(metrics.approvals.get(), 3);
    }

    #[test]
    fn test_encode() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection();
        metrics.set_live_tokens(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("sft_rejected_operations_total 1"));
        assert!(text.contains("sft_live_tokens 3"));
    }
}
