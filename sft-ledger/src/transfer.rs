//! Value and ownership transfer protocols
//!
//! # Protocols
//!
//! - **Split** ([`LedgerState::transfer_value`]): take `amount` out of a token
//!   and mint it as a brand-new token for the recipient. The new token
//!   inherits the source slot, so slot compatibility holds by construction.
//! - **Merge** ([`LedgerState::transfer_value_to_token`]): move `amount`
//!   into an existing token. Both tokens must share a slot.
//! - **Move** ([`LedgerState::transfer_ownership`]): hand the whole token,
//!   value included, to a new owner.
//!
//! Checks run in a fixed order and fail fast on the first violation. Writes
//! start only after every check has passed.
//!
//! Allowances are drawn down only when the spend was authorized by the
//! allowance itself; owner, operator and single-token approval spends leave
//! them alone. Value transfers never touch the single-token approval.

use crate::{
    authorization::{authorize_spend, authorize_transfer, Authority},
    error::{Error, Result},
    state::{LedgerState, Outcome},
    types::{LedgerEvent, Principal, TokenId, Value},
};

impl LedgerState {
    /// Split `amount` off `token_id` into a new token owned by `to`.
    ///
    /// Returns the new token's id.
    pub fn transfer_value(
        &mut self,
        caller: &Principal,
        token_id: TokenId,
        to: Principal,
        amount: Value,
    ) -> Result<Outcome<TokenId>> {
        let source = self.tokens.get(token_id)?;
        let authority = authorize_spend(source, &self.approvals, caller, amount)?;
        let remaining = checked_remaining(token_id, source.value, amount)?;
        if to.is_null() {
            return Err(Error::InvalidRecipient);
        }
        let slot = source.slot;
        let expected_id = self.tokens.next_id()?;

        let mut events = Vec::with_capacity(4);
        self.tokens.set_value(token_id, remaining)?;
        if authority.consumes_allowance() {
            events.push(self.consume_allowance(token_id, caller, amount));
        }

        let new_id = self.tokens.create(to.clone(), slot, amount);
        debug_assert_eq!(new_id, expected_id);

        events.push(LedgerEvent::Transfer {
            from: None,
            to: Some(to),
            token_id: new_id,
        });
        events.push(LedgerEvent::SlotChanged {
            token_id: new_id,
            old_slot: None,
            new_slot: Some(slot),
        });
        events.push(LedgerEvent::TransferValue {
            from_token: Some(token_id),
            to_token: Some(new_id),
            value: amount,
        });

        tracing::debug!(
            from = %token_id,
            to = %new_id,
            amount,
            ?authority,
            "split value into new token"
        );

        Ok(Outcome::new(new_id, events))
    }

    /// Move `amount` from `from_id` into the existing token `to_id`.
    ///
    /// Both tokens must share a slot. Ownership of `to_id` is irrelevant:
    /// the caller only needs spend authority on the source.
    pub fn transfer_value_to_token(
        &mut self,
        caller: &Principal,
        from_id: TokenId,
        to_id: TokenId,
        amount: Value,
    ) -> Result<Outcome<()>> {
        let source = self.tokens.get(from_id)?;
        let destination = self.tokens.get(to_id)?;
        if from_id == to_id {
            return Err(Error::SelfTransfer(from_id));
        }
        let authority = authorize_spend(source, &self.approvals, caller, amount)?;
        let remaining = checked_remaining(from_id, source.value, amount)?;
        if source.slot != destination.slot {
            return Err(Error::SlotMismatch {
                from: source.slot,
                to: destination.slot,
            });
        }
        let credited = destination
            .value
            .checked_add(amount)
            .ok_or(Error::ValueOverflow)?;

        let mut events = Vec::with_capacity(2);
        self.tokens.set_value(from_id, remaining)?;
        self.tokens.set_value(to_id, credited)?;
        if authority.consumes_allowance() {
            events.push(self.consume_allowance(from_id, caller, amount));
        }
        events.push(LedgerEvent::TransferValue {
            from_token: Some(from_id),
            to_token: Some(to_id),
            value: amount,
        });

        tracing::debug!(from = %from_id, to = %to_id, amount, ?authority, "merged value");

        Ok(Outcome::new((), events))
    }

    /// Hand `token_id`, with its entire value, to `to`.
    ///
    /// Clears the single-token approval. Value allowances stay attached to
    /// the token id and keep working under the new owner until revoked.
    pub fn transfer_ownership(
        &mut self,
        caller: &Principal,
        token_id: TokenId,
        to: Principal,
    ) -> Result<Outcome<()>> {
        let token = self.tokens.get(token_id)?;
        let authority = authorize_transfer(token, &self.approvals, caller)?;
        if to.is_null() {
            return Err(Error::InvalidRecipient);
        }

        let from = self.tokens.set_owner(token_id, to.clone())?;
        let cleared = self.approvals.set_token_approval(token_id, None);

        let mut events = Vec::with_capacity(2);
        if cleared.is_some() {
            events.push(LedgerEvent::Approval {
                owner: from.clone(),
                approved: None,
                token_id,
            });
        }
        tracing::debug!(token = %token_id, from = %from, to = %to, ?authority, "moved ownership");
        events.push(LedgerEvent::Transfer {
            from: Some(from),
            to: Some(to),
            token_id,
        });

        Ok(Outcome::new((), events))
    }

    /// Draw `amount` down from the caller's allowance. Caller must have
    /// been authorized through [`Authority::Allowance`] for this amount.
    fn consume_allowance(
        &mut self,
        token_id: TokenId,
        spender: &Principal,
        amount: Value,
    ) -> LedgerEvent {
        let left = self
            .approvals
            .allowance(token_id, spender)
            .saturating_sub(amount);
        self.approvals.set_allowance(token_id, spender.clone(), left);

        LedgerEvent::ApprovalValue {
            token_id,
            operator: spender.clone(),
            value: left,
        }
    }
}

fn checked_remaining(token_id: TokenId, available: Value, requested: Value) -> Result<Value> {
    available
        .checked_sub(requested)
        .ok_or(Error::InsufficientValue {
            token_id,
            available,
            requested,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slot;

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    fn minted(value: Value) -> (LedgerState, TokenId) {
        let mut state = LedgerState::new();
        let id = state.mint(p("alice"), Slot::new(1), value).unwrap().value;
        (state, id)
    }

    #[test]
    fn test_owner_split() {
        let (mut state, id) = minted(10_000);
        let new_id = state
            .transfer_value(&p("alice"), id, p("bob"), 2_500)
            .unwrap()
            .value;

        assert_eq!(new_id, TokenId::new(2));
        assert_eq!(state.value_of(id).unwrap(), 7_500);
        assert_eq!(state.value_of(new_id).unwrap(), 2_500);
        assert_eq!(state.slot_of(new_id).unwrap(), Slot::new(1));
        assert_eq!(state.owner_of(new_id).unwrap(), p("bob"));
        assert_eq!(state.owner_of(id).unwrap(), p("alice"));
        assert_eq!(state.owned_count(&p("bob")), 1);
    }

    #[test]
    fn test_split_via_allowance_decrements() {
        let (mut state, id) = minted(10_000);
        state.approve_value(&p("alice"), id, p("bob"), 3_000).unwrap();

        let outcome = state
            .transfer_value(&p("bob"), id, p("carol"), 1_000)
            .unwrap();

        assert_eq!(state.allowance_of(id, &p("bob")).unwrap(), 2_000);
        assert_eq!(
            outcome.events[0],
            LedgerEvent::ApprovalValue {
                token_id: id,
                operator: p("bob"),
                value: 2_000,
            }
        );
    }

    #[test]
    fn test_split_via_token_approval_leaves_allowance() {
        let (mut state, id) = minted(10_000);
        state.approve_token(&p("alice"), id, p("bob")).unwrap();
        state.approve_value(&p("alice"), id, p("bob"), 5).unwrap();

        state
            .transfer_value(&p("bob"), id, p("bob"), 10_000)
            .unwrap();

        assert_eq!(state.value_of(id).unwrap(), 0);
        assert_eq!(state.allowance_of(id, &p("bob")).unwrap(), 5);
        assert_eq!(state.get_approved(id).unwrap(), Some(p("bob")));
    }

    #[test]
    fn test_split_check_order() {
        let (mut state, id) = minted(100);

        let err = state
            .transfer_value(&p("alice"), TokenId::new(42), p("bob"), 1)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTokenId(_)));

        let err = state
            .transfer_value(&p("mallory"), id, Principal::null(), 1_000)
            .unwrap_err();
        assert!(matches!(err, Error::NotOwnerNorApproved { .. }));

        let err = state
            .transfer_value(&p("alice"), id, Principal::null(), 1_000)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientValue {
                available: 100,
                requested: 1_000,
                ..
            }
        ));

        let err = state
            .transfer_value(&p("alice"), id, Principal::null(), 10)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecipient));
    }

    #[test]
    fn test_failed_split_changes_nothing() {
        let (mut state, id) = minted(100);
        state.approve_value(&p("alice"), id, p("bob"), 500).unwrap();
        let before = state.clone();

        let err = state
            .transfer_value(&p("bob"), id, p("bob"), 200)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientValue { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_insufficient_allowance() {
        let (mut state, id) = minted(100);
        state.approve_value(&p("alice"), id, p("bob"), 10).unwrap();

        let err = state
            .transfer_value(&p("bob"), id, p("bob"), 11)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientAllowance { allowance: 10, .. }));
    }

    #[test]
    fn test_zero_amount_split_without_allowance() {
        let (mut state, id) = minted(100);
        assert!(state.can_spend_value(&p("mallory"), id, 0).unwrap());

        let new_id = state
            .transfer_value(&p("mallory"), id, p("mallory"), 0)
            .unwrap()
            .value;

        assert_eq!(state.value_of(id).unwrap(), 100);
        assert_eq!(state.value_of(new_id).unwrap(), 0);
        assert_eq!(state.owner_of(new_id).unwrap(), p("mallory"));
        assert_eq!(state.allowance_of(id, &p("mallory")).unwrap(), 0);

        let err = state
            .transfer_value(&p("mallory"), id, p("mallory"), 1)
            .unwrap_err();
        assert!(matches!(err, Error::NotOwnerNorApproved { .. }));
    }

    #[test]
    fn test_move_transfers_whole_token() {
        let (mut state, id) = minted(10_000);
        state.approve_token(&p("alice"), id, p("bob")).unwrap();
        state.approve_value(&p("alice"), id, p("carol"), 40).unwrap();

        let outcome = state.transfer_ownership(&p("bob"), id, p("bob")).unwrap();

        assert_eq!(state.owner_of(id).unwrap(), p("bob"));
        assert_eq!(state.value_of(id).unwrap(), 10_000);
        assert_eq!(state.owned_count(&p("alice")), 0);
        assert_eq!(state.owned_count(&p("bob")), 1);
        assert_eq!(state.get_approved(id).unwrap(), None);
        assert_eq!(state.allowance_of(id, &p("carol")).unwrap(), 40);
        assert_eq!(outcome.events.len(), 2);
    }

    #[test]
    fn test_move_rejections() {
        let (mut state, id) = minted(10_000);
        state.approve_value(&p("alice"), id, p("bob"), 10_000).unwrap();

        let err = state
            .transfer_ownership(&p("bob"), id, p("bob"))
            .unwrap_err();
        assert!(matches!(err, Error::NotOwnerNorApproved { .. }));

        let err = state
            .transfer_ownership(&p("alice"), id, Principal::null())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecipient));
        assert_eq!(state.owner_of(id).unwrap(), p("alice"));
    }

    #[test]
    fn test_operator_moves_and_splits() {
        let (mut state, id) = minted(10);
        state.set_operator_approval(&p("alice"), p("op"), true).unwrap();

        state.transfer_value(&p("op"), id, p("carol"), 4).unwrap();
        state.transfer_ownership(&p("op"), id, p("dave")).unwrap();

        assert_eq!(state.owner_of(id).unwrap(), p("dave"));
        assert_eq!(state.value_of(id).unwrap(), 6);
        // operator rights belong to alice's tokens only
        let err = state.transfer_ownership(&p("op"), id, p("op")).unwrap_err();
        assert!(matches!(err, Error::NotOwnerNorApproved { .. }));
    }

    #[test]
    fn test_merge_same_slot() {
        let (mut state, from) = minted(100);
        let to = state.mint(p("bob"), Slot::new(1), 5).unwrap().value;

        state
            .transfer_value_to_token(&p("alice"), from, to, 30)
            .unwrap();

        assert_eq!(state.value_of(from).unwrap(), 70);
        assert_eq!(state.value_of(to).unwrap(), 35);
        assert_eq!(state.total_supply(), 2);
    }

    #[test]
    fn test_merge_rejections() {
        let (mut state, from) = minted(100);
        let other_slot = state.mint(p("bob"), Slot::new(2), 0).unwrap().value;
        let full = state.mint(p("bob"), Slot::new(1), Value::MAX).unwrap().value;

        let err = state
            .transfer_value_to_token(&p("alice"), from, other_slot, 1)
            .unwrap_err();
        assert!(matches!(err, Error::SlotMismatch { .. }));

        let err = state
            .transfer_value_to_token(&p("alice"), from, full, 1)
            .unwrap_err();
        assert!(matches!(err, Error::ValueOverflow));

        let err = state
            .transfer_value_to_token(&p("alice"), from, from, 1)
            .unwrap_err();
        assert!(matches!(err, Error::SelfTransfer(_)));

        let err = state
            .transfer_value_to_token(&p("bob"), from, full, 1)
            .unwrap_err();
        assert!(matches!(err, Error::NotOwnerNorApproved { .. }));

        assert_eq!(state.value_of(from).unwrap(), 100);
    }
}
