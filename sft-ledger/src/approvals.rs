//! Three independent authorization layers
//!
//! - **Operator approval**: owner -> set of operators allowed to act on every
//!   token the owner holds.
//! - **Single-token approval**: at most one approved principal per token.
//!   Cleared whenever the token changes owner. Grants full authority over the
//!   token, including *unlimited* value spending (see [`crate::authorization`]).
//! - **Value allowance**: (token, spender) -> remaining spendable value.
//!   Keyed by token id, so it survives ownership changes; dropped only when
//!   the token itself is burned.

use crate::{
    error::{Error, Result},
    state::{LedgerState, Outcome},
    types::{LedgerEvent, Principal, TokenId, Value},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Approval state for all tokens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRegistry {
    /// owner -> enabled operators
    operators: HashMap<Principal, HashSet<Principal>>,

    /// token -> single approved principal
    token_approvals: HashMap<TokenId, Principal>,

    /// token -> spender -> remaining allowance (zero entries are removed)
    allowances: HashMap<TokenId, HashMap<Principal, Value>>,
}

impl ApprovalRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `operator` may act on all of `owner`'s tokens
    pub fn is_operator(&self, owner: &Principal, operator: &Principal) -> bool {
        self.operators
            .get(owner)
            .map_or(false, |operators| operators.contains(operator))
    }

    /// Single approved principal for a token, if any
    pub fn approved(&self, token_id: TokenId) -> Option<&Principal> {
        self.token_approvals.get(&token_id)
    }

    /// Remaining allowance of `spender` on `token_id` (zero if none)
    pub fn allowance(&self, token_id: TokenId, spender: &Principal) -> Value {
        self.allowances
            .get(&token_id)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Number of spenders holding a non-zero allowance on `token_id`
    pub fn spender_count(&self, token_id: TokenId) -> usize {
        self.allowances.get(&token_id).map_or(0, HashMap::len)
    }

    pub(crate) fn set_operator(&mut self, owner: &Principal, operator: Principal, enabled: bool) {
        if enabled {
            self.operators
                .entry(owner.clone())
                .or_default()
                .insert(operator);
        } else if let Some(operators) = self.operators.get_mut(owner) {
            operators.remove(&operator);
            if operators.is_empty() {
                self.operators.remove(owner);
            }
        }
    }

    /// Overwrite (or clear, with `None`) the single approval.
    ///
    /// Returns the previous approval.
    pub(crate) fn set_token_approval(
        &mut self,
        token_id: TokenId,
        approved: Option<Principal>,
    ) -> Option<Principal> {
        match approved {
            Some(principal) => self.token_approvals.insert(token_id, principal),
            None => self.token_approvals.remove(&token_id),
        }
    }

    /// Absolute set of an allowance
    pub(crate) fn set_allowance(&mut self, token_id: TokenId, spender: Principal, amount: Value) {
        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(&token_id) {
                spenders.remove(&spender);
                if spenders.is_empty() {
                    self.allowances.remove(&token_id);
                }
            }
        } else {
            self.allowances
                .entry(token_id)
                .or_default()
                .insert(spender, amount);
        }
    }

    /// Drop every approval that references `token_id`.
    ///
    /// Returns the single approval that was cleared, if any.
    pub(crate) fn clear_token(&mut self, token_id: TokenId) -> Option<Principal> {
        self.allowances.remove(&token_id);
        self.token_approvals.remove(&token_id)
    }
}

impl LedgerState {
    /// Enable or disable `operator` for every token owned by `owner`.
    ///
    /// `owner` is the authenticated caller. Idempotent: setting the current
    /// flag again still succeeds and is reported.
    pub fn set_operator_approval(
        &mut self,
        owner: &Principal,
        operator: Principal,
        enabled: bool,
    ) -> Result<Outcome<()>> {
        if operator.is_null() {
            return Err(Error::InvalidRecipient);
        }

        self.approvals.set_operator(owner, operator.clone(), enabled);

        Ok(Outcome::new(
            (),
            vec![LedgerEvent::ApprovalForAll {
                owner: owner.clone(),
                operator,
                approved: enabled,
            }],
        ))
    }

    /// Set the single approved principal for a token (null principal clears).
    ///
    /// The approved principal gets full authority over the token: it can move
    /// ownership *and* spend any amount of its value without a value allowance.
    pub fn approve_token(
        &mut self,
        caller: &Principal,
        token_id: TokenId,
        approved: Principal,
    ) -> Result<Outcome<()>> {
        let owner = self.tokens.owner_of(token_id)?.clone();
        if &owner != caller {
            return Err(Error::NotOwner {
                token_id,
                caller: caller.clone(),
            });
        }

        let approved = approved.into_option();
        self.approvals.set_token_approval(token_id, approved.clone());

        Ok(Outcome::new(
            (),
            vec![LedgerEvent::Approval {
                owner,
                approved,
                token_id,
            }],
        ))
    }

    /// Set the value allowance of `spender` on `token_id` to exactly `amount`
    pub fn approve_value(
        &mut self,
        caller: &Principal,
        token_id: TokenId,
        spender: Principal,
        amount: Value,
    ) -> Result<Outcome<()>> {
        let owner = self.tokens.owner_of(token_id)?;
        if owner != caller {
            return Err(Error::NotOwner {
                token_id,
                caller: caller.clone(),
            });
        }
        if spender.is_null() {
            return Err(Error::InvalidRecipient);
        }

        self.approvals.set_allowance(token_id, spender.clone(), amount);

        Ok(Outcome::new(
            (),
            vec![LedgerEvent::ApprovalValue {
                token_id,
                operator: spender,
                value: amount,
            }],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slot;

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    fn state_with_token() -> (LedgerState, TokenId) {
        let mut state = LedgerState::new();
        let id = state.mint(p("alice"), Slot::new(1), 10_000).unwrap().value;
        (state, id)
    }

    #[test]
    fn test_operator_toggle() {
        let mut registry = ApprovalRegistry::new();
        registry.set_operator(&p("alice"), p("op"), true);
        registry.set_operator(&p("alice"), p("op"), true);
        assert!(registry.is_operator(&p("alice"), &p("op")));
        assert!(!registry.is_operator(&p("bob"), &p("op")));

        registry.set_operator(&p("alice"), p("op"), false);
        assert!(!registry.is_operator(&p("alice"), &p("op")));
    }

    #[test]
    fn test_approve_token_by_owner() {
        let (mut state, id) = state_with_token();
        let outcome = state.approve_token(&p("alice"), id, p("bob")).unwrap();

        assert_eq!(state.get_approved(id).unwrap(), Some(p("bob")));
        assert_eq!(
            outcome.events,
            vec![LedgerEvent::Approval {
                owner: p("alice"),
                approved: Some(p("bob")),
                token_id: id,
            }]
        );
    }

    #[test]
    fn test_approve_token_overwrites_and_clears() {
        let (mut state, id) = state_with_token();
        state.approve_token(&p("alice"), id, p("bob")).unwrap();
        state.approve_token(&p("alice"), id, p("carol")).unwrap();
        assert_eq!(state.get_approved(id).unwrap(), Some(p("carol")));

        state.approve_token(&p("alice"), id, Principal::null()).unwrap();
        assert_eq!(state.get_approved(id).unwrap(), None);
    }

    #[test]
    fn test_approve_token_rejections() {
        let (mut state, id) = state_with_token();

        let err = state.approve_token(&p("bob"), id, p("bob")).unwrap_err();
        assert!(matches!(err, Error::NotOwner { .. }));

        let err = state
            .approve_token(&p("alice"), TokenId::new(99), p("bob"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTokenId(_)));
    }

    #[test]
    fn test_approve_value_is_absolute() {
        let (mut state, id) = state_with_token();
        state.approve_value(&p("alice"), id, p("bob"), 500).unwrap();
        state.approve_value(&p("alice"), id, p("bob"), 200).unwrap();
        assert_eq!(state.allowance_of(id, &p("bob")).unwrap(), 200);

        state.approve_value(&p("alice"), id, p("bob"), 0).unwrap();
        assert_eq!(state.allowance_of(id, &p("bob")).unwrap(), 0);
        assert_eq!(state.approvals().spender_count(id), 0);
    }

    #[test]
    fn test_approve_value_rejections() {
        let (mut state, id) = state_with_token();

        let err = state.approve_value(&p("bob"), id, p("bob"), 1).unwrap_err();
        assert!(matches!(err, Error::NotOwner { .. }));

        let err = state
            .approve_value(&p("alice"), id, Principal::null(), 1)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecipient));

        let err = state
            .approve_value(&p("alice"), TokenId::new(2), p("bob"), 1)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTokenId(_)));
    }

    #[test]
    fn test_set_operator_approval_rejects_null() {
        let mut state = LedgerState::new();
        let err = state
            .set_operator_approval(&p("alice"), Principal::null(), true)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecipient));
    }

    #[test]
    fn test_clear_token() {
        let mut registry = ApprovalRegistry::new();
        let id = TokenId::new(1);
        registry.set_token_approval(id, Some(p("bob")));
        registry.set_allowance(id, p("carol"), 10);

        assert_eq!(registry.clear_token(id), Some(p("bob")));
        assert_eq!(registry.approved(id), None);
        assert_eq!(registry.allowance(id, &p("carol")), 0);
    }
}
