//! Authorization predicates for value and ownership transfers
//!
//! Both predicates are pure functions over a [`Token`] and the
//! [`ApprovalRegistry`]. They return the first matching [`Authority`] in a
//! fixed order so the transfer engine knows whether an allowance must be
//! consumed.
//!
//! Note the coupling between layers: a single-token approval implies
//! unlimited value authority over that token, with no value allowance
//! needed. A value allowance alone never authorizes an ownership move.

use crate::{
    approvals::ApprovalRegistry,
    error::{Error, Result},
    types::{Principal, Token, Value},
};

/// Why a caller is allowed to act on a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Caller owns the token
    Owner,
    /// Caller is an operator of the owner
    Operator,
    /// Caller is the token's single approved principal
    TokenApproval,
    /// Caller holds a sufficient value allowance (value transfers only)
    Allowance,
}

impl Authority {
    /// Whether spending under this authority draws down an allowance
    pub fn consumes_allowance(&self) -> bool {
        matches!(self, Authority::Allowance)
    }
}

/// Authority to move ownership of `token` (owner, operator or single approval)
pub fn transfer_authority(
    token: &Token,
    approvals: &ApprovalRegistry,
    caller: &Principal,
) -> Option<Authority> {
    if &token.owner == caller {
        Some(Authority::Owner)
    } else if approvals.is_operator(&token.owner, caller) {
        Some(Authority::Operator)
    } else if approvals.approved(token.id) == Some(caller) {
        Some(Authority::TokenApproval)
    } else {
        None
    }
}

/// Authority to spend `amount` of `token`'s value
pub fn spend_authority(
    token: &Token,
    approvals: &ApprovalRegistry,
    caller: &Principal,
    amount: Value,
) -> Option<Authority> {
    transfer_authority(token, approvals, caller).or_else(|| {
        let allowance = approvals.allowance(token.id, caller);
        (allowance >= amount).then_some(Authority::Allowance)
    })
}

/// [`spend_authority`] with the failure reason spelled out.
///
/// A caller with a non-zero but too small allowance gets
/// [`Error::InsufficientAllowance`]; anyone else without authority gets
/// [`Error::NotOwnerNorApproved`].
pub fn authorize_spend(
    token: &Token,
    approvals: &ApprovalRegistry,
    caller: &Principal,
    amount: Value,
) -> Result<Authority> {
    if let Some(authority) = spend_authority(token, approvals, caller, amount) {
        return Ok(authority);
    }

    let allowance = approvals.allowance(token.id, caller);
    if allowance > 0 {
        Err(Error::InsufficientAllowance {
            token_id: token.id,
            allowance,
            requested: amount,
        })
    } else {
        Err(Error::NotOwnerNorApproved {
            token_id: token.id,
            caller: caller.clone(),
        })
    }
}

/// [`transfer_authority`] or [`Error::NotOwnerNorApproved`]
pub fn authorize_transfer(
    token: &Token,
    approvals: &ApprovalRegistry,
    caller: &Principal,
) -> Result<Authority> {
    transfer_authority(token, approvals, caller).ok_or_else(|| Error::NotOwnerNorApproved {
        token_id: token.id,
        caller: caller.clone(),
    })
}
