//! Authoritative token table and ownership index
//!
//! `TokenLedger` maps each live [`TokenId`] to its [`Token`] and keeps a
//! per-principal count of owned tokens in step with it. Identity allocation
//! lives here too: ids start at [`TokenId::FIRST`], advance by one per
//! created token and are never handed out again, even after a burn.
//!
//! Mutators assume their preconditions were checked by the caller (mint and
//! transfer engines validate everything before the first write).

use crate::{
    error::{Error, Result},
    types::{Principal, Slot, Token, TokenId, Value},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Token table, ownership index and id counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLedger {
    /// Live tokens by id
    tokens: BTreeMap<TokenId, Token>,

    /// Principal -> number of live tokens owned (entries at zero are removed)
    owned: HashMap<Principal, u64>,

    /// Next identity to hand out
    next_id: u64,
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenLedger {
    /// Empty ledger; first minted token gets id 1
    pub fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
            owned: HashMap::new(),
            next_id: TokenId::FIRST.get(),
        }
    }

    /// Look up a live token
    pub fn get(&self, id: TokenId) -> Result<&Token> {
        self.tokens.get(&id).ok_or(Error::InvalidTokenId(id))
    }

    /// Whether `id` refers to a live token
    pub fn contains(&self, id: TokenId) -> bool {
        self.tokens.contains_key(&id)
    }

    /// Owner of a live token
    pub fn owner_of(&self, id: TokenId) -> Result<&Principal> {
        self.get(id).map(|token| &token.owner)
    }

    /// Slot of a live token
    pub fn slot_of(&self, id: TokenId) -> Result<Slot> {
        self.get(id).map(|token| token.slot)
    }

    /// Value of a live token
    pub fn value_of(&self, id: TokenId) -> Result<Value> {
        self.get(id).map(|token| token.value)
    }

    /// Number of distinct tokens owned (zero for unknown principals)
    pub fn owned_count(&self, principal: &Principal) -> u64 {
        self.owned.get(principal).copied().unwrap_or(0)
    }

    /// Ids owned by `principal`, ascending
    pub fn tokens_of(&self, principal: &Principal) -> Vec<TokenId> {
        if self.owned_count(principal) == 0 {
            return Vec::new();
        }
        self.tokens
            .values()
            .filter(|token| &token.owner == principal)
            .map(|token| token.id)
            .collect()
    }

    /// Number of live tokens
    pub fn total_supply(&self) -> usize {
        self.tokens.len()
    }

    /// Iterate live tokens in id order
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// Identity the next created token will receive.
    ///
    /// The last ordinal is reserved so that the counter itself never overflows.
    pub fn next_id(&self) -> Result<TokenId> {
        if self.next_id == u64::MAX {
            return Err(Error::IdSpaceExhausted);
        }
        Ok(TokenId::new(self.next_id))
    }

    /// Create a token for `owner` with the next identity.
    ///
    /// Caller must have checked [`Self::next_id`] and that `owner` is not null.
    pub(crate) fn create(&mut self, owner: Principal, slot: Slot, value: Value) -> TokenId {
        debug_assert!(!owner.is_null());
        debug_assert!(self.next_id < u64::MAX);

        let id = TokenId::new(self.next_id);
        self.next_id += 1;

        self.increment_owned(&owner);
        self.tokens.insert(
            id,
            Token {
                id,
                owner,
                slot,
                value,
            },
        );
        id
    }

    /// Move a token to `to`, keeping the ownership index in step.
    ///
    /// Returns the previous owner.
    pub(crate) fn set_owner(&mut self, id: TokenId, to: Principal) -> Result<Principal> {
        let token = self.tokens.get_mut(&id).ok_or(Error::InvalidTokenId(id))?;
        let from = std::mem::replace(&mut token.owner, to.clone());

        self.decrement_owned(&from);
        self.increment_owned(&to);
        Ok(from)
    }

    /// Overwrite a token's value
    pub(crate) fn set_value(&mut self, id: TokenId, value: Value) -> Result<()> {
        let token = self.tokens.get_mut(&id).ok_or(Error::InvalidTokenId(id))?;
        token.value = value;
        Ok(())
    }

    /// Remove a token from the table. Its id is not recycled.
    pub(crate) fn remove(&mut self, id: TokenId) -> Result<Token> {
        let token = self.tokens.remove(&id).ok_or(Error::InvalidTokenId(id))?;
        self.decrement_owned(&token.owner);
        Ok(token)
    }

    /// Recompute the ownership index from the token table and compare
    pub fn ownership_index_consistent(&self) -> bool {
        let mut expected: HashMap<&Principal, u64> = HashMap::new();
        for token in self.tokens.values() {
            *expected.entry(&token.owner).or_default() += 1;
        }

        expected.len() == self.owned.len()
            && expected
                .iter()
                .all(|(principal, count)| self.owned.get(*principal) == Some(count))
    }

    /// Whether every entry is stored under its own id and has a real owner
    pub fn records_well_formed(&self) -> bool {
        self.tokens
            .iter()
            .all(|(id, token)| *id == token.id && !token.owner.is_null())
    }

    /// Whether every live id is below the allocation counter
    pub fn counter_ahead_of_ids(&self) -> bool {
        self.tokens
            .keys()
            .next_back()
            .map_or(true, |last| last.get() < self.next_id)
    }

    fn increment_owned(&mut self, principal: &Principal) {
        *self.owned.entry(principal.clone()).or_default() += 1;
    }

    fn decrement_owned(&mut self, principal: &Principal) {
        if let Some(count) = self.owned.get_mut(principal) {
            *count -= 1;
            if *count == 0 {
                self.owned.remove(principal);
            }
        }
    }
}
