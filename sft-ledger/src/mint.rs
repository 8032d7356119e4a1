//! Token creation and destruction

use crate::{
    authorization::authorize_transfer,
    error::{Error, Result},
    state::{LedgerState, Outcome},
    types::{LedgerEvent, Principal, Slot, TokenId, Value},
};

impl LedgerState {
    /// Mint a token for `recipient` with a fresh identity.
    ///
    /// Any slot is accepted; a slot comes into existence with its first token.
    pub fn mint(
        &mut self,
        recipient: Principal,
        slot: Slot,
        value: Value,
    ) -> Result<Outcome<TokenId>> {
        if recipient.is_null() {
            return Err(Error::InvalidRecipient);
        }
        let expected_id = self.tokens.next_id()?;

        let token_id = self.tokens.create(recipient.clone(), slot, value);
        debug_assert_eq!(token_id, expected_id);

        Ok(Outcome::new(
            token_id,
            vec![
                LedgerEvent::Transfer {
                    from: None,
                    to: Some(recipient),
                    token_id,
                },
                LedgerEvent::SlotChanged {
                    token_id,
                    old_slot: None,
                    new_slot: Some(slot),
                },
                LedgerEvent::TransferValue {
                    from_token: None,
                    to_token: Some(token_id),
                    value,
                },
            ],
        ))
    }

    /// Destroy a token.
    ///
    /// Requires ownership-transfer authority. Clears the single approval and
    /// every value allowance on the token and decrements the owner's count.
    /// The id is never reissued.
    pub fn burn(&mut self, caller: &Principal, token_id: TokenId) -> Result<Outcome<()>> {
        let token = self.tokens.get(token_id)?;
        authorize_transfer(token, &self.approvals, caller)?;

        let token = self.tokens.remove(token_id)?;
        let cleared = self.approvals.clear_token(token_id);

        let mut events = Vec::with_capacity(4);
        if cleared.is_some() {
            events.push(LedgerEvent::Approval {
                owner: token.owner.clone(),
                approved: None,
                token_id,
            });
        }
        events.push(LedgerEvent::TransferValue {
            from_token: Some(token_id),
            to_token: None,
            value: token.value,
        });
        events.push(LedgerEvent::SlotChanged {
            token_id,
            old_slot: Some(token.slot),
            new_slot: None,
        });
        events.push(LedgerEvent::Transfer {
            from: Some(token.owner),
            to: None,
            token_id,
        });

        Ok(Outcome::new((), events))
    }
}
