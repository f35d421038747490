use serde::{Deserialize, Serialize};

use crate::{now_millis, Address};

/// A value transfer. A transaction without a payer is minted value (mining
/// reward, airdrop or the genesis record) and debits nobody.
///
/// The serialized field names and order are part of the block hash and must
/// not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: u64,
    #[serde(rename = "payerAddress")]
    pub payer: Option<Address>,
    #[serde(rename = "payeeAddress")]
    pub payee: Option<Address>,
    pub amount: u64,
}

impl Transaction {
    pub fn new(
        timestamp: u64,
        payer: Option<Address>,
        payee: Option<Address>,
        amount: u64,
    ) -> Self {
        Self {
            timestamp,
            payer,
            payee,
            amount,
        }
    }

    /// Transfer between two addresses, stamped with the current time.
    pub fn transfer(payer: impl Into<Address>, payee: impl Into<Address>, amount: u64) -> Self {
        Self::new(now_millis(), Some(payer.into()), Some(payee.into()), amount)
    }

    /// Newly created value credited to `payee`, stamped with the current time.
    pub fn minted(payee: impl Into<Address>, amount: u64) -> Self {
        Self::new(now_millis(), None, Some(payee.into()), amount)
    }

    pub fn is_minted(&self) -> bool {
        self.payer.is_none()
    }
}
