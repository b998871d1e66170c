//! Value transfer used to collect submission fees.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use verdant_core::{Amount, Principal};

/// Why a transfer did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The payer cannot cover the amount.
    #[error("insufficient funds: {principal} holds {available}, needs {required}")]
    InsufficientFunds {
        /// The payer.
        principal: Principal,
        /// Current balance of the payer.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// The mechanism refused the transfer for another reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Moves an amount from one principal to another, atomically.
///
/// A returned error means nothing moved.
pub trait ValueTransfer: Send + Sync {
    /// Debit `from` and credit `to` by `amount`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the transfer did not happen.
    fn transfer(&self, amount: Amount, from: &Principal, to: &Principal)
    -> Result<(), TransferError>;
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Amount moved.
    pub amount: Amount,
    /// Debited principal.
    pub from: Principal,
    /// Credited principal.
    pub to: Principal,
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Principal, Amount>,
    journal: Vec<TransferRecord>,
}

/// In-process ledger with balances and a journal of every transfer.
///
/// A metered ledger refuses debits that exceed the payer's balance. An
/// unmetered ledger only journals and credits, which suits deployments where
/// fees are settled elsewhere.
#[derive(Debug)]
pub struct InMemoryLedger {
    inner: Mutex<Ledger>,
    metered: bool,
}

impl InMemoryLedger {
    /// A ledger that enforces balances.
    #[must_use]
    pub fn metered() -> Self {
        Self {
            inner: Mutex::new(Ledger::default()),
            metered: true,
        }
    }

    /// A ledger that never fails a debit.
    #[must_use]
    pub fn unmetered() -> Self {
        Self {
            inner: Mutex::new(Ledger::default()),
            metered: false,
        }
    }

    /// Add funds to a principal. Saturates at `Amount::MAX`.
    pub fn credit(&self, principal: &Principal, amount: Amount) {
        if let Ok(mut ledger) = self.inner.lock() {
            let balance = ledger.balances.entry(principal.clone()).or_default();
            *balance = balance.saturating_add(amount);
        }
    }

    /// Current balance of a principal.
    #[must_use]
    pub fn balance_of(&self, principal: &Principal) -> Amount {
        self.inner
            .lock()
            .ok()
            .and_then(|ledger| ledger.balances.get(principal).copied())
            .unwrap_or(0)
    }

    /// Every completed transfer, oldest first.
    #[must_use]
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.inner
            .lock()
            .map(|ledger| ledger.journal.clone())
            .unwrap_or_default()
    }
}

impl ValueTransfer for InMemoryLedger {
    fn transfer(
        &self,
        amount: Amount,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), TransferError> {
        let mut ledger = self
            .inner
            .lock()
            .map_err(|e| TransferError::Rejected(format!("ledger lock poisoned: {e}")))?;

        let available = ledger.balances.get(from).copied().unwrap_or(0);
        let remaining = if self.metered {
            Some(available.checked_sub(amount).ok_or_else(|| {
                TransferError::InsufficientFunds {
                    principal: from.clone(),
                    available,
                    required: amount,
                }
            })?)
        } else {
            None
        };

        // A self-transfer is checked and journaled but moves nothing.
        if from != to {
            let credited = ledger
                .balances
                .get(to)
                .copied()
                .unwrap_or(0)
                .checked_add(amount)
                .ok_or_else(|| TransferError::Rejected(format!("balance overflow for {to}")))?;

            if let Some(remaining) = remaining {
                ledger.balances.insert(from.clone(), remaining);
            }
            ledger.balances.insert(to.clone(), credited);
        }
        ledger.journal.push(TransferRecord {
            amount,
            from: from.clone(),
            to: to.clone(),
        });

        debug!(amount, from = %from, to = %to, "transfer applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Principal {
        Principal::new(s).unwrap()
    }

    #[test]
    fn test_metered_transfer_moves_balance() {
        let ledger = InMemoryLedger::metered();
        ledger.credit(&p("ST1TEST"), 800);
        ledger.transfer(500, &p("ST1TEST"), &p("ST2TEST")).unwrap();

        assert_eq!(ledger.balance_of(&p("ST1TEST")), 300);
        assert_eq!(ledger.balance_of(&p("ST2TEST")), 500);
        assert_eq!(
            ledger.transfers(),
            vec![TransferRecord {
                amount: 500,
                from: p("ST1TEST"),
                to: p("ST2TEST"),
            }]
        );
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let ledger = InMemoryLedger::metered();
        ledger.credit(&p("ST1TEST"), 500);
        ledger.transfer(500, &p("ST1TEST"), &p("ST1TEST")).unwrap();

        assert_eq!(ledger.balance_of(&p("ST1TEST")), 500);
        assert_eq!(ledger.transfers().len(), 1);

        // Still bounded by the balance.
        let err = ledger
            .transfer(600, &p("ST1TEST"), &p("ST1TEST"))
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance_of(&p("ST1TEST")), 500);

        let unmetered = InMemoryLedger::unmetered();
        unmetered.transfer(500, &p("ST1TEST"), &p("ST1TEST")).unwrap();
        assert_eq!(unmetered.balance_of(&p("ST1TEST")), 0);
    }

    #[test]
    fn test_metered_insufficient_funds_moves_nothing() {
        let ledger = InMemoryLedger::metered();
        ledger.credit(&p("ST1TEST"), 100);
        let err = ledger
            .transfer(500, &p("ST1TEST"), &p("ST2TEST"))
            .unwrap_err();

        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                principal: p("ST1TEST"),
                available: 100,
                required: 500,
            }
        );
        assert_eq!(ledger.balance_of(&p("ST1TEST")), 100);
        assert_eq!(ledger.balance_of(&p("ST2TEST")), 0);
        assert!(ledger.transfers().is_empty());
    }

    #[test]
    fn test_unmetered_never_fails_debit() {
        let ledger = InMemoryLedger::unmetered();
        ledger.transfer(500, &p("ST1TEST"), &p("ST2TEST")).unwrap();
        assert_eq!(ledger.balance_of(&p("ST2TEST")), 500);
        assert_eq!(ledger.transfers().len(), 1);
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let ledger = InMemoryLedger::unmetered();
        ledger.credit(&p("ST2TEST"), Amount::MAX);
        assert!(matches!(
            ledger.transfer(1, &p("ST1TEST"), &p("ST2TEST")),
            Err(TransferError::Rejected(_))
        ));
        assert!(ledger.transfers().is_empty());
    }
}
