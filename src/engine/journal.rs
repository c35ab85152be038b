use std::sync::{Mutex, PoisonError};

use crate::model::Transaction;

/// Append-only destination for settled transactions.
pub trait TransactionSink: Send + Sync {
    fn append(&self, transaction: Transaction);
}

/// In-memory transaction journal.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<Transaction>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every entry in append order.
    pub fn entries(&self) -> Vec<Transaction> {
        self.lock().clone()
    }

    pub fn for_member(&self, member: &str) -> Vec<Transaction> {
        self.lock()
            .iter()
            .filter(|tx| tx.member == member)
            .cloned()
            .collect()
    }

    // Entries are only ever pushed, so a poisoned lock still holds a
    // consistent list.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Transaction>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionSink for Journal {
    fn append(&self, transaction: Transaction) {
        self.lock().push(transaction);
    }
}
