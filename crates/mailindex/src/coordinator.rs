//! Freeze / transaction bookkeeping for a writer handle
//!
//! Freezes nest and are reference counted; an explicit transaction is a
//! single level. The storage batch stays open while either is active and
//! commits once both are released.

use crate::error::{Error, Result};
use crate::status::Status;

/// What the storage layer has to do after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    OpenBatch,
    CommitBatch,
    RollbackBatch,
}

/// Observable batching state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Frozen(u32),
    InTransaction { frozen: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coordinator {
    freeze_depth: u32,
    in_transaction: bool,
}

fn unbalanced(message: &str) -> Error {
    Error::with_message(Status::UnbalancedFreezeThaw, message)
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn freeze_depth(&self) -> u32 {
        self.freeze_depth
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// True while a batch is open
    pub fn is_active(&self) -> bool {
        self.freeze_depth > 0 || self.in_transaction
    }

    pub fn state(&self) -> BatchState {
        match (self.in_transaction, self.freeze_depth) {
            (true, frozen) => BatchState::InTransaction { frozen },
            (false, 0) => BatchState::Idle,
            (false, depth) => BatchState::Frozen(depth),
        }
    }

    pub fn freeze(&mut self) -> Transition {
        let was_active = self.is_active();
        self.freeze_depth += 1;
        if was_active {
            Transition::Unchanged
        } else {
            Transition::OpenBatch
        }
    }

    pub fn thaw(&mut self) -> Result<Transition> {
        if self.freeze_depth == 0 {
            return Err(unbalanced("thaw() without a matching freeze()"));
        }
        self.freeze_depth -= 1;
        Ok(if self.is_active() {
            Transition::Unchanged
        } else {
            Transition::CommitBatch
        })
    }

    pub fn begin(&mut self) -> Result<Transition> {
        if self.in_transaction {
            return Err(unbalanced("begin() inside an open transaction"));
        }
        let was_active = self.is_active();
        self.in_transaction = true;
        Ok(if was_active {
            Transition::Unchanged
        } else {
            Transition::OpenBatch
        })
    }

    pub fn commit(&mut self) -> Result<Transition> {
        if !self.in_transaction {
            return Err(unbalanced("commit() without begin()"));
        }
        self.in_transaction = false;
        Ok(if self.is_active() {
            Transition::Unchanged
        } else {
            Transition::CommitBatch
        })
    }

    /// Roll back the open transaction. Frozen changes can only be undone
    /// together with the freeze, so this is refused while frozen.
    pub fn rollback(&mut self) -> Result<Transition> {
        if !self.in_transaction {
            return Err(unbalanced("rollback() without begin()"));
        }
        if self.freeze_depth > 0 {
            return Err(unbalanced("rollback() while frozen"));
        }
        self.in_transaction = false;
        Ok(Transition::RollbackBatch)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
