// src/engine/mod.rs

//! Memoized execution engine: gates, ledger, failure normalization.

mod fault;
mod gate;
mod ledger;

pub(crate) use gate::Outcome;
pub(crate) use ledger::{Ledger, LedgerSnapshot};
