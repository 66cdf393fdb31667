// src/engine/fault.rs

//! Failure normalization.
//!
//! Dependency bodies run inside spawned tasks, so a panic surfaces as a
//! [`JoinError`] instead of tearing down the run. This module converts those
//! faults into ordinary error values: a deliberate [`Abort`] unwinds back
//! into the original error, anything else becomes a structured
//! [`RundagError::Panicked`].

use std::any::Any;
use std::backtrace::Backtrace;

use tokio::task::JoinError;
use tracing::error;

use crate::errors::RundagError;
use crate::must::Abort;

pub(crate) fn error_from_join(id: &str, err: JoinError) -> anyhow::Error {
    match err.try_into_panic() {
        Ok(payload) => error_from_panic(id, payload),
        Err(err) => anyhow::Error::new(err).context(format!("body task for {id} did not finish")),
    }
}

fn error_from_panic(id: &str, payload: Box<dyn Any + Send>) -> anyhow::Error {
    let payload = match payload.downcast::<Abort>() {
        Ok(abort) => return abort.into_inner(),
        Err(other) => other,
    };

    let message = panic_message(payload.as_ref());
    error!(id = %id, message = %message, "dependency body panicked");
    RundagError::Panicked {
        id: id.to_string(),
        message,
        backtrace: Backtrace::force_capture().to_string(),
    }
    .into()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
