//! Command implementations for the factorfolio CLI.

pub(crate) mod schedule;
pub(crate) mod signals;
pub(crate) mod sync;
