//! Long-running maintenance tasks spawned by the binary.

pub mod token_sweep;
