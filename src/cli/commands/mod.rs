//! One module per CLI action.

pub mod close;
pub mod open;
pub mod status;
