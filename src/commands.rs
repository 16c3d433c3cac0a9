//! Implementation of benten CLI commands.

pub mod check;
pub mod symbols;
