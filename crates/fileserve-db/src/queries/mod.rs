//! Query functions.
//!
//! Every function takes a plain `&Connection`, so callers decide whether to
//! run them on a pooled connection or inside a transaction.

pub mod share_files;
pub mod shares;
