#![forbid(unsafe_code)]
//! Filesystem, polling, collection, hashing, and process helpers for Kiln.

pub mod collect;
pub mod error;
pub mod fs;
pub mod hash;
pub mod poll;
pub mod process;
