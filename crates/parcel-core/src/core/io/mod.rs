//! # Archive I/O
//!
//! The time-series archive that receives the parcel diagnostics: a dimension /
//! variable / attribute store ([`traits::Archive`]) with an in-memory implementation
//! ([`memory::MemoryArchive`]) and a file-backed one ([`file::FileArchive`]).

pub mod file;
pub mod memory;
pub mod traits;
