//! Compacted de Bruijn graph construction over an implicit vertex set
pub mod classify;
pub mod extract;
pub mod meta_info;
pub mod state;
pub mod vertices;
