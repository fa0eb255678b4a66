// src/config/mod.rs
pub mod lookup;

pub use lookup::LookupConfig;
