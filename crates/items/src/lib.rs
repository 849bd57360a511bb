#![warn(missing_docs)]
//! Client item database: items.dat parsing, the cache file, content hashing.

pub mod database;
pub mod hash;
pub mod item;

pub use database::{save_to_file, ItemDatabase};
pub use hash::{proton, proton_file};
pub use item::{Item, ItemFlags};
