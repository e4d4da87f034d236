//! Configuration model.
//!
//! An immutable description of every algorithm, key, key set and checker the
//! registry can build. Nothing in here resolves entries; see `resolver` and
//! `registry` for that.

mod config;
mod document;
mod entry;

pub use config::{CheckersConfig, DEFAULT_NAME, JwtConfig};
pub use document::{
    CheckersDocument, ClaimProfileDocument, ConfigDocument, HeaderProfileDocument, KeyDocument,
    KeySetDocument, OrderedMap,
};
pub use entry::{
    AlgorithmEntry, ClaimCheckerEntry, ClaimProfile, Entry, HeaderCheckerEntry, HeaderProfile,
    KeyEntry, KeyMember, KeySetEntry, ProfileMember, TokenTypeEntry,
};
