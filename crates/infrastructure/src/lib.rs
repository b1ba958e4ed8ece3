//! Strata DNS Infrastructure Layer
//!
//! Adapters behind the application ports: cache tiers, the blocklist engine,
//! the upstream client, analytics, and the resolver pipeline that composes
//! them.

pub mod dns;
