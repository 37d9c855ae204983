//! Pure per-page reshaping: each builder takes loaded tables and returns a
//! serializable view model for the template renderer. Builders are stateless
//! and substitute defaults for anything missing, so no page ever fails on an
//! empty or misshapen sheet.
//!
//! Several near-duplicate pages diverge slightly in their column aliases and
//! aggregation edge cases; those divergences are kept as-is per stakeholder
//! guidance rather than unified.

pub mod finance;
pub mod org;
pub mod products;
pub mod strategy;
