//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `billing` - Plans, subscription records, Stripe events and signatures

pub mod billing;
pub mod foundation;
