//! Topaz Billing - Stripe subscription backend
//!
//! This crate serves the subscription plan catalog, creates Stripe customers
//! and subscriptions, and reconciles Stripe webhook events into the
//! subscription store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
