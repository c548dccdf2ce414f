//! # roost-domain
//!
//! Pure domain model for the roost device-connection agent.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions
//! - Define the **DeviceIdentity** (certificate pair plus its cloud-side
//!   registration) and the CSR/package inputs it is built from
//! - Define the **session state machine** (Disconnected → Connecting →
//!   Connected/failure states) and the broker status values it folds
//! - Define **messages** (raw broker payloads and their UTF-8 text form)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod identity;
pub mod message;
pub mod session;
