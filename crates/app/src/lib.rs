//! # roost-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `IdentityStore` — durable persistence of the device identity
//!   - `BundleScanner` — discovery of pre-provisioned credential packages
//!   - `CredentialIssuer` — certificate issuance from a CSR
//!   - `PolicyManager` — policy attachment and verification
//!   - `BrokerDialer` / `BrokerSession` — the pub/sub transport
//! - Provide the **use-case services**:
//!   - `ProvisioningService` — locate, import, or issue the device identity
//!   - `SessionManager` — single-session connect/disconnect and pub/sub
//! - Orchestrate domain objects without knowing *how* storage, HTTP, or
//!   the broker transport work
//!
//! ## Dependency rule
//! Depends on `roost-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
