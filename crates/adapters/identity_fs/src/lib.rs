//! # roost-adapter-identity-fs
//!
//! Filesystem implementation of the identity ports.
//!
//! ## Responsibilities
//! - Persist the device identity as a single TOML document, written
//!   atomically so a crash never leaves a truncated record
//! - Scan the bundle directory for pre-provisioned PEM credential
//!   packages and split them into certificate and private key
//!
//! ## Dependency rule
//! Depends on `roost-app` (port traits) and `roost-domain`. Never the
//! other way around.

mod bundle;
mod error;
mod store;

pub use bundle::FsBundleScanner;
pub use error::IdentityFsError;
pub use store::FsIdentityStore;
