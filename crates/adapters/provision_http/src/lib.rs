//! # roost-adapter-provision-http
//!
//! REST implementation of the provisioning ports: certificate issuance
//! through the credential service and policy attachment through the
//! policy service.
//!
//! ## Endpoints
//! - `POST {base}/v1/identities` — submit CSR subject fields, returns
//!   the issued identity
//! - `PUT {base}/v1/policies/{name}/attachments` — attach a policy to
//!   an identity ARN
//! - `GET {base}/v1/policies/{name}/attachments?target={arn}` — check
//!   an attachment
//!
//! ## Dependency rule
//! Depends on `roost-app` (port traits) and `roost-domain`. Never the
//! other way around.

mod client;
mod config;
mod error;

pub use client::HttpProvisioner;
pub use config::ProvisionConfig;
pub use error::ProvisionHttpError;
