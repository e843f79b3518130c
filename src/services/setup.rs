//! Setup-time account validation.
//!
//! Run once before entering the poll loop (the moral equivalent of a config
//! wizard's credential check): authenticate, then prove the smarthome id is
//! readable. Failures are classified so the operator is told whether to fix
//! credentials or connectivity.

use log::error;

use crate::client::{FenixClient, FenixClientError};

#[derive(Debug)]
pub enum SetupError {
    /// Credentials rejected by the token endpoint.
    InvalidAuth(FenixClientError),
    /// API unreachable, or the smarthome id yields no zones.
    CannotConnect(String),
}

impl core::fmt::Display for SetupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SetupError::InvalidAuth(e) => write!(f, "invalid credentials: {}", e),
            SetupError::CannotConnect(s) => write!(f, "cannot connect: {}", s),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::InvalidAuth(e) => Some(e),
            SetupError::CannotConnect(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct AccountInfo {
    /// Display title for the validated account.
    pub title: String,
    pub zones_count: usize,
}

pub fn validate_account(client: &FenixClient) -> Result<AccountInfo, SetupError> {
    client.authenticate().map_err(|e| match e {
        auth @ FenixClientError::Auth { .. } => {
            error!("setup validation: credentials rejected");
            SetupError::InvalidAuth(auth)
        }
        other => SetupError::CannotConnect(other.to_string()),
    })?;

    let zones = client
        .get_zones()
        .map_err(|e| SetupError::CannotConnect(e.to_string()))?;

    // get_zones degrades read failures to empty, so an empty result also means
    // the smarthome id could not be validated.
    if zones.is_empty() {
        return Err(SetupError::CannotConnect(format!(
            "no zones found for smarthome id {}",
            client.smarthome_id()
        )));
    }

    Ok(AccountInfo {
        title: format!("Fenix V24 ({})", client.email()),
        zones_count: zones.len(),
    })
}
