//! Host-facing commands: set a zone's operating mode or trigger a timed boost.
//!
//! Commands resolve the account's client through the registry, validate their
//! input here at the boundary, and delegate to the client. Client-level push
//! failures come back as a boolean, not an error.

use log::info;

use crate::client::FenixClientError;
use crate::models::fenix::{DeviceId, ZoneMode};
use crate::registry::ClientRegistry;

pub const MIN_BOOST_MINUTES: u32 = 5;
pub const MAX_BOOST_MINUTES: u32 = 120;
pub const DEFAULT_BOOST_MINUTES: u32 = 30;

#[derive(Debug)]
pub enum CommandError {
    /// No client registered for the account id.
    UnknownAccount(String),
    /// The requested mode label is outside the closed set.
    UnknownMode(String),
    /// Boost duration outside [MIN_BOOST_MINUTES, MAX_BOOST_MINUTES].
    BoostOutOfRange(u32),
    Api(FenixClientError),
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CommandError::UnknownAccount(id) => write!(f, "no client registered for account {}", id),
            CommandError::UnknownMode(label) => write!(f, "unknown mode: {}", label),
            CommandError::BoostOutOfRange(minutes) => write!(
                f,
                "boost duration {} minutes outside {}-{}",
                minutes, MIN_BOOST_MINUTES, MAX_BOOST_MINUTES
            ),
            CommandError::Api(e) => write!(f, "api error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FenixClientError> for CommandError {
    fn from(value: FenixClientError) -> Self {
        CommandError::Api(value)
    }
}

/// Set the operating mode of a device, addressed by its closed-set label.
/// Returns whether the backend accepted the command.
pub fn set_zone_mode(
    registry: &ClientRegistry,
    account_id: &str,
    device_id: &DeviceId,
    mode_label: &str,
) -> Result<bool, CommandError> {
    let client = registry
        .get(account_id)
        .ok_or_else(|| CommandError::UnknownAccount(account_id.to_string()))?;

    let mode = ZoneMode::from_label(mode_label)
        .ok_or_else(|| CommandError::UnknownMode(mode_label.to_string()))?;
    let code = mode
        .code()
        .ok_or_else(|| CommandError::UnknownMode(mode_label.to_string()))?;

    info!("setting device {} to mode {} ({})", device_id.0, mode_label, code);
    client.authenticate()?;
    Ok(client.set_mode(device_id, code)?)
}

/// Trigger a timed boost. Duration is bounds-checked here; the client trusts
/// this boundary and does not re-validate.
pub fn set_zone_boost(
    registry: &ClientRegistry,
    account_id: &str,
    device_id: &DeviceId,
    duration_minutes: u32,
) -> Result<bool, CommandError> {
    if !(MIN_BOOST_MINUTES..=MAX_BOOST_MINUTES).contains(&duration_minutes) {
        return Err(CommandError::BoostOutOfRange(duration_minutes));
    }

    let client = registry
        .get(account_id)
        .ok_or_else(|| CommandError::UnknownAccount(account_id.to_string()))?;

    info!(
        "triggering boost on device {} for {} minutes",
        device_id.0, duration_minutes
    );
    client.authenticate()?;
    Ok(client.set_boost(device_id, duration_minutes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FenixClient;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    fn registry_with_client(server: &mockito::ServerGuard) -> ClientRegistry {
        let client = FenixClient::with_endpoints(
            "user@example.com",
            "hunter2",
            "SH123",
            "en_GB",
            format!("{}/token", server.url()),
            server.url(),
        );
        let registry = ClientRegistry::new();
        registry.insert("entry-1", Arc::new(client));
        registry
    }

    fn device() -> DeviceId {
        DeviceId("C001-000".to_string())
    }

    #[test]
    fn boost_duration_is_bounds_checked_before_any_io() {
        // No mocks: an out-of-range duration must never reach the network.
        let server = Server::new();
        let registry = registry_with_client(&server);

        for minutes in [0, 4, 121, 600] {
            match set_zone_boost(&registry, "entry-1", &device(), minutes) {
                Err(CommandError::BoostOutOfRange(m)) => assert_eq!(m, minutes),
                other => panic!("expected BoostOutOfRange, got {:?}", other),
            }
        }
    }

    #[test]
    fn boost_range_bounds_are_inclusive() {
        let mut server = Server::new();
        let registry = registry_with_client(&server);
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                json!({"access_token": "tok", "refresh_token": "ref", "expires_in": 3600})
                    .to_string(),
            )
            .create();
        let push = server
            .mock("POST", "/query/push/")
            .with_status(200)
            .expect(2)
            .create();

        assert!(set_zone_boost(&registry, "entry-1", &device(), MIN_BOOST_MINUTES).unwrap());
        assert!(set_zone_boost(&registry, "entry-1", &device(), MAX_BOOST_MINUTES).unwrap());
        push.assert();
    }

    #[test]
    fn unknown_mode_label_is_rejected() {
        let server = Server::new();
        let registry = registry_with_client(&server);

        match set_zone_mode(&registry, "entry-1", &device(), "Toasty") {
            Err(CommandError::UnknownMode(label)) => assert_eq!(label, "Toasty"),
            other => panic!("expected UnknownMode, got {:?}", other),
        }
    }

    #[test]
    fn unknown_account_is_rejected() {
        let server = Server::new();
        let registry = registry_with_client(&server);

        match set_zone_mode(&registry, "entry-2", &device(), "Auto") {
            Err(CommandError::UnknownAccount(id)) => assert_eq!(id, "entry-2"),
            other => panic!("expected UnknownAccount, got {:?}", other),
        }
    }

    #[test]
    fn mode_label_resolves_to_canonical_code() {
        let mut server = Server::new();
        let registry = registry_with_client(&server);
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                json!({"access_token": "tok", "refresh_token": "ref", "expires_in": 3600})
                    .to_string(),
            )
            .create();
        let push = server
            .mock("POST", "/query/push/")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query[gv_mode]".into(), "13".into()),
                Matcher::UrlEncoded("query[nv_mode]".into(), "13".into()),
            ]))
            .with_status(200)
            .expect(1)
            .create();

        assert!(set_zone_mode(&registry, "entry-1", &device(), "Antifreeze").unwrap());
        push.assert();
    }

    #[test]
    fn backend_rejection_is_false_not_error() {
        let mut server = Server::new();
        let registry = registry_with_client(&server);
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                json!({"access_token": "tok", "refresh_token": "ref", "expires_in": 3600})
                    .to_string(),
            )
            .create();
        server.mock("POST", "/query/push/").with_status(500).create();

        assert_eq!(
            set_zone_boost(&registry, "entry-1", &device(), DEFAULT_BOOST_MINUTES).unwrap(),
            false
        );
    }
}
