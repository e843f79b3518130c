//! Steady-cadence polling of zone readings.

use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};

use crate::client::{FenixClient, FenixClientError};
use crate::services::readings::{self, ZoneReading};

/// Ensure a valid session, then fetch and derive all zone readings.
///
/// The authenticate-then-fetch pair lives here and nowhere else, so
/// re-authentication policy has exactly one home.
pub fn poll_readings(client: &FenixClient) -> Result<Vec<ZoneReading>, FenixClientError> {
    client.authenticate()?;
    let zones = client.get_zones()?;
    Ok(zones
        .iter()
        .map(|(zone_id, zone)| readings::zone_reading(zone_id, zone))
        .collect())
}

/// Poll forever at a steady cadence, logging each zone's reading. Per-poll
/// failures are logged and the loop carries on; the next cycle retries.
pub fn run_loop(client: &FenixClient, interval: Duration) {
    loop {
        let tick_start = Instant::now();

        match poll_readings(client) {
            Ok(readings) => {
                for reading in &readings {
                    log_reading(reading);
                }
            }
            Err(e) => warn!("poll failed: {}", e),
        }

        // Maintain steady cadence
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

fn log_reading(reading: &ZoneReading) {
    let temp = reading
        .temperature_c
        .map(|t| format!("{:.1}°C", t))
        .unwrap_or_else(|| "-".to_string());
    let mode = reading
        .mode
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "-".to_string());
    info!(
        "zone {} ({}): temperature={} mode={}",
        reading.zone_id.0, reading.zone_label, temp, mode
    );
    debug!(
        "zone {}: device={:?} raw_mode={:?}",
        reading.zone_id.0, reading.device_id, reading.raw_mode
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    #[test]
    fn poll_authenticates_then_derives_readings() {
        let mut server = Server::new();
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                json!({"access_token": "tok", "refresh_token": "ref", "expires_in": 3600})
                    .to_string(),
            )
            .expect(1)
            .create();
        server
            .mock("POST", "/smarthome/read/")
            .with_status(200)
            .with_body(
                json!({
                    "data": {
                        "zones": {
                            "1": {
                                "zone_label": "Living Room",
                                "devices": {
                                    "0": {"id_device": "C001-000", "temperature_air": "720", "nv_mode": "11"}
                                }
                            }
                        }
                    }
                })
                .to_string(),
            )
            .create();

        let client = FenixClient::with_endpoints(
            "user@example.com",
            "hunter2",
            "SH123",
            "en_GB",
            format!("{}/token", server.url()),
            server.url(),
        );

        let readings = poll_readings(&client).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].zone_label, "Living Room");
        assert_eq!(readings[0].temperature_c, Some(22.2));
        assert_eq!(readings[0].mode.as_ref().unwrap().to_string(), "Auto");
    }

    #[test]
    fn degraded_read_yields_no_readings_but_no_error() {
        let mut server = Server::new();
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                json!({"access_token": "tok", "refresh_token": "ref", "expires_in": 3600})
                    .to_string(),
            )
            .create();
        server.mock("POST", "/smarthome/read/").with_status(503).create();

        let client = FenixClient::with_endpoints(
            "user@example.com",
            "hunter2",
            "SH123",
            "en_GB",
            format!("{}/token", server.url()),
            server.url(),
        );

        assert!(poll_readings(&client).unwrap().is_empty());
    }
}
