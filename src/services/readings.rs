//! Derived per-zone readings: temperature in Celsius and decoded mode.

use crate::models::fenix::{DeviceId, Zone, ZoneId, ZoneMode};

/// What the host sees for one zone on one poll. Missing fields mean "no data
/// this cycle", not zero.
#[derive(Debug, Clone)]
pub struct ZoneReading {
    pub zone_id: ZoneId,
    pub zone_label: String,
    /// Primary device id, needed to address mode/boost commands.
    pub device_id: Option<DeviceId>,
    /// Air temperature, Celsius, one decimal.
    pub temperature_c: Option<f64>,
    pub mode: Option<ZoneMode>,
    /// Raw backend mode code, kept for diagnostics.
    pub raw_mode: Option<String>,
}

/// Convert a raw reading in tenths of a degree Fahrenheit to Celsius, rounded
/// to one decimal. 720 -> 72.0F -> 22.2C.
pub fn tenths_fahrenheit_to_celsius(raw: f64) -> f64 {
    let fahrenheit = raw / 10.0;
    let celsius = (fahrenheit - 32.0) * 5.0 / 9.0;
    (celsius * 10.0).round() / 10.0
}

/// Derive the reading for one zone from its primary device. A zone without a
/// primary device still yields a reading shell (label and id) so the host can
/// report "no data" instead of dropping the zone.
pub fn zone_reading(zone_id: &ZoneId, zone: &Zone) -> ZoneReading {
    let primary = zone.devices.primary();

    let temperature_c = primary
        .as_ref()
        .and_then(|d| d.temperature_air)
        .filter(|raw| *raw != 0.0)
        .map(tenths_fahrenheit_to_celsius);

    let raw_mode = primary.as_ref().and_then(|d| d.nv_mode.clone());
    let mode = raw_mode.as_deref().map(ZoneMode::from_code);
    let device_id = primary.and_then(|d| d.id_device);

    ZoneReading {
        zone_id: zone_id.clone(),
        zone_label: zone.label().to_string(),
        device_id,
        temperature_c,
        mode,
        raw_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zone(value: serde_json::Value) -> Zone {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn conversion_matches_reference_values() {
        assert_eq!(tenths_fahrenheit_to_celsius(720.0), 22.2);
        assert_eq!(tenths_fahrenheit_to_celsius(680.0), 20.0);
    }

    #[test]
    fn reading_from_listed_devices() {
        let zone = zone(json!({
            "zone_label": "Living Room",
            "devices": [
                {"id_device": "C001-000", "temperature_air": "720", "nv_mode": "11"}
            ]
        }));
        let reading = zone_reading(&ZoneId("1".to_string()), &zone);

        assert_eq!(reading.zone_label, "Living Room");
        assert_eq!(reading.device_id, Some(DeviceId("C001-000".to_string())));
        assert_eq!(reading.temperature_c, Some(22.2));
        assert_eq!(reading.mode, Some(ZoneMode::Auto));
        assert_eq!(reading.raw_mode.as_deref(), Some("11"));
    }

    #[test]
    fn reading_from_keyed_devices_uses_key_zero() {
        let zone = zone(json!({
            "zone_label": "Bedroom",
            "devices": {
                "0": {"id_device": "C002-000", "temperature_air": 680, "nv_mode": 16},
                "1": {"id_device": "C002-001", "temperature_air": 900, "nv_mode": 0}
            }
        }));
        let reading = zone_reading(&ZoneId("2".to_string()), &zone);

        assert_eq!(reading.device_id, Some(DeviceId("C002-000".to_string())));
        assert_eq!(reading.temperature_c, Some(20.0));
        assert_eq!(reading.mode, Some(ZoneMode::Boost));
    }

    #[test]
    fn zero_or_absent_temperature_publishes_nothing() {
        let zone_zero = zone(json!({
            "zone_label": "Attic",
            "devices": [{"id_device": "C003-000", "temperature_air": "0"}]
        }));
        assert_eq!(
            zone_reading(&ZoneId("3".to_string()), &zone_zero).temperature_c,
            None
        );

        let zone_absent = zone(json!({
            "zone_label": "Attic",
            "devices": [{"id_device": "C003-000"}]
        }));
        assert_eq!(
            zone_reading(&ZoneId("3".to_string()), &zone_absent).temperature_c,
            None
        );
    }

    #[test]
    fn missing_primary_device_yields_reading_shell() {
        let zone = zone(json!({
            "zone_label": "Garage",
            "devices": {"1": {"id_device": "C004-001"}}
        }));
        let reading = zone_reading(&ZoneId("4".to_string()), &zone);

        assert_eq!(reading.zone_label, "Garage");
        assert_eq!(reading.device_id, None);
        assert_eq!(reading.temperature_c, None);
        assert_eq!(reading.mode, None);
    }

    #[test]
    fn unknown_mode_is_labeled_with_raw_code() {
        let zone = zone(json!({
            "devices": [{"id_device": "C005-000", "nv_mode": "99"}]
        }));
        let reading = zone_reading(&ZoneId("5".to_string()), &zone);
        assert_eq!(reading.mode.unwrap().to_string(), "Unknown (99)");
        assert_eq!(reading.raw_mode.as_deref(), Some("99"));
    }
}
