//! Wire types for the Fenix V24 "human" API.
//!
//! Scope: types and field conversions only — no HTTP code.
//!
//! Notes
//! - The backend is inconsistent between API versions: zones and devices are
//!   returned either as a JSON array or as an object keyed by a stringified
//!   id/index. [`Collection`] is the single seam that absorbs that ambiguity;
//!   nothing downstream sees the raw shape.
//! - Numeric fields arrive as either JSON numbers or numeric strings, so the
//!   tolerant deserializers below normalize them.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

// =====================
// List-or-keyed collections
// =====================

/// A backend collection that may be a sequential array or an object keyed by
/// stringified id. The keyed shape keeps entry values raw so one type covers
/// both zones and devices; entries are converted on access.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Collection<T> {
    Listed(Vec<T>),
    Keyed(Map<String, Value>),
    /// Anything else (null, a scalar); treated as empty.
    Other(Value),
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection::Listed(Vec::new())
    }
}

impl<T: serde::de::DeserializeOwned + Clone> Collection<T> {
    /// Normalize into ordered `(id, item)` pairs. Source order is preserved
    /// for the listed shape, insertion order for the keyed shape. `id_of`
    /// supplies the id of a listed item; keyed entries use their key verbatim.
    pub fn into_pairs<F>(self, id_of: F) -> Vec<(String, T)>
    where
        F: Fn(&T) -> String,
    {
        match self {
            Collection::Listed(items) => items.into_iter().map(|item| (id_of(&item), item)).collect(),
            Collection::Keyed(entries) => entries
                .into_iter()
                .filter_map(|(key, value)| match serde_json::from_value::<T>(value) {
                    Ok(item) => Some((key, item)),
                    Err(e) => {
                        log::warn!("skipping malformed entry {}: {}", key, e);
                        None
                    }
                })
                .collect(),
            Collection::Other(value) => {
                log::warn!("backend returned collection as unexpected type: {}", json_type_name(&value));
                Vec::new()
            }
        }
    }

    /// The entry representing the whole collection: first element of a listed
    /// shape, entry at key `"0"` of a keyed one. `None` means no data — the
    /// caller publishes nothing rather than erroring.
    pub fn primary(&self) -> Option<T> {
        match self {
            Collection::Listed(items) => items.first().cloned(),
            Collection::Keyed(entries) => entries
                .get("0")
                .and_then(|value| serde_json::from_value(value.clone()).ok()),
            Collection::Other(_) => None,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =====================
// Smarthome read payload
// =====================

#[derive(Debug, Default, Deserialize)]
pub struct SmarthomeRead {
    #[serde(default)]
    pub data: SmarthomeData,
}

#[derive(Debug, Default, Deserialize)]
pub struct SmarthomeData {
    #[serde(default)]
    pub zones: Collection<Zone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub zone_label: Option<String>,
    /// Numeric zone id, present when the backend returns zones as an array.
    #[serde(default, deserialize_with = "stringly")]
    pub num_zone: Option<String>,
    #[serde(default)]
    pub devices: Collection<Device>,
}

impl Zone {
    pub fn label(&self) -> &str {
        self.zone_label.as_deref().unwrap_or("Unknown")
    }

    /// Zone id for the listed shape (the keyed shape carries its id as the key).
    pub fn listed_zone_id(&self) -> String {
        self.num_zone.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id_device: Option<DeviceId>,
    /// Air temperature in tenths of a degree Fahrenheit.
    #[serde(default, deserialize_with = "raw_tenths")]
    pub temperature_air: Option<f64>,
    /// Current operating mode code ("nv" = new value).
    #[serde(default, deserialize_with = "stringly")]
    pub nv_mode: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =====================
// Operating modes
// =====================

/// Closed mode table observed on the backend. Codes 2 and 8 both decode to
/// Eco; 8 is the canonical code when setting the mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneMode {
    Off,
    Eco,
    Auto,
    Antifreeze,
    Manual,
    Boost,
    /// Unrecognized code, kept raw for diagnostics.
    Unknown(String),
}

impl ZoneMode {
    pub fn from_code(code: &str) -> ZoneMode {
        match code {
            "0" => ZoneMode::Off,
            "2" | "8" => ZoneMode::Eco,
            "11" => ZoneMode::Auto,
            "13" => ZoneMode::Antifreeze,
            "15" => ZoneMode::Manual,
            "16" => ZoneMode::Boost,
            other => ZoneMode::Unknown(other.to_string()),
        }
    }

    /// Parse a user-facing label from the closed set. Unknown labels are not
    /// accepted — commands may only request modes the backend understands.
    pub fn from_label(label: &str) -> Option<ZoneMode> {
        match label {
            "Off" => Some(ZoneMode::Off),
            "Eco" => Some(ZoneMode::Eco),
            "Auto" => Some(ZoneMode::Auto),
            "Antifreeze" => Some(ZoneMode::Antifreeze),
            "Manual" => Some(ZoneMode::Manual),
            "Boost" => Some(ZoneMode::Boost),
            _ => None,
        }
    }

    /// Canonical backend code for settable modes.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ZoneMode::Off => Some("0"),
            ZoneMode::Eco => Some("8"),
            ZoneMode::Auto => Some("11"),
            ZoneMode::Antifreeze => Some("13"),
            ZoneMode::Manual => Some("15"),
            ZoneMode::Boost => Some("16"),
            ZoneMode::Unknown(_) => None,
        }
    }
}

impl core::fmt::Display for ZoneMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ZoneMode::Off => write!(f, "Off"),
            ZoneMode::Eco => write!(f, "Eco"),
            ZoneMode::Auto => write!(f, "Auto"),
            ZoneMode::Antifreeze => write!(f, "Antifreeze"),
            ZoneMode::Manual => write!(f, "Manual"),
            ZoneMode::Boost => write!(f, "Boost"),
            ZoneMode::Unknown(raw) => write!(f, "Unknown ({})", raw),
        }
    }
}

// =====================
// Tolerant field deserializers
// =====================

/// Accept a JSON number or string, yielding its string form.
fn stringly<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept a JSON number or numeric string as a raw fixed-point reading.
fn raw_tenths<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
