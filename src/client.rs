//! Standalone HTTP client for the Fenix V24 cloud API.
//!
//! - Blocking client using `ureq` (no async).
//! - Uses the wire models in `crate::models::fenix`.
//!
//! Authentication
//! - Performs the OAuth2 password grant against the Fenix Keycloak realm and
//!   caches the bearer token with a margin-adjusted expiry, so no caller ever
//!   presents a token that lapses mid-request.
//! - The refresh token is captured but re-authentication always re-runs the
//!   full password grant. Known gap: no retry/backoff here; that is a caller
//!   concern.
//!
//! Token state lives behind a `Mutex` held across the grant, which gives each
//! instance a single-flight guarantee: concurrent callers block on the lock
//! and then hit the freshly cached token instead of issuing duplicate grants.

use log::{debug, error, info, warn};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::fenix::{DeviceId, SmarthomeRead, Zone, ZoneId};

const TOKEN_ENDPOINT: &str =
    "https://auth.aks.mutualized.wattselectronics.com/realms/fenix/protocol/openid-connect/token";
const API_BASE: &str = "https://v24.fenixgroup.eu/api/v0.1/human";
// 'app-front' is the Fenix V24 web application client.
const OAUTH_CLIENT_ID: &str = "app-front";
const OAUTH_SCOPE: &str = "openid email profile";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Subtracted from `expires_in` at acquisition so the cached token is never
/// presented within this interval of its real expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
/// Push queries carry a fixed context discriminator.
const API_CONTEXT: &str = "1";
/// Mode code engaging a timed boost.
pub const BOOST_MODE_CODE: &str = "16";

#[derive(Debug)]
pub enum FenixClientError {
    /// A method requiring a session was called before `authenticate()` succeeded.
    NotAuthenticated,
    Transport(String),
    /// Non-200 from the token endpoint; carries status and body for the
    /// setup/validation boundary.
    Auth { status: u16, body: String },
    Json(serde_path_to_error::Error<serde_json::Error>),
}

impl core::fmt::Display for FenixClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FenixClientError::NotAuthenticated => {
                write!(f, "not authenticated: call authenticate() first")
            }
            FenixClientError::Transport(s) => write!(f, "transport error: {}", s),
            FenixClientError::Auth { status, body } => {
                write!(f, "authentication failed: http {}: {}", status, body)
            }
            FenixClientError::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for FenixClientError {}

#[derive(Debug)]
struct SessionToken {
    access_token: String,
    /// Captured for completeness; the refresh grant is not implemented.
    #[allow(dead_code)]
    refresh_token: Option<String>,
    /// Margin-adjusted: `acquired + expires_in - TOKEN_REFRESH_MARGIN`.
    expires_at: Instant,
}

/// Client for one Fenix V24 account. Owns the credentials exclusively; run
/// independent instances for independent accounts.
pub struct FenixClient {
    agent: ureq::Agent,
    email: String,
    password: String,
    smarthome_id: String,
    lang: String,
    token_url: String,
    api_base: String,
    token: Mutex<Option<SessionToken>>,
}

impl FenixClient {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        smarthome_id: impl Into<String>,
        lang: impl Into<String>,
    ) -> Self {
        Self::with_endpoints(
            email,
            password,
            smarthome_id,
            lang,
            TOKEN_ENDPOINT.to_string(),
            API_BASE.to_string(),
        )
    }

    /// Constructor with injectable endpoints, used by tests against a local
    /// mock server.
    pub fn with_endpoints(
        email: impl Into<String>,
        password: impl Into<String>,
        smarthome_id: impl Into<String>,
        lang: impl Into<String>,
        token_url: String,
        api_base: String,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        FenixClient {
            agent,
            email: email.into(),
            password: password.into(),
            smarthome_id: smarthome_id.into(),
            lang: lang.into(),
            token_url,
            api_base,
            token: Mutex::new(None),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn smarthome_id(&self) -> &str {
        &self.smarthome_id
    }

    fn token_state(&self) -> MutexGuard<'_, Option<SessionToken>> {
        match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Ensure a valid session token, performing the password grant only when
    /// the cached token is missing or past its margin-adjusted expiry.
    ///
    /// Idempotent: a call within the validity window does no I/O. A failed
    /// grant leaves any previously cached token untouched.
    pub fn authenticate(&self) -> Result<(), FenixClientError> {
        let mut state = self.token_state();

        if let Some(token) = state.as_ref() {
            if Instant::now() < token.expires_at {
                debug!("using cached access token");
                return Ok(());
            }
        }

        info!("authenticating against the Fenix V24 token endpoint");
        let resp = self
            .agent
            .post(&self.token_url)
            .set("Accept", "application/json")
            .send_form(&[
                ("grant_type", "password"),
                ("client_id", OAUTH_CLIENT_ID),
                ("username", self.email.as_str()),
                ("password", self.password.as_str()),
                ("scope", OAUTH_SCOPE),
            ]);

        let fresh = Self::parse_token_response(resp)?;
        *state = Some(fresh);
        Ok(())
    }

    fn parse_token_response(
        resp: Result<ureq::Response, ureq::Error>,
    ) -> Result<SessionToken, FenixClientError> {
        #[derive(serde::Deserialize)]
        struct R {
            access_token: String,
            expires_in: u64,
            #[serde(default)]
            refresh_token: Option<String>,
        }
        match resp {
            Ok(r) => {
                let mut de = serde_json::Deserializer::from_reader(r.into_reader());
                let R {
                    access_token,
                    expires_in,
                    refresh_token,
                } = serde_path_to_error::deserialize(&mut de).map_err(FenixClientError::Json)?;
                let lifetime =
                    Duration::from_secs(expires_in.saturating_sub(TOKEN_REFRESH_MARGIN.as_secs()));
                info!(
                    "authentication successful, token cached for {}s (margin-adjusted)",
                    lifetime.as_secs()
                );
                Ok(SessionToken {
                    access_token,
                    refresh_token,
                    expires_at: Instant::now() + lifetime,
                })
            }
            Err(ureq::Error::Transport(t)) => Err(FenixClientError::Transport(t.to_string())),
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_else(|_| String::from("<no body>"));
                error!("authentication failed: {} - {}", status, body);
                Err(FenixClientError::Auth { status, body })
            }
        }
    }

    fn bearer(&self) -> Result<String, FenixClientError> {
        self.token_state()
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or(FenixClientError::NotAuthenticated)
    }

    /// Fetch all zones of the smarthome as ordered `(zone_id, zone)` pairs.
    ///
    /// Requires a previously obtained token; this call does not
    /// self-authenticate. A non-200 response degrades to an empty list so a
    /// transient failure yields "no data this poll" instead of an error for
    /// every zone.
    pub fn get_zones(&self) -> Result<Vec<(ZoneId, Zone)>, FenixClientError> {
        let bearer = self.bearer()?;
        let url = format!("{}/smarthome/read/", self.api_base);

        let resp = self
            .agent
            .post(&url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", bearer))
            .send_form(&[
                ("smarthome_id", self.smarthome_id.as_str()),
                ("lang", self.lang.as_str()),
            ]);

        match resp {
            Ok(r) => {
                let mut de = serde_json::Deserializer::from_reader(r.into_reader());
                let body: SmarthomeRead =
                    serde_path_to_error::deserialize(&mut de).map_err(FenixClientError::Json)?;
                let pairs = body.data.zones.into_pairs(|zone: &Zone| zone.listed_zone_id());
                info!(
                    "smarthome {} returned {} zone(s)",
                    self.smarthome_id,
                    pairs.len()
                );
                Ok(pairs.into_iter().map(|(id, zone)| (ZoneId(id), zone)).collect())
            }
            Err(ureq::Error::Status(status, _)) => {
                warn!("zone read failed with http {}; returning no zones this cycle", status);
                Ok(Vec::new())
            }
            Err(ureq::Error::Transport(t)) => Err(FenixClientError::Transport(t.to_string())),
        }
    }

    /// Set a device's operating mode. True iff the backend answered 200; any
    /// failure during the request is logged and becomes `false`, never an error.
    pub fn set_mode(&self, device_id: &DeviceId, mode_code: &str) -> Result<bool, FenixClientError> {
        self.push_query(device_id, mode_code, None)
    }

    /// Engage a timed boost. The duration is converted to seconds; range
    /// validation (5-120 minutes) is the command layer's job, not re-checked
    /// here.
    ///
    /// The field combination that engages the boost (`time_boost` plus
    /// `gv_mode`/`nv_mode` = 16) is inferred from observed zone data, not
    /// documented backend behavior. Unverified against the live backend.
    pub fn set_boost(
        &self,
        device_id: &DeviceId,
        duration_minutes: u32,
    ) -> Result<bool, FenixClientError> {
        self.push_query(device_id, BOOST_MODE_CODE, Some(duration_minutes * 60))
    }

    fn push_query(
        &self,
        device_id: &DeviceId,
        mode_code: &str,
        time_seconds: Option<u32>,
    ) -> Result<bool, FenixClientError> {
        let bearer = self.bearer()?;
        let url = format!("{}/query/push/", self.api_base);

        let seconds = time_seconds.map(|s| s.to_string());
        let mut form: Vec<(&str, &str)> = vec![
            ("token", bearer.as_str()),
            ("smarthome_id", self.smarthome_id.as_str()),
            ("context", API_CONTEXT),
            ("query[id_device]", device_id.0.as_str()),
            ("query[gv_mode]", mode_code),
            ("query[nv_mode]", mode_code),
        ];
        if let Some(secs) = seconds.as_deref() {
            form.push(("query[time_boost]", secs));
        }

        let resp = self
            .agent
            .post(&url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {}", bearer))
            .send_form(&form);

        match resp {
            Ok(_) => {
                info!("push query accepted for device {} (mode {})", device_id.0, mode_code);
                Ok(true)
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_else(|_| String::from("<no body>"));
                error!(
                    "push query for device {} failed: {} - {}",
                    device_id.0, status, body
                );
                Ok(false)
            }
            Err(ureq::Error::Transport(t)) => {
                error!("push query for device {} failed: {}", device_id.0, t);
                Ok(false)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn force_expire_token(&self) {
        if let Some(token) = self.token_state().as_mut() {
            token.expires_at = Instant::now();
        }
    }
}
