//! Conversion of raw settings responses into [`SettingsSnapshot`]s.
use reqwest::{
    header::{HeaderMap, ETAG},
    StatusCode,
};
use serde::Deserialize;

use crate::{
    settings::{Settings, SettingsSnapshot, DEFAULT_REFRESH_INTERVAL_SECS, REFRESH_INTERVAL_HEADER},
    Error, Result,
};

#[derive(Debug, Deserialize)]
struct SettingsBody {
    #[serde(default)]
    settings: Settings,
}

/// Parse a settings response, degrading to a default snapshot on failure.
///
/// On failure the returned snapshot keeps `status` and holds defaults everywhere else. It does
/// not set [`SettingsSnapshot::has_error`]; that is left to the fetcher.
pub fn parse_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> SettingsSnapshot {
    try_parse_response(status, headers, body).unwrap_or_else(|err| {
        log::warn!(target: "onesettings",
                   status = status.as_u16();
                   "failed to parse settings response: {}", err);
        SettingsSnapshot::with_status(status.as_u16())
    })
}

/// Parse a settings response.
///
/// - `200 OK`: headers are read and the body is parsed as `{"settings": {...}}`.
/// - `304 Not Modified`: headers are read, the body is ignored and settings stay empty. Reusing
///   previously cached settings is up to the caller.
/// - Any other status yields a default snapshot carrying that status.
pub fn try_parse_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<SettingsSnapshot> {
    match status {
        StatusCode::OK => {
            let body: SettingsBody = serde_json::from_slice(body)?;
            let change_version = body.settings.change_version();
            Ok(SettingsSnapshot {
                etag: etag(headers),
                refresh_interval_secs: refresh_interval_secs(headers)?,
                settings: body.settings,
                change_version,
                status_code: status.as_u16(),
                has_error: false,
            })
        }
        StatusCode::NOT_MODIFIED => Ok(SettingsSnapshot {
            etag: etag(headers),
            refresh_interval_secs: refresh_interval_secs(headers)?,
            ..SettingsSnapshot::with_status(status.as_u16())
        }),
        _ => Ok(SettingsSnapshot::with_status(status.as_u16())),
    }
}

fn etag(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(ETAG)?;
    match value.to_str() {
        Ok(etag) => Some(etag.to_owned()),
        Err(_) => {
            log::debug!(target: "onesettings", "ignoring non-ascii etag");
            None
        }
    }
}

/// Read the refresh interval header (minutes) and convert it to seconds.
fn refresh_interval_secs(headers: &HeaderMap) -> Result<u64> {
    let Some(value) = headers.get(REFRESH_INTERVAL_HEADER) else {
        return Ok(DEFAULT_REFRESH_INTERVAL_SECS);
    };

    let malformed = Error::MalformedHeader {
        header: REFRESH_INTERVAL_HEADER,
    };
    let minutes: u64 = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| malformed.clone())?;

    minutes.checked_mul(60).ok_or(malformed)
}
