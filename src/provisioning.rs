//! Provisioning over the access-point web form.
//!
//! When the node has no working configuration it opens an access point and
//! serves a small form. Submitting the form posts
//! `application/x-www-form-urlencoded` data to `/config`:
//!
//! | field           | meaning                     |
//! |-----------------|-----------------------------|
//! | `wifi_ssid`     | network to join             |
//! | `wifi_pw`       | network password            |
//! | `accesstok`     | collector device token      |
//! | `pushintervall` | seconds between two pushes  |
//!
//! [`handle_request`] routes one request. A valid submission yields a brand
//! new [`NodeConfig`] together with the confirmation page. Persisting the
//! value and restarting are up to the caller.

#![allow(missing_docs)]

use crate::config::{self, MAX_PASSWORD_LEN, NodeConfig};
use core::fmt::Write;
use heapless::{String, Vec};

pub const FIELD_SSID: &str = "wifi_ssid";
pub const FIELD_PASSWORD: &str = "wifi_pw";
pub const FIELD_TOKEN: &str = "accesstok";
pub const FIELD_INTERVAL: &str = "pushintervall";

/// Path the form posts to.
pub const CONFIG_PATH: &str = "/config";
/// Capacity of generated pages.
pub const PAGE_LEN: usize = 2048;

const MAX_KEY_LEN: usize = 16;

/// The form served in provisioning mode.
pub const FORM_PAGE: &str = "<!DOCTYPE html><html><head><title>IoT-Node</title></head>\
<body><h1>environmental sensor node</h1><h2>wifi setup</h2>\
<form action=\"/config\" method=\"post\">\
wifi name (ssid): <input name=\"wifi_ssid\"><br/>\
wifi password: <input name=\"wifi_pw\" type=\"password\"><br/>\
access token: <input name=\"accesstok\"><br/>\
push interval (s): <input name=\"pushintervall\" value=\"20\"><br/>\
<input type=\"submit\" value=\"save\"></form></body></html>";

/// Errors decoding a provisioning form.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FormError {
    /// A required field is absent.
    Missing(&'static str),
    /// A bad percent escape or a value that is not UTF-8.
    Malformed,
    /// A value exceeds its maximum length.
    TooLong,
    /// The push interval is not a positive integer.
    InvalidInterval,
    /// The decoded values do not form a valid configuration.
    Invalid(config::Error),
}

impl core::fmt::Display for FormError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FormError::Missing(field) => write!(f, "missing field {}", field),
            FormError::Malformed => f.write_str("malformed form data"),
            FormError::TooLong => f.write_str("value too long"),
            FormError::InvalidInterval => f.write_str("invalid push interval"),
            FormError::Invalid(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FormError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            FormError::Missing(field) => defmt::write!(f, "Missing({=str})", field),
            FormError::Malformed => defmt::write!(f, "Malformed"),
            FormError::TooLong => defmt::write!(f, "TooLong"),
            FormError::InvalidInterval => defmt::write!(f, "InvalidInterval"),
            FormError::Invalid(e) => defmt::write!(f, "Invalid({})", e),
        }
    }
}

/// Decode one `application/x-www-form-urlencoded` value or key.
///
/// `+` becomes a space and `%XX` the byte it names.
pub fn decode_component<const N: usize>(input: &str) -> Result<String<N>, FormError> {
    let mut out: Vec<u8, N> = Vec::new();
    let mut bytes = input.bytes();
    while let Some(b) = bytes.next() {
        let decoded = match b {
            b'+' => b' ',
            b'%' => {
                let hi = bytes.next().and_then(hex_value).ok_or(FormError::Malformed)?;
                let lo = bytes.next().and_then(hex_value).ok_or(FormError::Malformed)?;
                (hi << 4) | lo
            }
            other => other,
        };
        out.push(decoded).map_err(|_| FormError::TooLong)?;
    }
    let text = core::str::from_utf8(&out).map_err(|_| FormError::Malformed)?;
    String::try_from(text).map_err(|_| FormError::TooLong)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode a submitted form into a new configuration.
///
/// Unknown fields are ignored and a repeated field keeps its last value.
///
/// ```rust
/// use telenode::provisioning::decode_form;
///
/// let config = decode_form("wifi_ssid=My+Net&wifi_pw=p%26ss&accesstok=A1&pushintervall=30").unwrap();
/// assert_eq!(config.ssid.as_str(), "My Net");
/// assert_eq!(config.password.as_str(), "p&ss");
/// assert_eq!(config.push_interval, 30);
/// ```
pub fn decode_form(body: &str) -> Result<NodeConfig, FormError> {
    let mut ssid: Option<String<MAX_PASSWORD_LEN>> = None;
    let mut password: Option<String<MAX_PASSWORD_LEN>> = None;
    let mut token: Option<String<MAX_PASSWORD_LEN>> = None;
    let mut interval: Option<String<MAX_PASSWORD_LEN>> = None;

    for pair in body.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let Ok(key) = decode_component::<MAX_KEY_LEN>(key) else {
            continue;
        };
        let slot = match key.as_str() {
            FIELD_SSID => &mut ssid,
            FIELD_PASSWORD => &mut password,
            FIELD_TOKEN => &mut token,
            FIELD_INTERVAL => &mut interval,
            _ => continue,
        };
        *slot = Some(decode_component(value)?);
    }

    let ssid = ssid.ok_or(FormError::Missing(FIELD_SSID))?;
    let password = password.ok_or(FormError::Missing(FIELD_PASSWORD))?;
    let token = token.ok_or(FormError::Missing(FIELD_TOKEN))?;
    let interval = interval
        .ok_or(FormError::Missing(FIELD_INTERVAL))?
        .trim()
        .parse::<u32>()
        .map_err(|_| FormError::InvalidInterval)?;

    NodeConfig::new(&ssid, &password, &token, interval).map_err(|e| match e {
        config::Error::InvalidInterval => FormError::InvalidInterval,
        config::Error::TooLong => FormError::TooLong,
        other => FormError::Invalid(other),
    })
}

/// Page confirming the new settings to the client at `peer`.
///
/// The password is not echoed back; it is shown as asterisks.
pub fn confirmation_page(peer: &str, config: &NodeConfig) -> Result<String<PAGE_LEN>, FormError> {
    let mut page: String<PAGE_LEN> = String::new();
    let mut put = |text: &str| page.push_str(text).map_err(|_| FormError::TooLong);

    put("<!DOCTYPE html><html><head><title>IoT-Node</title></head><body>")?;
    put("<h1>environmental sensor node</h1><h2>wifi mode</h2>")?;
    put("<p><strong>new settings</strong></p>your are connected from IP: <strong>")?;
    escape_into(&mut put, peer)?;
    put("</strong><hr/>new wifi name (ssid): <strong>")?;
    escape_into(&mut put, &config.ssid)?;
    put("</strong><br/>new wifi password: <strong>")?;
    for _ in config.password.chars() {
        put("*")?;
    }
    put("</strong><hr/>access token: <strong>")?;
    escape_into(&mut put, &config.access_token)?;
    put("</strong><br/>push interval: <strong>")?;
    let mut secs: String<10> = String::new();
    write!(secs, "{}", config.push_interval).map_err(|_| FormError::TooLong)?;
    put(&secs)?;
    put("</strong><hr/><strong>restarting and connecting to wifi ...</strong></body></html>")?;

    Ok(page)
}

fn escape_into<F>(put: &mut F, text: &str) -> Result<(), FormError>
where
    F: FnMut(&str) -> Result<(), FormError>,
{
    let mut rest = text;
    while let Some(pos) = rest.find(['<', '>', '&', '"', '\'']) {
        put(&rest[..pos])?;
        put(match rest.as_bytes()[pos] {
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'&' => "&amp;",
            b'"' => "&quot;",
            _ => "&#39;",
        })?;
        rest = &rest[pos + 1..];
    }
    put(rest)
}

/// What the provisioning server should answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Serve [`FORM_PAGE`].
    Form,
    /// A valid submission: persist `config`, send `page`, then restart.
    Configured {
        config: NodeConfig,
        page: String<PAGE_LEN>,
    },
    /// The submission was rejected; answer 400 and stay in provisioning mode.
    Rejected(FormError),
    /// Unknown route; answer 404.
    NotFound,
}

/// Route one request received in provisioning mode.
pub fn handle_request(method: &str, path: &str, body: &[u8], peer: &str) -> Reply {
    match (method, path) {
        ("GET", "/") | ("GET", "/index.html") => Reply::Form,
        ("POST", CONFIG_PATH) => {
            let result = core::str::from_utf8(body)
                .map_err(|_| FormError::Malformed)
                .and_then(decode_form)
                .and_then(|config| {
                    let page = confirmation_page(peer, &config)?;
                    Ok(Reply::Configured { config, page })
                });
            match result {
                Ok(reply) => {
                    info!("provisioning form accepted");
                    reply
                }
                Err(e) => {
                    warn!("provisioning form rejected: {}", e);
                    Reply::Rejected(e)
                }
            }
        }
        _ => Reply::NotFound,
    }
}
