//! URL decomposition for uplink targets.
//!
//! Only the `scheme://authority/path` shape is understood. The path is carried
//! through verbatim, so percent-escapes and query strings reach the server
//! exactly as the caller wrote them.

/// Returned when a URL does not split into scheme, authority and path.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MalformedUrl;

impl core::fmt::Display for MalformedUrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("malformed url")
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MalformedUrl {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "MalformedUrl")
    }
}

/// A URL split into its parts, borrowing from the original string.
///
/// # Examples
///
/// ```rust
/// use telenode::network::url::Endpoint;
///
/// let endpoint = Endpoint::parse("https://demo.thingsboard.io/api/v1/TOKEN/telemetry").unwrap();
/// assert_eq!(endpoint.scheme(), "https");
/// assert_eq!(endpoint.host(), "demo.thingsboard.io");
/// assert_eq!(endpoint.path(), "api/v1/TOKEN/telemetry");
/// assert_eq!(endpoint.port(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    scheme: &'a str,
    authority: &'a str,
    host: &'a str,
    port: Option<u16>,
    path: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Split `url` on its first three `/` separators.
    pub fn parse(url: &'a str) -> Result<Self, MalformedUrl> {
        let mut parts = url.splitn(4, '/');
        let (Some(scheme), Some(""), Some(authority), Some(path)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MalformedUrl);
        };

        let scheme = scheme.strip_suffix(':').ok_or(MalformedUrl)?;
        if scheme.is_empty() || authority.is_empty() {
            return Err(MalformedUrl);
        }
        let (host, port) = split_authority(authority)?;

        Ok(Self {
            scheme,
            authority,
            host,
            port,
            path,
        })
    }

    /// Scheme without the trailing colon, e.g. `https`.
    pub fn scheme(&self) -> &'a str {
        self.scheme
    }

    /// `true` for the encrypted HTTP scheme.
    pub fn is_https(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }

    /// Host and optional port exactly as written; this is what goes into `Host:`.
    pub fn authority(&self) -> &'a str {
        self.authority
    }

    /// Host name or address literal, without port or IPv6 brackets.
    pub fn host(&self) -> &'a str {
        self.host
    }

    /// Explicit port, if the authority carried one.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Everything after the host, without the separating slash.
    pub fn path(&self) -> &'a str {
        self.path
    }
}

fn split_authority(authority: &str) -> Result<(&str, Option<u16>), MalformedUrl> {
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or(MalformedUrl)?;
        match after {
            "" => (host, None),
            _ => (host, Some(after.strip_prefix(':').ok_or(MalformedUrl)?)),
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(MalformedUrl);
    }
    let port = match port {
        Some(port) => Some(port.parse::<u16>().map_err(|_| MalformedUrl)?),
        None => None,
    };
    Ok((host, port))
}
