//! Network endpoints
//!
//! An endpoint is written `scheme://host[:port][/path]`, as a bare
//! `host[:port]` or `/path`, or in the opaque form `scheme:rest`
//! (`tcp:127.0.0.1:25`, `unix:sock`). Which schemes are accepted depends on
//! the [`Family`] being parsed.

use crate::directories::Directories;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Address family, i.e. the set of schemes a directive accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Raw listener sockets: `tcp`, `tls`, `unix`
    Listener,
    /// Protocol addresses: `imap`, `imaps`, `smtp`, `smtps`, `lmtp+unix`
    Mail,
}

impl Family {
    /// Scheme used for a bare `/path`
    fn path_scheme(self) -> Scheme {
        match self {
            Family::Listener => Scheme::Unix,
            Family::Mail => Scheme::LmtpUnix,
        }
    }

    /// Scheme used for a bare `host[:port]`
    fn host_scheme(self, port: Option<u16>) -> Option<Scheme> {
        match self {
            Family::Listener => Some(Scheme::Tcp),
            Family::Mail => {
                let port = port?;
                Scheme::ALL
                    .into_iter()
                    .find(|s| s.family() == Family::Mail && s.default_port() == Some(port))
            }
        }
    }
}

/// Endpoint scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Tcp,
    Tls,
    Unix,
    Imap,
    Imaps,
    Smtp,
    Smtps,
    LmtpUnix,
}

impl Scheme {
    pub const ALL: [Scheme; 8] = [
        Scheme::Tcp,
        Scheme::Tls,
        Scheme::Unix,
        Scheme::Imap,
        Scheme::Imaps,
        Scheme::Smtp,
        Scheme::Smtps,
        Scheme::LmtpUnix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Tls => "tls",
            Scheme::Unix => "unix",
            Scheme::Imap => "imap",
            Scheme::Imaps => "imaps",
            Scheme::Smtp => "smtp",
            Scheme::Smtps => "smtps",
            Scheme::LmtpUnix => "lmtp+unix",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Scheme::Tcp | Scheme::Tls | Scheme::Unix => Family::Listener,
            _ => Family::Mail,
        }
    }

    /// Local socket schemes carry a path instead of host and port
    pub fn is_unix(self) -> bool {
        matches!(self, Scheme::Unix | Scheme::LmtpUnix)
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Scheme::Tls | Scheme::Imaps | Scheme::Smtps)
    }

    /// Well-known port used when the address omits one
    pub fn default_port(self) -> Option<u16> {
        match self {
            Scheme::Imap => Some(143),
            Scheme::Imaps => Some(993),
            Scheme::Smtp => Some(25),
            Scheme::Smtps => Some(465),
            _ => None,
        }
    }

    /// Port that belongs to the opposite (plaintext or TLS) variant
    fn conflicting_port(self) -> Option<u16> {
        match self {
            Scheme::Imap => Some(993),
            Scheme::Imaps => Some(143),
            Scheme::Smtp => Some(465),
            Scheme::Smtps => Some(25),
            _ => None,
        }
    }

    fn lookup(name: &str, family: Family) -> Option<Scheme> {
        Scheme::ALL
            .into_iter()
            .find(|s| s.family() == family && s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized network or unix socket address.
///
/// Equality ignores [`Endpoint::original`], so an endpoint compares equal to
/// the result of parsing its own [`Display`](fmt::Display) output.
#[derive(Debug, Clone)]
pub struct Endpoint {
    original: String,
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
}

impl Endpoint {
    /// Parse a listener endpoint (`tcp`, `tls`, `unix`), resolving relative
    /// socket paths against the runtime directory.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_in(Family::Listener, text, &Directories::get().runtime)
    }

    /// Parse a protocol address (`imap`, `imaps`, `smtp`, `smtps`, `lmtp+unix`)
    pub fn parse_mail(text: &str) -> Result<Self> {
        Self::parse_in(Family::Mail, text, &Directories::get().runtime)
    }

    /// Parse `text` within `family`, using `runtime_dir` as the base of
    /// relative socket paths.
    pub fn parse_in(family: Family, text: &str, runtime_dir: &Path) -> Result<Self> {
        let parts = UrlParts::split(text, family);

        let explicit = match parts.scheme {
            Some(name) => Some(Scheme::lookup(name, family).ok_or_else(|| {
                Error::UnsupportedScheme {
                    input: text.to_string(),
                }
            })?),
            None => None,
        };

        let bare_path = parts.scheme.is_none() && parts.authority.is_empty() && parts.path.starts_with('/');
        let scheme = match explicit {
            Some(scheme) => Some(scheme),
            None if bare_path => Some(family.path_scheme()),
            None => None,
        };
        if let Some(scheme) = scheme.filter(|s| s.is_unix()) {
            return Self::local(text, scheme, &parts, runtime_dir);
        }

        let (host, port_text) = split_host_port(parts.authority, text)?;
        let port = match port_text {
            Some(port) if Scheme::ALL.iter().any(|s| s.as_str().eq_ignore_ascii_case(port)) => {
                return Err(Error::SchemeRepeated {
                    input: text.to_string(),
                });
            }
            Some(port) => Some(port.parse::<u16>().map_err(|_| Error::InvalidPort {
                input: text.to_string(),
                port: port.to_string(),
            })?),
            None => None,
        };

        let scheme = match scheme {
            Some(scheme) => scheme,
            None => family.host_scheme(port).ok_or_else(|| Error::UnsupportedScheme {
                input: text.to_string(),
            })?,
        };

        let port = port
            .or_else(|| scheme.default_port())
            .ok_or_else(|| Error::MissingPort {
                input: text.to_string(),
            })?;

        if scheme.conflicting_port() == Some(port) {
            return Err(Error::SchemeConflict {
                input: text.to_string(),
            });
        }

        Ok(Self {
            original: text.to_string(),
            scheme,
            host: host.to_string(),
            port: Some(port),
            path: parts.path.to_string(),
        })
    }

    fn local(text: &str, scheme: Scheme, parts: &UrlParts<'_>, runtime_dir: &Path) -> Result<Self> {
        let joined = format!("{}{}", parts.authority, parts.path);
        if joined.is_empty() {
            return Err(Error::Malformed {
                input: text.to_string(),
                reason: "missing socket path",
            });
        }

        let path = if Path::new(&joined).is_absolute() {
            joined
        } else {
            runtime_dir.join(&joined).to_string_lossy().into_owned()
        };

        Ok(Self {
            original: text.to_string(),
            scheme,
            host: String::new(),
            port: None,
            path,
        })
    }

    /// Text the endpoint was parsed from
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host without IPv6 brackets; empty for unix sockets
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port; `None` only for unix sockets
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Socket path for unix schemes, URL path otherwise
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `"unix"` or `"tcp"`
    pub fn network(&self) -> &'static str {
        if self.scheme.is_unix() { "unix" } else { "tcp" }
    }

    /// Address suitable for bind/connect: a socket path or `host:port`
    pub fn address(&self) -> String {
        if self.scheme.is_unix() {
            return self.path.clone();
        }
        let port = self.port.unwrap_or_default();
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, port)
        } else {
            format!("{}:{}", self.host, port)
        }
    }

    pub fn is_tls(&self) -> bool {
        self.scheme.is_tls()
    }

    /// Application protocol spoken on a mail-family endpoint
    pub fn protocol(&self) -> Option<&'static str> {
        match self.scheme {
            Scheme::Imap | Scheme::Imaps => Some("imap"),
            Scheme::Smtp | Scheme::Smtps => Some("smtp"),
            Scheme::LmtpUnix => Some("lmtp"),
            _ => None,
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.host == other.host
            && self.port == other.port
            && self.path == other.path
    }
}

impl Eq for Endpoint {}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_unix() {
            return write!(f, "{}://{}", self.scheme, self.path);
        }

        write!(f, "{}://", self.scheme)?;
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        f.write_str(&self.path)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// URL-shaped pieces of an endpoint string
struct UrlParts<'a> {
    scheme: Option<&'a str>,
    authority: &'a str,
    path: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(text: &'a str, family: Family) -> Self {
        if let Some((scheme, rest)) = text.split_once(':') {
            let known = Scheme::lookup(scheme, family);
            if is_scheme_name(scheme) && (rest.starts_with("//") || known.is_some()) {
                if let Some(rest) = rest.strip_prefix("//") {
                    let (authority, path) = split_authority(rest);
                    return Self { scheme: Some(scheme), authority, path };
                }

                // scheme:opaque
                if known.is_some_and(Scheme::is_unix) {
                    return Self { scheme: Some(scheme), authority: "", path: rest };
                }
                let (authority, path) = split_authority(rest);
                return Self { scheme: Some(scheme), authority, path };
            }
        }

        if text.starts_with('/') && !text.starts_with("//") {
            return Self { scheme: None, authority: "", path: text };
        }

        let (authority, path) = split_authority(text.strip_prefix("//").unwrap_or(text));
        Self { scheme: None, authority, path }
    }
}

fn is_scheme_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_authority(s: &str) -> (&str, &str) {
    match s.find('/') {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

/// Split `host[:port]`, accepting bracketed IPv6 hosts. An unbracketed host
/// with several colons is taken whole, without a port.
fn split_host_port<'a>(authority: &'a str, input: &str) -> Result<(&'a str, Option<&'a str>)> {
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let end = rest.find(']').ok_or_else(|| Error::Malformed {
            input: input.to_string(),
            reason: "missing ']' in host",
        })?;
        let after = &rest[end + 1..];
        let port = match after.strip_prefix(':') {
            Some(port) => Some(port),
            None if after.is_empty() => None,
            None => {
                return Err(Error::Malformed {
                    input: input.to_string(),
                    reason: "unexpected text after ']'",
                });
            }
        };
        (&rest[..end], port)
    } else if authority.matches(':').count() == 1 {
        let (host, port) = authority.split_once(':').unwrap_or((authority, ""));
        (host, Some(port))
    } else {
        (authority, None)
    };

    if host.contains(['[', ']']) {
        return Err(Error::Malformed {
            input: input.to_string(),
            reason: "unexpected bracket in host",
        });
    }

    Ok((host, port.filter(|p| !p.is_empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNTIME: &str = "/run/postern";

    fn listener(text: &str) -> Result<Endpoint> {
        Endpoint::parse_in(Family::Listener, text, Path::new(RUNTIME))
    }

    fn mail(text: &str) -> Result<Endpoint> {
        Endpoint::parse_in(Family::Mail, text, Path::new(RUNTIME))
    }

    fn parts(e: &Endpoint) -> (Scheme, &str, Option<u16>, &str) {
        (e.scheme(), e.host(), e.port(), e.path())
    }

    #[test]
    fn test_listener_endpoints() {
        let cases = [
            ("tcp://0.0.0.0:10025", (Scheme::Tcp, "0.0.0.0", Some(10025), "")),
            ("tcp://[::]:10025", (Scheme::Tcp, "::", Some(10025), "")),
            ("tcp:127.0.0.1:10025", (Scheme::Tcp, "127.0.0.1", Some(10025), "")),
            ("tls://0.0.0.0:10025", (Scheme::Tls, "0.0.0.0", Some(10025), "")),
            ("tls:0.0.0.0:10025", (Scheme::Tls, "0.0.0.0", Some(10025), "")),
            ("unix://path", (Scheme::Unix, "", None, "/run/postern/path")),
            ("unix:path", (Scheme::Unix, "", None, "/run/postern/path")),
            ("unix:/path", (Scheme::Unix, "", None, "/path")),
            ("unix:///path", (Scheme::Unix, "", None, "/path")),
            ("unix://also/path", (Scheme::Unix, "", None, "/run/postern/also/path")),
            ("unix:///also/path", (Scheme::Unix, "", None, "/also/path")),
            ("127.0.0.1:2525", (Scheme::Tcp, "127.0.0.1", Some(2525), "")),
            ("/var/run/lmtp.sock", (Scheme::Unix, "", None, "/var/run/lmtp.sock")),
        ];

        for (text, expected) in cases {
            let endpoint = listener(text).unwrap();
            assert_eq!(parts(&endpoint), expected, "parsing {}", text);
            assert_eq!(endpoint.original(), text);
        }
    }

    #[test]
    fn test_listener_errors() {
        assert!(matches!(listener("tcp://0.0.0.0"), Err(Error::MissingPort { .. })));
        assert!(matches!(listener("http://example.org:80"), Err(Error::UnsupportedScheme { .. })));
        assert!(matches!(listener("imap://example.org"), Err(Error::UnsupportedScheme { .. })));
        assert!(matches!(listener("tcp://host:http"), Err(Error::InvalidPort { .. })));
        assert!(matches!(listener("tcp://host:70000"), Err(Error::InvalidPort { .. })));
        assert!(matches!(listener("tcp://[::1"), Err(Error::Malformed { .. })));
        assert!(matches!(listener("unix://"), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_mail_default_ports() {
        assert_eq!(mail("imap://mx.example.org").unwrap().port(), Some(143));
        assert_eq!(mail("imaps://mx.example.org").unwrap().port(), Some(993));
        assert_eq!(mail("smtp://mx.example.org").unwrap().port(), Some(25));
        assert_eq!(mail("smtps://mx.example.org").unwrap().port(), Some(465));
        assert_eq!(mail("smtp://mx.example.org:587").unwrap().port(), Some(587));
    }

    #[test]
    fn test_mail_inferred_scheme() {
        let endpoint = mail("mx.example.org:993").unwrap();
        assert_eq!(endpoint.scheme(), Scheme::Imaps);
        assert!(endpoint.is_tls());
        assert_eq!(endpoint.protocol(), Some("imap"));

        assert!(matches!(mail("mx.example.org:8080"), Err(Error::UnsupportedScheme { .. })));
        assert!(matches!(mail("mx.example.org"), Err(Error::UnsupportedScheme { .. })));
    }

    #[test]
    fn test_mail_conflicts() {
        assert!(matches!(mail("imap://host:993"), Err(Error::SchemeConflict { .. })));
        assert!(matches!(mail("imaps://host:143"), Err(Error::SchemeConflict { .. })));
        assert!(matches!(mail("smtp://host:465"), Err(Error::SchemeConflict { .. })));
        assert!(matches!(mail("smtps://host:25"), Err(Error::SchemeConflict { .. })));
        assert!(matches!(mail("imap://host:imaps"), Err(Error::SchemeRepeated { .. })));
    }

    #[test]
    fn test_lmtp_socket() {
        let endpoint = mail("lmtp+unix:///run/dovecot/lmtp").unwrap();
        assert_eq!(endpoint.network(), "unix");
        assert_eq!(endpoint.address(), "/run/dovecot/lmtp");
        assert_eq!(endpoint.protocol(), Some("lmtp"));
        assert_eq!(endpoint.to_string(), "lmtp+unix:///run/dovecot/lmtp");
    }

    #[test]
    fn test_display_and_address() {
        let endpoint = listener("tcp://[::1]:25").unwrap();
        assert_eq!(endpoint.to_string(), "tcp://[::1]:25");
        assert_eq!(endpoint.address(), "[::1]:25");
        assert_eq!(endpoint.network(), "tcp");

        let endpoint = listener("unix:sock").unwrap();
        assert_eq!(endpoint.to_string(), "unix:///run/postern/sock");
    }

    #[test]
    fn test_equality_ignores_original() {
        let a = listener("tcp:127.0.0.1:25").unwrap();
        let b = listener("tcp://127.0.0.1:25").unwrap();
        assert_ne!(a.original(), b.original());
        assert_eq!(a, b);
    }
}
