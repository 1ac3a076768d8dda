//! Exposed container ports.

use std::fmt;
use std::str::FromStr;

use crate::error::{CapsuleError, CapsuleResult};

/// Transport protocol of an exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Protocol {
    /// TCP protocol.
    #[default]
    Tcp,
    /// UDP protocol.
    Udp,
    /// SCTP protocol.
    Sctp,
}

impl Protocol {
    /// Get the protocol string as used in port specifications.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A container port to publish, e.g. `80/tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExposedPort {
    /// Port number inside the container.
    pub port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl ExposedPort {
    /// A TCP port.
    #[must_use]
    pub const fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Tcp,
        }
    }

    /// A UDP port.
    #[must_use]
    pub const fn udp(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Udp,
        }
    }

    /// Parse a port specification such as `80`, `80/tcp` or `53/udp`.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidPort`] for anything else.
    pub fn parse(value: &str) -> CapsuleResult<Self> {
        let invalid = || CapsuleError::InvalidPort {
            value: value.to_string(),
        };

        let (number, protocol) = value.trim().split_once('/').unwrap_or((value.trim(), "tcp"));

        let protocol = match protocol.to_ascii_lowercase().as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            "sctp" => Protocol::Sctp,
            _ => return Err(invalid()),
        };

        let port: u16 = number.parse().map_err(|_| invalid())?;
        if port == 0 {
            return Err(invalid());
        }

        Ok(Self { port, protocol })
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

impl FromStr for ExposedPort {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ExposedPort {
    type Error = CapsuleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for ExposedPort {
    type Error = CapsuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<u16> for ExposedPort {
    fn from(port: u16) -> Self {
        Self::tcp(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_tcp() {
        assert_eq!(ExposedPort::parse("80").unwrap(), ExposedPort::tcp(80));
        assert_eq!(ExposedPort::parse("80/tcp").unwrap(), ExposedPort::tcp(80));
        assert_eq!(ExposedPort::parse("53/UDP").unwrap(), ExposedPort::udp(53));
    }

    #[test]
    fn parse_rejects_garbage() {
        for value in ["", "0", "http", "80/icmp", "70000/tcp", "80/", "/tcp"] {
            assert!(ExposedPort::parse(value).is_err(), "{value} should not parse");
        }
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(ExposedPort::tcp(8080).to_string(), "8080/tcp");
        assert_eq!(
            ExposedPort {
                port: 9,
                protocol: Protocol::Sctp
            }
            .to_string(),
            "9/sctp"
        );
    }
}
