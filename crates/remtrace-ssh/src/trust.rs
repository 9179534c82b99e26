use std::path::PathBuf;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use ssh2::{CheckResult, HashType, KnownHostFileKind, Session};

use crate::error::{Error, Result};

/// How the identity of the target is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Any host key is accepted.
    ///
    /// Only suitable for development targets on a trusted network.
    Insecure,

    /// The host key must match the given SHA-256 fingerprint
    /// (`SHA256:<base64>`, as printed by `ssh-keygen -l`).
    Pinned(String),

    /// The host key must be listed in the given OpenSSH known hosts file.
    KnownHosts(PathBuf),
}

impl TrustPolicy {
    pub(crate) fn verify(&self, session: &Session, host: &str, port: u16) -> Result<()> {
        match self {
            Self::Insecure => {
                tracing::warn!(host, "host key not verified");
                Ok(())
            }
            Self::Pinned(expected) => {
                let actual = fingerprint(session).ok_or(Error::HostKeyUnavailable)?;
                let expected = normalize_fingerprint(expected);

                if actual != expected {
                    return Err(Error::HostKeyMismatch {
                        host: host.to_owned(),
                        expected,
                        actual,
                    });
                }

                Ok(())
            }
            Self::KnownHosts(path) => {
                let (key, _) = session.host_key().ok_or(Error::HostKeyUnavailable)?;

                let mut known_hosts = session.known_hosts()?;
                known_hosts
                    .read_file(path, KnownHostFileKind::OpenSSH)
                    .map_err(|e| Error::KnownHosts(path.clone(), e))?;

                match known_hosts.check_port(host, port, key) {
                    CheckResult::Match => Ok(()),
                    CheckResult::NotFound => Err(Error::UnknownHost(host.to_owned())),
                    CheckResult::Mismatch | CheckResult::Failure => Err(Error::HostKeyMismatch {
                        host: host.to_owned(),
                        expected: format!("entry of {}", path.display()),
                        actual: fingerprint(session).unwrap_or_else(|| "unknown".to_owned()),
                    }),
                }
            }
        }
    }
}

impl FromStr for TrustPolicy {
    type Err = std::convert::Infallible;

    /// Parses `insecure`, a `SHA256:` fingerprint, or a known hosts path.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let policy = if s == "insecure" {
            Self::Insecure
        } else if s.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("sha256:")) {
            Self::Pinned(s.to_owned())
        } else {
            Self::KnownHosts(PathBuf::from(s))
        };

        Ok(policy)
    }
}

/// Returns the SHA-256 fingerprint of the host key presented by the target.
pub fn fingerprint(session: &Session) -> Option<String> {
    session
        .host_key_hash(HashType::Sha256)
        .map(|hash| format!("SHA256:{}", STANDARD_NO_PAD.encode(hash)))
}

fn normalize_fingerprint(fingerprint: &str) -> String {
    let fingerprint = fingerprint.trim().trim_end_matches('=');

    let encoded = fingerprint
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("sha256:"))
        .map_or(fingerprint, |_| &fingerprint[7..]);

    format!("SHA256:{encoded}")
}
