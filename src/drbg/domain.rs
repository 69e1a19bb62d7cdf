//! Security domains.

use std::fmt;

/// The security domain a DRBG serves.
///
/// Private output is reserved for secret material (keys, nonces, IVs).
/// Public output is for protocol behavior that need not stay confidential,
/// such as jitter or padding length choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Values visible on the wire.
    Public,
    /// Secret material.
    Private,
}

impl Domain {
    /// Personalization string mixed into every key derivation of the domain.
    pub(crate) fn personalization(self) -> &'static [u8] {
        match self {
            Domain::Public => b"tls-random public drbg",
            Domain::Private => b"tls-random private drbg",
        }
    }

    /// Lowercase label, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Public => "public",
            Domain::Private => "private",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
