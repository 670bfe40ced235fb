//! Client identity.

use std::fmt;

use uuid::Uuid;

/// A process-lifetime-unique identifier for one gateway instance.
///
/// The identity travels on mutation requests (see
/// [`CLIENT_ID_HEADER`](crate::CLIENT_ID_HEADER)) and comes back on push
/// notifications caused by this client, which allows self-originated
/// notifications to be filtered out (echo suppression).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Generate a fresh identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_unique() {
        let a = ClientIdentity::generate();
        let b = ClientIdentity::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn identity_displays_as_raw_value() {
        let identity = ClientIdentity::generate();
        assert_eq!(identity.to_string(), identity.as_str());
    }
}
