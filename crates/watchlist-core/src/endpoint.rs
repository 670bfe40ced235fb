//! Endpoint descriptors.
//!
//! A descriptor names the logical operation behind an outbound request. It is
//! attached to identity failures so a caller can distinguish "could not
//! authenticate a call to X" from "the server rejected X".

use std::fmt;

/// HTTP verbs used by the watchlist service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// DELETE request.
    Delete,
}

impl Verb {
    /// Get the verb as an uppercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes one logical operation against the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Operation name (e.g. `read-watchlists`).
    pub name: &'static str,
    /// HTTP verb.
    pub verb: Verb,
    /// Path, starting with `/`.
    pub path: String,
}

impl EndpointDescriptor {
    /// Create a new descriptor.
    #[must_use]
    pub fn new(name: &'static str, verb: Verb, path: impl Into<String>) -> Self {
        Self {
            name,
            verb,
            path: path.into(),
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.verb, self.path)
    }
}
