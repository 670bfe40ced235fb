//! Watchlist domain objects.
//!
//! Only the fields the request/response contracts need are typed; anything
//! else the server sends rides along in the `extra` maps so a round-tripped
//! object is not stripped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A watchlist as stored by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    /// Server-assigned identifier. Absent on objects not yet created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Owning context (e.g. an application or tenant identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Display name.
    pub name: String,

    /// Symbols on the watchlist.
    #[serde(default)]
    pub entries: Vec<WatchlistEntry>,

    /// Per-watchlist preferences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<WatchlistPreferences>,

    /// Fields this client does not interpret.
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Watchlist {
    /// Create a watchlist with a name and no entries.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            context: None,
            name: name.into(),
            entries: Vec::new(),
            preferences: None,
            extra: Map::new(),
        }
    }
}

/// A single symbol entry on a watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// The instrument symbol.
    pub symbol: String,

    /// Fields this client does not interpret.
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl WatchlistEntry {
    /// Create an entry for a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            extra: Map::new(),
        }
    }
}

/// Per-watchlist display preferences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WatchlistPreferences {
    /// Sort order, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,

    /// Fields this client does not interpret.
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Column sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    /// Column to sort by.
    pub column: String,

    /// Descending when `true`.
    #[serde(default)]
    pub desc: bool,
}

/// Service metadata returned by the remote server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Information about the service itself.
    pub service: ServiceInfo,

    /// Information about the authenticated user, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

/// Version information for the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Server version.
    pub semver: String,
}

/// The authenticated user as the server sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User identifier.
    pub id: String,

    /// Context identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Permission level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

/// Result of querying one symbol across all of a user's watchlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolQueryResult {
    /// The queried symbol.
    pub symbol: String,

    /// Identifiers of the watchlists containing the symbol.
    #[serde(default)]
    pub watchlists: Vec<String>,
}
