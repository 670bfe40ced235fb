//! REST endpoint descriptors for the watchlist service.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use watchlist_core::{EndpointDescriptor, Verb};

// Characters that cannot appear raw in a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

pub(crate) fn read_service_metadata() -> EndpointDescriptor {
    EndpointDescriptor::new("read-service-metadata", Verb::Get, "/v1/service")
}

pub(crate) fn read_watchlists() -> EndpointDescriptor {
    EndpointDescriptor::new("read-watchlists", Verb::Get, "/v1/watchlists")
}

pub(crate) fn create_watchlist() -> EndpointDescriptor {
    EndpointDescriptor::new("create-watchlist", Verb::Post, "/v1/watchlists")
}

pub(crate) fn edit_watchlist(id: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "edit-watchlist",
        Verb::Put,
        format!("/v1/watchlists/{}", segment(id)),
    )
}

pub(crate) fn delete_watchlist(id: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "delete-watchlist",
        Verb::Delete,
        format!("/v1/watchlists/{}", segment(id)),
    )
}

pub(crate) fn add_symbol(id: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "add-symbol",
        Verb::Put,
        format!("/v1/watchlists/{}/symbols", segment(id)),
    )
}

pub(crate) fn delete_symbol(id: &str, symbol: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "delete-symbol",
        Verb::Delete,
        format!("/v1/watchlists/{}/symbols/{}", segment(id), segment(symbol)),
    )
}

pub(crate) fn query_symbol(symbol: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "query-symbol",
        Verb::Get,
        format!("/v1/symbols/{}", segment(symbol)),
    )
}

pub(crate) fn edit_preferences(id: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "edit-preferences",
        Verb::Put,
        format!("/v1/watchlists/{}/preferences", segment(id)),
    )
}

pub(crate) fn impersonate(environment_code: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        "generate-impersonation-token",
        Verb::Post,
        format!(
            "/v1/tokens/impersonate/service/watchlist/environment/{}",
            segment(environment_code)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_paths() {
        assert_eq!(read_service_metadata().path, "/v1/service");
        assert_eq!(read_watchlists().path, "/v1/watchlists");
        assert_eq!(create_watchlist().verb, Verb::Post);
    }

    #[test]
    fn parameterized_paths() {
        assert_eq!(edit_watchlist("abc-123").path, "/v1/watchlists/abc-123");
        assert_eq!(
            delete_symbol("abc-123", "TSLA").path,
            "/v1/watchlists/abc-123/symbols/TSLA"
        );
        assert_eq!(
            impersonate("test").path,
            "/v1/tokens/impersonate/service/watchlist/environment/test"
        );
    }

    #[test]
    fn symbols_are_percent_encoded() {
        assert_eq!(query_symbol("^EURUSD").path, "/v1/symbols/^EURUSD");
        assert_eq!(query_symbol("BRK/B").path, "/v1/symbols/BRK%2FB");
        assert_eq!(
            delete_symbol("abc 123", "ES U26").path,
            "/v1/watchlists/abc%20123/symbols/ES%20U26"
        );
    }
}
