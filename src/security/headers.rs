//! Hop-by-hop header removal and forwarding headers.

use std::net::IpAddr;

use axum::http::header::{CONNECTION, TE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Headers that only apply to a single transport hop.
pub const HOP_HEADERS: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Remove every header listed in `Connection`, then the fixed hop-by-hop set.
///
/// `TE` survives only when its value is exactly `trailers`.
pub fn strip_hop_headers(headers: &mut HeaderMap) {
    remove_connection_headers(headers);

    let keep_te = {
        let mut values = headers.get_all(TE).iter();
        matches!((values.next(), values.next()), (Some(v), None) if v == "trailers")
    };

    for name in HOP_HEADERS {
        if name == "te" && keep_te {
            continue;
        }
        headers.remove(name);
    }
}

/// Remove headers named by the `Connection` header's comma-separated tokens.
pub fn remove_connection_headers(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
}

/// Append `client` to `X-Forwarded-For`, folding prior values into one line.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let mut chain: Vec<String> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect();
    chain.push(client.to_string());

    // Visible ASCII only.
    if let Ok(value) = HeaderValue::try_from(chain.join(", ")) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
