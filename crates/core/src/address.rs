//! Socket address derivation from a page location.

use crate::error::AddressError;
use url::Url;

/// Path of the socket endpoint relative to the page's origin.
pub const SOCKET_PATH: &str = "/ws";

/// Replaces the first occurrence of `http` in `scheme` with `ws`.
///
/// This is a plain substring substitution, not a scheme-aware mapping:
/// `http` → `ws` and `https` → `wss` work because `http` is a prefix, but
/// `shttp` turns into `swss` and any scheme without `http` is left alone.
pub fn swap_http_prefix(scheme: &str) -> String {
    scheme.replacen("http", "ws", 1)
}

/// Derives the socket URL for a page: same host and port, path `/ws`, and
/// the scheme passed through [`swap_http_prefix`].
pub fn derive_socket_url(base: &Url) -> Result<Url, AddressError> {
    let joined = base.join(SOCKET_PATH)?;
    let scheme = joined.scheme();
    let rewritten = format!(
        "{}{}",
        swap_http_prefix(scheme),
        &joined.as_str()[scheme.len()..]
    );
    Ok(Url::parse(&rewritten)?)
}

/// Parses `page` and derives its socket URL.
pub fn socket_url_for_page(page: &str) -> Result<Url, AddressError> {
    let base = Url::parse(page)?;
    derive_socket_url(&base)
}
