//! Map tile proxy.
//!
//! Serves chart imagery to viewers by rewriting tile request paths and
//! fetching the corresponding JPEG from the upstream provider. The proxy is
//! deliberately quiet about failure: requests missing the shared-secret
//! path segment, malformed paths and upstream errors all produce an empty
//! body rather than an error status - silence is the failure signal.
//!
//! Request path shape: `/{secret}/{mapSetId}/{depth}/{z}/{x}/{y}.jpg`. The
//! zoom segment is rewritten with a per-map-set formula before the path is
//! substituted into the upstream URL.

pub mod http;

pub use http::{AsyncHttpClient, AsyncReqwestClient, HttpError};

use tracing::{debug, trace, warn};

/// Tile proxy configuration.
#[derive(Debug, Clone)]
pub struct TileProxyConfig {
    /// Shared-secret path segment; requests without it get an empty body.
    pub secret: String,
    /// Upstream tile provider base URL, no trailing slash.
    pub upstream_base: String,
}

/// Path index of the map-set identifier segment.
const MAPSET_SEGMENT: usize = 2;

/// Path index of the zoom-level selector segment.
const ZOOM_SEGMENT: usize = 4;

/// Maximum tile depth per map set. Map set 301 (IFR low) goes deepest,
/// 302 (IFR high) one level less, everything else (VFR sectionals) 20.
fn max_depth(map_set: &str) -> i64 {
    match map_set {
        "301" => 23,
        "302" => 22,
        _ => 20,
    }
}

/// Rewrite the zoom segment of a tile request path.
///
/// The viewer's zoom selector `z` becomes `max - 2` for `z == 1` and
/// `max - 2*z` otherwise, where `max` is the map set's maximum depth.
/// Returns `None` when the path is too short or the zoom segment is not
/// numeric.
pub fn rewrite_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.len() <= ZOOM_SEGMENT {
        return None;
    }

    let max = max_depth(segments[MAPSET_SEGMENT]);
    let zoom: i64 = segments[ZOOM_SEGMENT].parse().ok()?;
    let rewritten = if zoom == 1 { max - 2 } else { max - zoom * 2 };

    let rewritten = rewritten.to_string();
    segments[ZOOM_SEGMENT] = &rewritten;
    Some(segments.join("/"))
}

/// On-demand tile proxy over an [`AsyncHttpClient`].
pub struct TileProxy<C> {
    config: TileProxyConfig,
    client: C,
}

impl<C: AsyncHttpClient> TileProxy<C> {
    pub fn new(config: TileProxyConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Handle one tile request path, returning the image bytes.
    ///
    /// Every failure mode - missing secret, malformed path, upstream error -
    /// returns an empty body.
    pub async fn handle(&self, path: &str) -> Vec<u8> {
        if !path.contains(&self.config.secret) {
            trace!(path, "tile request without secret rejected");
            return Vec::new();
        }

        let Some(rewritten) = rewrite_path(path) else {
            debug!(path, "malformed tile path rejected");
            return Vec::new();
        };

        let url = format!("{}{}", self.config.upstream_base, rewritten);
        match self.client.get(&url).await {
            Ok(bytes) => {
                trace!(url, len = bytes.len(), "tile fetched");
                bytes
            }
            Err(e) => {
                warn!(url, error = %e, "upstream tile fetch failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::http::tests::MockHttpClient;
    use super::*;

    const SECRET: &str = "test-secret-segment";

    fn proxy_with(response: Result<Vec<u8>, HttpError>) -> TileProxy<MockHttpClient> {
        TileProxy::new(
            TileProxyConfig {
                secret: SECRET.to_string(),
                upstream_base: "https://tiles.example.com".to_string(),
            },
            MockHttpClient::returning(response),
        )
    }

    #[test]
    fn test_zoom_rewrite_map_set_301() {
        // max depth 23: z=1 becomes 21
        assert_eq!(
            rewrite_path("/secret/301/2308/1/3/4.jpg").as_deref(),
            Some("/secret/301/2308/21/3/4.jpg")
        );
        // z=3 becomes 23 - 6 = 17
        assert_eq!(
            rewrite_path("/secret/301/2308/3/3/4.jpg").as_deref(),
            Some("/secret/301/2308/17/3/4.jpg")
        );
    }

    #[test]
    fn test_zoom_rewrite_map_set_302() {
        assert_eq!(
            rewrite_path("/secret/302/2308/1/3/4.jpg").as_deref(),
            Some("/secret/302/2308/20/3/4.jpg")
        );
    }

    #[test]
    fn test_zoom_rewrite_unknown_map_set_uses_depth_20() {
        assert_eq!(
            rewrite_path("/secret/999/2308/2/3/4.jpg").as_deref(),
            Some("/secret/999/2308/16/3/4.jpg")
        );
    }

    #[test]
    fn test_rewrite_rejects_malformed_paths() {
        assert!(rewrite_path("/secret/301").is_none());
        assert!(rewrite_path("/secret/301/2308/abc/3/4.jpg").is_none());
        assert!(rewrite_path("").is_none());
    }

    #[tokio::test]
    async fn test_request_without_secret_gets_empty_body() {
        let proxy = proxy_with(Ok(vec![0xff, 0xd8]));
        let body = proxy.handle("/wrong-secret/301/2308/1/3/4.jpg").await;
        assert!(body.is_empty());
        // The upstream must not even be contacted
        assert!(proxy.client.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn test_valid_request_rewrites_and_fetches() {
        let proxy = proxy_with(Ok(vec![0xff, 0xd8, 0xff]));
        let body = proxy
            .handle(&format!("/{SECRET}/301/2308/1/3/4.jpg"))
            .await;

        assert_eq!(body, vec![0xff, 0xd8, 0xff]);
        assert_eq!(
            proxy.client.requested_urls(),
            vec![format!(
                "https://tiles.example.com/{SECRET}/301/2308/21/3/4.jpg"
            )]
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_empty_body() {
        let proxy = proxy_with(Err(HttpError::Status {
            status: 502,
            url: "https://tiles.example.com/x".to_string(),
        }));
        let body = proxy
            .handle(&format!("/{SECRET}/302/2308/2/3/4.jpg"))
            .await;
        assert!(body.is_empty());
    }
}
