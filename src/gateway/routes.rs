/// Static route table
///
/// Maps path prefixes to backend services. Classification is total: a path
/// either matches a route (longest prefix wins) or is an explicit miss —
/// there is no fall-through backend.

use crate::configuration::GatewaySettings;

/// How a route's bodies move through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// Read the full body before forwarding. Fine for small JSON payloads.
    Buffered,
    /// Relay request and response bodies chunk by chunk. Required for the
    /// media routes, whose payloads must not be held in memory whole.
    Streaming,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: &'static str,
    pub backend: String,
    pub requires_auth: bool,
    pub mode: ForwardMode,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_settings(settings: &GatewaySettings) -> Self {
        let routes = vec![
            Route {
                prefix: "/api/auth",
                backend: settings.auth_service_url.clone(),
                requires_auth: false,
                mode: ForwardMode::Buffered,
            },
            Route {
                prefix: "/api/posts",
                backend: settings.post_service_url.clone(),
                requires_auth: true,
                mode: ForwardMode::Buffered,
            },
            Route {
                prefix: "/api/comments",
                backend: settings.comment_service_url.clone(),
                requires_auth: true,
                mode: ForwardMode::Buffered,
            },
            Route {
                prefix: "/api/likes",
                backend: settings.like_service_url.clone(),
                requires_auth: true,
                mode: ForwardMode::Buffered,
            },
            Route {
                prefix: "/api/media/upload",
                backend: settings.media_service_url.clone(),
                requires_auth: true,
                mode: ForwardMode::Streaming,
            },
            Route {
                prefix: "/api/media/files",
                backend: settings.media_service_url.clone(),
                requires_auth: false,
                mode: ForwardMode::Streaming,
            },
        ];
        Self { routes }
    }

    /// Longest-prefix match on path-segment boundaries.
    pub fn classify(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|route| prefix_matches(route.prefix, path))
            .max_by_key(|route| route.prefix.len())
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Strip the gateway's `/api` prefix; the remainder is the path the
/// backend itself serves (`/api/posts/7` becomes `/posts/7`).
pub fn rewrite_path(path: &str) -> &str {
    path.strip_prefix("/api").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> GatewaySettings {
        GatewaySettings {
            port: 4000,
            auth_service_url: "http://auth:4001".to_string(),
            post_service_url: "http://posts:4002".to_string(),
            comment_service_url: "http://comments:4003".to_string(),
            like_service_url: "http://likes:4004".to_string(),
            media_service_url: "http://media:4005".to_string(),
            jwt_access_secret: "access-secret".to_string(),
            forward_timeout_secs: 30,
        }
    }

    #[test]
    fn auth_prefix_is_public() {
        let table = RouteTable::from_settings(&test_settings());
        let route = table.classify("/api/auth/login").expect("No route matched");

        assert_eq!(route.backend, "http://auth:4001");
        assert!(!route.requires_auth);
    }

    #[test]
    fn crud_prefixes_require_auth() {
        let table = RouteTable::from_settings(&test_settings());

        for path in ["/api/posts", "/api/posts/7", "/api/comments/3", "/api/likes/toggle"] {
            let route = table.classify(path).expect("No route matched");
            assert!(route.requires_auth, "{} should require auth", path);
            assert_eq!(route.mode, ForwardMode::Buffered);
        }
    }

    #[test]
    fn media_routes_pick_longest_prefix() {
        let table = RouteTable::from_settings(&test_settings());

        let upload = table.classify("/api/media/upload").expect("No route matched");
        assert!(upload.requires_auth);
        assert_eq!(upload.mode, ForwardMode::Streaming);

        let files = table
            .classify("/api/media/files/abc123.png")
            .expect("No route matched");
        assert!(!files.requires_auth);
        assert_eq!(files.mode, ForwardMode::Streaming);
    }

    #[test]
    fn unmatched_paths_are_an_explicit_miss() {
        let table = RouteTable::from_settings(&test_settings());

        assert!(table.classify("/api/unknown").is_none());
        assert!(table.classify("/api/media").is_none());
        assert!(table.classify("/api/postscript").is_none());
        assert!(table.classify("/healthz").is_none());
        assert!(table.classify("/").is_none());
    }

    #[test]
    fn prefix_matches_only_on_segment_boundaries() {
        assert!(prefix_matches("/api/posts", "/api/posts"));
        assert!(prefix_matches("/api/posts", "/api/posts/7"));
        assert!(!prefix_matches("/api/posts", "/api/postsextra"));
    }

    #[test]
    fn rewrite_strips_only_the_api_prefix() {
        assert_eq!(rewrite_path("/api/posts/7"), "/posts/7");
        assert_eq!(rewrite_path("/api/auth/login"), "/auth/login");
        assert_eq!(rewrite_path("/api/media/files/x.png"), "/media/files/x.png");
        // Only the leading /api is stripped, nothing inside the path.
        assert_eq!(rewrite_path("/api/posts/api/x"), "/posts/api/x");
    }
}
