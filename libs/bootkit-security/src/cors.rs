use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::SecurityConfigError;
use crate::path::PathPattern;
use crate::properties::CorsProperties;

fn is_wildcard(values: Option<&Vec<String>>) -> bool {
    values.is_some_and(|v| v.iter().any(|s| s == "*"))
}

fn parse_all<T, F>(
    values: &[String],
    kind: &'static str,
    parse: F,
) -> Result<Vec<T>, SecurityConfigError>
where
    F: Fn(&str) -> Option<T>,
{
    values
        .iter()
        .map(|v| {
            parse(v).ok_or_else(|| SecurityConfigError::InvalidCorsValue {
                kind,
                value: v.clone(),
            })
        })
        .collect()
}

/// Build a CORS layer from config.
///
/// Only requests whose path matches `mapping` are granted CORS headers.
/// Options left unset are not applied.
///
/// # Errors
/// - `WildcardOriginWithCredentials` when `allowed_origins` contains `"*"`
///   and `allow_credentials` is `true`;
/// - `InvalidCorsValue` for unparsable origins, methods or headers;
/// - `InvalidPattern` for a malformed `mapping`.
pub fn build_cors_layer(props: &CorsProperties) -> Result<CorsLayer, SecurityConfigError> {
    let credentials = props.allow_credentials.unwrap_or(false);
    let wildcard_origin = is_wildcard(props.allowed_origins.as_ref());

    if wildcard_origin && credentials {
        return Err(SecurityConfigError::WildcardOriginWithCredentials);
    }
    if wildcard_origin {
        warn!(
            mapping = %props.mapping,
            "CORS is configured with allowed_origins=['*']; any website may call the API"
        );
    }

    let mapping = PathPattern::new(&props.mapping)?;
    let mut layer = CorsLayer::new();

    if let Some(origins) = &props.allowed_origins {
        let allowed = if wildcard_origin {
            None
        } else {
            Some(parse_all(origins, "origin", |s| HeaderValue::from_str(s).ok())?)
        };
        layer = layer.allow_origin(AllowOrigin::predicate(move |origin, parts| {
            mapping.matches(parts.uri.path())
                && allowed.as_ref().is_none_or(|list| list.contains(origin))
        }));
    }

    if let Some(methods) = &props.allowed_methods {
        layer = if is_wildcard(Some(methods)) {
            layer.allow_methods(AllowMethods::mirror_request())
        } else {
            layer.allow_methods(parse_all(methods, "method", |s| {
                s.parse::<Method>().ok()
            })?)
        };
    }

    if let Some(headers) = &props.allowed_headers {
        layer = if is_wildcard(Some(headers)) {
            layer.allow_headers(AllowHeaders::mirror_request())
        } else {
            layer.allow_headers(parse_all(headers, "header", |s| {
                s.parse::<HeaderName>().ok()
            })?)
        };
    }

    if let Some(credentials) = props.allow_credentials {
        layer = layer.allow_credentials(credentials);
    }

    if let Some(secs) = props.max_age {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Ok(layer)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use tower::ServiceExt;

    fn props(origins: &[&str]) -> CorsProperties {
        CorsProperties {
            mapping: "/api/**".to_owned(),
            allowed_origins: Some(origins.iter().map(|s| (*s).to_owned()).collect()),
            allowed_methods: Some(vec!["GET".to_owned(), "POST".to_owned()]),
            ..CorsProperties::default()
        }
    }

    fn app(layer: CorsLayer) -> Router {
        Router::new()
            .route("/api/orders", get(|| async { "ok" }))
            .route("/health", get(|| async { "ok" }))
            .layer(layer)
    }

    async fn allow_origin_for(router: Router, path: &str, origin: &str) -> Option<String> {
        let resp = router
            .oneshot(
                Request::get(path)
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_owned())
    }

    #[tokio::test]
    async fn grants_listed_origin_inside_mapping_only() {
        let layer = build_cors_layer(&props(&["https://app.example"])).unwrap();
        assert_eq!(
            allow_origin_for(app(layer.clone()), "/api/orders", "https://app.example")
                .await
                .as_deref(),
            Some("https://app.example")
        );
        assert!(
            allow_origin_for(app(layer.clone()), "/api/orders", "https://evil.example")
                .await
                .is_none()
        );
        assert!(
            allow_origin_for(app(layer), "/health", "https://app.example")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn wildcard_origin_allows_any_caller() {
        let layer = build_cors_layer(&props(&["*"])).unwrap();
        assert!(
            allow_origin_for(app(layer), "/api/orders", "https://anything.example")
                .await
                .is_some()
        );
    }

    #[test]
    fn wildcard_with_credentials_is_rejected() {
        let mut p = props(&["*"]);
        p.allow_credentials = Some(true);
        assert!(matches!(
            build_cors_layer(&p),
            Err(SecurityConfigError::WildcardOriginWithCredentials)
        ));
    }

    #[test]
    fn invalid_method_is_reported() {
        let mut p = props(&["https://app.example"]);
        p.allowed_methods = Some(vec!["NOT A METHOD".to_owned()]);
        assert!(matches!(
            build_cors_layer(&p),
            Err(SecurityConfigError::InvalidCorsValue { kind: "method", .. })
        ));
    }
}
