use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::AppConfig;

/// Parses `cors_allowed_origins`, skipping blanks and values that are not valid header values.
pub fn configured_origins(cfg: &AppConfig) -> Option<Vec<HeaderValue>> {
    cfg.cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
}

/// Builds the CORS layer from config, or `None` when no usable policy is configured.
pub fn cors_layer(cfg: &AppConfig) -> Option<CorsLayer> {
    if let Some(origins) = configured_origins(cfg) {
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        let mut cfg = AppConfig::new("k", "production");
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        let origins = configured_origins(&cfg).unwrap();
        assert_eq!(
            origins,
            vec![
                HeaderValue::from_static("https://a.example"),
                HeaderValue::from_static("https://b.example")
            ]
        );
        assert!(cors_layer(&cfg).is_some());
    }

    #[test]
    fn production_without_origins_has_no_policy() {
        let cfg = AppConfig::new("k", "production");
        assert!(configured_origins(&cfg).is_none());
        assert!(cors_layer(&cfg).is_none());

        let dev = AppConfig::new("k", "development");
        assert!(cors_layer(&dev).is_some());
    }
}
