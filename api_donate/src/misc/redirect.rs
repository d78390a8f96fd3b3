use actix_web::HttpRequest;
use common::{donation::Redirects, env_config::Config};
use url::Url;

/// Builds the redirect destinations for a request: the Origin header when it
/// parses as an http(s) URL, otherwise the configured web-app origin.
/// Validation keeps an attacker-supplied header out of redirect targets.
pub fn from_request(req: &HttpRequest, config: &Config) -> Redirects {
    let origin = req
        .headers()
        .get("origin")
        .and_then(|value| value.to_str().ok())
        .filter(|raw| is_valid_origin(raw));

    Redirects::from_origin(origin.unwrap_or(config.web_app_origin.as_str()))
}

fn is_valid_origin(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_origin;

    #[test]
    fn accepts_http_origins() {
        assert!(is_valid_origin("https://donate.example.org"));
        assert!(is_valid_origin("http://localhost:3000"));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(!is_valid_origin("javascript:alert(1)"));
        assert!(!is_valid_origin("not a url"));
        assert!(!is_valid_origin(""));
    }
}
