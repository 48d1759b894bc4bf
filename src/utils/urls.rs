use url::{ParseError, Url};

pub fn to_url(host: &str) -> Result<Url, ParseError> {
    Url::parse(host)
}

/// Appends `path` to the base URL, keeping any path prefix the base already has.
pub fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url
}
