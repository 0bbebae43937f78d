use anyhow::{anyhow, Context, Result};
use url::Url;

/// Removes the fragment from a distribution URL. Some indexes embed the
/// file checksum there (`...#sha256=...`); the stanza wants the bare URL.
pub fn strip_fragment(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid distribution url: {raw}"))?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Splits embedded `user:password@` credentials out of an index URL so they
/// can be sent as basic auth instead of travelling inside the URL.
pub fn extract_credentials(raw: &str) -> Result<(String, Option<String>, Option<String>)> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid index url: {raw}"))?;

    let username = (!url.username().is_empty()).then(|| url.username().to_string());
    let password = url.password().map(str::to_string);

    if username.is_some() || password.is_some() {
        url.set_username("")
            .map_err(|_| anyhow!("cannot strip credentials from url: {raw}"))?;
        url.set_password(None)
            .map_err(|_| anyhow!("cannot strip credentials from url: {raw}"))?;
    }

    Ok((url.to_string(), username, password))
}
