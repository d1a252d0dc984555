use crate::RemoteError;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Maximum redirect hops followed by [`HttpClient::final_url`].
pub const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client shared by every remote backend.
///
/// Every request carries the configured `User-Agent` and, when set, an
/// `Authorization: Bearer` token. Non-2xx statuses become errors.
pub struct HttpClient {
    agent: ureq::Agent,
    manual: ureq::Agent,
    user_agent: String,
    auth_token: Option<String>,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let manual: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .max_redirects(0)
            .max_redirects_will_error(false)
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            manual,
            user_agent: user_agent.to_owned(),
            auth_token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        self.auth_token = token.map(str::to_owned);
        self
    }

    fn call(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>, RemoteError> {
        let mut req = self.agent.get(url).header("User-Agent", &self.user_agent);
        if let Some(ref token) = self.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.call() {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::StatusCode(404)) => Err(RemoteError::NotFound(url.to_owned())),
            Err(ureq::Error::StatusCode(code)) => Err(RemoteError::Status {
                code,
                url: url.to_owned(),
            }),
            Err(e) => Err(RemoteError::Http(format!("{url}: {e}"))),
        }
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        tracing::debug!("GET {url}");
        let resp = self.call(url)?;
        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(format!("{url}: {e}")))?;
        Ok(body)
    }

    pub fn get_text(&self, url: &str) -> Result<String, RemoteError> {
        let body = self.get_bytes(url)?;
        String::from_utf8(body).map_err(|e| RemoteError::Http(format!("{url}: {e}")))
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        let body = self.get_bytes(url)?;
        serde_json::from_slice(&body)
            .map_err(|e| RemoteError::Serialization(format!("invalid JSON from {url}: {e}")))
    }

    /// Stream `url` into `dest`. The body goes to a temp file next to `dest`
    /// which is renamed into place only once the transfer completes.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<u64, RemoteError> {
        tracing::debug!("GET {url} -> {}", dest.display());
        let resp = self.call(url)?;
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let mut reader = resp.into_body().into_reader();
        let written = std::io::copy(&mut reader, &mut tmp)
            .map_err(|e| RemoteError::Http(format!("{url}: {e}")))?;
        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| RemoteError::Io(e.error))?;
        Ok(written)
    }

    /// Follow redirects from `url` by hand and return the URL of the first
    /// non-redirect response. The response body is not read.
    pub fn final_url(&self, url: &str) -> Result<String, RemoteError> {
        let mut current = url.to_owned();
        for _ in 0..=MAX_REDIRECTS {
            tracing::debug!("GET {current} (redirects off)");
            let resp = self
                .manual
                .get(&current)
                .header("User-Agent", &self.user_agent)
                .call()
                .map_err(|e| RemoteError::Http(format!("{current}: {e}")))?;
            let status = resp.status();
            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        RemoteError::Resolve(format!("{current}: redirect without Location"))
                    })?;
                current = join_location(&current, location)?;
                continue;
            }
            if status.is_success() {
                return Ok(current);
            }
            return Err(RemoteError::Status {
                code: status.as_u16(),
                url: current,
            });
        }
        Err(RemoteError::Resolve(format!(
            "{url}: more than {MAX_REDIRECTS} redirects"
        )))
    }
}

/// Resolve a `Location` header value against the URL that returned it.
fn join_location(base: &str, location: &str) -> Result<String, RemoteError> {
    let base = url::Url::parse(base).map_err(|e| RemoteError::Resolve(format!("{base}: {e}")))?;
    base.join(location)
        .map(String::from)
        .map_err(|e| RemoteError::Resolve(format!("{location}: {e}")))
}
