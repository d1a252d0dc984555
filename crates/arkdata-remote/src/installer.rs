use crate::http::HttpClient;
use crate::{InstallerKind, InstallerSource, RemoteConfig, RemoteError, Server};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static APK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="(https://pkg\.bili[^"]+\.apk)"#).expect("valid APK link pattern")
});

/// First installer link on a download page, with `&amp;` unescaped.
pub fn find_scraped_apk_url(html: &str) -> Option<String> {
    APK_LINK
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

/// [`InstallerSource`] over plain HTTP.
///
/// `scrape` servers publish the link in page HTML; `redirect` servers answer
/// the endpoint with a redirect chain ending at the package.
pub struct HttpInstallerSource {
    client: HttpClient,
    config: RemoteConfig,
}

impl HttpInstallerSource {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            client: HttpClient::new(&config.user_agent, config.timeout()),
            config: config.clone(),
        }
    }
}

impl InstallerSource for HttpInstallerSource {
    fn resolve_url(&self, server: Server) -> Result<String, RemoteError> {
        let endpoint = self.config.server(server);
        match endpoint.installer_kind {
            InstallerKind::Scrape => {
                let html = self.client.get_text(&endpoint.installer_url)?;
                find_scraped_apk_url(&html).ok_or_else(|| {
                    RemoteError::Resolve(format!(
                        "no installer link on {}",
                        endpoint.installer_url
                    ))
                })
            }
            InstallerKind::Redirect => self.client.final_url(&endpoint.installer_url),
        }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, RemoteError> {
        self.client.download_to(url, dest)
    }
}
