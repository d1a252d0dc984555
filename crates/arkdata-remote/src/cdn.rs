//! Vendor hot-update CDN.
//!
//! Resolution goes network config → version endpoint → asset base URL:
//! the network config's `content` is itself a JSON document whose
//! `configs[funcVer].network` carries the version URL template (`hv`) and the
//! asset host (`hu`).

use crate::http::HttpClient;
use crate::{AssetBackend, RemoteConfig, RemoteError, Server};
use arkdata_schema::HotUpdateList;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Client platform the assets are requested for.
pub const PLATFORM: &str = "Android";
/// Name of the hot-update list under the asset base URL.
pub const LIST_FILE: &str = "hot_update_list.json";

/// A resolved resource version and where its assets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetVersion {
    pub res_version: String,
    pub assets_url: String,
}

#[derive(Debug, Deserialize)]
struct NetworkConfigEnvelope {
    content: String,
}

#[derive(Debug, Deserialize)]
struct NetworkContent {
    #[serde(rename = "funcVer")]
    func_ver: String,
    configs: BTreeMap<String, FuncConfig>,
}

#[derive(Debug, Deserialize)]
struct FuncConfig {
    network: NetworkUrls,
}

/// The endpoints advertised by a network config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkUrls {
    /// Version endpoint template; `{0}` is the platform.
    pub hv: String,
    /// Hot-update asset host.
    pub hu: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "resVersion")]
    res_version: String,
}

/// Extract the active network endpoints from a network-config response body.
pub fn parse_network_config(body: &[u8]) -> Result<NetworkUrls, RemoteError> {
    let envelope: NetworkConfigEnvelope = serde_json::from_slice(body)
        .map_err(|e| RemoteError::Serialization(format!("invalid network config: {e}")))?;
    let content: NetworkContent = serde_json::from_str(&envelope.content)
        .map_err(|e| RemoteError::Serialization(format!("invalid network config content: {e}")))?;
    content
        .configs
        .get(&content.func_ver)
        .map(|c| c.network.clone())
        .ok_or_else(|| {
            RemoteError::Serialization(format!(
                "network config has no entry for funcVer '{}'",
                content.func_ver
            ))
        })
}

/// HTTP implementation of [`AssetBackend`] for one server.
pub struct CdnBackend {
    client: HttpClient,
    network_config_url: String,
}

impl CdnBackend {
    pub fn new(config: &RemoteConfig, server: Server) -> Self {
        Self {
            client: HttpClient::new(&config.user_agent, config.timeout()),
            network_config_url: config.server(server).network_config_url.clone(),
        }
    }

    pub fn network_urls(&self) -> Result<NetworkUrls, RemoteError> {
        let body = self.client.get_bytes(&self.network_config_url)?;
        parse_network_config(&body)
    }
}

impl AssetBackend for CdnBackend {
    fn resolve_version(&self) -> Result<AssetVersion, RemoteError> {
        let urls = self.network_urls()?;
        let version_url = urls.hv.replace("{0}", PLATFORM);
        let info: VersionInfo = self.client.get_json(&version_url)?;
        let assets_url = format!(
            "{}/{PLATFORM}/assets/{}",
            urls.hu.trim_end_matches('/'),
            info.res_version
        );
        tracing::debug!("resource version {} at {assets_url}", info.res_version);
        Ok(AssetVersion {
            res_version: info.res_version,
            assets_url,
        })
    }

    fn fetch_list(&self, version: &AssetVersion) -> Result<HotUpdateList, RemoteError> {
        let url = format!("{}/{LIST_FILE}", version.assets_url);
        let body = self.client.get_bytes(&url)?;
        HotUpdateList::from_bytes(&body)
            .map_err(|e| RemoteError::Serialization(format!("invalid {LIST_FILE}: {e}")))
    }

    fn download_bundle(
        &self,
        version: &AssetVersion,
        file_name: &str,
        dest: &Path,
    ) -> Result<u64, RemoteError> {
        let url = format!("{}/{file_name}", version.assets_url);
        self.client.download_to(&url, dest)
    }
}
