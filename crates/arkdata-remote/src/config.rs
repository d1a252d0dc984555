use crate::retry::RetryPolicy;
use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "ARKDATA_CONFIG";
/// Environment variable supplying a GitHub API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36 Edg/116.0.1938.81";

/// Game server region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Server {
    Cn,
    En,
}

impl Server {
    pub fn as_str(self) -> &'static str {
        match self {
            Server::Cn => "cn",
            Server::En => "en",
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Server {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cn" => Ok(Server::Cn),
            "en" => Ok(Server::En),
            other => Err(RemoteError::Config(format!(
                "unknown server '{other}', expected cn or en"
            ))),
        }
    }
}

/// How the installer download URL is found on `installer_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerKind {
    /// Scan the page HTML for an anchor pointing at an `.apk`.
    Scrape,
    /// Follow redirects from the endpoint; the final URL is the package.
    Redirect,
}

/// Endpoints for one server. A `[cn]` or `[en]` table in the config file
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub network_config_url: String,
    pub installer_url: String,
    pub installer_kind: InstallerKind,
}

/// Repository publishing the binary schema sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaRepoConfig {
    /// `owner/name` on GitHub.
    pub repo: String,
    pub branch: String,
    /// Directory of `.fbs` files inside the repository.
    pub dir: String,
    pub api_base: String,
    pub raw_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for SchemaRepoConfig {
    fn default() -> Self {
        Self {
            repo: "MooncellWiki/OpenArknightsFBS".to_owned(),
            branch: "main".to_owned(),
            dir: "FBS".to_owned(),
            api_base: "https://api.github.com".to_owned(),
            raw_base: "https://raw.githubusercontent.com".to_owned(),
            token: None,
        }
    }
}

/// Settings for the bundle download pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub workers: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

/// Every endpoint and network tunable used by the tools.
///
/// Defaults are compiled in; a TOML file may override any subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub cn: ServerConfig,
    pub en: ServerConfig,
    pub schema_repo: SchemaRepoConfig,
    pub retry: RetryPolicy,
    pub sync: SyncSettings,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            user_agent: DESKTOP_USER_AGENT.to_owned(),
            timeout_secs: 90,
            cn: ServerConfig {
                network_config_url: "https://ak-conf.hypergryph.com/config/prod/b/network_config"
                    .to_owned(),
                installer_url: "https://www.biligame.com/detail/?id=101772".to_owned(),
                installer_kind: InstallerKind::Scrape,
            },
            en: ServerConfig {
                network_config_url:
                    "https://ak-conf.arknights.global/config/prod/official/network_config"
                        .to_owned(),
                installer_url:
                    "https://d.apkpure.com/b/XAPK/com.YoStarEN.Arknights?version=latest"
                        .to_owned(),
                installer_kind: InstallerKind::Redirect,
            },
            schema_repo: SchemaRepoConfig::default(),
            retry: RetryPolicy::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl RemoteConfig {
    pub fn server(&self, server: Server) -> &ServerConfig {
        match server {
            Server::Cn => &self.cn,
            Server::En => &self.en,
        }
    }

    pub fn parse(input: &str) -> Result<Self, RemoteError> {
        toml::from_str(input).map_err(|e| RemoteError::Config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RemoteError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Load from an explicit path, else from `$ARKDATA_CONFIG`, else defaults.
    /// A token from `$GITHUB_TOKEN` fills in when none is configured.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, RemoteError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let mut config = match path {
            Some(p) => Self::load(&p)?,
            None => Self::default(),
        };
        if config.schema_repo.token.is_none() {
            config.schema_repo.token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
        }
        Ok(config)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
