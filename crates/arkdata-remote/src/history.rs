use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::{RemoteConfig, RemoteError, SchemaHistory, SchemaRepoConfig};
use arkdata_schema::{CommitSha, SchemaName};
use serde::Deserialize;
use std::collections::HashMap;

/// Commits requested per listing page.
pub const PAGE_SIZE: u32 = 100;

/// Reference to a parent commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentRef {
    pub sha: CommitSha,
}

/// One entry of a commit listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitInfo {
    pub sha: CommitSha,
    #[serde(default)]
    pub parents: Vec<ParentRef>,
}

impl CommitInfo {
    pub fn first_parent(&self) -> Option<&CommitSha> {
        self.parents.first().map(|p| &p.sha)
    }
}

/// [`SchemaHistory`] backed by the GitHub REST API and raw file host.
pub struct GitHubHistory {
    client: HttpClient,
    repo: SchemaRepoConfig,
}

impl GitHubHistory {
    pub fn new(config: &RemoteConfig) -> Self {
        let client = HttpClient::new(&config.user_agent, config.timeout())
            .with_token(config.schema_repo.token.as_deref());
        Self {
            client,
            repo: config.schema_repo.clone(),
        }
    }

    fn page_url(&self, page: u32) -> String {
        format!(
            "{}/repos/{}/commits?sha={}&page={page}&per_page={PAGE_SIZE}",
            self.repo.api_base.trim_end_matches('/'),
            self.repo.repo,
            self.repo.branch
        )
    }

    fn raw_url(&self, commit: &CommitSha, schema: &SchemaName) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.repo.raw_base.trim_end_matches('/'),
            self.repo.repo,
            commit,
            self.repo.dir,
            schema.file_name()
        )
    }
}

impl SchemaHistory for GitHubHistory {
    fn commits_page(&self, page: u32) -> Result<Vec<CommitInfo>, RemoteError> {
        self.client.get_json(&self.page_url(page))
    }

    fn schema_at(&self, commit: &CommitSha, schema: &SchemaName) -> Result<String, RemoteError> {
        self.client.get_text(&self.raw_url(commit, schema))
    }
}

/// Memoizes commit listing pages across a whole extraction run.
///
/// Each page is fetched at most once (under the retry policy); empty pages
/// are cached too so the end of history is discovered only once.
pub struct CommitPageCache<'a> {
    history: &'a dyn SchemaHistory,
    policy: RetryPolicy,
    pages: HashMap<u32, Vec<CommitInfo>>,
}

impl<'a> CommitPageCache<'a> {
    pub fn new(history: &'a dyn SchemaHistory, policy: RetryPolicy) -> Self {
        Self {
            history,
            policy,
            pages: HashMap::new(),
        }
    }

    /// Listing page `page` (1-based), fetched on first use.
    pub fn page(&mut self, page: u32) -> Result<&[CommitInfo], RemoteError> {
        if !self.pages.contains_key(&page) {
            let history = self.history;
            let fetched = self
                .policy
                .run(&format!("fetch commit page {page}"), |_| {
                    history.commits_page(page)
                })
                .map_err(|e| e.into_remote(&format!("fetch commit page {page}")))?;
            tracing::debug!("commit page {page}: {} entries", fetched.len());
            self.pages.insert(page, fetched);
        }
        Ok(self.pages.get(&page).map_or(&[][..], Vec::as_slice))
    }

    /// The commit whose first parent is `commit`, i.e. the next newer commit
    /// on the branch. `None` when `commit` is the branch head or unknown.
    pub fn child_of(&mut self, commit: &CommitSha) -> Result<Option<CommitSha>, RemoteError> {
        let mut page = 1;
        loop {
            let entries = self.page(page)?;
            if entries.is_empty() {
                return Ok(None);
            }
            if let Some(found) = entries
                .iter()
                .find(|c| c.first_parent() == Some(commit))
            {
                return Ok(Some(found.sha.clone()));
            }
            page += 1;
        }
    }
}
