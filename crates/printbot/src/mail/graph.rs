//! Microsoft Graph implementation of [`MailSource`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, Response, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::auth::{ClientCredentials, TokenCache, DEFAULT_AUTHORITY_URL};
use super::error::{MailError, Result};
use super::message::{GraphCollection, GraphMessage, Message};
use super::source::{FolderId, MailFolder, MailSource};

/// Default Graph API root.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Well-known name of the inbox folder.
const INBOX: &str = "Inbox";

/// Upper bound on pages followed when listing folders.
const MAX_FOLDER_PAGES: usize = 20;

/// Longest server-requested wait honored between retries.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`GraphMailSource`].
#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub base_url: String,
    pub authority_url: String,
    pub mailbox_upn: String,
    pub credentials: ClientCredentials,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl GraphSettings {
    pub fn new(mailbox_upn: impl Into<String>, credentials: ClientCredentials) -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            mailbox_upn: mailbox_upn.into(),
            credentials,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// In-call retry of transient failures with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based). A server hint wins, capped.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(MAX_RETRY_AFTER),
            None => self.base_delay * attempt,
        }
    }
}

/// Escapes a string literal for use inside an OData `$filter`.
pub(crate) fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Orders messages oldest first. Unparseable timestamps sort last.
pub(crate) fn sort_oldest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| match (a.received_at(), b.received_at()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.received.cmp(&b.received),
    });
}

/// Mail source backed by the Microsoft Graph REST API.
pub struct GraphMailSource {
    client: Client,
    tokens: TokenCache,
    base_url: Url,
    mailbox_upn: String,
    retry: RetryPolicy,
}

impl GraphMailSource {
    pub fn new(settings: GraphSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| MailError::Permanent {
                status: 0,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base_url = Url::parse(settings.base_url.trim_end_matches('/')).map_err(|e| {
            MailError::Permanent {
                status: 0,
                message: format!("Invalid Graph base URL '{}': {}", settings.base_url, e),
            }
        })?;

        let tokens = TokenCache::new(
            client.clone(),
            &settings.authority_url,
            settings.credentials,
        );

        Ok(Self {
            client,
            tokens,
            base_url,
            mailbox_upn: settings.mailbox_upn,
            retry: settings.retry,
        })
    }

    /// Builds `<base>/users/<mailbox>/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MailError::Permanent {
                status: 0,
                message: format!("Graph base URL '{}' cannot hold a path", self.base_url),
            })?
            .pop_if_empty()
            .push("users")
            .push(&self.mailbox_upn)
            .extend(segments);
        Ok(url)
    }

    /// Sends one request, retrying transient failures. Returns only successful responses.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let (err, retry_after) = match self.send_once(&method, &url, query, body).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !err.is_transient() || attempt >= self.retry.max_retries {
                return Err(err);
            }
            attempt += 1;
            let delay = self.retry.delay(attempt, retry_after);
            warn!(
                method = %method,
                path = url.path(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient mail provider failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<Response, (MailError, Option<Duration>)> {
        let token = self.tokens.access_token().await.map_err(|e| (e, None))?;

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(token.expose_secret());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| (MailError::from(e), None))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        let err = MailError::from_status(status.as_u16(), text);
        if status.as_u16() == 401 {
            // A revoked or expired credential must be re-acquired next time.
            self.tokens.invalidate().await;
        }
        Err((err, retry_after))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.execute(Method::GET, url, query, None).await?;
        Ok(response.json::<T>().await?)
    }

    async fn find_folder(&self, segments: &[&str], display_name: &str) -> Result<Option<FolderId>> {
        let url = self.endpoint(segments)?;
        let filter = format!("displayName eq '{}'", escape_odata(display_name));
        let page: GraphCollection<MailFolder> = self.get_json(url, &[("$filter", filter)]).await?;
        Ok(page.value.first().map(MailFolder::folder_id))
    }

    async fn list_all_folders(&self, url: Url) -> Result<Vec<MailFolder>> {
        let mut folders = Vec::new();
        let mut next: Option<Url> = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page: GraphCollection<MailFolder> = self.get_json(url, &[]).await?;
            folders.extend(page.value);
            pages += 1;

            if pages >= MAX_FOLDER_PAGES {
                warn!(pages, "Stopped following folder pages");
                break;
            }
            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).map_err(|e| MailError::Permanent {
                    status: 0,
                    message: format!("Invalid next link from provider: {}", e),
                })?),
                None => None,
            };
        }

        Ok(folders)
    }

    /// Runs a folder lookup step, treating permanent failures as "not found".
    async fn lookup_step(
        &self,
        step: &'static str,
        segments: &[&str],
        display_name: &str,
    ) -> Result<Option<FolderId>> {
        match self.find_folder(segments, display_name).await {
            Ok(found) => Ok(found),
            Err(err @ MailError::Permanent { .. }) => {
                warn!(
                    folder = display_name,
                    step,
                    error_kind = %err.kind(),
                    error = %err,
                    "Folder lookup rejected, continuing search"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl MailSource for GraphMailSource {
    async fn resolve_folder(&self, display_name: &str) -> Result<FolderId> {
        if let Some(id) = self
            .lookup_step("top_level", &["mailFolders"], display_name)
            .await?
        {
            debug!(folder = display_name, "Resolved top-level folder");
            return Ok(id);
        }

        if let Some(id) = self
            .lookup_step(
                "inbox_child",
                &["mailFolders", INBOX, "childFolders"],
                display_name,
            )
            .await?
        {
            debug!(folder = display_name, "Resolved folder under inbox");
            return Ok(id);
        }

        warn!(folder = display_name, "Folder not found, falling back to inbox");
        let inbox: MailFolder = self
            .get_json(self.endpoint(&["mailFolders", INBOX])?, &[])
            .await?;
        Ok(inbox.folder_id())
    }

    async fn get_or_create_child_folder(
        &self,
        parent: &FolderId,
        display_name: &str,
    ) -> Result<FolderId> {
        let segments = ["mailFolders", parent.as_str(), "childFolders"];
        if let Some(id) = self.find_folder(&segments, display_name).await? {
            return Ok(id);
        }

        let body = json!({ "displayName": display_name });
        let created = self
            .execute(Method::POST, self.endpoint(&segments)?, &[], Some(&body))
            .await;

        match created {
            Ok(response) => {
                let folder: MailFolder = response.json().await?;
                info!(folder = display_name, "Created mail folder");
                Ok(folder.folder_id())
            }
            // Created concurrently by another client between lookup and create.
            Err(MailError::Permanent { status: 409, .. }) => self
                .find_folder(&segments, display_name)
                .await?
                .ok_or_else(|| MailError::Permanent {
                    status: 409,
                    message: format!("Folder '{}' conflicts but cannot be found", display_name),
                }),
            Err(err) => Err(err),
        }
    }

    async fn list_unread(
        &self,
        folder: &FolderId,
        sender: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let mut filter = "isRead eq false".to_string();
        if let Some(sender) = sender {
            filter.push_str(&format!(
                " and from/emailAddress/address eq '{}'",
                escape_odata(sender)
            ));
        }

        // No $orderby: combining it with a from/ filter is rejected by the provider.
        let url = self.endpoint(&["mailFolders", folder.as_str(), "messages"])?;
        let page: GraphCollection<GraphMessage> = self
            .get_json(
                url,
                &[("$filter", filter), ("$top", limit.max(1).to_string())],
            )
            .await?;

        let mut messages: Vec<Message> = page.value.into_iter().map(Message::from).collect();
        sort_oldest_first(&mut messages);
        messages.truncate(limit);
        Ok(messages)
    }

    async fn move_message(&self, message_id: &str, destination: &FolderId) -> Result<()> {
        let body = json!({ "destinationId": destination.as_str() });
        self.execute(
            Method::POST,
            self.endpoint(&["messages", message_id, "move"])?,
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<MailFolder>> {
        self.list_all_folders(self.endpoint(&["mailFolders"])?).await
    }

    async fn list_child_folders(&self, parent: &FolderId) -> Result<Vec<MailFolder>> {
        self.list_all_folders(self.endpoint(&["mailFolders", parent.as_str(), "childFolders"])?)
            .await
    }
}
