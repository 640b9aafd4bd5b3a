//! Facebook Page inspection
//!
//! Every operation here expects the **Page-scoped** access token returned by
//! [`MeManager::pages`], not the user token.
//!
//! [`MeManager::pages`]: crate::me::MeManager::pages

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    client::Client,
    error::{Error, GraphErrorKind},
    rest::{
        client::{DataWrapper, PageIgResponse, SuccessStatus},
        execute_request,
    },
    waba::SubscribedApp,
};

/// Webhook fields requested by [`PageManager::subscribe`], sent verbatim.
pub const PAGE_SUBSCRIBED_FIELDS: [&str; 5] = [
    "messages",
    "message_reactions",
    "messaging_postbacks",
    "message_reads",
    "standby",
];

/// Webhook fields an Instagram messaging subscription is expected to carry.
pub const IG_SUBSCRIBED_FIELDS: [&str; 3] =
    ["messages", "message_reactions", "messaging_postbacks"];

/// Graph codes meaning "no permission" (200) or "field/feature unavailable" (100).
const IG_ABSENT_CODES: [i64; 2] = [100, 200];

/// Manager for a single Facebook Page.
///
/// Obtain one with [`Client::page`].
#[derive(Debug)]
pub struct PageManager {
    client: Client,
    page_id: String,
}

impl PageManager {
    pub(crate) fn new(page_id: String, client: &Client) -> Self {
        Self {
            client: client.clone(),
            page_id,
        }
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Lists the apps subscribed to this Page's webhooks.
    pub async fn subscribed_apps(&self, page_token: &str) -> Result<Vec<SubscribedApp>, Error> {
        let request = self
            .client
            .get(self.subscribed_apps_endpoint(), page_token)
            .query(&[("fields", "id,name,subscribed_fields")]);

        let response: DataWrapper<Vec<SubscribedApp>> = execute_request(request).await?;
        Ok(response.into_inner())
    }

    /// Subscribes the Page to its app's webhooks with [`PAGE_SUBSCRIBED_FIELDS`].
    ///
    /// A `{"success": false}` answer is an error with code `0`.
    pub async fn subscribe(&self, page_token: &str) -> Result<(), Error> {
        let request = self
            .client
            .post(self.subscribed_apps_endpoint(), page_token)
            .query(&[("subscribed_fields", PAGE_SUBSCRIBED_FIELDS.join(","))]);

        let status: SuccessStatus = execute_request(request).await?;
        status.acknowledge("Page subscribe")?;
        Ok(())
    }

    /// Fetches the Instagram business account linked to this Page.
    ///
    /// Returns `Ok(None)` when the Page has no linked account, and also when Meta
    /// answers with code 100 or 200: without the Instagram permissions or feature,
    /// the lookup fails that way instead of returning nothing. Any other error
    /// propagates.
    pub async fn instagram_account(&self, token: &str) -> Result<Option<IgAccount>, Error> {
        let request = self
            .client
            .get(self.client.a_node(&self.page_id), token)
            .query(&[("fields", "instagram_business_account{id,name,username}")]);

        match execute_request::<PageIgResponse>(request).await {
            Ok(response) => Ok(response.instagram_business_account),
            Err(Error::Graph(err))
                if matches!(err.kind(), GraphErrorKind::Api { .. })
                    && IG_ABSENT_CODES.contains(&err.code()) =>
            {
                debug!(page = %self.page_id, code = err.code(), "no Instagram account visible");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn subscribed_apps_endpoint(&self) -> crate::client::Endpoint {
        self.client.a_node(&self.page_id).join("subscribed_apps")
    }
}

/// A Page the user can access, with its own Page-scoped token.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub category: Option<String>,
    /// `MANAGE`, `MESSAGING`, `MODERATE`, ...
    #[serde(default)]
    pub tasks: Vec<String>,
}

// The page token is a credential.
impl std::fmt::Debug for PageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("access_token", &"REDACTED")
            .field("category", &self.category)
            .field("tasks", &self.tasks)
            .finish()
    }
}

impl PageInfo {
    pub fn has_task(&self, task: &str) -> bool {
        self.tasks.iter().any(|t| t == task)
    }
}

/// An Instagram business account linked to a Page.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct IgAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// The entries of `wanted` that `app` is not subscribed to.
pub fn missing_fields<'a>(app: &SubscribedApp, wanted: &[&'a str]) -> Vec<&'a str> {
    wanted
        .iter()
        .copied()
        .filter(|field| !app.subscribed_fields.iter().any(|have| have == field))
        .collect()
}
