//! The token owner (`/me`)
//!
//! What `/me` is depends on the token: a user, a system user, or a Page. The
//! operations here list what the owner can reach.

use serde::{Deserialize, Serialize};

use crate::{
    client::Client,
    error::Error,
    page::PageInfo,
    rest::{client::DataWrapper, execute_request},
};

/// Operations on the node that owns the access token.
///
/// Obtain one with [`Client::me`].
#[derive(Debug)]
pub struct MeManager {
    client: Client,
}

impl MeManager {
    pub(crate) fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Lists the businesses owned by the current user (`/me/businesses`).
    pub async fn businesses(&self, token: &str) -> Result<Vec<BusinessInfo>, Error> {
        let request = self
            .client
            .get(self.client.a_node("me").join("businesses"), token);

        let response: DataWrapper<Vec<BusinessInfo>> = execute_request(request).await?;
        Ok(response.into_inner())
    }

    /// Returns `id`, `name` and `category` of the token owner.
    ///
    /// `category` is only present when the token is a Page token.
    pub async fn profile(&self, token: &str) -> Result<PageProfile, Error> {
        let request = self
            .client
            .get(self.client.a_node("me"), token)
            .query(&[("fields", "id,name,category")]);

        execute_request(request).await
    }

    /// Lists the Pages the current user can access (`/me/accounts`).
    ///
    /// Every returned [`PageInfo`] carries its own Page-scoped access token; use it
    /// for the per-Page operations of [`Client::page`].
    pub async fn pages(&self, token: &str) -> Result<Vec<PageInfo>, Error> {
        let request = self.client.get(self.client.a_node("me").join("accounts"), token);

        let response: DataWrapper<Vec<PageInfo>> = execute_request(request).await?;
        Ok(response.into_inner())
    }
}

/// A Business Manager account.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct BusinessInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The profile of the token owner.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct PageProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl PageProfile {
    /// Whether the token that produced this profile is a Page token.
    pub fn is_page(&self) -> bool {
        self.category.is_some()
    }
}
