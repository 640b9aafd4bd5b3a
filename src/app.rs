//! App Inspection
//!
//! Operations scoped to a Meta App rather than to a business asset:
//! - inspecting any access token with `/debug_token`
//! - listing the app's webhook subscriptions
//!
//! Both use the **app access token** (`{app_id}|{app_secret}`), not the user or
//! system token being diagnosed.
//!
//! # Example – Debugging a token
//! ```rust,no_run
//! use meta_graph_doctor::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//! let app = client.app("123456");
//!
//! let info = app.debug_token("EAAG...", "123456|app_secret").await?;
//! if !info.is_valid {
//!     println!("token is invalid: {:?}", info.error);
//! }
//!
//! for subscription in app.subscriptions("123456|app_secret").await? {
//!     println!("{} -> {}", subscription.object, subscription.callback_url);
//! }
//! # Ok(()) }
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    client::Client,
    error::Error,
    rest::{client::DataWrapper, execute_request},
    Timestamp,
};

/// Provides app-scoped access to Graph API features.
///
/// Obtain one with [`Client::app`].
#[derive(Debug)]
pub struct AppManager {
    client: Client,
    app_id: String,
}

impl AppManager {
    pub(crate) fn new(app_id: String, client: &Client) -> Self {
        Self {
            client: client.clone(),
            app_id,
        }
    }

    /// The ID of the app this manager is scoped to.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Retrieves metadata about `input_token`, using `app_token` as the authority.
    ///
    /// This method makes a GET request to `/debug_token`. An invalid input token
    /// is **not** an error: Meta answers with `is_valid: false` and a nested
    /// [`TokenError`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn example(client: meta_graph_doctor::Client) -> Result<(), meta_graph_doctor::Error> {
    /// let token_info = client
    ///     .app("123456")
    ///     .debug_token("EAAG...", "123456|app_secret")
    ///     .await?;
    ///
    /// println!("  App ID: {}", token_info.app_id);
    /// println!("  Expires At: {}", token_info.expires_at);
    /// println!("  Scopes: {:?}", token_info.scopes);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn debug_token(&self, input_token: &str, app_token: &str) -> Result<TokenDebug, Error> {
        let request = self
            .client
            .get(self.client.a_node("debug_token"), app_token)
            .query(&[("input_token", input_token)]);

        let response: DataWrapper<TokenDebug> = execute_request(request).await?;
        Ok(response.into_inner())
    }

    /// Lists the app's webhook subscriptions (`/{app_id}/subscriptions`).
    pub async fn subscriptions(&self, app_token: &str) -> Result<Vec<WebhookSubscription>, Error> {
        let request = self.client.get(
            self.client.a_node(&self.app_id).join("subscriptions"),
            app_token,
        );

        let response: DataWrapper<Vec<WebhookSubscription>> = execute_request(request).await?;
        Ok(response.into_inner())
    }
}

/// Debug token information
///
/// > Note: the token may belong to an app user, a system user, a Page, or the app
/// > itself; which fields are filled in depends on `type`.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct TokenDebug {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub data_access_expires_at: Timestamp,
    #[serde(default)]
    pub expires_at: Timestamp,
    #[serde(default)]
    pub issued_at: Timestamp,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub granular_scopes: Vec<GranularScope>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// Why the token is invalid, when it is.
    #[serde(default)]
    pub error: Option<TokenError>,
}

impl TokenDebug {
    /// Whether `scope` was granted.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|granted| granted == scope)
    }

    /// The assets a granular scope is limited to; empty means unrestricted.
    pub fn targets_of(&self, scope: &str) -> &[String] {
        self.granular_scopes
            .iter()
            .find(|granular| granular.scope == scope)
            .map(|granular| granular.target_ids.as_slice())
            .unwrap_or_default()
    }
}

/// Granular scope information
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct GranularScope {
    pub scope: String,
    // account_ids of businesses, WABAs or Pages
    #[serde(default)]
    pub target_ids: Vec<String>,
}

/// The error nested in a debug-token record for an invalid token.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct TokenError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub subcode: Option<i64>,
}

/// One webhook subscription of an app, per object type.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct WebhookSubscription {
    /// `page`, `instagram`, `whatsapp_business_account`, ...
    pub object: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub fields: Vec<WebhookField>,
}

impl WebhookSubscription {
    /// Whether `field` is among the subscribed fields.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }
}

/// A subscribed webhook field and the API version it is delivered with.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct WebhookField {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_record() {
        let info: TokenDebug = serde_json::from_str(
            r#"{
                "app_id": "1",
                "type": "USER",
                "application": "Doctor",
                "data_access_expires_at": 0,
                "expires_at": 1700000000,
                "is_valid": false,
                "error": {"code": 190, "message": "Session has expired", "subcode": 463},
                "scopes": []
            }"#,
        )
        .unwrap();

        assert!(!info.is_valid);
        assert_eq!(info.error.as_ref().map(|e| e.code), Some(190));
        assert_eq!(info.error.and_then(|e| e.subcode), Some(463));
        assert_eq!(info.user_id, None);
    }

    #[test]
    fn granular_targets() {
        let info: TokenDebug = serde_json::from_str(
            r#"{
                "is_valid": true,
                "scopes": ["whatsapp_business_management", "pages_show_list"],
                "granular_scopes": [
                    {"scope": "whatsapp_business_management", "target_ids": ["waba1"]},
                    {"scope": "pages_show_list"}
                ]
            }"#,
        )
        .unwrap();

        assert!(info.has_scope("pages_show_list"));
        assert!(!info.has_scope("instagram_basic"));
        assert_eq!(info.targets_of("whatsapp_business_management"), ["waba1"]);
        assert!(info.targets_of("pages_show_list").is_empty());
    }

    #[test]
    fn subscription_fields() {
        let sub: WebhookSubscription = serde_json::from_str(
            r#"{
                "object": "page",
                "callback_url": "https://example.com/hook",
                "active": true,
                "fields": [{"name": "messages", "version": "v21.0"}]
            }"#,
        )
        .unwrap();

        assert!(sub.has_field("messages"));
        assert!(!sub.has_field("standby"));
    }
}
