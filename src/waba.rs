//! WhatsApp Business Account (WABA) inspection
//!
//! Access this functionality through [`Client::waba`].
//!
//! Features include:
//! - Reading the review and verification status of a WABA
//! - Listing its phone numbers with their quality and verification flags
//! - Viewing which apps receive its webhooks, and subscribing the calling app
//!
//! # Example – Checking webhook delivery
//! ```rust,no_run
//! use meta_graph_doctor::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//! let waba = client.waba("WABA_ID");
//!
//! let apps = waba.subscribed_apps("ACCESS_TOKEN").await?;
//! if !apps.iter().any(|app| app.id.as_deref() == Some("MY_APP_ID")) {
//!     waba.subscribe("ACCESS_TOKEN").await?;
//! }
//! # Ok(()) }
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    client::Client,
    error::Error,
    rest::{
        client::{DataWrapper, RawWabaSubscribedApp, SuccessStatus},
        execute_request,
    },
};

/// Fields requested by [`WabaManager::info`].
pub const WABA_FIELDS: &str = "id,name,currency,timezone_id,message_template_namespace,account_review_status,business_verification_status,ownership_type";

/// Fields requested by [`WabaManager::phone_numbers`].
pub const PHONE_FIELDS: &str = "id,display_phone_number,verified_name,quality_rating,code_verification_status,platform_type,throughput,is_official_business_account,account_mode,is_pin_enabled,name_status,new_name_status,status,search_visibility,messaging_limit_tier";

/// Manager for a single WhatsApp Business Account.
///
/// For most use cases, you won't construct this directly; instead, use:
/// ```rust,no_run
/// # use meta_graph_doctor::Client;
/// # fn example(client: Client) {
/// let manager = client.waba("1234567890");
/// # }
/// ```
#[derive(Debug)]
pub struct WabaManager {
    client: Client,
    waba_id: String,
}

impl WabaManager {
    pub(crate) fn new(waba_id: String, client: &Client) -> Self {
        Self {
            client: client.clone(),
            waba_id,
        }
    }

    pub fn waba_id(&self) -> &str {
        &self.waba_id
    }

    /// Fetches the WABA's details with the fixed [`WABA_FIELDS`] projection.
    pub async fn info(&self, token: &str) -> Result<WabaInfo, Error> {
        let request = self
            .client
            .get(self.client.a_node(&self.waba_id), token)
            .query(&[("fields", WABA_FIELDS)]);

        execute_request(request).await
    }

    /// Lists the apps subscribed to this WABA's webhooks.
    ///
    /// Meta nests each app's id and name under `whatsapp_business_api_data` here,
    /// unlike the Page variant. The nested values win; the top-level ones are the
    /// fallback.
    pub async fn subscribed_apps(&self, token: &str) -> Result<Vec<SubscribedApp>, Error> {
        let request = self.client.get(self.endpoint(), token);

        let response: DataWrapper<Vec<RawWabaSubscribedApp>> = execute_request(request).await?;
        Ok(response
            .into_inner()
            .into_iter()
            .map(SubscribedApp::from)
            .collect())
    }

    /// Subscribes the app that owns `token` to this WABA's webhooks.
    ///
    /// A `{"success": false}` answer is an error with code `0`.
    pub async fn subscribe(&self, token: &str) -> Result<(), Error> {
        let request = self.client.post(self.endpoint(), token);

        let status: SuccessStatus = execute_request(request).await?;
        status.acknowledge("WABA subscribe")?;
        Ok(())
    }

    /// Lists the phone numbers attached to this WABA with the [`PHONE_FIELDS`] projection.
    pub async fn phone_numbers(&self, token: &str) -> Result<Vec<PhoneNumber>, Error> {
        let request = self
            .client
            .get(self.client.a_node(&self.waba_id).join("phone_numbers"), token)
            .query(&[("fields", PHONE_FIELDS)]);

        let response: DataWrapper<Vec<PhoneNumber>> = execute_request(request).await?;
        Ok(response.into_inner())
    }

    fn endpoint(&self) -> crate::client::Endpoint {
        self.client.a_node(&self.waba_id).join("subscribed_apps")
    }
}

/// A WhatsApp Business Account and its review status.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct WabaInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone_id: Option<String>,
    #[serde(default)]
    pub message_template_namespace: Option<String>,
    /// `APPROVED`, `PENDING`, `REJECTED`
    #[serde(default)]
    pub account_review_status: Option<String>,
    #[serde(default)]
    pub business_verification_status: Option<String>,
    #[serde(default)]
    pub ownership_type: Option<String>,
}

/// A phone number registered to a WABA.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub struct PhoneNumber {
    pub id: String,
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub verified_name: String,
    /// `GREEN`, `YELLOW`, `RED`, `UNKNOWN`
    #[serde(default)]
    pub quality_rating: Option<String>,
    #[serde(default)]
    pub code_verification_status: Option<String>,
    /// `CLOUD_API`, `ON_PREMISE`, `NOT_APPLICABLE`
    #[serde(default)]
    pub platform_type: Option<String>,
    #[serde(default)]
    pub throughput: Option<Throughput>,
    #[serde(default)]
    pub is_official_business_account: Option<bool>,
    #[serde(default)]
    pub account_mode: Option<String>,
    #[serde(default)]
    pub is_pin_enabled: Option<bool>,
    #[serde(default)]
    pub name_status: Option<String>,
    #[serde(default)]
    pub new_name_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search_visibility: Option<String>,
    #[serde(default)]
    pub messaging_limit_tier: Option<String>,
}

impl PhoneNumber {
    /// Whether the number is on the Cloud API (as opposed to On-Premises).
    pub fn is_cloud_api(&self) -> bool {
        self.platform_type.as_deref() == Some("CLOUD_API")
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Throughput {
    pub level: String,
}

/// An app subscribed to a WABA's or Page's webhooks.
///
/// The WABA and Page endpoints shape this differently on the wire; both are
/// normalized into this type.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct SubscribedApp {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Link to the app on Meta's platform (WABA listings only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Page listings only.
    #[serde(default)]
    pub subscribed_fields: Vec<String>,
}

impl SubscribedApp {
    pub fn is_app(&self, app_id: &str) -> bool {
        self.id.as_deref() == Some(app_id)
    }
}
