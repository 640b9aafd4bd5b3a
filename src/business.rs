use crate::{
    client::Client,
    error::Error,
    rest::{client::DataWrapper, execute_request},
    waba::WabaInfo,
};

/// Operations on a Business Manager account.
///
/// Obtain one with [`Client::business`].
#[derive(Debug)]
pub struct BusinessManager {
    client: Client,
    business_id: String,
}

impl BusinessManager {
    pub(crate) fn new(business_id: String, client: &Client) -> Self {
        Self {
            client: client.clone(),
            business_id,
        }
    }

    /// Lists the WABAs the business owns (`/{business_id}/owned_whatsapp_business_accounts`).
    ///
    /// Only the default fields are returned; use [`WabaManager::info`] for details.
    ///
    /// [`WabaManager::info`]: crate::waba::WabaManager::info
    pub async fn owned_wabas(&self, token: &str) -> Result<Vec<WabaInfo>, Error> {
        let request = self.client.get(
            self.client
                .a_node(&self.business_id)
                .join("owned_whatsapp_business_accounts"),
            token,
        );

        let response: DataWrapper<Vec<WabaInfo>> = execute_request(request).await?;
        Ok(response.into_inner())
    }
}
