use serde::Deserialize;

use crate::{error::GraphError, page::IgAccount, waba::SubscribedApp};

/// A helper struct for unwrapping responses nested within a `{"data": ...}` object.
#[derive(Deserialize, Debug)]
pub(crate) struct DataWrapper<T> {
    data: T,
}

impl<T> DataWrapper<T> {
    #[inline]
    pub(crate) fn into_inner(self) -> T {
        self.data
    }
}

/// The `{"success": bool}` acknowledgement of a write.
#[derive(Deserialize, Debug)]
pub(crate) struct SuccessStatus {
    #[serde(default)]
    pub(crate) success: bool,
}

impl SuccessStatus {
    /// Turns a `false` acknowledgement into an error even though the transport succeeded.
    pub(crate) fn acknowledge(self, operation: &str) -> Result<(), GraphError> {
        if self.success {
            Ok(())
        } else {
            Err(GraphError::not_acknowledged(format!(
                "{operation} returned success: false"
            )))
        }
    }
}

/// `whatsapp_business_api_data`, the extra level WABA subscribed_apps puts app info under.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct WhatsAppBusinessApiData {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) link: Option<String>,
}

/// One raw item of a WABA `subscribed_apps` listing.
#[derive(Deserialize, Debug)]
pub(crate) struct RawWabaSubscribedApp {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) whatsapp_business_api_data: Option<WhatsAppBusinessApiData>,
}

impl From<RawWabaSubscribedApp> for SubscribedApp {
    fn from(raw: RawWabaSubscribedApp) -> Self {
        let nested = raw.whatsapp_business_api_data.unwrap_or_default();
        SubscribedApp {
            id: nested.id.or(raw.id),
            name: nested.name.or(raw.name),
            link: nested.link,
            subscribed_fields: Vec::new(),
        }
    }
}

/// Response of `/{page_id}?fields=instagram_business_account{...}`.
#[derive(Deserialize, Debug)]
pub(crate) struct PageIgResponse {
    #[serde(default)]
    pub(crate) instagram_business_account: Option<IgAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_waba_app_wins() {
        let raw: RawWabaSubscribedApp = serde_json::from_str(
            r#"{
                "id": "outer",
                "whatsapp_business_api_data": {"id": "inner", "name": "Inner App", "link": "https://l"}
            }"#,
        )
        .unwrap();

        let app = SubscribedApp::from(raw);

        assert_eq!(app.id.as_deref(), Some("inner"));
        assert_eq!(app.name.as_deref(), Some("Inner App"));
    }

    #[test]
    fn top_level_waba_app_fallback() {
        let raw: RawWabaSubscribedApp =
            serde_json::from_str(r#"{"id": "outer", "name": "Outer"}"#).unwrap();

        let app = SubscribedApp::from(raw);

        assert_eq!(app.id.as_deref(), Some("outer"));
        assert_eq!(app.name.as_deref(), Some("Outer"));
    }

    #[test]
    fn false_success_is_an_error() {
        let status = SuccessStatus { success: false };
        let err = status.acknowledge("WABA subscribe").unwrap_err();

        assert_eq!(err.code(), 0);
        assert_eq!(err.message(), "WABA subscribe returned success: false");
    }
}
