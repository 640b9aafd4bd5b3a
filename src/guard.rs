//! Navigation guard for credential-gated views.

use crate::store::CredentialStore;

/// The views of the tool.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Route {
    /// Credential entry. Always reachable.
    Credentials,
    /// The diagnosis dashboard. Needs a ready credential set.
    Dashboard,
}

impl Route {
    pub fn requires_credentials(self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

/// Resolves where navigation to `target` actually lands.
///
/// Gated routes redirect to [`Route::Credentials`] unless the store is ready.
pub fn guard(target: Route, store: &CredentialStore) -> Route {
    if target.requires_credentials() && !store.is_ready() {
        Route::Credentials
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{storage::MemoryStorage, store::Tiers};

    #[test]
    fn dashboard_needs_ready_store() {
        let tiers = Tiers::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()));
        let mut store = CredentialStore::open(tiers);

        assert_eq!(guard(Route::Dashboard, &store), Route::Credentials);
        assert_eq!(guard(Route::Credentials, &store), Route::Credentials);

        store.set_app_id("1");
        store.set_app_secret("2");
        assert_eq!(guard(Route::Dashboard, &store), Route::Credentials);

        store.set_token("3");
        assert_eq!(guard(Route::Dashboard, &store), Route::Dashboard);
    }
}
