use crate::config::AppSettings;
use anyhow::Result;
use datavibe_core::{
    ApiClient, AuthBridge, MountGuard, ReqwestTransport, SessionFile, SessionStorage, TokenStore,
    Transport,
};
use std::sync::Arc;
use tracing::debug;

/// Backend client and auth bridge sharing one token slot, with the bridge
/// mounted for as long as the context lives.
pub struct AppContext {
    pub api: ApiClient,
    pub auth: AuthBridge,
    _mount: MountGuard,
}

impl AppContext {
    pub async fn mount(api: ApiClient, auth: AuthBridge) -> Self {
        let mount = auth.mount().await;
        Self {
            api,
            auth,
            _mount: mount,
        }
    }

    /// Wire the network transport, restoring any session a previous run saved
    /// to `session_file`.
    pub async fn from_settings(settings: &AppSettings, session_file: SessionFile) -> Result<Self> {
        let client_config = settings.client_config();
        debug!(base_url = %client_config.base_url, "using backend");
        let storage: Arc<dyn TokenStore> = Arc::new(SessionStorage::new());
        let identity_transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(client_config.timeout)?);
        let api = ApiClient::from_config(client_config, storage.clone())?;
        let auth = AuthBridge::from_config(
            settings.identity_config(),
            identity_transport,
            storage,
            Some(session_file),
        );
        Ok(Self::mount(api, auth).await)
    }
}
