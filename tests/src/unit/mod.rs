mod auth_flow_tests;
mod query_flow_tests;

use datavibe_core::{
    ApiClient, AuthBridge, ClientConfig, IdentityProvider, MockIdentityProvider, MockTransport,
    SessionStorage,
};
use std::sync::Arc;

pub(crate) fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

/// Client and bridge sharing one token slot, as the front end wires them.
pub(crate) struct Harness {
    pub transport: MockTransport,
    pub provider: Arc<MockIdentityProvider>,
    pub storage: SessionStorage,
    pub api: ApiClient,
    pub auth: AuthBridge,
}

impl Harness {
    pub fn new(provider: MockIdentityProvider) -> Self {
        let transport = MockTransport::new();
        let provider = Arc::new(provider);
        let storage = SessionStorage::new();
        let api = ApiClient::new(
            ClientConfig::new("https://api.test"),
            Arc::new(transport.clone()),
            Arc::new(storage.clone()),
        );
        let auth = AuthBridge::new(
            Some(provider.clone() as Arc<dyn IdentityProvider>),
            Arc::new(storage.clone()),
        );
        Self {
            transport,
            provider,
            storage,
            api,
            auth,
        }
    }
}
