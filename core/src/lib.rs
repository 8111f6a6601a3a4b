pub mod api;
pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod identity;
pub mod models;
pub mod storage;
pub mod store;
pub mod supabase;
pub mod telemetry;
pub mod transport;

pub use api::ApiClient;
pub use auth::{AuthBridge, AuthOutcome, AuthPhase, AuthSnapshot, MountGuard};
pub use config::{ClientConfig, IdentityConfig};
pub use error::{ApiError, AuthError, ErrorKind};
pub use identity::{
    AuthEvent, AuthEventKind, AuthSession, IdentityProvider, MockIdentityProvider, Subscription,
    User,
};
pub use storage::{SessionStorage, TokenStore, TOKEN_STORAGE_KEY};
pub use store::SessionFile;
pub use supabase::SupabaseProvider;
pub use transport::{HttpRequest, HttpResponse, MockTransport, ReqwestTransport, Transport};
