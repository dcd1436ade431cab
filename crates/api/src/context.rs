use std::sync::Arc;

use warden_auth::Identity;

/// Request identity extension, inserted by the authentication middleware.
///
/// Every request gets one: either a verified principal or `Guest`. Handlers
/// behind login-gated rules can rely on the guard having rejected guests
/// already, but still fetch the principal through [`RequestIdentity`].
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub Arc<Identity>);

impl RequestIdentity {
    pub fn guest() -> Self {
        Self(Arc::new(Identity::Guest))
    }

    pub fn identity(&self) -> &Identity {
        &self.0
    }
}
