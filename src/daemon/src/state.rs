use crate::backend::CredentialsBackend;
use mesos2iam_identity::IdentityResolver;
use std::sync::Arc;

/// Shared by every request. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct ProxyState {
    resolver: Arc<IdentityResolver>,
    backend: Arc<CredentialsBackend>,
}

impl ProxyState {
    pub fn new(resolver: IdentityResolver, backend: CredentialsBackend) -> Self {
        Self {
            resolver: Arc::new(resolver),
            backend: Arc::new(backend),
        }
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn backend(&self) -> &CredentialsBackend {
        &self.backend
    }
}
