//! Request-level permission oracle.
#[cfg(test)]
use mockall::automock;

use crate::ClientRequest;

#[cfg_attr(test, automock)]
pub trait AccessController: Send + Sync + 'static {
    fn allowed(
        &self,
        request: &ClientRequest,
    ) -> bool;
}

/// Permissive controller for deployments without ACLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAccessController;

impl AccessController for AllowAllAccessController {
    fn allowed(
        &self,
        _request: &ClientRequest,
    ) -> bool {
        true
    }
}
