use async_trait::async_trait;
use tracing::{debug, warn};

use super::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Prompts the user for a named runtime permission.
#[async_trait]
pub trait PermissionRequester: Send + Sync {
    async fn request(&self, permission: &str) -> Result<PermissionStatus, PlatformError>;
}

/// Request `permission` and run `on_grant` only if it is granted.
///
/// Returns whether the callback ran.
pub async fn request_then<F>(requester: &dyn PermissionRequester, permission: &str, on_grant: F) -> bool
where
    F: FnOnce() + Send,
{
    match requester.request(permission).await {
        Ok(PermissionStatus::Granted) => {
            on_grant();
            true
        }
        Ok(PermissionStatus::Denied) => {
            debug!(permission, "permission denied");
            false
        }
        Err(e) => {
            warn!(permission, error = %e, "permission request failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Answer(Result<PermissionStatus, PlatformError>);

    #[async_trait]
    impl PermissionRequester for Answer {
        async fn request(&self, _permission: &str) -> Result<PermissionStatus, PlatformError> {
            self.0.clone()
        }
    }

    const POST: &str = "android.permission.POST_NOTIFICATIONS";

    #[tokio::test]
    async fn callback_runs_only_on_grant() {
        let mut ran = 0;
        assert!(request_then(&Answer(Ok(PermissionStatus::Granted)), POST, || ran += 1).await);
        assert!(!request_then(&Answer(Ok(PermissionStatus::Denied)), POST, || ran += 1).await);
        assert!(
            !request_then(
                &Answer(Err(PlatformError::Failed("no activity".into()))),
                POST,
                || ran += 1
            )
            .await
        );
        assert_eq!(ran, 1);
    }
}
