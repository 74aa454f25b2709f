//! Outbound notification seam for the authorization-retry email cadence
//! (§4.4.2/§8 invariant 6). Kept abstract at this crate's boundary like
//! [`crate::psp::PspAdapter`]; the actual delivery channel (email/push) lives
//! outside this crate.

use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Notification hooks the authorization workers call through.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sent once, the first time a booking's authorization attempt fails.
    async fn send_authorization_failed(&self, booking_id: Uuid, student_id: Uuid) -> Result<()>;

    /// Sent once, in the 12-13h window before lesson start, while
    /// authorization is still unresolved.
    async fn send_final_warning(&self, booking_id: Uuid, student_id: Uuid) -> Result<()>;
}

/// A [`Notifier`] that drops every call. Used by callers that have not wired
/// a real delivery channel yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_authorization_failed(&self, _booking_id: Uuid, _student_id: Uuid) -> Result<()> {
        Ok(())
    }

    async fn send_final_warning(&self, _booking_id: Uuid, _student_id: Uuid) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_notifier_never_errors() {
        let notifier = NoopNotifier;
        notifier
            .send_authorization_failed(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        notifier
            .send_final_warning(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
    }
}
