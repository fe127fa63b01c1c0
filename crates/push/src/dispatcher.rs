//! Fan-out of push notifications to offline chat participants.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use dispatch_database::SubscriptionRepository;

use crate::provider::{PushOutcome, PushPayload, PushProvider};

/// Delivers a payload to each recipient with a stored subscription.
///
/// Delivery is best-effort: recipients without a subscription are skipped,
/// endpoints the provider reports gone are pruned, and every other failure
/// is logged and swallowed. Nothing here ever propagates to the
/// message-send path.
pub struct PushDispatcher<P: PushProvider> {
    provider: P,
    subscriptions: SubscriptionRepository,
    enabled: bool,
}

impl<P: PushProvider> PushDispatcher<P> {
    pub fn new(pool: SqlitePool, provider: P, enabled: bool) -> Self {
        Self {
            provider,
            subscriptions: SubscriptionRepository::new(pool),
            enabled,
        }
    }

    /// Attempt delivery to every recipient in turn.
    pub async fn dispatch(&self, recipients: &[i64], payload: &PushPayload) {
        if !self.enabled || recipients.is_empty() {
            return;
        }

        for &user_id in recipients {
            let subscription = match self.subscriptions.find_by_user(user_id).await {
                Ok(Some(subscription)) => subscription,
                Ok(None) => continue,
                Err(error) => {
                    warn!(user_id = user_id, error = %error, "failed to load push subscription");
                    continue;
                }
            };

            match self.provider.send(&subscription, payload).await {
                PushOutcome::Delivered => {
                    debug!(user_id = user_id, "push notification delivered");
                }
                PushOutcome::Gone => {
                    info!(user_id = user_id, "push endpoint gone, pruning subscription");
                    if let Err(error) = self.subscriptions.delete_for_user(user_id).await {
                        warn!(user_id = user_id, error = %error, "failed to prune push subscription");
                    }
                }
                PushOutcome::Failed(reason) => {
                    warn!(user_id = user_id, reason = %reason, "push delivery failed");
                }
            }
        }
    }
}
