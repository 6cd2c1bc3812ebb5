use super::{AppState, StreamHandle};
use crate::error::RelayError;
use crate::types::*;

/// Summary of one routing pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub membership: Membership,
    /// Whether the origin stream was recorded for the sender during this pass
    pub attached: bool,
    pub delivered: usize,
    /// Members with no recorded stream
    pub skipped: usize,
    /// Members whose stream rejected the push
    pub failed: usize,
}

impl AppState {
    /// Route one inbound message from `origin` to every other member of its room.
    ///
    /// Membership update, stream attach and recipient lookup happen in one
    /// critical section. Pushing happens after the lock is released, in
    /// member-list order. Delivery is at-most-once: a failed push is logged
    /// and the loop moves on.
    pub async fn route(&self, msg: ChatMessage, origin: &StreamHandle) -> RouteOutcome {
        let sender_id = msg.user.user_id.clone();
        let room_id = msg.chat_room.channel_id.clone();

        let (membership, attached, recipients) = {
            let mut guard = self.relay.lock().await;

            let membership = guard.ensure_member(&room_id, &msg.user);
            match membership {
                Membership::NoRoom => {
                    tracing::warn!("Message for unknown chat room {}", room_id)
                }
                Membership::Joined => {
                    tracing::info!("User {} joined chat room {}", sender_id, room_id)
                }
                Membership::Member => {}
            }

            let attached = guard.attach_if_absent(&sender_id, origin);
            if attached {
                tracing::info!(
                    "Stream attached for user {} (connection {})",
                    sender_id,
                    origin.connection_id()
                );
            }

            let relay = &*guard;
            let recipients: Vec<(UserId, Option<StreamHandle>)> = relay
                .rooms
                .get(&room_id)
                .map(|room| {
                    room.users
                        .iter()
                        .filter(|u| u.user_id != sender_id)
                        .map(|u| (u.user_id.clone(), relay.streams.get(&u.user_id).cloned()))
                        .collect()
                })
                .unwrap_or_default();

            (membership, attached, recipients)
        };

        let mut outcome = RouteOutcome {
            membership,
            attached,
            delivered: 0,
            skipped: 0,
            failed: 0,
        };

        for (user_id, handle) in recipients {
            let Some(handle) = handle else {
                tracing::debug!("{}, skipping", RelayError::RecipientUnavailable(user_id));
                outcome.skipped += 1;
                continue;
            };

            match handle.push(msg.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to forward message to {}: {}", user_id, e);
                    outcome.failed += 1;
                }
            }
        }

        tracing::debug!(
            "Routed message from {} in {}: delivered={} skipped={} failed={}",
            sender_id,
            room_id,
            outcome.delivered,
            outcome.skipped,
            outcome.failed
        );

        outcome
    }
}
