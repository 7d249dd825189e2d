// Copyright 2024 Lectern Media, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use lectern_protocol::{ControlMessage, TrackKind};
use parking_lot::Mutex;
use thiserror::Error;

use crate::id::ParticipantId;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("relay failure: {0}")]
    Relay(String),
    #[error("side channel failure: {0}")]
    Channel(String),
}

/// Transport for control commands: the room-command HTTP relay or the SDK
/// side channel.
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send(&self, msg: &ControlMessage) -> Result<(), CommandError>;
}

#[async_trait]
impl CommandSender for lectern_api::RoomCommandClient {
    async fn send(&self, msg: &ControlMessage) -> Result<(), CommandError> {
        self.send_command(msg).await.map_err(|err| CommandError::Relay(err.to_string()))
    }
}

/// Moderated-floor policy: at most one participant holds the broadcast
/// privilege at a time.
///
/// The policy is request-driven, not confirmation-driven: `holder` reflects
/// "last granted", not "verified active". There is no acknowledgment
/// protocol, so a revoked participant that never complies leaves a transient
/// double-floor window; that is inherited behavior, kept as-is.
pub struct FloorControl {
    sender: Arc<dyn CommandSender>,
    holder: Mutex<Option<ParticipantId>>,
}

impl Debug for FloorControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloorControl").field("holder", &self.holder.lock()).finish()
    }
}

impl FloorControl {
    pub fn new(sender: Arc<dyn CommandSender>) -> Self {
        Self { sender, holder: Mutex::new(None) }
    }

    pub fn holder(&self) -> Option<ParticipantId> {
        self.holder.lock().clone()
    }

    /// Grants the floor to `target`.
    ///
    /// If a different participant holds the floor, its revoke is issued and
    /// awaited before the grant goes out, so there is never a
    /// grant-then-revoke window. The revoke itself is best-effort.
    pub async fn grant(&self, target: &ParticipantId) -> Result<(), CommandError> {
        let previous = self.holder.lock().clone();
        if let Some(previous) = previous {
            if previous != *target {
                let revoke = stop_audio(&previous);
                if let Err(err) = self.sender.send(&revoke).await {
                    log::warn!("floor revoke for {} failed: {}", previous, err);
                }
            }
        }

        let grant = ControlMessage::RequestTrack {
            target: target.to_string(),
            kind: TrackKind::Audio,
        };
        self.sender.send(&grant).await?;
        *self.holder.lock() = Some(target.clone());
        Ok(())
    }

    /// Revokes the current holder, if any ("silence all").
    ///
    /// Fire and forget: the holder is cleared locally whether or not the
    /// remote participant is known to have received the message. Returns
    /// the participant that was silenced.
    pub async fn silence(&self) -> Option<ParticipantId> {
        let previous = self.holder.lock().take()?;
        if let Err(err) = self.sender.send(&stop_audio(&previous)).await {
            log::warn!("floor revoke for {} failed: {}", previous, err);
        }
        Some(previous)
    }

    /// Clears the holder without sending anything, e.g. when the holder
    /// left the room. Returns `true` when `id` was the holder.
    pub fn clear_if_holder(&self, id: &ParticipantId) -> bool {
        let mut holder = self.holder.lock();
        if holder.as_ref() == Some(id) {
            *holder = None;
            true
        } else {
            false
        }
    }
}

fn stop_audio(target: &ParticipantId) -> ControlMessage {
    ControlMessage::StopTrack { target: target.to_string(), kind: TrackKind::Audio }
}
