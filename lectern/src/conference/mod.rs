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

use lectern_protocol::TrackKind;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::id::{ParticipantId, RoomName};
use crate::sdk::{ConferencingSdk, Role, SdkError};

pub mod breakout;
pub mod floor;
pub mod roster;

mod conference_session;
mod options;

pub use conference_session::*;
pub use options::*;

use floor::{CommandError, CommandSender};

pub type ConferenceEvents = mpsc::UnboundedReceiver<ConferenceEvent>;
pub type ConferenceResult<T> = Result<T, ConferenceError>;

#[derive(Error, Debug)]
pub enum ConferenceError {
    #[error("sdk failure: {0}")]
    Sdk(#[from] SdkError),
    #[error("command failure: {0}")]
    Command(#[from] CommandError),
    #[error("conference is closed")]
    Closed,
    #[error("conference failure: {0}")]
    Internal(String),
}

/// Events projected to the UI layer. Rendering is a pure projection of the
/// state these events describe.
#[derive(Debug, Clone)]
pub enum ConferenceEvent {
    ConnectionStateChanged(ConnectionState),
    ParticipantConnected {
        id: ParticipantId,
        display_name: Option<String>,
    },
    ParticipantUpdated {
        id: ParticipantId,
        display_name: Option<String>,
    },
    ParticipantDisconnected {
        id: ParticipantId,
    },
    TrackAttached {
        participant: ParticipantId,
        kind: TrackKind,
        sink: String,
    },
    TrackDetached {
        participant: ParticipantId,
        kind: TrackKind,
    },
    RoleChanged {
        id: ParticipantId,
        role: Role,
    },
    FloorChanged {
        holder: Option<ParticipantId>,
    },
    RoomSwitched {
        room: RoomName,
    },
    Failed {
        reason: String,
    },
}

/// Handle owning a conference session.
///
/// Dropping the handle without calling [`Conference::close`] stops the
/// event task but skips the orderly leave; call `close` on every exit path.
pub struct Conference {
    handle: SessionHandle,
}

impl Debug for Conference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conference").field("session", &self.handle.session()).finish()
    }
}

impl Conference {
    /// Connects, joins the home room, publishes the role's local tracks and
    /// starts the event task. Device acquisition failure is non-fatal: the
    /// session joins with whatever subset of tracks was obtainable.
    pub async fn connect(
        sdk: Arc<dyn ConferencingSdk>,
        commands: Arc<dyn CommandSender>,
        options: ConferenceOptions,
    ) -> ConferenceResult<(Self, ConferenceEvents)> {
        let (handle, events) = SessionHandle::connect(sdk, commands, options).await?;
        Ok((Self { handle }, events))
    }

    pub fn session(&self) -> ConferenceSession {
        self.handle.session()
    }

    /// Tears the session down: local tracks detached and disposed, room
    /// left, connection closed. Safe to race with an SDK-initiated
    /// disconnect; the second teardown is a no-op.
    pub async fn close(self) {
        self.handle.close().await;
    }
}
