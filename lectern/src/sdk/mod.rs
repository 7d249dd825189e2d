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

//! Boundary to the external conferencing SDK.
//!
//! The SDK owns signaling, SFU negotiation, codecs and ICE; this crate only
//! drives it. Integrations implement the traits below over the real SDK and
//! forward its callbacks as [`SdkEvent`]s; tests substitute fakes.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use lectern_protocol::{ControlMessage, TrackKind};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::id::{ParticipantId, RoomName};

mod options;

pub use options::*;

pub type SdkEvents = mpsc::UnboundedReceiver<SdkEvent>;
pub type SdkEventEmitter = mpsc::UnboundedSender<SdkEvent>;

/// Classroom role of a session member.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
    Instructor,
    Student,
}

/// Media acquisition failure. Never fatal: the session joins with whatever
/// subset of tracks was obtainable.
#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    #[error("permission denied for {0}")]
    PermissionDenied(TrackKind),
    #[error("no capture device for {0}")]
    NotFound(TrackKind),
    #[error("device failure: {0}")]
    Failure(String),
}

/// Attach/detach failure on a media sink. Always best-effort: callers log
/// and move on.
#[derive(Error, Debug, Clone)]
pub enum AttachmentError {
    #[error("sink {0} is not available")]
    SinkUnavailable(String),
    #[error("track is already detached")]
    AlreadyDetached,
}

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("connection failure: {0}")]
    Connection(String),
    #[error("could not join room: {0}")]
    Join(String),
    #[error("publish failure: {0}")]
    Publish(String),
    #[error("control channel failure: {0}")]
    Control(String),
}

/// Opaque attachment point for a media track, e.g. a DOM media element in a
/// browser embedding. Sinks mount asynchronously, strictly after the state
/// update that created them.
pub trait MediaSink: Send + Sync + Debug {
    /// Stable identifier of the attachment point.
    fn id(&self) -> &str;
}

/// Handle to a local or remote media track owned by the SDK.
pub trait MediaTrack: Send + Sync + Debug {
    fn kind(&self) -> TrackKind;

    /// Owner of the track; `None` for a local track that has not been
    /// published yet.
    fn participant_id(&self) -> Option<ParticipantId>;

    fn attach(&self, sink: &dyn MediaSink) -> Result<(), AttachmentError>;
    fn detach(&self, sink: &dyn MediaSink) -> Result<(), AttachmentError>;

    fn mute(&self);
    fn unmute(&self);

    /// Releases the underlying device or decoder. Detach from all known
    /// sinks first.
    fn dispose(&self);
}

/// Events forwarded from the SDK's callbacks.
///
/// Ordering between events is NOT guaranteed: a `TrackAdded` may arrive
/// before the `ParticipantJoined` for the same id. The session reconciler is
/// built around that.
#[derive(Debug, Clone)]
pub enum SdkEvent {
    ParticipantJoined {
        id: ParticipantId,
        display_name: Option<String>,
    },
    ParticipantLeft {
        id: ParticipantId,
    },
    TrackAdded {
        participant: ParticipantId,
        kind: TrackKind,
        track: Arc<dyn MediaTrack>,
    },
    TrackRemoved {
        participant: ParticipantId,
        kind: TrackKind,
    },
    RoleChanged {
        id: ParticipantId,
        role: Role,
    },
    ControlMessageReceived {
        sender: ParticipantId,
        payload: serde_json::Value,
    },
    ConnectionFailed {
        reason: String,
    },
    Disconnected,
}

#[async_trait]
pub trait ConferencingSdk: Send + Sync {
    /// One-time process-wide setup.
    fn initialize(&self, options: &SdkInitOptions);

    /// Acquires local capture devices for the requested kinds.
    async fn create_local_tracks(
        &self,
        kinds: &[TrackKind],
    ) -> Result<Vec<Arc<dyn MediaTrack>>, DeviceError>;

    /// Establishes the signaling connection. The returned event stream
    /// carries every subsequent connection-level and room-level event.
    async fn connect(
        &self,
        credential: &Credential,
        options: &ConnectionOptions,
    ) -> Result<(Arc<dyn SdkConnection>, SdkEvents), SdkError>;
}

#[async_trait]
pub trait SdkConnection: Send + Sync {
    async fn join_room(
        &self,
        room: &RoomName,
        options: &RoomOptions,
    ) -> Result<Arc<dyn RoomHandle>, SdkError>;

    async fn disconnect(&self);
}

#[async_trait]
pub trait RoomHandle: Send + Sync {
    fn local_participant_id(&self) -> ParticipantId;

    async fn publish(&self, track: Arc<dyn MediaTrack>) -> Result<(), SdkError>;
    async fn unpublish(&self, track: Arc<dyn MediaTrack>) -> Result<(), SdkError>;

    /// Sends an application payload over the SDK's low-latency side channel,
    /// optionally targeted at a single participant.
    async fn send_control_message(
        &self,
        payload: &ControlMessage,
        target: Option<&ParticipantId>,
    ) -> Result<(), SdkError>;

    fn set_receive_constraints(&self, constraints: ReceiveConstraints);

    async fn leave(&self);
}
