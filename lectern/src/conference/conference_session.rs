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

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
};

use lectern_protocol::observer::Dispatcher;
use lectern_protocol::{ControlMessage, TrackKind};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::breakout;
use super::floor::{CommandSender, FloorControl};
use super::roster::{Participant, ParticipantUpdate, Roster};
use super::{ConferenceError, ConferenceEvent, ConferenceEvents, ConferenceOptions, ConferenceResult};
use crate::id::{ParticipantId, RoomName};
use crate::sdk::{
    ConferencingSdk, MediaSink, MediaTrack, ReceiveConstraints, Role, RoomHandle, SdkConnection,
    SdkEvent, SdkEvents,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    JoiningRoom,
    InRoom,
    Leaving,
    Failed,
}

/// Internal state of a conference session.
struct SessionInner {
    options: ConferenceOptions,
    state: Mutex<ConnectionState>,
    local_id: Mutex<ParticipantId>,
    current_room: Mutex<RoomName>,
    instructor_id: Mutex<Option<ParticipantId>>,
    roster: Mutex<Roster>,
    floor: FloorControl,
    local_tracks: Mutex<Vec<Arc<dyn MediaTrack>>>,
    local_previews: Mutex<HashMap<TrackKind, Arc<dyn MediaSink>>>,
    sdk: Arc<dyn ConferencingSdk>,
    connection: Arc<dyn SdkConnection>,
    room: Mutex<Option<Arc<dyn RoomHandle>>>,
    dispatcher: Dispatcher<ConferenceEvent>,
    closed: AtomicBool,
}

pub(crate) struct SessionHandle {
    session: ConferenceSession,
    session_task: JoinHandle<()>,
    close_emitter: oneshot::Sender<()>,
}

/// A connection to one room. Cheap to clone and share; all clones observe
/// the same session.
#[derive(Clone)]
pub struct ConferenceSession {
    inner: Arc<SessionInner>,
}

impl Debug for ConferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferenceSession")
            .field("room", &self.current_room())
            .field("state", &self.connection_state())
            .finish()
    }
}

impl SessionHandle {
    pub(crate) async fn connect(
        sdk: Arc<dyn ConferencingSdk>,
        commands: Arc<dyn CommandSender>,
        options: ConferenceOptions,
    ) -> ConferenceResult<(Self, ConferenceEvents)> {
        sdk.initialize(&options.init);

        let dispatcher = Dispatcher::default();
        let events = dispatcher.register();
        let emit_state = |state: ConnectionState| {
            dispatcher.dispatch(&ConferenceEvent::ConnectionStateChanged(state));
        };

        emit_state(ConnectionState::Connecting);
        let (connection, sdk_events) =
            match sdk.connect(&options.credential, &options.connection).await {
                Ok(connected) => connected,
                Err(err) => {
                    emit_state(ConnectionState::Failed);
                    return Err(err.into());
                }
            };
        emit_state(ConnectionState::Connected);

        // Device failure is non-fatal: join proceeds with whatever subset
        // of tracks was obtainable, possibly none.
        let local_tracks = match sdk.create_local_tracks(options.publish_kinds()).await {
            Ok(tracks) => tracks,
            Err(err) => {
                log::warn!("continuing without local media: {}", err);
                Vec::new()
            }
        };

        emit_state(ConnectionState::JoiningRoom);
        let room = match connection.join_room(&options.room, &options.room_options).await {
            Ok(room) => room,
            Err(err) => {
                emit_state(ConnectionState::Failed);
                connection.disconnect().await;
                return Err(err.into());
            }
        };
        let local_id = room.local_participant_id();

        for track in &local_tracks {
            if let Err(err) = room.publish(track.clone()).await {
                log::warn!("could not publish local {} track: {}", track.kind(), err);
            }
        }

        let instructor_id = match options.role {
            Role::Instructor => Some(local_id.clone()),
            Role::Student => None,
        };

        let inner = Arc::new(SessionInner {
            current_room: Mutex::new(options.room.clone()),
            options,
            state: Mutex::new(ConnectionState::JoiningRoom),
            local_id: Mutex::new(local_id),
            instructor_id: Mutex::new(instructor_id),
            roster: Mutex::new(Roster::new()),
            floor: FloorControl::new(commands),
            local_tracks: Mutex::new(local_tracks),
            local_previews: Mutex::new(HashMap::new()),
            sdk,
            connection,
            room: Mutex::new(Some(room.clone())),
            dispatcher,
            closed: AtomicBool::new(false),
        });

        inner.apply_receive_constraints(room.as_ref());
        inner.update_state(ConnectionState::InRoom);

        let (close_emitter, close_receiver) = oneshot::channel();
        let session_task = tokio::spawn(inner.clone().session_task(sdk_events, close_receiver));

        let handle = Self {
            session: ConferenceSession { inner },
            session_task,
            close_emitter,
        };
        Ok((handle, events))
    }

    pub(crate) async fn close(self) {
        self.session.inner.teardown(ConnectionState::Disconnected, true).await;
        let _ = self.close_emitter.send(());
        let _ = self.session_task.await;
    }

    pub(crate) fn session(&self) -> ConferenceSession {
        self.session.clone()
    }
}

impl ConferenceSession {
    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    pub fn local_participant_id(&self) -> ParticipantId {
        self.inner.local_id.lock().clone()
    }

    pub fn home_room(&self) -> RoomName {
        self.inner.options.room.clone()
    }

    pub fn current_room(&self) -> RoomName {
        self.inner.current_room.lock().clone()
    }

    pub fn is_in_breakout(&self) -> bool {
        self.current_room() != self.home_room()
    }

    pub fn role(&self) -> Role {
        self.inner.options.role
    }

    pub fn instructor_id(&self) -> Option<ParticipantId> {
        self.inner.instructor_id.lock().clone()
    }

    /// Snapshot of the remote roster.
    pub fn participants(&self) -> Vec<Participant> {
        self.inner.roster.lock().participants().cloned().collect()
    }

    pub fn floor_holder(&self) -> Option<ParticipantId> {
        self.inner.floor.holder()
    }

    /// Registers another observer for session events.
    pub fn subscribe(&self) -> ConferenceEvents {
        self.inner.dispatcher.register()
    }

    /// Announces that a sink for (participant, kind) is mounted and ready.
    ///
    /// Sinks mount strictly after the state update that created them, so
    /// this may run before or after the matching track arrives; attachment
    /// fires from whichever side completes the pair.
    pub fn attachment_target_ready(
        &self,
        participant: &ParticipantId,
        kind: TrackKind,
        sink: Arc<dyn MediaSink>,
    ) {
        let attached = self.inner.roster.lock().record_attachment_target(participant, kind, sink);
        if let Some(sink) = attached {
            self.inner.emit(ConferenceEvent::TrackAttached {
                participant: participant.clone(),
                kind,
                sink: sink.id().to_owned(),
            });
        }
    }

    /// Attaches the local track of `kind` to a preview sink. The sink is
    /// remembered so teardown can detach before releasing the device.
    pub fn set_local_preview(&self, kind: TrackKind, sink: Arc<dyn MediaSink>) {
        let track = {
            let tracks = self.inner.local_tracks.lock();
            tracks.iter().find(|track| track.kind() == kind).cloned()
        };
        if let Some(track) = track {
            if let Err(err) = track.attach(sink.as_ref()) {
                log::debug!("preview attach ignored: {}", err);
            }
        }
        self.inner.local_previews.lock().insert(kind, sink);
    }

    pub fn set_muted(&self, kind: TrackKind, muted: bool) {
        let tracks = self.inner.local_tracks.lock();
        for track in tracks.iter().filter(|track| track.kind() == kind) {
            if muted {
                track.mute();
            } else {
                track.unmute();
            }
        }
    }

    /// Grants the floor to `target`, revoking the current holder first.
    pub async fn grant_floor(&self, target: &ParticipantId) -> ConferenceResult<()> {
        self.inner.floor.grant(target).await?;
        self.inner.emit(ConferenceEvent::FloorChanged { holder: Some(target.clone()) });
        Ok(())
    }

    /// Revokes the current holder, if any. Fire and forget.
    pub async fn silence(&self) {
        if self.inner.floor.silence().await.is_some() {
            self.inner.emit(ConferenceEvent::FloorChanged { holder: None });
        }
    }

    /// Leaves the current room and joins `target`: local tracks are
    /// re-published, the remote roster starts over from empty.
    pub async fn switch_room(&self, target: RoomName) -> ConferenceResult<()> {
        self.inner.switch_room(target).await
    }

    /// Moves `target` and ourselves into a private breakout room.
    pub async fn start_one_on_one(&self, target: &ParticipantId) -> ConferenceResult<()> {
        self.inner.start_one_on_one(target).await
    }

    /// Sends everyone in the current breakout back to the home room, then
    /// returns ourselves.
    pub async fn end_one_on_one(&self) -> ConferenceResult<()> {
        self.inner.end_one_on_one().await
    }
}

impl SessionInner {
    async fn session_task(
        self: Arc<Self>,
        mut sdk_events: SdkEvents,
        mut close_receiver: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = sdk_events.recv() => {
                    match event {
                        Some(event) => self.on_sdk_event(event).await,
                        None => {
                            // the SDK dropped its emitter, nothing more can arrive
                            self.teardown(ConnectionState::Disconnected, false).await;
                            break;
                        }
                    }
                }
                _ = &mut close_receiver => break,
            }
        }
    }

    async fn on_sdk_event(self: &Arc<Self>, event: SdkEvent) {
        match event {
            SdkEvent::ParticipantJoined { id, display_name } => {
                let created = self.roster.lock().upsert(
                    &id,
                    ParticipantUpdate { display_name: display_name.clone(), role: None },
                );
                if created {
                    self.emit(ConferenceEvent::ParticipantConnected { id, display_name });
                } else if display_name.is_some() {
                    self.emit(ConferenceEvent::ParticipantUpdated { id, display_name });
                }
            }
            SdkEvent::ParticipantLeft { id } => self.handle_participant_left(&id),
            SdkEvent::TrackAdded { participant, kind, track } => {
                let (created, attached) = {
                    let mut roster = self.roster.lock();
                    let created = !roster.contains(&participant);
                    let attached = roster.record_track(&participant, kind, track);
                    (created, attached)
                };
                if created {
                    self.emit(ConferenceEvent::ParticipantConnected {
                        id: participant.clone(),
                        display_name: None,
                    });
                }
                if let Some(sink) = attached {
                    self.emit(ConferenceEvent::TrackAttached {
                        participant,
                        kind,
                        sink: sink.id().to_owned(),
                    });
                }
            }
            SdkEvent::TrackRemoved { participant, kind } => {
                let released = self.roster.lock().release_track(&participant, kind);
                if released.is_some() {
                    self.emit(ConferenceEvent::TrackDetached { participant, kind });
                }
            }
            SdkEvent::RoleChanged { id, role } => self.handle_role_changed(id, role),
            SdkEvent::ControlMessageReceived { sender, payload } => {
                self.handle_control_message(sender, payload).await;
            }
            SdkEvent::ConnectionFailed { reason } => {
                self.emit(ConferenceEvent::Failed { reason });
                self.teardown(ConnectionState::Failed, false).await;
            }
            SdkEvent::Disconnected => {
                self.teardown(ConnectionState::Disconnected, false).await;
            }
        }
    }

    fn handle_participant_left(&self, id: &ParticipantId) {
        let released = self.roster.lock().remove(id);
        for track in released {
            self.emit(ConferenceEvent::TrackDetached {
                participant: id.clone(),
                kind: track.kind(),
            });
        }
        if self.floor.clear_if_holder(id) {
            self.emit(ConferenceEvent::FloorChanged { holder: None });
        }
        self.emit(ConferenceEvent::ParticipantDisconnected { id: id.clone() });
    }

    fn handle_role_changed(&self, id: ParticipantId, role: Role) {
        self.roster.lock().upsert(
            &id,
            ParticipantUpdate { display_name: None, role: Some(role) },
        );
        if role == Role::Instructor {
            *self.instructor_id.lock() = Some(id.clone());
            if self.options.role == Role::Student {
                let room = self.room.lock().clone();
                if let Some(room) = room {
                    self.apply_receive_constraints(room.as_ref());
                }
            }
        }
        self.emit(ConferenceEvent::RoleChanged { id, role });
    }

    async fn handle_control_message(self: &Arc<Self>, sender: ParticipantId, payload: serde_json::Value) {
        let msg: ControlMessage = match serde_json::from_value(payload) {
            Ok(msg) => msg,
            Err(err) => {
                log::debug!("ignoring unrecognized control payload from {}: {}", sender, err);
                return;
            }
        };

        let local_id = self.local_id.lock().clone();
        if msg.target() != local_id.as_str() {
            return;
        }

        match msg {
            ControlMessage::RequestTrack { kind, .. } => self.start_local_track(kind).await,
            ControlMessage::StopTrack { kind, .. } => self.stop_local_track(kind).await,
            ControlMessage::MoveToBreakout { room, .. } => {
                if let Err(err) = self.switch_room(RoomName::from(room)).await {
                    log::error!("breakout switch failed: {}", err);
                }
            }
            ControlMessage::ReturnToMain { room, .. } => {
                if room != self.options.room {
                    return;
                }
                if let Err(err) = self.switch_room(self.options.room.clone()).await {
                    log::error!("return to main failed: {}", err);
                }
            }
        }
    }

    /// Creates and publishes a local track of `kind` unless one is already
    /// held. Device failure is logged and swallowed.
    async fn start_local_track(&self, kind: TrackKind) {
        let already_held = self.local_tracks.lock().iter().any(|track| track.kind() == kind);
        if already_held {
            return;
        }

        let created = match self.sdk.create_local_tracks(&[kind]).await {
            Ok(tracks) => tracks,
            Err(err) => {
                log::warn!("could not start local {} track: {}", kind, err);
                return;
            }
        };

        let room = self.room.lock().clone();
        for track in created {
            if let Some(room) = &room {
                if let Err(err) = room.publish(track.clone()).await {
                    log::warn!("could not publish local {} track: {}", track.kind(), err);
                }
            }
            let preview = self.local_previews.lock().get(&track.kind()).cloned();
            if let Some(sink) = preview {
                if let Err(err) = track.attach(sink.as_ref()) {
                    log::debug!("preview attach ignored: {}", err);
                }
            }
            self.local_tracks.lock().push(track);
        }
    }

    /// Unpublishes and disposes the local track of `kind`, if held.
    async fn stop_local_track(&self, kind: TrackKind) {
        let track = {
            let mut tracks = self.local_tracks.lock();
            let position = tracks.iter().position(|track| track.kind() == kind);
            position.map(|index| tracks.remove(index))
        };
        let Some(track) = track else {
            return;
        };

        let room = self.room.lock().clone();
        if let Some(room) = room {
            if let Err(err) = room.unpublish(track.clone()).await {
                log::warn!("could not unpublish local {} track: {}", kind, err);
            }
        }
        let preview = self.local_previews.lock().get(&kind).cloned();
        if let Some(sink) = preview {
            if let Err(err) = track.detach(sink.as_ref()) {
                log::debug!("preview detach ignored: {}", err);
            }
        }
        track.dispose();
    }

    async fn switch_room(self: &Arc<Self>, target: RoomName) -> ConferenceResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConferenceError::Closed);
        }

        // leave the current room and wait for it to complete
        let previous = self.room.lock().take();
        if let Some(previous) = previous {
            previous.leave().await;
        }

        // hard context reset: the target room's roster is unrelated
        let removed = {
            let mut roster = self.roster.lock();
            let ids = roster.ids();
            roster.drain();
            ids
        };
        for id in removed {
            self.emit(ConferenceEvent::ParticipantDisconnected { id });
        }

        self.update_state(ConnectionState::JoiningRoom);
        let room = match self.connection.join_room(&target, &self.options.room_options).await {
            Ok(room) => room,
            Err(err) => {
                self.update_state(ConnectionState::Failed);
                self.emit(ConferenceEvent::Failed { reason: err.to_string() });
                return Err(err.into());
            }
        };

        // local track ownership persists across the switch
        let tracks = self.local_tracks.lock().clone();
        for track in tracks {
            if let Err(err) = room.publish(track).await {
                log::warn!("could not re-publish local track: {}", err);
            }
        }
        self.apply_receive_constraints(room.as_ref());

        *self.local_id.lock() = room.local_participant_id();
        *self.room.lock() = Some(room);
        *self.current_room.lock() = target.clone();
        self.update_state(ConnectionState::InRoom);
        self.emit(ConferenceEvent::RoomSwitched { room: target });
        Ok(())
    }

    async fn start_one_on_one(self: &Arc<Self>, target: &ParticipantId) -> ConferenceResult<()> {
        if *self.current_room.lock() != self.options.room {
            return Err(ConferenceError::Internal("already in a breakout room".to_owned()));
        }

        let breakout_room = breakout::one_on_one_room(&self.options.room, target);
        let room = self.room.lock().clone().ok_or(ConferenceError::Closed)?;
        room.send_control_message(&breakout::move_to_breakout(target, &breakout_room), Some(target))
            .await?;
        self.switch_room(breakout_room).await
    }

    async fn end_one_on_one(self: &Arc<Self>) -> ConferenceResult<()> {
        let home = self.options.room.clone();
        let others = self.roster.lock().ids();
        let room = self.room.lock().clone().ok_or(ConferenceError::Closed)?;
        for id in others {
            let msg = breakout::return_to_main(&id, &home);
            if let Err(err) = room.send_control_message(&msg, Some(&id)).await {
                log::warn!("could not send {} back to {}: {}", id, home, err);
            }
        }
        self.switch_room(home).await
    }

    /// Releases everything this session owns, in sink-then-device order.
    /// Idempotent: the second invocation is a no-op. `orderly` announces the
    /// `Leaving` state, which a remote disconnect or failure skips.
    async fn teardown(&self, final_state: ConnectionState, orderly: bool) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if orderly {
            self.update_state(ConnectionState::Leaving);
        }

        // local tracks: detach from every known sink before releasing the
        // underlying device
        let tracks: Vec<_> = std::mem::take(&mut *self.local_tracks.lock());
        let previews = std::mem::take(&mut *self.local_previews.lock());
        for track in tracks {
            if let Some(sink) = previews.get(&track.kind()) {
                if let Err(err) = track.detach(sink.as_ref()) {
                    log::debug!("detach ignored: {}", err);
                }
            }
            track.dispose();
        }

        let _ = self.roster.lock().drain();

        let room = self.room.lock().take();
        if let Some(room) = room {
            room.leave().await;
        }
        self.connection.disconnect().await;

        self.update_state(final_state);
    }

    fn apply_receive_constraints(&self, room: &dyn RoomHandle) {
        let constraints = match self.options.role {
            Role::Instructor => ReceiveConstraints::unconstrained(),
            Role::Student => {
                let instructor = self.instructor_id.lock().clone();
                ReceiveConstraints::stage_only(instructor.as_ref())
            }
        };
        room.set_receive_constraints(constraints);
    }

    fn update_state(&self, state: ConnectionState) -> bool {
        {
            let mut current = self.state.lock();
            if *current == state {
                return false;
            }
            *current = state;
        }
        self.dispatcher.dispatch(&ConferenceEvent::ConnectionStateChanged(state));
        true
    }

    fn emit(&self, event: ConferenceEvent) {
        self.dispatcher.dispatch(&event);
    }
}
