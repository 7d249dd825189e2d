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

#![allow(dead_code)]

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use lectern::prelude::*;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Shared log of SDK-visible operations, in call order.
#[derive(Debug, Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<String>>>);

impl OpLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count_of(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn position_of(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }
}

#[derive(Debug)]
pub struct FakeSink {
    id: String,
}

impl FakeSink {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self { id: id.to_owned() })
    }
}

impl MediaSink for FakeSink {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug)]
pub struct FakeTrack {
    label: String,
    kind: TrackKind,
    owner: Option<ParticipantId>,
    log: OpLog,
    disposals: AtomicUsize,
}

impl FakeTrack {
    pub fn local(kind: TrackKind, log: &OpLog) -> Arc<Self> {
        Arc::new(Self {
            label: format!("local-{}", kind),
            kind,
            owner: None,
            log: log.clone(),
            disposals: AtomicUsize::new(0),
        })
    }

    pub fn remote(owner: &ParticipantId, kind: TrackKind, label: &str, log: &OpLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_owned(),
            kind,
            owner: Some(owner.clone()),
            log: log.clone(),
            disposals: AtomicUsize::new(0),
        })
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn participant_id(&self) -> Option<ParticipantId> {
        self.owner.clone()
    }

    fn attach(&self, sink: &dyn MediaSink) -> Result<(), AttachmentError> {
        self.log.push(format!("attach {} -> {}", self.label, sink.id()));
        Ok(())
    }

    fn detach(&self, sink: &dyn MediaSink) -> Result<(), AttachmentError> {
        self.log.push(format!("detach {} -> {}", self.label, sink.id()));
        Ok(())
    }

    fn mute(&self) {
        self.log.push(format!("mute {}", self.label));
    }

    fn unmute(&self) {
        self.log.push(format!("unmute {}", self.label));
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("dispose {}", self.label));
    }
}

pub struct FakeSdk {
    pub log: OpLog,
    pub fail_connect: AtomicBool,
    pub fail_join: Arc<AtomicBool>,
    pub device_error: Mutex<Option<DeviceError>>,
    pub events_tx: Mutex<Option<SdkEventEmitter>>,
    pub connection: Mutex<Option<Arc<FakeConnection>>>,
}

impl FakeSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: OpLog::default(),
            fail_connect: AtomicBool::new(false),
            fail_join: Arc::new(AtomicBool::new(false)),
            device_error: Mutex::new(None),
            events_tx: Mutex::new(None),
            connection: Mutex::new(None),
        })
    }

    /// Injects an event as if the SDK fired a callback.
    pub fn emit(&self, event: SdkEvent) {
        let tx = self.events_tx.lock();
        tx.as_ref().expect("not connected").send(event).expect("session task gone");
    }

    pub fn rooms(&self) -> Vec<Arc<FakeRoom>> {
        self.connection.lock().as_ref().expect("not connected").rooms.lock().clone()
    }
}

#[async_trait]
impl ConferencingSdk for FakeSdk {
    fn initialize(&self, _options: &SdkInitOptions) {
        self.log.push("initialize");
    }

    async fn create_local_tracks(
        &self,
        kinds: &[TrackKind],
    ) -> Result<Vec<Arc<dyn MediaTrack>>, DeviceError> {
        if let Some(err) = self.device_error.lock().clone() {
            return Err(err);
        }
        let spelled = kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(",");
        self.log.push(format!("create {}", spelled));
        Ok(kinds
            .iter()
            .map(|kind| -> Arc<dyn MediaTrack> { FakeTrack::local(*kind, &self.log) })
            .collect())
    }

    async fn connect(
        &self,
        _credential: &Credential,
        _options: &ConnectionOptions,
    ) -> Result<(Arc<dyn SdkConnection>, SdkEvents), SdkError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(SdkError::Connection("connection refused".to_owned()));
        }
        self.log.push("connect");

        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock() = Some(tx);

        let connection = Arc::new(FakeConnection {
            log: self.log.clone(),
            fail_join: self.fail_join.clone(),
            local_id: ParticipantId::from("local-1"),
            rooms: Mutex::new(Vec::new()),
        });
        *self.connection.lock() = Some(connection.clone());
        Ok((connection, rx))
    }
}

pub struct FakeConnection {
    log: OpLog,
    fail_join: Arc<AtomicBool>,
    local_id: ParticipantId,
    pub rooms: Mutex<Vec<Arc<FakeRoom>>>,
}

#[async_trait]
impl SdkConnection for FakeConnection {
    async fn join_room(
        &self,
        room: &RoomName,
        _options: &RoomOptions,
    ) -> Result<Arc<dyn RoomHandle>, SdkError> {
        if self.fail_join.load(Ordering::SeqCst) {
            return Err(SdkError::Join(format!("{} rejected us", room)));
        }
        self.log.push(format!("join {}", room));
        let handle = Arc::new(FakeRoom {
            name: room.clone(),
            local_id: self.local_id.clone(),
            log: self.log.clone(),
            sent: Mutex::new(Vec::new()),
        });
        self.rooms.lock().push(handle.clone());
        Ok(handle)
    }

    async fn disconnect(&self) {
        self.log.push("disconnect");
    }
}

pub struct FakeRoom {
    pub name: RoomName,
    local_id: ParticipantId,
    log: OpLog,
    pub sent: Mutex<Vec<(ControlMessage, Option<ParticipantId>)>>,
}

#[async_trait]
impl RoomHandle for FakeRoom {
    fn local_participant_id(&self) -> ParticipantId {
        self.local_id.clone()
    }

    async fn publish(&self, track: Arc<dyn MediaTrack>) -> Result<(), SdkError> {
        self.log.push(format!("publish {} in {}", track.kind(), self.name));
        Ok(())
    }

    async fn unpublish(&self, track: Arc<dyn MediaTrack>) -> Result<(), SdkError> {
        self.log.push(format!("unpublish {} in {}", track.kind(), self.name));
        Ok(())
    }

    async fn send_control_message(
        &self,
        payload: &ControlMessage,
        target: Option<&ParticipantId>,
    ) -> Result<(), SdkError> {
        self.log.push(format!("send {} in {}", payload.target(), self.name));
        self.sent.lock().push((payload.clone(), target.cloned()));
        Ok(())
    }

    fn set_receive_constraints(&self, constraints: ReceiveConstraints) {
        let stage = constraints
            .on_stage
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.log.push(format!(
            "constraints {} lastN={} stage={}",
            self.name, constraints.last_n, stage
        ));
    }

    async fn leave(&self) {
        self.log.push(format!("leave {}", self.name));
    }
}

/// Command sender that records instead of relaying.
#[derive(Default)]
pub struct RecordingCommands {
    pub sent: Mutex<Vec<ControlMessage>>,
}

#[async_trait]
impl CommandSender for RecordingCommands {
    async fn send(&self, msg: &ControlMessage) -> Result<(), CommandError> {
        self.sent.lock().push(msg.clone());
        Ok(())
    }
}

pub fn conference_options(room: &str, role: Role) -> ConferenceOptions {
    ConferenceOptions {
        room: RoomName::from(room),
        role,
        display_name: Some("Tester".to_owned()),
        credential: Credential { token: Some("test-jwt".to_owned()) },
        init: SdkInitOptions { disable_audio_levels: true },
        connection: ConnectionOptions {
            domain: "meet.example.com".to_owned(),
            service_url: "wss://meet.example.com/xmpp-websocket".to_owned(),
            peer_to_peer: false,
        },
        room_options: RoomOptions::default(),
    }
}

pub async fn connect_fake(
    room: &str,
    role: Role,
) -> (Conference, ConferenceEvents, Arc<FakeSdk>, Arc<RecordingCommands>) {
    let sdk = FakeSdk::new();
    let commands = Arc::new(RecordingCommands::default());
    let (conference, events) =
        Conference::connect(sdk.clone(), commands.clone(), conference_options(room, role))
            .await
            .expect("connect");
    (conference, events, sdk, commands)
}

pub async fn next_event(events: &mut ConferenceEvents) -> ConferenceEvent {
    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Reads events until one matches, failing the test after a second per event.
pub async fn wait_for<F>(events: &mut ConferenceEvents, mut pred: F) -> ConferenceEvent
where
    F: FnMut(&ConferenceEvent) -> bool,
{
    loop {
        let event = next_event(events).await;
        if pred(&event) {
            return event;
        }
    }
}
