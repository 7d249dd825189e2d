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

//! Roster of remote participants and their media attachment state.
//!
//! Track arrival and sink readiness are independent events with no ordering
//! guarantee between them. Attachment fires from whichever side completes
//! the (track, sink) pair, exactly once per pairing, and re-fires when
//! either handle is replaced.

use std::{collections::HashMap, sync::Arc};

use lectern_protocol::TrackKind;

use crate::id::ParticipantId;
use crate::sdk::{MediaSink, MediaTrack, Role};

/// Partial participant record merged by [`Roster::upsert`]. Fields left as
/// `None` keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ParticipantUpdate {
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

/// Per-kind attachment state of one participant.
#[derive(Debug, Clone, Default)]
pub struct MediaSlot {
    track: Option<Arc<dyn MediaTrack>>,
    sink: Option<Arc<dyn MediaSink>>,
    attached: bool,
}

impl MediaSlot {
    pub fn track(&self) -> Option<&Arc<dyn MediaTrack>> {
        self.track.as_ref()
    }

    pub fn sink(&self) -> Option<&Arc<dyn MediaSink>> {
        self.sink.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Attaches the current pairing if both handles are known and the
    /// pairing has not been attached yet. Returns the sink on success.
    fn try_attach(&mut self) -> Option<Arc<dyn MediaSink>> {
        if self.attached {
            return None;
        }
        let track = self.track.as_ref()?;
        let sink = self.sink.clone()?;
        if let Err(err) = track.attach(sink.as_ref()) {
            log::debug!("attach to {} ignored: {}", sink.id(), err);
        }
        self.attached = true;
        Some(sink)
    }

    /// Best-effort detach of the current pairing. A missing sink or an
    /// already-detached handle is not an error.
    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        if let (Some(track), Some(sink)) = (self.track.as_ref(), self.sink.as_ref()) {
            if let Err(err) = track.detach(sink.as_ref()) {
                log::debug!("detach from {} ignored: {}", sink.id(), err);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Participant {
    id: ParticipantId,
    display_name: Option<String>,
    role: Option<Role>,
    slots: HashMap<TrackKind, MediaSlot>,
}

impl Participant {
    fn new(id: ParticipantId) -> Self {
        Self { id, display_name: None, role: None, slots: HashMap::new() }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn slot(&self, kind: TrackKind) -> Option<&MediaSlot> {
        self.slots.get(&kind)
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut MediaSlot {
        self.slots.entry(kind).or_default()
    }
}

/// Roster of remote participants.
///
/// A participant exists iff a join or a track-added has been observed for
/// its id and no later leave; only an explicit leave removes it.
#[derive(Debug, Default)]
pub struct Roster {
    participants: HashMap<ParticipantId, Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().cloned().collect()
    }

    /// Monotonic merge: creates the entry if absent, never clears fields the
    /// update leaves out. Returns `true` when the entry was created.
    pub fn upsert(&mut self, id: &ParticipantId, update: ParticipantUpdate) -> bool {
        let created = !self.participants.contains_key(id);
        let participant = self
            .participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id.clone()));
        if update.display_name.is_some() {
            participant.display_name = update.display_name;
        }
        if update.role.is_some() {
            participant.role = update.role;
        }
        created
    }

    /// Removes the participant, detaching any attached pairings, and
    /// returns the track handles that were live for the caller to release.
    pub fn remove(&mut self, id: &ParticipantId) -> Vec<Arc<dyn MediaTrack>> {
        let Some(participant) = self.participants.remove(id) else {
            return Vec::new();
        };
        let mut released = Vec::new();
        for (_, mut slot) in participant.slots {
            slot.detach();
            if let Some(track) = slot.track.take() {
                released.push(track);
            }
        }
        released
    }

    /// Stores a track handle, creating the roster entry if the join event
    /// has not arrived yet. A second track of the same kind before a removal
    /// is a replace: the old pairing is detached and the old handle
    /// discarded. Returns the sink when attachment fired now.
    pub fn record_track(
        &mut self,
        id: &ParticipantId,
        kind: TrackKind,
        track: Arc<dyn MediaTrack>,
    ) -> Option<Arc<dyn MediaSink>> {
        let participant = self
            .participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id.clone()));
        let slot = participant.slot_mut(kind);
        if slot.track.is_some() {
            slot.detach();
        }
        slot.track = Some(track);
        slot.try_attach()
    }

    /// Stores a sink handle for a (participant, kind), creating the roster
    /// entry if needed. Replacing the sink moves an already-attached track
    /// over to the new sink. Returns the sink when attachment fired now.
    pub fn record_attachment_target(
        &mut self,
        id: &ParticipantId,
        kind: TrackKind,
        sink: Arc<dyn MediaSink>,
    ) -> Option<Arc<dyn MediaSink>> {
        let participant = self
            .participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id.clone()));
        let slot = participant.slot_mut(kind);
        match slot.sink.as_ref() {
            Some(current) if current.id() == sink.id() => {}
            _ => {
                slot.detach();
                slot.sink = Some(sink);
            }
        }
        slot.try_attach()
    }

    /// Clears the track slot, detaching first (best-effort), and returns
    /// the handle that was stored.
    pub fn release_track(
        &mut self,
        id: &ParticipantId,
        kind: TrackKind,
    ) -> Option<Arc<dyn MediaTrack>> {
        let participant = self.participants.get_mut(id)?;
        let slot = participant.slots.get_mut(&kind)?;
        slot.detach();
        slot.track.take()
    }

    /// Hard reset: removes every participant and returns all live track
    /// handles. Used when switching rooms, where the target room's roster
    /// is unrelated to the source room's.
    pub fn drain(&mut self) -> Vec<Arc<dyn MediaTrack>> {
        let ids = self.ids();
        ids.iter().flat_map(|id| self.remove(id)).collect()
    }
}
