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

pub use crate::floor::{CommandError, CommandSender, FloorControl};

pub use crate::roster::{MediaSlot, Participant, ParticipantUpdate, Roster};

pub use crate::sdk::{
    AttachmentError, ConferencingSdk, ConnectionOptions, Credential, DeviceError, MediaSink,
    MediaTrack, ReceiveConstraints, Role, RoomHandle, RoomOptions, SdkConnection, SdkError,
    SdkEvent, SdkEventEmitter, SdkEvents, SdkInitOptions,
};

pub use crate::{
    breakout, Conference, ConferenceError, ConferenceEvent, ConferenceEvents, ConferenceOptions,
    ConferenceResult, ConferenceSession, ConnectionState, ControlMessage, ParticipantId, RoomName,
    TrackKind,
};
