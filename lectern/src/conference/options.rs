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

use lectern_protocol::TrackKind;

use crate::id::RoomName;
use crate::sdk::{ConnectionOptions, Credential, Role, RoomOptions, SdkInitOptions};

/// Options for [`Conference::connect`](crate::Conference::connect).
///
/// `room` is the home room: the room joined first, and the one a breakout
/// returns to.
#[derive(Debug, Clone)]
pub struct ConferenceOptions {
    pub room: RoomName,
    pub role: Role,
    pub display_name: Option<String>,
    pub credential: Credential,
    pub init: SdkInitOptions,
    pub connection: ConnectionOptions,
    pub room_options: RoomOptions,
}

impl ConferenceOptions {
    /// Track kinds published on join. Instructors broadcast audio and
    /// video; students publish video only and get audio on a floor grant.
    pub fn publish_kinds(&self) -> &'static [TrackKind] {
        match self.role {
            Role::Instructor => &[TrackKind::Audio, TrackKind::Video],
            Role::Student => &[TrackKind::Video],
        }
    }
}
