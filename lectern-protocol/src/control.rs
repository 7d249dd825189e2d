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

use serde::{Deserialize, Serialize};

/// Kind of a media track, as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackKind {
    Audio,
    Video,
    DesktopShare,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
            TrackKind::DesktopShare => "desktop-share",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application payload carried over the conference side channel or relayed
/// through the room-command HTTP endpoint.
///
/// Closed set: a payload whose `type` is not one of the four variants below
/// fails to deserialize and must be ignored by receivers. Receivers also
/// ignore messages whose `target` is not their own participant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "move-to-breakout")]
    MoveToBreakout { target: String, room: String },
    #[serde(rename = "return-to-main")]
    ReturnToMain { target: String, room: String },
    #[serde(rename = "requestTrack")]
    RequestTrack { target: String, kind: TrackKind },
    #[serde(rename = "stopTrack")]
    StopTrack { target: String, kind: TrackKind },
}

impl ControlMessage {
    /// Participant the message is addressed to.
    pub fn target(&self) -> &str {
        match self {
            ControlMessage::MoveToBreakout { target, .. } => target,
            ControlMessage::ReturnToMain { target, .. } => target,
            ControlMessage::RequestTrack { target, .. } => target,
            ControlMessage::StopTrack { target, .. } => target,
        }
    }
}
