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

//! Breakout-room naming and the control messages that move participants
//! between the home room and a breakout.

use lectern_protocol::ControlMessage;

use crate::id::{ParticipantId, RoomName};

const ONE_ON_ONE_INFIX: &str = "__1on1__";

/// Name of the 1:1 breakout room `home` spawns for `target`. Unique per
/// target, so repeated 1:1s with the same participant land in the same room.
pub fn one_on_one_room(home: &RoomName, target: &ParticipantId) -> RoomName {
    RoomName::from(format!("{}{}{}", home.as_str(), ONE_ON_ONE_INFIX, target.as_str()))
}

pub(crate) fn move_to_breakout(target: &ParticipantId, room: &RoomName) -> ControlMessage {
    ControlMessage::MoveToBreakout { target: target.to_string(), room: room.to_string() }
}

pub(crate) fn return_to_main(target: &ParticipantId, home: &RoomName) -> ControlMessage {
    ControlMessage::ReturnToMain { target: target.to_string(), room: home.to_string() }
}
