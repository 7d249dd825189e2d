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

use std::{collections::HashMap, fmt::Debug};

use crate::id::ParticipantId;

#[derive(Debug, Clone, Default)]
pub struct SdkInitOptions {
    pub disable_audio_levels: bool,
}

/// Bearer credential forwarded to the signaling layer, usually a JWT.
#[derive(Clone, Default)]
pub struct Credential {
    pub token: Option<String>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("token", &self.token.as_ref().map(|_| "***")).finish()
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub domain: String,
    pub service_url: String,
    /// Disabling peer-to-peer keeps media flowing through the SFU even in
    /// two-party rooms.
    pub peer_to_peer: bool,
}

#[derive(Debug, Clone)]
pub struct RoomOptions {
    pub open_bridge_channel: bool,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self { open_bridge_channel: true }
    }
}

/// Receive-side routing policy handed to the SDK.
///
/// `last_n == -1` lifts the forwarding limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveConstraints {
    pub last_n: i32,
    pub on_stage: Vec<ParticipantId>,
    pub default_max_height: u32,
    pub max_heights: HashMap<ParticipantId, u32>,
}

impl ReceiveConstraints {
    /// Student policy: only the instructor is kept on stage, at full
    /// quality; everyone else stays thumbnail-sized.
    pub fn stage_only(instructor: Option<&ParticipantId>) -> Self {
        let on_stage = instructor.cloned().into_iter().collect::<Vec<_>>();
        let max_heights =
            instructor.map(|id| HashMap::from([(id.clone(), 720)])).unwrap_or_default();
        Self { last_n: 1, on_stage, default_max_height: 180, max_heights }
    }

    /// Instructor policy: every participant is received.
    pub fn unconstrained() -> Self {
        Self {
            last_n: -1,
            on_stage: Vec::new(),
            default_max_height: 240,
            max_heights: HashMap::new(),
        }
    }
}
