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

//! Classroom and breakout-room session layer on top of an external
//! conferencing SDK.
//!
//! The SDK owns signaling, SFU negotiation and media; this crate owns the
//! part worth owning: a race-free view of who is present and what media is
//! attached where, under out-of-order delivery of join and track events,
//! plus the moderated-floor and breakout policies built on it.

pub mod sdk;

mod conference;
mod id;

pub use conference::*;
pub use id::*;

pub use lectern_protocol::{ControlMessage, TrackKind};

/// `use lectern::prelude::*;` to import common types
pub mod prelude;
