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

use lectern::prelude::*;
use serde_json::json;

mod common;

use common::*;

#[tokio::test]
async fn test_switch_room_resets_roster_and_republishes() {
    let (conference, mut events, sdk, _) = connect_fake("room-a", Role::Instructor).await;
    let session = conference.session();
    let p1 = ParticipantId::from("p1");

    let track = FakeTrack::remote(&p1, TrackKind::Video, "p1-cam", &sdk.log);
    sdk.emit(SdkEvent::TrackAdded { participant: p1.clone(), kind: TrackKind::Video, track });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::ParticipantConnected { .. })).await;
    sdk.emit(SdkEvent::ParticipantJoined { id: p1.clone(), display_name: Some("Ada".to_owned()) });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::ParticipantUpdated { .. })).await;

    session.switch_room(RoomName::from("room-b")).await.unwrap();

    // no stale entries from the source room remain
    assert!(session.participants().is_empty());
    assert_eq!(session.current_room(), RoomName::from("room-b"));
    assert!(session.is_in_breakout());

    let event = wait_for(&mut events, |e| matches!(e, ConferenceEvent::RoomSwitched { .. })).await;
    assert!(matches!(event, ConferenceEvent::RoomSwitched { room } if room.as_str() == "room-b"));

    let entries = sdk.log.entries();
    let leave = sdk.log.position_of("leave room-a").expect("left the source room");
    let join = sdk.log.position_of("join room-b").expect("joined the target room");
    assert!(leave < join, "leave must complete before the join starts");

    // local track ownership persists across the switch
    assert!(entries.contains(&"publish audio in room-b".to_owned()));
    assert!(entries.contains(&"publish video in room-b".to_owned()));
    assert_eq!(sdk.log.count_of("dispose local-audio"), 0);
    assert_eq!(sdk.log.count_of("dispose local-video"), 0);

    conference.close().await;
}

#[tokio::test]
async fn test_move_to_breakout_control_message() {
    let (conference, mut events, sdk, _) = connect_fake("room-a", Role::Student).await;
    let session = conference.session();

    sdk.emit(SdkEvent::ControlMessageReceived {
        sender: ParticipantId::from("instr-1"),
        payload: json!({
            "type": "move-to-breakout",
            "target": "local-1",
            "room": "room-a__1on1__local-1",
        }),
    });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::RoomSwitched { .. })).await;

    assert_eq!(session.current_room(), RoomName::from("room-a__1on1__local-1"));
    assert!(session.is_in_breakout());

    conference.close().await;
}

#[tokio::test]
async fn test_return_to_main_requires_home_room() {
    let (conference, mut events, sdk, _) = connect_fake("room-a", Role::Student).await;
    let session = conference.session();

    session.switch_room(RoomName::from("room-a__1on1__local-1")).await.unwrap();

    // a return pointing at some other room is not ours to follow
    sdk.emit(SdkEvent::ControlMessageReceived {
        sender: ParticipantId::from("instr-1"),
        payload: json!({"type": "return-to-main", "target": "local-1", "room": "room-z"}),
    });
    sdk.emit(SdkEvent::ParticipantJoined { id: ParticipantId::from("sync-1"), display_name: None });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::ParticipantConnected { .. })).await;
    assert!(session.is_in_breakout());

    sdk.emit(SdkEvent::ControlMessageReceived {
        sender: ParticipantId::from("instr-1"),
        payload: json!({"type": "return-to-main", "target": "local-1", "room": "room-a"}),
    });
    wait_for(&mut events, |e| {
        matches!(e, ConferenceEvent::RoomSwitched { room } if room.as_str() == "room-a")
    })
    .await;
    assert!(!session.is_in_breakout());

    conference.close().await;
}

#[tokio::test]
async fn test_start_one_on_one_messages_target_then_switches() {
    let (conference, mut events, sdk, _) = connect_fake("room-a", Role::Instructor).await;
    let session = conference.session();
    let p1 = ParticipantId::from("p1");

    sdk.emit(SdkEvent::ParticipantJoined { id: p1.clone(), display_name: None });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::ParticipantConnected { .. })).await;

    session.start_one_on_one(&p1).await.unwrap();

    assert_eq!(session.current_room(), RoomName::from("room-a__1on1__p1"));
    let rooms = sdk.rooms();
    let sent = rooms[0].sent.lock().clone();
    assert_eq!(sent.len(), 1);
    let (msg, target) = &sent[0];
    assert_eq!(
        *msg,
        ControlMessage::MoveToBreakout {
            target: "p1".to_owned(),
            room: "room-a__1on1__p1".to_owned(),
        }
    );
    assert_eq!(target.as_ref(), Some(&p1));

    // already in a breakout: a second 1:1 is refused
    assert!(session.start_one_on_one(&p1).await.is_err());

    conference.close().await;
}

#[tokio::test]
async fn test_end_one_on_one_returns_everyone_home() {
    let (conference, mut events, sdk, _) = connect_fake("room-a", Role::Instructor).await;
    let session = conference.session();
    let p1 = ParticipantId::from("p1");

    sdk.emit(SdkEvent::ParticipantJoined { id: p1.clone(), display_name: None });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::ParticipantConnected { .. })).await;
    session.start_one_on_one(&p1).await.unwrap();

    // the peer shows up in the breakout room
    sdk.emit(SdkEvent::ParticipantJoined { id: p1.clone(), display_name: None });
    wait_for(&mut events, |e| matches!(e, ConferenceEvent::ParticipantConnected { .. })).await;

    session.end_one_on_one().await.unwrap();

    assert_eq!(session.current_room(), RoomName::from("room-a"));
    assert!(!session.is_in_breakout());

    let rooms = sdk.rooms();
    // rooms: [room-a, breakout, room-a again]
    assert_eq!(rooms.len(), 3);
    let sent = rooms[1].sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].0,
        ControlMessage::ReturnToMain { target: "p1".to_owned(), room: "room-a".to_owned() }
    );

    conference.close().await;
}
