//! Integration tests for the broadcast loop with a scripted device

mod common;

use std::time::Duration;

use common::{pad, pad_profile, rest, with_axis, with_button};
use nexuscontroller::broadcast::{StreamSettings, Streamer, SubscriberSet, TickOutcome};
use nexuscontroller::codec::{FrameFormat, Payload, BINARY_FRAME_LEN};
use nexuscontroller::controller::{RawSample, ScriptedSampler};
use nexuscontroller::mapping::{AxisName, ButtonName, MappingProfile, NormalizationPipeline};
use tokio_util::sync::CancellationToken;

fn streamer(sampler: &ScriptedSampler, set: &SubscriberSet) -> Streamer<ScriptedSampler> {
    Streamer::new(
        sampler.clone(),
        NormalizationPipeline::new(pad_profile()),
        set.clone(),
        None,
    )
}

fn text_of(payload: Option<Payload>) -> serde_json::Value {
    match payload {
        Some(Payload::Text(text)) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text payload, got {:?}", other),
    }
}

#[test]
fn test_first_frame_uses_profile_and_baseline() {
    let sampler = pad();
    let mut sample = with_button(0);
    sample.axes[0] = 0.4;
    sampler.push(sample);

    let set = SubscriberSet::default();
    let mut sub = set.join("viewer").unwrap();
    let mut streamer = streamer(&sampler, &set);

    assert_eq!(
        streamer.tick().unwrap(),
        TickOutcome::Delivered {
            recipients: 1,
            dropped: 0
        }
    );

    let handshake = text_of(sub.try_recv());
    assert_eq!(handshake["connected"], serde_json::json!(false));

    let frame = text_of(sub.try_recv());
    assert_eq!(frame["a"], serde_json::json!(true));
    assert_eq!(frame["lx"], serde_json::json!(0.4));
    // Left trigger rests at -1 on this pad
    assert_eq!(frame["lt"], serde_json::json!(0.0));
}

#[test]
fn test_unplug_stops_frames_and_disconnects() {
    let sampler = pad();
    sampler.push(rest());
    let set = SubscriberSet::default();
    let mut early = set.join("early").unwrap();
    let mut streamer = streamer(&sampler, &set);

    assert!(matches!(
        streamer.tick().unwrap(),
        TickOutcome::Delivered { .. }
    ));
    assert!(set.device_info().connected);

    sampler.disconnect();
    assert_eq!(streamer.tick().unwrap(), TickOutcome::DeviceLost);
    assert!(!set.device_info().connected);
    assert_eq!(set.device_info().name, "Test Pad");
    assert_eq!(sampler.release_count(), 1);

    // Handshake and one frame, nothing for the lost tick
    early.try_recv();
    early.try_recv();
    assert_eq!(early.try_recv(), None);

    assert_eq!(streamer.tick().unwrap(), TickOutcome::NoDevice);

    let mut late = set.join("late").unwrap();
    let handshake = text_of(late.try_recv());
    assert_eq!(handshake["connected"], serde_json::json!(false));
    assert_eq!(handshake["name"], serde_json::json!("Test Pad"));
}

#[test]
fn test_replug_reconnects() {
    let sampler = pad();
    let set = SubscriberSet::default();
    let mut streamer = streamer(&sampler, &set);

    streamer.tick().unwrap();
    sampler.disconnect();
    assert_eq!(streamer.tick().unwrap(), TickOutcome::DeviceLost);

    sampler.connect();
    assert_eq!(streamer.tick().unwrap(), TickOutcome::Idle);
    assert!(set.device_info().connected);
    assert_eq!(sampler.open_count(), 2);
}

#[test]
fn test_closed_subscriber_does_not_affect_others() {
    let sampler = pad();
    let set = SubscriberSet::default();
    let mut stays = set.join("stays").unwrap();
    let mut leaves = set.join("leaves").unwrap();
    let mut streamer = streamer(&sampler, &set);

    leaves.close();
    assert_eq!(
        streamer.tick().unwrap(),
        TickOutcome::Delivered {
            recipients: 1,
            dropped: 1
        }
    );
    assert_eq!(
        streamer.tick().unwrap(),
        TickOutcome::Delivered {
            recipients: 1,
            dropped: 0
        }
    );

    stays.try_recv();
    assert!(matches!(stays.try_recv(), Some(Payload::Text(_))));
    assert!(matches!(stays.try_recv(), Some(Payload::Text(_))));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_no_subscribers_no_frames() {
    let sampler = pad();
    let set = SubscriberSet::default();
    let mut streamer = streamer(&sampler, &set);

    for _ in 0..5 {
        assert_eq!(streamer.tick().unwrap(), TickOutcome::Idle);
    }
    assert!(streamer.is_attached());
}

#[test]
fn test_guid_mismatch_still_streams() {
    let sampler = ScriptedSampler::new("Other Pad", Some("ffffffff"));
    sampler.push(with_button(0));
    let set = SubscriberSet::default();
    let mut sub = set.join("viewer").unwrap();
    let mut streamer = streamer(&sampler, &set);

    assert!(matches!(
        streamer.tick().unwrap(),
        TickOutcome::Delivered { recipients: 1, .. }
    ));
    sub.try_recv();
    assert_eq!(text_of(sub.try_recv())["a"], serde_json::json!(true));
}

#[test]
fn test_empty_profile_streams_neutral_state() {
    let sampler = pad();
    sampler.push(with_axis(0, 1.0));
    let set = SubscriberSet::default();
    let mut sub = set.join("viewer").unwrap();
    let mut streamer = Streamer::new(
        sampler.clone(),
        NormalizationPipeline::new(MappingProfile::empty()),
        set.clone(),
        None,
    );

    streamer.tick().unwrap();
    sub.try_recv();
    let frame = text_of(sub.try_recv());
    assert_eq!(frame["lx"], serde_json::json!(0.0));
    assert_eq!(frame["a"], serde_json::json!(false));
}

#[test]
fn test_binary_frames() {
    let sampler = pad();
    let mut profile = MappingProfile::new("Test Pad", None);
    profile
        .map_button(ButtonName::FaceRight, 1)
        .map_axis(AxisName::RightStickY, 4);
    sampler.push(RawSample {
        axes: vec![0.0, 0.0, -1.0, 0.0, -1.0],
        buttons: vec![false, true],
        hats: vec![],
    });

    let set = SubscriberSet::default();
    let mut sub = set.join("viewer").unwrap();
    let settings = StreamSettings {
        frame_format: FrameFormat::Binary,
        ..StreamSettings::default()
    };
    let mut streamer = Streamer::new(
        sampler.clone(),
        NormalizationPipeline::new(profile),
        set.clone(),
        Some(settings),
    );
    streamer.tick().unwrap();

    // Handshake stays JSON regardless of frame format
    assert!(matches!(sub.try_recv(), Some(Payload::Text(_))));
    let Some(Payload::Binary(frame)) = sub.try_recv() else {
        panic!("expected a binary frame");
    };
    assert_eq!(frame.len(), BINARY_FRAME_LEN);
    assert_eq!(u16::from_le_bytes([frame[0], frame[1]]), 0b10);
    assert_eq!(i16::from_le_bytes([frame[8], frame[9]]), -32767);
}

#[tokio::test]
async fn test_cancelled_loop_releases_device() {
    let sampler = pad();
    let set = SubscriberSet::default();
    let mut sub = set.join("viewer").unwrap();
    let cancel = CancellationToken::new();

    let settings = StreamSettings {
        frame_rate: 200,
        ..StreamSettings::default()
    };
    let streamer = Streamer::new(
        sampler.clone(),
        NormalizationPipeline::new(pad_profile()),
        set.clone(),
        Some(settings),
    );
    let handle = tokio::spawn(streamer.run(cancel.clone()));

    // Handshake, then at least one periodic frame
    sub.recv().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();

    cancel.cancel();
    let returned = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert!(!returned.is_open());
    assert_eq!(sampler.release_count(), 1);
    assert!(!set.device_info().connected);
}
