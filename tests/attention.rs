mod common;

use std::time::Duration;

use common::{options, Harness};
use focusguard_lib::models::{AttentionClass, Blacklist, Detection, SessionState};
use focusguard_lib::session::{LoopHealth, SessionEvent};

#[tokio::test]
async fn looking_away_raises_the_alarm_and_records_once() {
    let h = Harness::new();
    let mut events = h.coordinator.events();
    h.coordinator
        .start_for(Duration::from_secs(60), Blacklist::new(), options())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.detector.set(Detection::absent());
    tokio::time::sleep(Duration::from_millis(120)).await;

    let snapshot = h.coordinator.snapshot();
    assert!(snapshot.alarm_on);
    assert_eq!(snapshot.attention.classification, AttentionClass::Distracted);
    assert_eq!(snapshot.distraction_count, 1);
    assert!(!h.audio.tones().is_empty(), "alarm should be audible");

    h.detector.set(Detection::focused());
    tokio::time::sleep(Duration::from_millis(60)).await;
    let snapshot = h.coordinator.snapshot();
    assert!(!snapshot.alarm_on);
    assert_eq!(snapshot.attention.classification, AttentionClass::Focused);

    let stats = h.coordinator.stop().await.unwrap().unwrap();
    assert_eq!(stats.distraction_count, 1);

    let mut recorded = 0;
    let mut alarm_edges = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::DistractionRecorded(_) => recorded += 1,
            SessionEvent::AlarmChanged { on } => alarm_edges.push(on),
            _ => {}
        }
    }
    assert_eq!(recorded, 1);
    assert_eq!(alarm_edges, vec![true, false]);
}

#[tokio::test]
async fn a_brief_miss_is_not_a_distraction() {
    let h = Harness::new();
    h.coordinator
        .start_for(Duration::from_secs(60), Blacklist::new(), options())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    // Under the three-sample threshold at 5ms per frame.
    h.detector.set(Detection::absent());
    tokio::time::sleep(Duration::from_millis(8)).await;
    h.detector.set(Detection::focused());
    tokio::time::sleep(Duration::from_millis(40)).await;

    let snapshot = h.coordinator.snapshot();
    assert!(!snapshot.alarm_on);
    assert_eq!(snapshot.distraction_count, 0);
    h.coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn pausing_silences_the_alarm() {
    let h = Harness::new();
    h.detector.set(Detection::absent());
    h.coordinator
        .start_for(Duration::from_secs(60), Blacklist::new(), options())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.coordinator.snapshot().alarm_on);

    h.coordinator.pause().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let tones = h.audio.tones().len();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!h.coordinator.snapshot().alarm_on);
    assert_eq!(h.audio.tones().len(), tones);
    h.coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn disabled_alarm_stays_silent() {
    let h = Harness::new();
    h.detector.set(Detection::absent());
    let silent = focusguard_lib::session::SessionOptions {
        alarm_enabled: false,
        ..options()
    };
    h.coordinator
        .start_for(Duration::from_secs(60), Blacklist::new(), silent)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let snapshot = h.coordinator.snapshot();
    assert!(snapshot.alarm_on);
    assert!(snapshot.alarm_visual_only);
    assert!(h.audio.tones().is_empty());
    h.coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn detector_failures_skip_frames_without_ending_the_session() {
    let h = Harness::new();
    h.coordinator
        .start_for(Duration::from_secs(60), Blacklist::new(), options())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    h.detector.set_failing(true);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let snapshot = h.coordinator.snapshot();
    assert!(matches!(snapshot.tracking, LoopHealth::Degraded(_)));
    assert_eq!(snapshot.state, SessionState::Running);
    // Failed frames are not counted as misses.
    assert!(!snapshot.alarm_on);
    assert_eq!(snapshot.distraction_count, 0);

    h.detector.set_failing(false);
    tokio::time::sleep(Duration::from_millis(40)).await;
    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.tracking, LoopHealth::Active);
    assert_eq!(snapshot.attention.classification, AttentionClass::Focused);

    assert!(h.coordinator.stop().await.unwrap().is_some());
}
