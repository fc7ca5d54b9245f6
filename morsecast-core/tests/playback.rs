use std::sync::Arc;
use std::time::Duration;

use morsecast_core::{
    EmitterHandle, Mode, MorseError, MorsePlayer, MorseTiming, PlaybackEvent, PlayerConfig,
    PlayerStatus, ToneCompletion, ToneEmitter,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Paused-clock timers resolve on millisecond ticks.
const SLACK: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy)]
struct Emission {
    started: Instant,
    duration: Duration,
}

impl Emission {
    fn ended(&self) -> Instant {
        self.started + self.duration
    }
}

/// Emitter that records every tone it is asked to play.
#[derive(Clone, Default)]
struct RecordingEmitter {
    emissions: Arc<Mutex<Vec<Emission>>>,
    /// `emit` fails once this many tones have been recorded.
    fail_after: Option<usize>,
}

impl RecordingEmitter {
    fn failing_after(tones: usize) -> Self {
        Self {
            fail_after: Some(tones),
            ..Self::default()
        }
    }

    fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().clone()
    }
}

impl ToneEmitter for RecordingEmitter {
    fn prepare(&mut self) -> morsecast_core::Result<()> {
        Ok(())
    }

    fn emit(
        &mut self,
        duration: Duration,
        on_complete: ToneCompletion,
    ) -> morsecast_core::Result<()> {
        let mut emissions = self.emissions.lock();
        if self.fail_after.is_some_and(|n| emissions.len() >= n) {
            return Err(MorseError::EmitterUnavailable("device unplugged".into()));
        }
        emissions.push(Emission {
            started: Instant::now(),
            duration,
        });
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = on_complete.send(());
        });
        Ok(())
    }
}

fn dot_at(wpm: u32) -> Duration {
    MorseTiming::from_wpm(wpm).expect("timing").dot()
}

fn player_with(recorder: &RecordingEmitter, config: PlayerConfig) -> MorsePlayer {
    MorsePlayer::with_config(config, EmitterHandle::new(recorder.clone())).expect("player")
}

async fn recv_event_with_timeout(
    rx: &mut broadcast::Receiver<PlaybackEvent>,
    timeout: Duration,
    predicate: impl Fn(&PlaybackEvent) -> bool,
) -> Option<PlaybackEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(event)) if predicate(&event) => return Some(event),
            Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
        }
    }
}

async fn wait_finished(rx: &mut broadcast::Receiver<PlaybackEvent>, seq: u64) {
    let event = recv_event_with_timeout(rx, Duration::from_secs(30), |e| {
        matches!(e, PlaybackEvent::WordFinished { seq: s, .. } if *s == seq)
    })
    .await;
    assert!(event.is_some(), "word {seq} never finished");
}

fn assert_close(actual: Duration, expected: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(diff <= SLACK, "expected ~{expected:?}, got {actual:?}");
}

#[tokio::test(start_paused = true)]
async fn sos_plays_with_standard_timing() {
    let recorder = RecordingEmitter::default();
    let d = dot_at(20);
    let player = player_with(&recorder, PlayerConfig::default());
    let mut events = player.subscribe_events();

    player.push("SOS");
    player.start().expect("start");
    wait_finished(&mut events, 1).await;

    let tones = recorder.emissions();
    let durations: Vec<Duration> = tones.iter().map(|t| t.duration).collect();
    assert_eq!(
        durations,
        vec![d, d, d, d * 3, d * 3, d * 3, d, d, d],
        "s o s should be three dots, three dashes, three dots"
    );

    // Gaps: 1D inside a letter, 3D between letters.
    let expected_gaps = [d, d, d * 3, d, d, d * 3, d, d];
    for (pair, expected) in tones.windows(2).zip(expected_gaps) {
        assert_close(pair[1].started - pair[0].ended(), expected);
    }

    player.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn character_mode_plays_a_single_symbol() {
    let recorder = RecordingEmitter::default();
    let d = dot_at(20);
    let config = PlayerConfig {
        mode: Mode::Character,
        ..PlayerConfig::default()
    };
    let player = player_with(&recorder, config);
    let mut events = player.subscribe_events();

    player.push("one");
    player.push("xyz123");
    player.start().expect("start");

    let started = recv_event_with_timeout(&mut events, Duration::from_secs(5), |e| {
        matches!(e, PlaybackEvent::WordStarted { .. })
    })
    .await
    .expect("word started");
    assert!(
        matches!(&started, PlaybackEvent::WordStarted { symbols, .. } if symbols == ".----"),
        "unexpected: {started:?}"
    );

    let fallback = recv_event_with_timeout(&mut events, Duration::from_secs(5), |e| {
        matches!(e, PlaybackEvent::WordStarted { seq: 2, .. })
    })
    .await
    .expect("second word started");
    assert!(
        matches!(&fallback, PlaybackEvent::WordStarted { symbols, .. } if symbols == "....-.-."),
        "unresolvable token should play the fallback symbol: {fallback:?}"
    );
    wait_finished(&mut events, 2).await;

    // ".----" then "....-.-."
    let durations: Vec<Duration> = recorder.emissions().iter().map(|t| t.duration).collect();
    assert_eq!(
        durations,
        vec![
            d, d * 3, d * 3, d * 3, d * 3, // 1
            d, d, d, d, d * 3, d, d * 3, d, // #
        ]
    );

    player.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn words_play_in_order_without_overlap() {
    let recorder = RecordingEmitter::default();
    let player = player_with(&recorder, PlayerConfig::default());
    let mut events = player.subscribe_events();

    for word in ["ab", "cd", "ef"] {
        player.push(word);
    }
    player.start().expect("start");

    let mut lifecycle = Vec::new();
    while lifecycle.len() < 6 {
        let event = recv_event_with_timeout(&mut events, Duration::from_secs(30), |e| {
            matches!(
                e,
                PlaybackEvent::WordStarted { .. } | PlaybackEvent::WordFinished { .. }
            )
        })
        .await
        .expect("lifecycle event");
        lifecycle.push(match event {
            PlaybackEvent::WordStarted { word, .. } => format!("start:{word}"),
            PlaybackEvent::WordFinished { word, .. } => format!("end:{word}"),
            _ => unreachable!(),
        });
    }
    assert_eq!(
        lifecycle,
        vec!["start:ab", "end:ab", "start:cd", "end:cd", "start:ef", "end:ef"]
    );

    // a(.-) b(-...) c(-.-.) d(-..) e(.) f(..-.)
    let tones = recorder.emissions();
    assert_eq!(tones.len(), 2 + 4 + 4 + 3 + 1 + 4);
    for pair in tones.windows(2) {
        assert!(
            pair[1].started >= pair[0].ended(),
            "tones overlapped: {pair:?}"
        );
    }

    let stats = player.diagnostics_snapshot();
    assert_eq!(stats.words_drained, 3);
    assert_eq!(stats.tones_emitted, tones.len());
    assert!(stats.ticks_while_draining > 0);

    player.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn speed_change_mid_word_only_affects_later_words() {
    let recorder = RecordingEmitter::default();
    let d = dot_at(20);
    let player = player_with(&recorder, PlayerConfig::default());
    let mut events = player.subscribe_events();

    player.push("mmm");
    player.start().expect("start");
    recv_event_with_timeout(&mut events, Duration::from_secs(5), |e| {
        matches!(e, PlaybackEvent::Tone { .. })
    })
    .await
    .expect("first tone");

    player.set_wpm(10).expect("set wpm");
    recv_event_with_timeout(&mut events, Duration::from_secs(1), |e| {
        matches!(e, PlaybackEvent::SpeedChanged { wpm: 10, .. })
    })
    .await
    .expect("speed changed");

    // "mmm" is still playing; ticks now arrive every 120 ms instead of 60 ms.
    let ticks_before = player.diagnostics_snapshot().ticks;
    tokio::time::sleep(Duration::from_millis(550)).await;
    let ticks = player.diagnostics_snapshot().ticks - ticks_before;
    assert!((4..=5).contains(&ticks), "ticks in 550 ms after slowdown: {ticks}");
    assert_eq!(player.diagnostics_snapshot().words_drained, 0);

    wait_finished(&mut events, 1).await;

    player.push("t");
    wait_finished(&mut events, 2).await;

    let durations: Vec<Duration> = recorder.emissions().iter().map(|t| t.duration).collect();
    assert_eq!(durations[..6], [d * 3; 6]);
    // 10 WPM doubles the dot, so the dash of "t" is 360 ms.
    assert_eq!(durations[6..], [MorseTiming::from_wpm(10).expect("timing").dash()]);

    let snapshot = player.snapshot();
    assert_eq!(snapshot.wpm, 10);
    assert_eq!(snapshot.current_word, "t");

    player.stop().await.expect("stop");
}

#[tokio::test(start_paused = true)]
async fn stop_lets_the_current_tone_finish_then_drops_the_word() {
    let recorder = RecordingEmitter::default();
    let d = dot_at(20);
    let player = player_with(&recorder, PlayerConfig::default());
    let mut events = player.subscribe_events();

    player.push("ooo");
    player.start().expect("start");
    recv_event_with_timeout(&mut events, Duration::from_secs(5), |e| {
        matches!(e, PlaybackEvent::Tone { .. })
    })
    .await
    .expect("first tone");

    let stop_requested = Instant::now();
    player.stop().await.expect("stop");

    // The dash in flight completed before stop returned.
    assert!(Instant::now() >= stop_requested + d * 3);
    assert_eq!(recorder.emissions().len(), 1);
    assert_eq!(player.status(), PlayerStatus::Stopped);
    assert_eq!(player.diagnostics_snapshot().sequences_abandoned, 1);

    let abandoned = recv_event_with_timeout(&mut events, Duration::from_secs(1), |e| {
        matches!(e, PlaybackEvent::WordAbandoned { .. })
    })
    .await;
    assert!(
        matches!(&abandoned, Some(PlaybackEvent::WordAbandoned { word, .. }) if word == "ooo"),
        "unexpected: {abandoned:?}"
    );

    // A restart begins at Idle and keeps playing new words.
    player.start().expect("restart");
    assert!(player.is_running());
    player.push("e");
    wait_finished(&mut events, 1).await;
    assert_eq!(recorder.emissions().len(), 2);

    player.stop().await.expect("stop again");
}

#[tokio::test(start_paused = true)]
async fn emit_failure_abandons_the_rest_of_the_word() {
    let recorder = RecordingEmitter::failing_after(2);
    let player = player_with(&recorder, PlayerConfig::default());
    let mut events = player.subscribe_events();

    // "sos" fails on its third dot.
    player.push("sos");
    player.start().expect("start");

    let abandoned = recv_event_with_timeout(&mut events, Duration::from_secs(5), |e| {
        matches!(e, PlaybackEvent::WordAbandoned { .. })
    })
    .await
    .expect("abandoned event");
    assert!(
        matches!(&abandoned, PlaybackEvent::WordAbandoned { reason, .. } if reason.contains("device unplugged")),
        "unexpected: {abandoned:?}"
    );
    assert_eq!(recorder.emissions().len(), 2);

    let snapshot = player.snapshot();
    assert!(!snapshot.is_playing);

    player.stop().await.expect("stop");
    let stats = player.diagnostics_snapshot();
    assert_eq!(stats.sequences_abandoned, 1);
    assert_eq!(stats.words_drained, 0);
}

#[tokio::test(start_paused = true)]
async fn overflow_keeps_the_newest_words() {
    let recorder = RecordingEmitter::default();
    let d = dot_at(20);
    let config = PlayerConfig {
        queue_capacity: 2,
        ..PlayerConfig::default()
    };
    let player = player_with(&recorder, config);
    let mut events = player.subscribe_events();

    assert_eq!(player.push("a"), None);
    assert_eq!(player.push("b"), None);
    assert_eq!(player.push("e"), Some("a".to_string()));
    assert_eq!(player.push("t"), Some("b".to_string()));
    assert_eq!(player.queue().evicted_total(), 2);

    player.start().expect("start");
    wait_finished(&mut events, 2).await;

    // e(.) then t(-)
    let durations: Vec<Duration> = recorder.emissions().iter().map(|t| t.duration).collect();
    assert_eq!(durations, vec![d, d * 3]);
    assert!(player.queue().is_empty());

    player.stop().await.expect("stop");
}
