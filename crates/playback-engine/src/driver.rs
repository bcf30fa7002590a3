//! Live playback driver.
//!
//! Owns the audio sink, walks the timeline segment by segment, and keeps
//! the presentation moving through the silent inter-segment delay and
//! past failed assets. All outward signalling goes through an injected
//! event callback; the driver knows nothing about any UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use tilawa_common::clock::{PlaybackClock, RateController};
use tilawa_common::error::{TilawaError, TilawaResult};
use tilawa_project_model::{map_time, Timeline};

use crate::sink::{AudioSink, SinkEvent};

/// Seeking back within this many seconds of a segment's start steps to
/// the previous segment; further in, it restarts the current one.
const PREVIOUS_RESTART_THRESHOLD_SECS: f64 = 2.0;

/// Interval of the driver's service loop.
const SERVICE_TICK: Duration = Duration::from_millis(10);

/// State of the playback driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// No session; nothing loaded.
    Idle,
    /// Waiting for the segment's audio to become ready.
    Loading(usize),
    /// The segment's audio is playing (or its trailing delay is
    /// running).
    Playing(usize),
    /// Playback halted by the user.
    Paused(usize),
    /// Advanced past the final segment.
    Ended,
}

impl DriverState {
    /// Index of the segment this state refers to, if any.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            DriverState::Loading(i) | DriverState::Playing(i) | DriverState::Paused(i) => Some(*i),
            DriverState::Idle | DriverState::Ended => None,
        }
    }
}

/// Transient position state owned by the driver.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaybackCursor {
    /// Segment the driver is currently on.
    pub active_segment_index: usize,

    /// Whether the presentation is logically playing (survives the
    /// silent delay window, where no audio is running).
    pub is_playing: bool,

    /// Last authoritative timeline position in seconds.
    pub last_known_secs: f64,
}

/// Notifications emitted by the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEvent {
    StateChanged { state: DriverState },
    TimeUpdate { seconds: f64 },
    SegmentChanged { index: usize },
    /// Non-fatal: a segment's audio failed to load or play and the
    /// driver skipped over it.
    SegmentFailed { index: usize, message: String },
    Ended,
}

/// Callback receiving driver notifications.
pub type EventCallback = Box<dyn Fn(PlaybackEvent) + Send>;

/// Live playback driver over a timeline and an audio sink.
pub struct PlaybackDriver {
    timeline: Arc<Timeline>,
    sink: Box<dyn AudioSink>,
    state: DriverState,
    cursor: PlaybackCursor,

    /// Pending advance to the next segment after the inter-segment
    /// delay. Cleared by seek; survives pause (the advance then happens
    /// without autoplay).
    delay_deadline: Option<Instant>,

    /// Intra-segment position to apply once the loading asset is ready.
    pending_seek_secs: Option<f64>,

    autoplay_on_ready: bool,
    events: Option<EventCallback>,

    clock: PlaybackClock,
    time_rate: RateController,
    stop_flag: Arc<AtomicBool>,
}

impl PlaybackDriver {
    pub fn new(timeline: Arc<Timeline>, sink: Box<dyn AudioSink>) -> Self {
        Self {
            timeline,
            sink,
            state: DriverState::Idle,
            cursor: PlaybackCursor::default(),
            delay_deadline: None,
            pending_seek_secs: None,
            autoplay_on_ready: false,
            events: None,
            clock: PlaybackClock::start(),
            time_rate: RateController::new(30),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Install the notification callback.
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.events = Some(callback);
    }

    /// Cap the rate of `TimeUpdate` notifications.
    pub fn set_time_update_hz(&mut self, hz: u32) {
        self.time_rate = RateController::new(hz);
    }

    /// Swap in a freshly built timeline, resetting the session.
    ///
    /// Rebuilt timelines arrive as new `Arc`s; an in-flight export
    /// holding the old one is unaffected.
    pub fn replace_timeline(&mut self, timeline: Arc<Timeline>) {
        self.timeline = timeline;
        self.sink.clear();
        self.state = DriverState::Idle;
        self.cursor = PlaybackCursor::default();
        self.delay_deadline = None;
        self.pending_seek_secs = None;
        self.autoplay_on_ready = false;
        tracing::debug!("Timeline replaced; playback session reset");
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.is_playing
    }

    /// Whether an inter-segment delay is currently pending.
    pub fn delay_pending(&self) -> bool {
        self.delay_deadline.is_some()
    }

    /// The driver's authoritative timeline position in seconds.
    ///
    /// While audio is running this is the active segment's start plus
    /// the sink position; otherwise (paused, loading, delay window,
    /// ended) it is the last known position.
    pub fn current_time(&self) -> f64 {
        match self.state {
            DriverState::Playing(index) if self.delay_deadline.is_none() => self
                .timeline
                .segment(index)
                .map(|s| s.start_secs + self.sink.position_secs())
                .unwrap_or(self.cursor.last_known_secs),
            _ => self.cursor.last_known_secs,
        }
    }

    /// Start or resume playback.
    pub fn play(&mut self) -> TilawaResult<()> {
        if self.timeline.is_empty() {
            return Err(TilawaError::playback("no segments selected"));
        }

        self.cursor.is_playing = true;
        match self.state {
            DriverState::Idle => {
                let index = self.cursor.active_segment_index;
                self.begin_load(index, true);
            }
            DriverState::Ended => {
                self.cursor.active_segment_index = 0;
                self.cursor.last_known_secs = 0.0;
                self.begin_load(0, true);
            }
            DriverState::Paused(index) => {
                if self.delay_deadline.is_none() {
                    self.sink.play()?;
                }
                self.state = DriverState::Playing(index);
                self.emit(PlaybackEvent::StateChanged { state: self.state });
            }
            DriverState::Loading(_) => {
                self.autoplay_on_ready = true;
            }
            DriverState::Playing(_) => {}
        }
        Ok(())
    }

    /// Pause playback. A pending inter-segment delay keeps running, but
    /// its advance will load the next segment without autoplay.
    pub fn pause(&mut self) {
        self.cursor.last_known_secs = self.current_time();
        self.cursor.is_playing = false;
        self.autoplay_on_ready = false;
        if let DriverState::Playing(index) = self.state {
            if self.delay_deadline.is_none() {
                if let Err(err) = self.sink.pause() {
                    tracing::warn!(error = %err, "Audio sink pause failed");
                }
            }
            self.state = DriverState::Paused(index);
            self.emit(PlaybackEvent::StateChanged { state: self.state });
        }
    }

    /// Toggle between playing and paused.
    pub fn toggle(&mut self) -> TilawaResult<()> {
        if self.cursor.is_playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jump to an absolute timeline position.
    ///
    /// Cancels any pending delay advance, loads the target segment's
    /// audio if it differs from the current one, and clamps the
    /// intra-segment position to the asset's real duration (resolved
    /// durations are estimates). Playing/paused mode is preserved.
    pub fn seek(&mut self, position_secs: f64) -> TilawaResult<()> {
        if self.timeline.is_empty() {
            return Err(TilawaError::playback("no segments selected"));
        }

        let t = position_secs.clamp(0.0, self.timeline.total_duration());
        self.delay_deadline = None;
        self.cursor.last_known_secs = t;
        let was_playing = self.cursor.is_playing;

        let timeline = Arc::clone(&self.timeline);
        let Some(active) = map_time(&timeline, t) else {
            return Err(TilawaError::playback(format!(
                "position {t} is outside the timeline"
            )));
        };

        let index = active.index;
        let offset = active.offset_into_audio;
        self.cursor.active_segment_index = index;

        let same_loaded = matches!(
            self.state,
            DriverState::Playing(i) | DriverState::Paused(i) if i == index
        );
        if same_loaded {
            let clamped = match self.sink.duration_secs() {
                Some(real) => offset.min(real),
                None => offset,
            };
            self.sink.seek(clamped)?;
            if was_playing {
                self.sink.play()?;
                if self.state != DriverState::Playing(index) {
                    self.state = DriverState::Playing(index);
                    self.emit(PlaybackEvent::StateChanged { state: self.state });
                }
            }
        } else if matches!(self.state, DriverState::Loading(i) if i == index) {
            self.pending_seek_secs = Some(offset);
            self.autoplay_on_ready = was_playing;
        } else {
            self.pending_seek_secs = Some(offset);
            self.begin_load(index, was_playing);
        }

        self.emit(PlaybackEvent::TimeUpdate { seconds: t });
        Ok(())
    }

    /// Skip to the next segment, or end the session past the last one.
    pub fn next(&mut self) -> TilawaResult<()> {
        if self.timeline.is_empty() {
            return Err(TilawaError::playback("no segments selected"));
        }

        self.delay_deadline = None;
        let next = self.cursor.active_segment_index + 1;
        if next >= self.timeline.len() {
            self.finish();
            return Ok(());
        }

        self.pending_seek_secs = None;
        self.cursor.last_known_secs = self
            .timeline
            .segment(next)
            .map(|s| s.start_secs)
            .unwrap_or_default();
        let autoplay = self.cursor.is_playing;
        self.begin_load(next, autoplay);
        Ok(())
    }

    /// Restart the current segment, or step back to the previous one
    /// when near the current segment's start.
    pub fn previous(&mut self) -> TilawaResult<()> {
        if self.timeline.is_empty() {
            return Err(TilawaError::playback("no segments selected"));
        }

        self.delay_deadline = None;
        let index = self.cursor.active_segment_index;
        let start = self
            .timeline
            .segment(index)
            .map(|s| s.start_secs)
            .unwrap_or_default();
        let into_segment = self.current_time() - start;

        let loaded = matches!(
            self.state,
            DriverState::Playing(i) | DriverState::Paused(i) if i == index
        );

        if into_segment > PREVIOUS_RESTART_THRESHOLD_SECS {
            self.cursor.last_known_secs = start;
            if loaded {
                self.sink.seek(0.0)?;
                if self.cursor.is_playing {
                    self.sink.play()?;
                }
            } else {
                self.pending_seek_secs = Some(0.0);
                let autoplay = self.cursor.is_playing;
                self.begin_load(index, autoplay);
            }
        } else {
            let target = index.saturating_sub(1);
            self.cursor.last_known_secs = self
                .timeline
                .segment(target)
                .map(|s| s.start_secs)
                .unwrap_or_default();
            self.pending_seek_secs = None;
            let autoplay = self.cursor.is_playing;
            self.begin_load(target, autoplay);
        }
        Ok(())
    }

    /// Drain sink events and fire the delay advance if due. The async
    /// `run` loop calls this on every tick; tests call it directly.
    pub fn service(&mut self) {
        while let Some(event) = self.sink.poll_event() {
            self.handle_sink_event(event);
        }
        self.poll_delay(Instant::now());
    }

    /// Apply one sink event to the state machine.
    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Ready => {
                let DriverState::Loading(index) = self.state else {
                    return;
                };
                if let Some(offset) = self.pending_seek_secs.take() {
                    let clamped = match self.sink.duration_secs() {
                        Some(real) => offset.min(real),
                        None => offset,
                    };
                    if let Err(err) = self.sink.seek(clamped) {
                        tracing::warn!(segment = index, error = %err, "Seek after load failed");
                    }
                }
                let start = self
                    .timeline
                    .segment(index)
                    .map(|s| s.start_secs)
                    .unwrap_or_default();
                self.cursor.last_known_secs = start + self.sink.position_secs();

                if self.autoplay_on_ready {
                    match self.sink.play() {
                        Ok(()) => {
                            self.state = DriverState::Playing(index);
                            self.emit(PlaybackEvent::StateChanged { state: self.state });
                        }
                        Err(err) => self.handle_segment_failure(index, err.to_string()),
                    }
                } else {
                    self.state = DriverState::Paused(index);
                    self.emit(PlaybackEvent::StateChanged { state: self.state });
                }
            }
            SinkEvent::Ended => {
                if let DriverState::Playing(index) | DriverState::Paused(index) = self.state {
                    self.cursor.last_known_secs = self.segment_end(index);
                    self.advance_from(index);
                }
            }
            SinkEvent::Error(message) => {
                if let Some(index) = self.state.segment_index() {
                    self.handle_segment_failure(index, message);
                } else {
                    tracing::warn!(message = %message, "Audio sink error outside a session");
                }
            }
        }
    }

    /// Fire the pending delay advance once its deadline has passed.
    pub fn poll_delay(&mut self, now: Instant) {
        let Some(deadline) = self.delay_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        self.delay_deadline = None;
        let next = self.cursor.active_segment_index + 1;
        let autoplay = self.cursor.is_playing;
        self.begin_load(next, autoplay);
    }

    /// Service loop: drains sink events, fires due delays, and emits
    /// rate-limited time updates until `stop` is called.
    pub async fn run(&mut self) {
        tracing::info!(segments = self.timeline.len(), "Playback driver started");
        while !self.stop_flag.load(Ordering::Relaxed) {
            self.service();
            if self.cursor.is_playing && self.time_rate.should_tick(self.clock.elapsed_ns()) {
                let seconds = self.current_time();
                self.emit(PlaybackEvent::TimeUpdate { seconds });
            }
            tokio::time::sleep(SERVICE_TICK).await;
        }
        tracing::info!("Playback driver stopped");
    }

    /// Request the service loop to exit.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    // Internal helpers

    fn begin_load(&mut self, index: usize, autoplay: bool) {
        let Some(segment) = self.timeline.segment(index) else {
            self.finish();
            return;
        };
        let audio = segment.audio.clone();

        self.state = DriverState::Loading(index);
        self.cursor.active_segment_index = index;
        self.autoplay_on_ready = autoplay;
        self.emit(PlaybackEvent::SegmentChanged { index });
        tracing::debug!(segment = index, audio = %audio, autoplay, "Loading segment audio");

        if let Err(err) = self.sink.load(&audio) {
            self.handle_segment_failure(index, err.to_string());
        }
    }

    /// A failed asset is equivalent to a segment that played silently to
    /// its estimated end: notify, jump the cursor there, and advance.
    fn handle_segment_failure(&mut self, index: usize, message: String) {
        tracing::warn!(segment = index, message = %message, "Segment failed; skipping");
        self.emit(PlaybackEvent::SegmentFailed {
            index,
            message,
        });
        self.pending_seek_secs = None;
        self.cursor.last_known_secs = self.segment_end(index);
        self.advance_from(index);
    }

    /// Schedule or perform the advance that follows segment `index`.
    fn advance_from(&mut self, index: usize) {
        if index + 1 >= self.timeline.len() {
            self.finish();
            return;
        }

        let delay = self.timeline.inter_segment_delay();
        if delay > 0.0 {
            // The visual holds the finished segment through its display
            // window; the mapper reports it as active until the
            // deadline fires.
            self.delay_deadline = Some(Instant::now() + Duration::from_secs_f64(delay));
            tracing::debug!(segment = index, delay_secs = delay, "Holding through inter-segment delay");
        } else {
            let autoplay = self.cursor.is_playing;
            self.begin_load(index + 1, autoplay);
        }
    }

    fn finish(&mut self) {
        self.sink.clear();
        self.state = DriverState::Ended;
        self.cursor.is_playing = false;
        self.cursor.last_known_secs = self.timeline.total_duration();
        self.delay_deadline = None;
        self.pending_seek_secs = None;
        tracing::debug!("Playback reached the end of the timeline");
        self.emit(PlaybackEvent::Ended);
    }

    fn segment_end(&self, index: usize) -> f64 {
        self.timeline
            .segment(index)
            .map(|s| s.end_secs())
            .unwrap_or_else(|| self.timeline.total_duration())
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}
