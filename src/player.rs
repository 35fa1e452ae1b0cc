// src/player.rs
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use crate::drivers::{DaqError, RingBuffer};
use crate::types::PlaybackEvent;

/// Base refresh rate of playback at 1x.
pub const BASE_TICKS_PER_SECOND: u32 = 60;

/// A complete, immutable `channels x frames` recording.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    data: Array2<f64>,
}

impl Dataset {
    pub fn new(data: Array2<f64>) -> Result<Self, DaqError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(DaqError::InvalidInput(format!(
                "dataset must have at least one channel and one frame, got {:?}",
                data.dim()
            )));
        }
        Ok(Self { data })
    }

    /// Everything the buffer currently holds, oldest first.
    pub fn from_buffer(buffer: &RingBuffer) -> Result<Self, DaqError> {
        Self::new(buffer.contents().to_owned())
    }

    pub fn channel_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn frame_count(&self) -> usize {
        self.data.ncols()
    }

    /// All channels at one time index.
    pub fn frame(&self, index: usize) -> Option<ArrayView1<f64>> {
        (index < self.frame_count()).then(|| self.data.index_axis(Axis(1), index))
    }

    pub fn view(&self) -> ArrayView2<f64> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackSpeed {
    #[default]
    X1,
    X2,
    X4,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 3] = [PlaybackSpeed::X1, PlaybackSpeed::X2, PlaybackSpeed::X4];

    pub fn multiplier(self) -> u32 {
        match self {
            PlaybackSpeed::X1 => 1,
            PlaybackSpeed::X2 => 2,
            PlaybackSpeed::X4 => 4,
        }
    }

    pub fn from_multiplier(multiplier: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.multiplier() == multiplier)
    }

    /// Parses labels such as `"2x"`; anything unrecognized plays at 1x.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// `1000ms / (60 * speed)`, truncated to whole milliseconds.
    pub fn tick_interval(self) -> Duration {
        Duration::from_millis(u64::from(1000 / (BASE_TICKS_PER_SECOND * self.multiplier())))
    }
}

impl FromStr for PlaybackSpeed {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches(['x', 'X']);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_multiplier)
            .ok_or_else(|| DaqError::InvalidInput(format!("unknown playback speed {s:?}")))
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Single-threaded periodic timer polled by its owner.
#[derive(Clone, Debug, Default)]
pub struct PlaybackTimer {
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl PlaybackTimer {
    pub fn start(&mut self, interval: Duration, now: Instant) {
        self.interval = Some(interval);
        self.next_due = Some(now + interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Consumes one due tick, scheduling the next.
    ///
    /// Ticks missed by a late poll are dropped: the schedule is re-anchored to
    /// `now` so at most one overdue tick fires.
    fn take_due(&mut self, now: Instant) -> bool {
        match (self.interval, self.next_due) {
            (Some(interval), Some(due)) if due <= now => {
                let next = due + interval;
                self.next_due = Some(if next <= now { now + interval } else { next });
                true
            }
            _ => false,
        }
    }
}

/// Replays a [`Dataset`] frame by frame.
///
/// Runs entirely on its owner's thread: nothing ticks unless [`poll`](Self::poll),
/// [`tick`](Self::tick) or [`run_blocking`](Self::run_blocking) is called.
/// Every operation is a no-op until a dataset is loaded.
pub struct PlaybackEngine {
    dataset: Option<Arc<Dataset>>,
    current_frame: usize,
    state: PlaybackState,
    speed: PlaybackSpeed,
    timer: PlaybackTimer,
    events: Sender<PlaybackEvent>,
}

impl PlaybackEngine {
    pub fn new(events: Sender<PlaybackEvent>) -> Self {
        Self {
            dataset: None,
            current_frame: 0,
            state: PlaybackState::Stopped,
            speed: PlaybackSpeed::default(),
            timer: PlaybackTimer::default(),
            events,
        }
    }

    pub fn load_dataset(&mut self, dataset: Arc<Dataset>) {
        log::info!(
            "loaded dataset: {} channels x {} frames",
            dataset.channel_count(),
            dataset.frame_count()
        );
        self.timer.stop();
        self.dataset = Some(dataset);
        self.current_frame = 0;
        self.state = PlaybackState::Paused;
    }

    pub fn play(&mut self) {
        if self.dataset.is_none() {
            return;
        }
        self.state = PlaybackState::Playing;
        self.timer.start(self.speed.tick_interval(), Instant::now());
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
        self.timer.stop();
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
        if self.state == PlaybackState::Playing {
            self.timer.start(speed.tick_interval(), Instant::now());
        }
    }

    /// Moves to `frame`, clamped into the dataset, and emits the frame.
    pub fn seek(&mut self, frame: i64) {
        let Some(total) = self.dataset.as_ref().map(|d| d.frame_count()) else {
            return;
        };
        let last = (total - 1) as i64;
        self.current_frame = frame.clamp(0, last) as usize;
        self.emit_frame();
    }

    /// Runs every tick due at `now`. Returns how many ran.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while self.state == PlaybackState::Playing && self.timer.take_due(now) {
            self.tick();
            ran += 1;
        }
        ran
    }

    /// One timer tick: advance a frame, or finish at the last one.
    pub fn tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(total) = self.dataset.as_ref().map(|d| d.frame_count()) else {
            return;
        };
        if self.current_frame + 1 < total {
            self.current_frame += 1;
            self.emit_frame();
        } else {
            self.pause();
            log::debug!("playback reached frame {}", self.current_frame);
            self.events.send(PlaybackEvent::Finished).ok();
        }
    }

    /// Drives the timer on the calling thread until playback pauses.
    pub fn run_blocking(&mut self) {
        while self.state == PlaybackState::Playing {
            let Some(due) = self.timer.next_due() else {
                break;
            };
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
            self.poll(Instant::now());
        }
    }

    fn emit_frame(&self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        if let Some(frame) = dataset.frame(self.current_frame) {
            let event = PlaybackEvent::FrameChanged {
                index: self.current_frame,
                frame: Array1::from_iter(frame.iter().copied()),
            };
            self.events.send(event).ok();
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn frame_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, |d| d.frame_count())
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn timer(&self) -> &PlaybackTimer {
        &self.timer
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// `"current / total"`, 1-based.
    pub fn position_label(&self) -> String {
        match &self.dataset {
            Some(d) => format!("{} / {}", self.current_frame + 1, d.frame_count()),
            None => "0 / 0".to_string(),
        }
    }
}
