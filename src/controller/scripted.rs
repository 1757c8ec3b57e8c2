//! Scripted device for tests and offline runs
//!
//! [`ScriptedSampler`] replays queued [`RawSample`]s, one per `pump`, and keeps
//! repeating the last one once the queue runs dry. Clones share state, so a test
//! can keep a handle while the sampler itself is owned by a calibrator or a
//! streamer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::device::{DeviceError, DeviceIdentity, DeviceSampler, HatState, RawSample};

#[derive(Debug, Default)]
struct ScriptState {
    identity: DeviceIdentity,
    present: bool,
    open: bool,
    queue: VecDeque<RawSample>,
    current: RawSample,
    pumps: usize,
    opens: usize,
    releases: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedSampler {
    /// Creates a sampler with one attached device
    pub fn new(name: impl Into<String>, guid: Option<&str>) -> Self {
        let sampler = Self::default();
        {
            let mut state = sampler.lock();
            state.identity = DeviceIdentity {
                name: name.into(),
                guid: guid.map(str::to_string),
            };
            state.present = true;
        }
        sampler
    }

    /// Creates a sampler with nothing attached
    pub fn empty() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self) {
        self.lock().present = true;
    }

    /// Simulates unplugging: the system reports zero devices from now on
    pub fn disconnect(&self) {
        self.lock().present = false;
    }

    /// Queues a sample to be returned after the next `pump`
    pub fn push(&self, sample: RawSample) {
        self.lock().queue.push_back(sample);
    }

    /// Replaces the held sample immediately and clears the queue
    pub fn set_current(&self, sample: RawSample) {
        let mut state = self.lock();
        state.queue.clear();
        state.current = sample;
    }

    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn pump_count(&self) -> usize {
        self.lock().pumps
    }

    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    pub fn release_count(&self) -> usize {
        self.lock().releases
    }

    fn read<T>(&self, f: impl FnOnce(&RawSample) -> T, fallback: T) -> T {
        let state = self.lock();
        if state.open {
            f(&state.current)
        } else {
            fallback
        }
    }
}

impl DeviceSampler for ScriptedSampler {
    fn pump(&mut self) {
        let mut state = self.lock();
        state.pumps += 1;
        if let Some(next) = state.queue.pop_front() {
            state.current = next;
        }
    }

    fn device_count(&self) -> usize {
        usize::from(self.lock().present)
    }

    fn open(&mut self, index: usize) -> Result<DeviceIdentity, DeviceError> {
        let mut state = self.lock();
        if !state.present || index != 0 {
            return Err(DeviceError::NoDevice(index));
        }
        state.open = true;
        state.opens += 1;
        debug!("Scripted device opened: {}", state.identity.name);
        Ok(state.identity.clone())
    }

    fn release(&mut self) {
        let mut state = self.lock();
        if state.open {
            state.open = false;
            state.releases += 1;
        }
    }

    fn axis_count(&self) -> usize {
        self.read(|s| s.axes.len(), 0)
    }

    fn button_count(&self) -> usize {
        self.read(|s| s.buttons.len(), 0)
    }

    fn hat_count(&self) -> usize {
        self.read(|s| s.hats.len(), 0)
    }

    fn axis(&self, index: usize) -> f32 {
        self.read(|s| s.axis(index).unwrap_or(0.0), 0.0)
    }

    fn button(&self, index: usize) -> bool {
        self.read(|s| s.button(index), false)
    }

    fn hat(&self, index: usize) -> HatState {
        self.read(|s| s.hat(index), HatState::CENTERED)
    }
}
