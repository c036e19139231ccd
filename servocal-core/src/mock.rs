//! Test doubles for the collaborator traits
//!
//! [`MockPort`] records every register batch, [`ManualClock`] only advances
//! when slept on, and [`ScriptedInput`] plays back operator input against
//! that clock. Together they run the sequencer deterministically and without
//! real waiting. Clones share state, so a test can keep a handle while a
//! [`servocal_hal::Session`] owns the other.

use core::ops::Range;
use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::NaiveDateTime;
use servocal_hal::{
    Clock, Device, DeviceInfo, DeviceSelector, Direction, InputSource, PortError, RegisterBatch,
    RegisterPort,
};

#[derive(Default)]
struct PortInner {
    registers: BTreeMap<String, f64>,
    writes: Vec<RegisterBatch>,
    write_budget: Option<usize>,
    read_budget: Option<usize>,
    reads: usize,
    closes: u32,
}

/// In-memory register port
///
/// Unknown registers read as `0.0`. A failing write applies nothing.
#[derive(Clone, Default)]
pub struct MockPort {
    inner: Rc<RefCell<PortInner>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a register value returned by reads
    pub fn with_reading(self, name: &str, value: f64) -> Self {
        self.inner.borrow_mut().registers.insert(name.into(), value);
        self
    }

    /// Let `n` more write batches succeed, then fail every one after
    pub fn fail_writes_after(&self, n: usize) {
        self.inner.borrow_mut().write_budget = Some(n);
    }

    /// Let `n` more read batches succeed, then fail every one after
    pub fn fail_reads_after(&self, n: usize) {
        self.inner.borrow_mut().read_budget = Some(n);
    }

    /// Current value of a register, if it was ever written or preset
    pub fn register(&self, name: &str) -> Option<f64> {
        self.inner.borrow().registers.get(name).copied()
    }

    /// Successfully applied batches, in order
    pub fn writes(&self) -> Vec<RegisterBatch> {
        self.inner.borrow().writes.clone()
    }

    /// Number of successful read batches
    pub fn read_count(&self) -> usize {
        self.inner.borrow().reads
    }

    /// Number of times the device was closed
    pub fn close_count(&self) -> u32 {
        self.inner.borrow().closes
    }
}

fn take_budget(budget: &mut Option<usize>) -> bool {
    match budget {
        Some(0) => false,
        Some(n) => {
            *n -= 1;
            true
        }
        None => true,
    }
}

impl RegisterPort for MockPort {
    fn write_registers(&mut self, batch: &RegisterBatch) -> Result<(), PortError> {
        let mut inner = self.inner.borrow_mut();
        if !take_budget(&mut inner.write_budget) {
            return Err(PortError::Transport("injected write failure".into()));
        }
        for (name, value) in batch.iter() {
            inner.registers.insert(name.into(), value);
        }
        inner.writes.push(batch.clone());
        Ok(())
    }

    fn read_registers(&mut self, names: &[String]) -> Result<Vec<f64>, PortError> {
        let mut inner = self.inner.borrow_mut();
        if !take_budget(&mut inner.read_budget) {
            return Err(PortError::Transport("injected read failure".into()));
        }
        inner.reads += 1;
        Ok(names
            .iter()
            .map(|name| inner.registers.get(name).copied().unwrap_or(0.0))
            .collect())
    }
}

impl Device for MockPort {
    fn open(_selector: &DeviceSelector) -> Result<Self, PortError> {
        Ok(Self::new())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            device_type: "MOCK".into(),
            connection_type: "MEMORY".into(),
            serial_number: 0,
            address: None,
        }
    }

    fn close(&mut self) {
        self.inner.borrow_mut().closes += 1;
    }
}

/// Clock that advances only when slept on
#[derive(Clone)]
pub struct ManualClock {
    elapsed: Rc<Cell<Duration>>,
    base: NaiveDateTime,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(NaiveDateTime::default())
    }

    /// Clock whose wall time starts at `base`
    pub fn starting_at(base: NaiveDateTime) -> Self {
        Self {
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
            base,
        }
    }

    /// Move time forward without sleeping
    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }

    fn wall_time(&self) -> NaiveDateTime {
        let offset = chrono::Duration::from_std(self.elapsed.get())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + offset
    }
}

/// Operator input played back against a [`ManualClock`]
pub struct ScriptedInput {
    clock: ManualClock,
    cancel_at: Option<Duration>,
    cancel_after_polls: Option<usize>,
    cancel_polls: usize,
    cancelled: bool,
    confirm_every: Option<usize>,
    continue_polls: usize,
    holds: Vec<(Direction, Range<Duration>)>,
}

impl ScriptedInput {
    /// Input that never cancels, confirms or holds anything
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            cancel_at: None,
            cancel_after_polls: None,
            cancel_polls: 0,
            cancelled: false,
            confirm_every: None,
            continue_polls: 0,
            holds: Vec::new(),
        }
    }

    /// Request cancel once the clock reaches `at`
    pub fn cancel_at(mut self, at: Duration) -> Self {
        self.cancel_at = Some(at);
        self
    }

    /// Request cancel on the poll after `polls` cancel checks
    pub fn cancel_after_polls(mut self, polls: usize) -> Self {
        self.cancel_after_polls = Some(polls);
        self
    }

    /// Confirm "continue" on every `n`th continue poll
    pub fn confirm_every(mut self, n: usize) -> Self {
        self.confirm_every = Some(n.max(1));
        self
    }

    /// Hold `direction` while the clock is within `during`
    pub fn hold(mut self, direction: Direction, during: Range<Duration>) -> Self {
        self.holds.push((direction, during));
        self
    }
}

impl InputSource for ScriptedInput {
    fn cancel_requested(&mut self) -> bool {
        self.cancel_polls += 1;
        let by_time = self.cancel_at.is_some_and(|at| self.clock.elapsed() >= at);
        let by_polls = self
            .cancel_after_polls
            .is_some_and(|polls| self.cancel_polls > polls);
        self.cancelled |= by_time || by_polls;
        self.cancelled
    }

    fn continue_requested(&mut self) -> bool {
        let Some(every) = self.confirm_every else {
            return false;
        };
        self.continue_polls += 1;
        self.continue_polls % every == 0
    }

    fn is_held(&mut self, direction: Direction) -> bool {
        let now = self.clock.elapsed();
        self.holds
            .iter()
            .any(|(held, during)| *held == direction && during.contains(&now))
    }
}
