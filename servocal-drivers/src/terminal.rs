//! Keyboard input through crossterm
//!
//! Keys:
//! - `q`, `Esc`, `Ctrl+C`: cancel the run
//! - `Enter`, `Space`: continue
//! - `u` / `Up`, `d` / `Down`: hold a direction
//!
//! Most terminals only report key presses and auto-repeats, not releases.
//! A direction therefore counts as held while presses keep arriving within
//! the hold window, which has to outlast the OS key-repeat delay (commonly
//! 500-660 ms). Where the terminal reports release events they end the hold
//! immediately.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use log::{debug, warn};
use servocal_hal::{Direction, InputSource};

/// How long a direction stays held after its last key event, by default
pub const DEFAULT_HOLD_WINDOW: Duration = Duration::from_millis(750);

/// What a key means to the bench
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Cancel,
    Continue,
    Press(Direction),
    Release(Direction),
}

/// Map a terminal key event to an action
pub fn map_key(key: &KeyEvent) -> Option<KeyAction> {
    let direction = match key.code {
        KeyCode::Up | KeyCode::Char('u') | KeyCode::Char('U') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Down),
        _ => None,
    };
    if let Some(direction) = direction {
        return Some(match key.kind {
            KeyEventKind::Release => KeyAction::Release(direction),
            _ => KeyAction::Press(direction),
        });
    }

    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Cancel)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(KeyAction::Cancel),
        KeyCode::Enter | KeyCode::Char(' ') => Some(KeyAction::Continue),
        _ => None,
    }
}

/// Input state accumulated from key actions
#[derive(Debug, Clone)]
pub struct KeyState {
    hold_window: Duration,
    cancelled: bool,
    pending_continue: bool,
    up_seen: Option<Instant>,
    down_seen: Option<Instant>,
}

impl Default for KeyState {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_WINDOW)
    }
}

impl KeyState {
    pub fn new(hold_window: Duration) -> Self {
        Self {
            hold_window,
            cancelled: false,
            pending_continue: false,
            up_seen: None,
            down_seen: None,
        }
    }

    pub fn apply(&mut self, action: KeyAction, now: Instant) {
        match action {
            KeyAction::Cancel => self.cancelled = true,
            KeyAction::Continue => self.pending_continue = true,
            KeyAction::Press(direction) => {
                if let Some(slot) = self.slot(direction) {
                    *slot = Some(now);
                }
            }
            KeyAction::Release(direction) => {
                if let Some(slot) = self.slot(direction) {
                    *slot = None;
                }
            }
        }
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Consume a pending continue
    pub fn take_continue(&mut self) -> bool {
        core::mem::take(&mut self.pending_continue)
    }

    pub fn is_held(&self, direction: Direction, now: Instant) -> bool {
        let seen = match direction {
            Direction::Up => self.up_seen,
            Direction::Down => self.down_seen,
            Direction::Neutral => return false,
        };
        seen.is_some_and(|at| now.saturating_duration_since(at) < self.hold_window)
    }

    fn slot(&mut self, direction: Direction) -> Option<&mut Option<Instant>> {
        match direction {
            Direction::Up => Some(&mut self.up_seen),
            Direction::Down => Some(&mut self.down_seen),
            Direction::Neutral => None,
        }
    }
}

/// Non-blocking keyboard input in raw mode
///
/// Raw mode is enabled on creation and restored on drop.
pub struct TerminalInput {
    state: KeyState,
    enhanced: bool,
}

impl TerminalInput {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        debug!("Terminal input ready (release events: {})", enhanced);
        Ok(Self {
            state: KeyState::default(),
            enhanced,
        })
    }

    /// Keep a direction held for `window` after its last key event
    pub fn with_hold_window(mut self, window: Duration) -> Self {
        debug!("Hold window {:?}", window);
        self.state = KeyState::new(window);
        self
    }

    /// Drain every pending terminal event without blocking
    fn drain(&mut self) {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    warn!("Terminal poll failed: {}", err);
                    break;
                }
            }
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(action) = map_key(&key) {
                        self.state.apply(action, Instant::now());
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("Terminal read failed: {}", err);
                    break;
                }
            }
        }
    }
}

impl InputSource for TerminalInput {
    fn cancel_requested(&mut self) -> bool {
        self.drain();
        self.state.cancelled()
    }

    fn continue_requested(&mut self) -> bool {
        self.drain();
        self.state.take_continue()
    }

    fn is_held(&mut self, direction: Direction) -> bool {
        self.drain();
        self.state.is_held(direction, Instant::now())
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        if let Err(err) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal: {}", err);
        }
    }
}
