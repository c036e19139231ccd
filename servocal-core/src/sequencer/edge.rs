//! Held-key edge tracking for interactive runs

use servocal_hal::Direction;

/// Change of a held input between two polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Steady,
}

/// Turns a polled level into edges
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    held: bool,
}

impl EdgeDetector {
    /// Feed the latest level and report the edge
    pub fn update(&mut self, held: bool) -> Edge {
        let edge = match (self.held, held) {
            (false, true) => Edge::Rising,
            (true, false) => Edge::Falling,
            _ => Edge::Steady,
        };
        self.held = held;
        edge
    }

    /// Level seen by the last update
    pub fn is_held(&self) -> bool {
        self.held
    }
}

/// Commanded direction derived from up/down key edges
///
/// A press commands that direction (up wins when both are pressed in the
/// same poll). Releasing the commanded key falls back to the other key if it
/// is still held, otherwise to neutral. Releasing a key that is not the
/// commanded one changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionTracker {
    up: EdgeDetector,
    down: EdgeDetector,
    commanded: Direction,
}

impl DirectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commanded(&self) -> Direction {
        self.commanded
    }

    /// Feed one poll; returns the new direction when the command changes
    pub fn update(&mut self, up_held: bool, down_held: bool) -> Option<Direction> {
        let up = self.up.update(up_held);
        let down = self.down.update(down_held);

        let released = match self.commanded {
            Direction::Up => up == Edge::Falling,
            Direction::Down => down == Edge::Falling,
            Direction::Neutral => false,
        };

        let next = if up == Edge::Rising {
            Direction::Up
        } else if down == Edge::Rising {
            Direction::Down
        } else if released {
            if self.up.is_held() {
                Direction::Up
            } else if self.down.is_held() {
                Direction::Down
            } else {
                Direction::Neutral
            }
        } else {
            self.commanded
        };

        if next == self.commanded {
            None
        } else {
            self.commanded = next;
            Some(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let mut edge = EdgeDetector::default();
        assert_eq!(edge.update(false), Edge::Steady);
        assert_eq!(edge.update(true), Edge::Rising);
        assert_eq!(edge.update(true), Edge::Steady);
        assert_eq!(edge.update(false), Edge::Falling);
    }

    #[test]
    fn test_press_and_release() {
        let mut tracker = DirectionTracker::new();
        assert_eq!(tracker.update(true, false), Some(Direction::Up));
        assert_eq!(tracker.update(true, false), None);
        assert_eq!(tracker.update(false, false), Some(Direction::Neutral));
    }

    #[test]
    fn test_release_falls_back_to_other_key() {
        let mut tracker = DirectionTracker::new();
        tracker.update(true, false);
        // Down pressed while up is held takes over
        assert_eq!(tracker.update(true, true), Some(Direction::Down));
        // Releasing up does not change the command
        assert_eq!(tracker.update(false, true), None);
        assert_eq!(tracker.update(false, false), Some(Direction::Neutral));
    }

    #[test]
    fn test_release_of_commanded_returns_to_held() {
        let mut tracker = DirectionTracker::new();
        tracker.update(true, false);
        tracker.update(true, true);
        assert_eq!(tracker.commanded(), Direction::Down);
        assert_eq!(tracker.update(true, false), Some(Direction::Up));
    }

    #[test]
    fn test_up_wins_simultaneous_press() {
        let mut tracker = DirectionTracker::new();
        assert_eq!(tracker.update(true, true), Some(Direction::Up));
    }
}
