//! Frame request coalescing.

use noteflow_core::Instant;

/// Tracks whether a frame is wanted and whether one is being drawn.
///
/// Any number of requests before the next frame collapse into one. A request
/// made while a frame is in flight is held until that frame ends, so frames
/// never stack.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: bool,
    in_flight: bool,
    collapsed: u64,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a frame. Returns false if one was already pending.
    pub fn request_frame(&mut self) -> bool {
        if self.pending {
            self.collapsed += 1;
            return false;
        }
        self.pending = true;
        true
    }

    /// Start the pending frame, if any and none is in flight.
    pub fn begin_frame(&mut self) -> bool {
        if self.in_flight || !self.pending {
            return false;
        }
        self.pending = false;
        self.in_flight = true;
        true
    }

    pub fn end_frame(&mut self, now: Instant) {
        if !self.in_flight {
            log::warn!("end_frame called without a frame in flight");
        }
        self.in_flight = false;
        self.last_frame = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Requests that were folded into an already pending frame.
    pub fn collapsed_requests(&self) -> u64 {
        self.collapsed
    }

    pub fn last_frame(&self) -> Option<Instant> {
        self.last_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_collapse() {
        let mut scheduler = FrameScheduler::new();
        assert!(scheduler.request_frame());
        assert!(!scheduler.request_frame());
        assert!(!scheduler.request_frame());
        assert_eq!(scheduler.collapsed_requests(), 2);
        assert!(scheduler.begin_frame());
        assert!(!scheduler.begin_frame());
    }

    #[test]
    fn test_request_during_flight_waits() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request_frame();
        assert!(scheduler.begin_frame());
        scheduler.request_frame();
        scheduler.request_frame();
        assert!(!scheduler.begin_frame());
        scheduler.end_frame(Instant::now());
        assert!(scheduler.last_frame().is_some());
        assert!(scheduler.begin_frame());
        scheduler.end_frame(Instant::now());
        assert!(!scheduler.begin_frame());
    }

    #[test]
    fn test_no_frame_without_request() {
        let mut scheduler = FrameScheduler::new();
        assert!(!scheduler.begin_frame());
        assert!(!scheduler.is_pending());
    }
}
