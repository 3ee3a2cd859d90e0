use super::action::{Lane, SignalPhase};

/// Vehicles queued on one approach lane
///
/// Positions are distances measured toward the exit boundary; the vehicle
/// count is derived from the sequence, so it cannot drift from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneState {
    positions: Vec<i32>,
}

impl LaneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vehicles in the lane
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Vehicle positions in arrival order
    pub fn positions(&self) -> &[i32] {
        &self.positions
    }

    pub(crate) fn push(&mut self, position: i32) {
        self.positions.push(position);
    }

    /// Advance every vehicle before `stop_line` by `step`
    pub(crate) fn advance(&mut self, stop_line: i32, step: i32) {
        for pos in self.positions.iter_mut() {
            if *pos < stop_line {
                *pos += step;
            }
        }
    }

    /// Drop vehicles beyond `boundary`, returning how many left
    pub(crate) fn remove_exited(&mut self, boundary: i32) -> usize {
        let before = self.positions.len();
        self.positions.retain(|&pos| pos <= boundary);
        before - self.positions.len()
    }
}

/// Complete intersection state
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionState {
    pub lanes: [LaneState; 4],
    pub signal: SignalPhase,
    pub phase_time: u32,
    pub step_count: u32,
}

impl IntersectionState {
    /// Create an empty intersection with the north-south phase green
    pub fn new() -> Self {
        Self {
            lanes: Default::default(),
            signal: SignalPhase::NsGreen,
            phase_time: 0,
            step_count: 0,
        }
    }

    pub fn lane(&self, lane: Lane) -> &LaneState {
        &self.lanes[lane.index()]
    }

    pub fn lane_mut(&mut self, lane: Lane) -> &mut LaneState {
        &mut self.lanes[lane.index()]
    }

    /// Vehicle counts in `Lane::ALL` order
    pub fn lane_counts(&self) -> [usize; 4] {
        [
            self.lanes[0].count(),
            self.lanes[1].count(),
            self.lanes[2].count(),
            self.lanes[3].count(),
        ]
    }

    /// Total number of vehicles waiting across all lanes
    pub fn total_vehicles(&self) -> usize {
        self.lanes.iter().map(LaneState::count).sum()
    }

    /// Check if the given lane currently has a green light
    pub fn is_green(&self, lane: Lane) -> bool {
        lane.green_phase() == self.signal
    }
}

impl Default for IntersectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_count_tracks_positions() {
        let mut lane = LaneState::new();
        assert_eq!(lane.count(), 0);

        lane.push(300);
        lane.push(260);
        assert_eq!(lane.count(), 2);
        assert_eq!(lane.positions(), &[300, 260]);
    }

    #[test]
    fn test_advance_stops_at_stop_line() {
        let mut lane = LaneState::new();
        lane.push(300);
        lane.push(296);
        lane.push(100);

        lane.advance(300, 5);

        assert_eq!(lane.positions(), &[300, 301, 105]);
    }

    #[test]
    fn test_remove_exited() {
        let mut lane = LaneState::new();
        lane.push(601);
        lane.push(600);
        lane.push(700);

        let exited = lane.remove_exited(600);

        assert_eq!(exited, 2);
        assert_eq!(lane.positions(), &[600]);
        assert_eq!(lane.count(), 1);
    }

    #[test]
    fn test_new_state() {
        let state = IntersectionState::new();
        assert_eq!(state.signal, SignalPhase::NsGreen);
        assert_eq!(state.phase_time, 0);
        assert_eq!(state.step_count, 0);
        assert_eq!(state.total_vehicles(), 0);
    }

    #[test]
    fn test_green_lanes() {
        let mut state = IntersectionState::new();
        assert!(state.is_green(Lane::North));
        assert!(!state.is_green(Lane::East));

        state.signal = SignalPhase::EwGreen;
        assert!(state.is_green(Lane::West));
        assert!(!state.is_green(Lane::South));
    }

    #[test]
    fn test_lane_counts_order() {
        let mut state = IntersectionState::new();
        state.lane_mut(Lane::East).push(300);
        state.lane_mut(Lane::East).push(260);
        state.lane_mut(Lane::South).push(300);

        assert_eq!(state.lane_counts(), [0, 1, 2, 0]);
        assert_eq!(state.total_vehicles(), 3);
    }
}
