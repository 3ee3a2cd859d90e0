use crate::error::TrafficError;

/// Approach lane of the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    North,
    South,
    East,
    West,
}

impl Lane {
    /// All lanes in observation order
    pub const ALL: [Lane; 4] = [Lane::North, Lane::South, Lane::East, Lane::West];

    /// Position of this lane in `Lane::ALL`
    pub fn index(&self) -> usize {
        match self {
            Lane::North => 0,
            Lane::South => 1,
            Lane::East => 2,
            Lane::West => 3,
        }
    }

    /// The signal phase under which this lane has a green light
    pub fn green_phase(&self) -> SignalPhase {
        match self {
            Lane::North | Lane::South => SignalPhase::NsGreen,
            Lane::East | Lane::West => SignalPhase::EwGreen,
        }
    }

    /// Single-letter label used by the renderer
    pub fn label(&self) -> &'static str {
        match self {
            Lane::North => "N",
            Lane::South => "S",
            Lane::East => "E",
            Lane::West => "W",
        }
    }
}

/// Which axis currently has the green light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalPhase {
    /// North-south traffic flows
    #[default]
    NsGreen,
    /// East-west traffic flows
    EwGreen,
}

impl SignalPhase {
    /// Numeric encoding used in observations (0 or 1)
    pub fn as_index(&self) -> u8 {
        match self {
            SignalPhase::NsGreen => 0,
            SignalPhase::EwGreen => 1,
        }
    }
}

/// Control action applied to the signal at each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalAction {
    /// Give north-south the green light and restart the phase timer
    SwitchNs,
    /// Give east-west the green light and restart the phase timer
    SwitchEw,
    /// Keep the current phase and advance the phase timer
    Extend,
}

impl SignalAction {
    /// Size of the discrete action space
    pub const COUNT: usize = 3;

    /// All actions in index order
    pub const ALL: [SignalAction; 3] = [
        SignalAction::SwitchNs,
        SignalAction::SwitchEw,
        SignalAction::Extend,
    ];

    /// Discrete index of this action
    pub fn index(&self) -> usize {
        match self {
            SignalAction::SwitchNs => 0,
            SignalAction::SwitchEw => 1,
            SignalAction::Extend => 2,
        }
    }

    /// Returns true for the two explicit phase switches
    pub fn is_switch(&self) -> bool {
        !matches!(self, SignalAction::Extend)
    }
}

impl TryFrom<usize> for SignalAction {
    type Error = TrafficError;

    fn try_from(idx: usize) -> Result<Self, Self::Error> {
        match idx {
            0 => Ok(SignalAction::SwitchNs),
            1 => Ok(SignalAction::SwitchEw),
            2 => Ok(SignalAction::Extend),
            other => Err(TrafficError::InvalidAction(other)),
        }
    }
}
