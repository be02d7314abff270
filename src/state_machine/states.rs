use serde::{Deserialize, Serialize};
use std::fmt;

/// Transfer process state definitions with stable integer codes.
///
/// The codes are the persisted representation; stores index processes by
/// code, so the values must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferProcessState {
    /// Initial state when the process is created
    Initial,
    /// Resource provisioning has been requested
    Provisioning,
    /// All manifest resources are provisioned
    Provisioned,
    /// The data request is being dispatched to the other connector
    Requesting,
    /// The other connector acknowledged the data request
    Requested,
    /// A finite transfer is running
    InProgress,
    /// A non-finite transfer is running
    Streaming,
    /// The transfer finished; tear-down pending
    Completed,
    /// Resource deprovisioning has been requested
    Deprovisioning,
    /// All managed resources are released
    Deprovisioned,
    /// The process reached its end of life
    Ended,
    /// The process failed irrecoverably
    Error,
}

/// States the scheduler polls, in tick dispatch order. The order lets a
/// single tick carry a freshly created process as far as `Requesting`.
pub const ACTIVE_STATES: [TransferProcessState; 9] = [
    TransferProcessState::Initial,
    TransferProcessState::Provisioning,
    TransferProcessState::Provisioned,
    TransferProcessState::Requesting,
    TransferProcessState::Requested,
    TransferProcessState::InProgress,
    TransferProcessState::Streaming,
    TransferProcessState::Deprovisioning,
    TransferProcessState::Deprovisioned,
];

impl TransferProcessState {
    /// Stable integer code used by persistence adapters
    pub fn code(&self) -> i32 {
        match self {
            Self::Initial => 100,
            Self::Provisioning => 200,
            Self::Provisioned => 300,
            Self::Requesting => 400,
            Self::Requested => 500,
            Self::InProgress => 600,
            Self::Streaming => 650,
            Self::Completed => 700,
            Self::Deprovisioning => 800,
            Self::Deprovisioned => 900,
            Self::Ended => 1000,
            Self::Error => -1,
        }
    }

    /// Resolve a persisted code back to a state
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            100 => Some(Self::Initial),
            200 => Some(Self::Provisioning),
            300 => Some(Self::Provisioned),
            400 => Some(Self::Requesting),
            500 => Some(Self::Requested),
            600 => Some(Self::InProgress),
            650 => Some(Self::Streaming),
            700 => Some(Self::Completed),
            800 => Some(Self::Deprovisioning),
            900 => Some(Self::Deprovisioned),
            1000 => Some(Self::Ended),
            -1 => Some(Self::Error),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Error)
    }

    /// Check whether `target` is a legal successor of this state.
    ///
    /// `Error` is reachable from every non-terminal state; terminal states
    /// have no successors.
    pub fn can_transition_to(&self, target: TransferProcessState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == Self::Error {
            return true;
        }
        matches!(
            (self, target),
            (Self::Initial, Self::Provisioning)
                | (Self::Initial, Self::Provisioned)
                | (Self::Provisioning, Self::Provisioned)
                | (Self::Provisioned, Self::Requesting)
                | (Self::Provisioned, Self::InProgress)
                | (Self::Requesting, Self::Requested)
                | (Self::Requested, Self::InProgress)
                | (Self::Requested, Self::Streaming)
                | (Self::InProgress, Self::Completed)
                | (Self::Streaming, Self::Completed)
                | (Self::Completed, Self::Deprovisioning)
                | (Self::Completed, Self::Deprovisioned)
                | (Self::Deprovisioning, Self::Deprovisioned)
                | (Self::Deprovisioned, Self::Ended)
        )
    }
}

impl fmt::Display for TransferProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::Provisioned => write!(f, "provisioned"),
            Self::Requesting => write!(f, "requesting"),
            Self::Requested => write!(f, "requested"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Streaming => write!(f, "streaming"),
            Self::Completed => write!(f, "completed"),
            Self::Deprovisioning => write!(f, "deprovisioning"),
            Self::Deprovisioned => write!(f, "deprovisioned"),
            Self::Ended => write!(f, "ended"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for TransferProcessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Self::Initial),
            "provisioning" => Ok(Self::Provisioning),
            "provisioned" => Ok(Self::Provisioned),
            "requesting" => Ok(Self::Requesting),
            "requested" => Ok(Self::Requested),
            "in_progress" => Ok(Self::InProgress),
            "streaming" => Ok(Self::Streaming),
            "completed" => Ok(Self::Completed),
            "deprovisioning" => Ok(Self::Deprovisioning),
            "deprovisioned" => Ok(Self::Deprovisioned),
            "ended" => Ok(Self::Ended),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid transfer process state: {s}")),
        }
    }
}

impl Default for TransferProcessState {
    fn default() -> Self {
        Self::Initial
    }
}
