use std::fmt;

/// Number of EMG sensor pods on the armband.
pub const EMG_CHANNELS: usize = 8;

/// One frame of raw EMG samples, one signed byte per sensor.
pub type EmgFrame = [i8; EMG_CHANNELS];

bitflags::bitflags! {
    /// Listener capability bitmap: one bit per handler kind.
    ///
    /// Computed once when a listener is registered and handed to the engine
    /// so that events nobody handles are never marshaled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(C)]
    pub struct Capabilities: u16 {
        const PAIR             = 1 << 0;
        const UNPAIR           = 1 << 1;
        const CONNECT          = 1 << 2;
        const DISCONNECT       = 1 << 3;
        const ARM_SYNC         = 1 << 4;
        const ARM_UNSYNC       = 1 << 5;
        const LOCK             = 1 << 6;
        const UNLOCK           = 1 << 7;
        const POSE             = 1 << 8;
        const ORIENTATION      = 1 << 9;
        const ACCELEROMETER    = 1 << 10;
        const GYROSCOPE        = 1 << 11;
        const RSSI             = 1 << 12;
        const BATTERY_LEVEL    = 1 << 13;
        const EMG              = 1 << 14;
        const WARMUP_COMPLETED = 1 << 15;
    }
}

/// Firmware version reported on pair and connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Hardware revision; not part of firmware compatibility checks.
    pub hardware_rev: u32,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} (rev {})",
            self.major, self.minor, self.patch, self.hardware_rev
        )
    }
}

/// Which arm the Myo is synced to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arm {
    Right = 0,
    Left = 1,
    Unknown = 2,
}

/// Direction of the Myo's +x axis relative to the user's arm.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XDirection {
    TowardWrist = 0,
    TowardElbow = 1,
    Unknown = 2,
}

/// Warmup state reported with an arm sync.
///
/// A `Cold` device emits a warmup-completed event once it is ready.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarmupState {
    Unknown = 0,
    Cold = 1,
    Warm = 2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarmupResult {
    Unknown = 0,
    Success = 1,
    FailedTimeout = 2,
}

/// Hand pose classified by the engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pose {
    Rest = 0,
    Fist = 1,
    WaveIn = 2,
    WaveOut = 3,
    FingersSpread = 4,
    DoubleTap = 5,
    Unknown = 0xffff,
}

impl Pose {
    pub fn name(&self) -> &'static str {
        match self {
            Pose::Rest => "rest",
            Pose::Fist => "fist",
            Pose::WaveIn => "waveIn",
            Pose::WaveOut => "waveOut",
            Pose::FingersSpread => "fingersSpread",
            Pose::DoubleTap => "doubleTap",
            Pose::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hub-wide locking policy.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockingPolicy {
    /// Pose events are always sent.
    None = 0,
    /// Pose events are only sent while the Myo is unlocked.
    Standard = 1,
}

impl LockingPolicy {
    /// Numeric policy code, for engines backed by a C library.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Parse a policy name as used in configuration (`none` / `standard`).
    pub fn parse(name: &str) -> Option<LockingPolicy> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(LockingPolicy::None),
            "standard" => Some(LockingPolicy::Standard),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VibrationType {
    Short = 0,
    Medium = 1,
    Long = 2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnlockType {
    /// Unlock for a short period, enough for a pose transition.
    Timed = 0,
    /// Stay unlocked until told otherwise.
    Hold = 1,
}

/// EMG streaming mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEmg {
    Disabled = 0,
    Enabled = 1,
}
