//! Fixed delivery parameters of the pod and the status enumerations it reports.

use std::time::Duration;

use packed_struct::prelude::*;

/// Volume of U100 insulin in one motor pulse.
pub const PULSE_SIZE: f64 = 0.05;
pub const PULSES_PER_UNIT: f64 = 1.0 / PULSE_SIZE;

pub const SECONDS_PER_BOLUS_PULSE: f64 = 2.0;
pub const SECONDS_PER_PRIME_PULSE: f64 = 1.0;

pub const PRIME_UNITS: f64 = 2.6;
pub const CANNULA_INSERTION_UNITS: f64 = 0.5;

/// Rate substituted for zero wherever the pod needs a pulse interval.
pub const NEAR_ZERO_BASAL_RATE: f64 = 0.01;

pub const MAX_TIME_BETWEEN_PULSES: f64 = 5.0 * 60.0 * 60.0;
pub const NEAR_ZERO_BASAL_RATE_FLAG: u32 = 0x8000_0000;

pub const SEGMENT_SECONDS: f64 = 30.0 * 60.0;
pub const SEGMENTS_PER_DAY: usize = 48;
pub const MAX_SEGMENTS_PER_ENTRY: u8 = 16;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Largest supported rate index: rates run from 0 to 30 U/h in single pulse steps.
const MAX_RATE_INDEX: u32 = 600;

pub const MAX_BASAL_RATE: f64 = MAX_RATE_INDEX as f64 / PULSES_PER_UNIT;

/// Reservoir reading that means "more than fifty units remain".
pub const RESERVOIR_LEVEL_ABOVE_THRESHOLD: f64 = 51.15;

/// Largest supported basal rate not above `rate` (with 0.01 U/h of slack), or zero.
pub fn round_to_supported_basal_rate(rate: f64) -> f64 {
    (0..=MAX_RATE_INDEX)
        .rev()
        .map(|i| i as f64 / PULSES_PER_UNIT)
        .find(|&supported| supported <= rate + 0.01)
        .unwrap_or(0.0)
}

/// Supported rate used to time pulses: zero becomes [`NEAR_ZERO_BASAL_RATE`].
pub fn round_to_supported_basal_timing_rate(rate: f64) -> f64 {
    match round_to_supported_basal_rate(rate) {
        r if r == 0.0 => NEAR_ZERO_BASAL_RATE,
        r => r,
    }
}

#[inline]
/// Truncated tick count. Products within float error of a whole tick snap to
/// it so decoded delays encode back to the same ticks.
pub(crate) fn hundredths_of_millis(secs: f64) -> f64 {
    let ticks = secs * 100_000.0;
    match ticks.round() {
        nearest if (ticks - nearest).abs() <= nearest * 1e-12 => nearest,
        _ => ticks.trunc(),
    }
}

#[inline]
pub(crate) fn from_hundredths_of_millis(ticks: u32) -> f64 {
    ticks as f64 / 100_000.0
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PrimitiveEnum_u8, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum DeliveryStatus {
    Suspended                   = 0,
    ScheduledBasal              = 1,
    TempBasalRunning            = 2,
    Priming                     = 4,
    BolusInProgress             = 5,
    BolusAndTempBasal           = 6,
    ExtendedBolusWhileSuspended = 8,
    ExtendedBolusRunning        = 9,
    ExtendedBolusAndTempBasal   = 10,
}

impl DeliveryStatus {
    pub fn suspended(&self) -> bool {
        matches!(self, Self::Suspended | Self::Priming | Self::ExtendedBolusWhileSuspended)
    }

    pub fn bolusing(&self) -> bool {
        !matches!(self, Self::Suspended | Self::ScheduledBasal | Self::TempBasalRunning)
    }

    pub fn temp_basal_running(&self) -> bool {
        matches!(
            self,
            Self::TempBasalRunning | Self::BolusAndTempBasal | Self::ExtendedBolusAndTempBasal
        )
    }
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PrimitiveEnum_u8, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum PodProgressStatus {
    Initialized            = 0,
    MemoryInitialized      = 1,
    ReminderInitialized    = 2,
    PairingCompleted       = 3,
    Priming                = 4,
    PrimingCompleted       = 5,
    BasalInitialized       = 6,
    InsertingCannula       = 7,
    AboveFiftyUnits        = 8,
    FiftyOrLessUnits       = 9,
    OneNotUsedButIn33      = 10,
    TwoNotUsedButIn33      = 11,
    ThreeNotUsedButIn33    = 12,
    FaultEventOccurred     = 13,
    ActivationTimeExceeded = 14,
    Inactive               = 15,
}

impl PodProgressStatus {
    pub fn ready_for_delivery(&self) -> bool {
        matches!(self, Self::AboveFiftyUnits | Self::FiftyOrLessUnits)
    }
}

/// Bitmask of the eight alert slots.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    derive_more::From,
    derive_more::Into,
)]
pub struct AlertSet(pub u8);

impl AlertSet {
    #[inline]
    pub fn contains(&self, slot: u8) -> bool {
        slot < 8 && self.0 & (1 << slot) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn slots(&self) -> impl Iterator<Item = u8> + '_ {
        (0..8).filter(|&slot| self.contains(slot))
    }
}

/// Raw fault event code reported by the pod. Zero means no fault.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    derive_more::From,
    derive_more::Into,
)]
pub struct FaultEventCode(pub u8);

impl FaultEventCode {
    pub const NO_FAULTS: Self = Self(0x00);
    pub const OCCLUSION_CHECK_ABOVE_THRESHOLD: Self = Self(0x6a);

    #[inline]
    pub fn is_fault(&self) -> bool {
        *self != Self::NO_FAULTS
    }
}
