use std::{
    fmt::{
        Display,
        Formatter,
    },
    time::Duration,
};

use byteorder::{
    BigEndian,
    ByteOrder,
};
use bytes::Bytes;
use packed_struct::{
    prelude::*,
    PackingResult,
};

use crate::{
    block::{
        frame,
        require,
        MessageBlockType,
    },
    error::MessageBlockError,
    pod::{
        PodProgressStatus,
        PULSES_PER_UNIT,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FirmwareVersion {
    #[inline]
    fn read(src: &[u8]) -> Self {
        Self {
            major: src[0],
            minor: src[1],
            patch: src[2],
        }
    }

    #[inline]
    fn bytes(&self) -> [u8; 3] {
        [self.major, self.minor, self.patch]
    }
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Delivery parameters reported in the long form of the version response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PodConfiguration {
    /// Pulse volume in hundred-thousandths of a unit.
    pub pulse_size:               u16,
    /// Eighths of a second between bolus pulses.
    pub bolus_pulse_rate:         u8,
    /// Eighths of a second between prime pulses.
    pub prime_pulse_rate:         u8,
    pub prime_pulses:             u8,
    pub cannula_insertion_pulses: u8,
    pub service_duration_hours:   u8,
}

impl PodConfiguration {
    #[inline]
    pub fn pulse_size_units(&self) -> f64 {
        self.pulse_size as f64 / 100_000.0
    }

    #[inline]
    pub fn seconds_per_bolus_pulse(&self) -> f64 {
        self.bolus_pulse_rate as f64 / 8.0
    }

    #[inline]
    pub fn seconds_per_prime_pulse(&self) -> f64 {
        self.prime_pulse_rate as f64 / 8.0
    }

    #[inline]
    pub fn prime_units(&self) -> f64 {
        self.prime_pulses as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn cannula_insertion_units(&self) -> f64 {
        self.cannula_insertion_pulses as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn service_duration(&self) -> Duration {
        Duration::from_secs(self.service_duration_hours as u64 * 60 * 60)
    }
}

/// The two shapes of version response: the long form answers address assignment and carries
/// the pod's delivery configuration, the short form answers setup and carries radio levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum VersionDetails {
    AssignAddress(PodConfiguration),
    SetupPod { gain: u8, rssi: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VersionResponse {
    pub firmware_version:   FirmwareVersion,
    pub i_firmware_version: FirmwareVersion,
    pub product_id:         u8,
    pub pod_progress:       PodProgressStatus,
    pub lot:                u32,
    pub tid:                u32,
    pub address:            u32,
    pub details:            VersionDetails,
}

const SHORT_LEN: u8 = 0x15;
const LONG_LEN: u8 = 0x1b;

impl VersionResponse {
    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = Vec::with_capacity(LONG_LEN as usize);

        if let VersionDetails::AssignAddress(config) = &self.details {
            body.extend(config.pulse_size.to_be_bytes());
            body.extend([
                config.bolus_pulse_rate,
                config.prime_pulse_rate,
                config.prime_pulses,
                config.cannula_insertion_pulses,
                config.service_duration_hours,
            ]);
        }

        body.extend(self.firmware_version.bytes());
        body.extend(self.i_firmware_version.bytes());
        body.push(self.product_id);
        body.push(self.pod_progress.to_primitive());
        body.extend(self.lot.to_be_bytes());
        body.extend(self.tid.to_be_bytes());

        if let VersionDetails::SetupPod {
            gain,
            rssi,
        } = self.details
        {
            body.push(((gain & 0x3) << 6) | (rssi & 0x3f));
        }

        body.extend(self.address.to_be_bytes());

        frame(MessageBlockType::VersionResponse, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, 2)?;

        let (details, rest) = match block[1] {
            SHORT_LEN => {
                require(block, SHORT_LEN as usize + 2)?;

                let details = VersionDetails::SetupPod {
                    gain: block[18] >> 6,
                    rssi: block[18] & 0x3f,
                };

                (details, &block[2..])
            },
            LONG_LEN => {
                require(block, LONG_LEN as usize + 2)?;

                let details = VersionDetails::AssignAddress(PodConfiguration {
                    pulse_size:               BigEndian::read_u16(&block[2..4]),
                    bolus_pulse_rate:         block[4],
                    prime_pulse_rate:         block[5],
                    prime_pulses:             block[6],
                    cannula_insertion_pulses: block[7],
                    service_duration_hours:   block[8],
                });

                (details, &block[9..])
            },
            other => return Err(MessageBlockError::unknown(other, "VersionResponse length")),
        };

        // `rest` starts at the firmware version in both forms
        let address_offset = match details {
            VersionDetails::SetupPod {
                ..
            } => 17,
            VersionDetails::AssignAddress(_) => 16,
        };

        Ok(Self {
            firmware_version: FirmwareVersion::read(&rest[0..3]),
            i_firmware_version: FirmwareVersion::read(&rest[3..6]),
            product_id: rest[6],
            pod_progress: PodProgressStatus::from_primitive(rest[7])
                .ok_or_else(|| MessageBlockError::unknown(rest[7], "PodProgressStatus"))?,
            lot: BigEndian::read_u32(&rest[8..12]),
            tid: BigEndian::read_u32(&rest[12..16]),
            address: BigEndian::read_u32(&rest[address_offset..address_offset + 4]),
            details,
        })
    }
}
