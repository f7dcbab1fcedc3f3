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
        FaultEventCode,
        PodProgressStatus,
    },
};

/// Error reported by the pod in place of the expected response.
///
/// [`ErrorResponse::BadNonce`] is the only retryable case: the caller derives a fresh nonce
/// from `resync_key` and resends. Every other code is terminal for the command that caused it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorResponse {
    BadNonce {
        resync_key: u16,
    },
    Nonretryable {
        code:             u8,
        fault_event_code: FaultEventCode,
        pod_progress:     PodProgressStatus,
    },
}

impl ErrorResponse {
    pub const BAD_NONCE: u8 = 0x14;
    const LEN: usize = 5;

    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BadNonce { .. })
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = [0u8; 3];

        match *self {
            ErrorResponse::BadNonce {
                resync_key,
            } => {
                body[0] = Self::BAD_NONCE;
                BigEndian::write_u16(&mut body[1..], resync_key);
            },
            ErrorResponse::Nonretryable {
                code: Self::BAD_NONCE,
                ..
            } => return Err(PackingError::InvalidValue),
            ErrorResponse::Nonretryable {
                code,
                fault_event_code,
                pod_progress,
            } => {
                body = [code, fault_event_code.0, pod_progress.to_primitive()];
            },
        }

        frame(MessageBlockType::ErrorResponse, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::LEN)?;

        let code = block[2];
        if code == Self::BAD_NONCE {
            return Ok(Self::BadNonce {
                resync_key: BigEndian::read_u16(&block[3..5]),
            });
        }

        Ok(Self::Nonretryable {
            code,
            fault_event_code: FaultEventCode(block[3]),
            pod_progress: PodProgressStatus::from_primitive(block[4])
                .ok_or_else(|| MessageBlockError::unknown(block[4], "PodProgressStatus"))?,
        })
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bad_nonce() -> eyre::Result<()> {
        let src = hex::decode("060314a9e403f5")?;
        let response = ErrorResponse::decode(&src)?;

        assert_eq!(
            ErrorResponse::BadNonce {
                resync_key: 43492,
            },
            response
        );
        assert!(response.is_retryable());
        assert_eq!(&src[..5], &response.encode()?[..]);

        Ok(())
    }

    #[test]
    fn nonretryable_keeps_fault_details() -> eyre::Result<()> {
        let response = ErrorResponse::decode(&hex::decode("0603076a09")?)?;

        assert_eq!(
            ErrorResponse::Nonretryable {
                code:             0x07,
                fault_event_code: FaultEventCode::OCCLUSION_CHECK_ABOVE_THRESHOLD,
                pod_progress:     PodProgressStatus::FiftyOrLessUnits,
            },
            response
        );
        assert!(!response.is_retryable());

        Ok(())
    }

    #[test]
    fn invalid_progress() {
        assert_eq!(
            Err(MessageBlockError::unknown(0x20, "PodProgressStatus")),
            ErrorResponse::decode(&[0x06, 0x03, 0x07, 0x00, 0x20])
        );
    }

    #[test]
    fn nonretryable_cannot_carry_bad_nonce_code() {
        let response = ErrorResponse::Nonretryable {
            code:             ErrorResponse::BAD_NONCE,
            fault_event_code: FaultEventCode(0),
            pod_progress:     PodProgressStatus::AboveFiftyUnits,
        };

        assert_eq!(Err(PackingError::InvalidValue), response.encode());
    }

    prop_compose! {
        fn nonretryable()(
            code in any::<u8>().prop_filter("bad nonce code", |&c| c != ErrorResponse::BAD_NONCE),
            fault in any::<u8>(),
            progress in 0u8..16,
        ) -> ErrorResponse {
            ErrorResponse::Nonretryable {
                code,
                fault_event_code: FaultEventCode(fault),
                pod_progress: PodProgressStatus::from_primitive(progress).unwrap(),
            }
        }
    }

    fn error_response() -> impl Strategy<Value = ErrorResponse> {
        prop_oneof![
            any::<u16>().prop_map(|resync_key| ErrorResponse::BadNonce { resync_key }),
            nonretryable(),
        ]
    }

    proptest! {
        #[test]
        fn responses_survive_decoding(response in error_response()) {
            let encoded = response.encode().unwrap();
            prop_assert_eq!(ErrorResponse::LEN, encoded.len());
            prop_assert_eq!(response, ErrorResponse::decode(&encoded).unwrap());
        }
    }
}
