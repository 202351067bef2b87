//! Camera command frame encoder/decoder.
//!
//! The camera core speaks a binary request/response protocol over its
//! serial port; the WIC bridge forwards frames verbatim. This module
//! handles the pure byte-level encoding and validation of those frames.
//!
//! # Frame format
//!
//! ```text
//! 0x6E <status> 0x00 <function> <count_hi> <count_lo> <crc1_hi> <crc1_lo> [<arg>...] <crc2_hi> <crc2_lo>
//! ```
//!
//! - Process code: always `0x6E`
//! - `status`: `0x00` on commands, a [`ResponseStatus`] code on replies
//! - reserved byte: `0x00`
//! - `function`: [`FunctionCode`], echoed by the reply
//! - byte count: big-endian length of the argument block
//! - `crc1`: CRC-16 over the six bytes before it
//! - arguments: exactly byte-count bytes
//! - `crc2`: CRC-16 over every preceding byte, `crc1` included
//!
//! The CRC is CRC-16/CCITT with polynomial `0x1021` and initial value
//! `0x0000`, most significant bit first, transmitted big-endian.

use bytes::{BufMut, BytesMut};
use taulib_core::{Error, ResponseStatus, Result};

/// First byte of every frame.
pub const PROCESS_CODE: u8 = 0x6E;

/// Bytes before the argument block, header CRC included.
pub const HEADER_LEN: usize = 8;

/// Length of the trailing frame CRC.
pub const CRC_LEN: usize = 2;

/// Smallest possible frame (no arguments).
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;

/// Largest argument block the byte-count field can describe.
pub const MAX_ARGUMENT_LEN: usize = u16::MAX as usize;

const CRC_POLY: u16 = 0x1021;

/// Compute the frame CRC over `data`.
///
/// ```
/// use taulib_wic::frame::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x31C3);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Device operation selected by the function byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    NoOp = 0x00,
    SetDefaults = 0x01,
    CameraReset = 0x02,
    RestoreFactoryDefaults = 0x03,
    SerialNumber = 0x04,
    GetRevision = 0x05,
    GainMode = 0x0A,
    FfcModeSelect = 0x0B,
    DoFfc = 0x0C,
    FfcPeriod = 0x0D,
    FfcTempDelta = 0x0E,
    VideoMode = 0x0F,
    VideoPalette = 0x10,
    VideoOrientation = 0x11,
    DigitalOutputMode = 0x12,
    AgcType = 0x13,
    Contrast = 0x14,
    Brightness = 0x15,
    BrightnessBias = 0x18,
    SpotMeterMode = 0x1F,
    ReadSensor = 0x20,
    ExternalSync = 0x21,
    Isotherm = 0x22,
    IsothermThresholds = 0x23,
    TestPattern = 0x25,
    VideoColorMode = 0x26,
    GetSpotMeter = 0x2A,
    SpotDisplay = 0x2B,
    DdeGain = 0x2C,
    FfcWarnTime = 0x3C,
    AgcFilter = 0x3E,
    PlateauLevel = 0x3F,
    ShutterTemp = 0x4D,
    AgcMidpoint = 0x55,
    CameraPart = 0x66,
    MaxAgcGain = 0x6A,
    VideoStandard = 0x72,
    Radiometry = 0x8E,
    SpatialThreshold = 0xE3,
    LensResponseParams = 0xE5,
}

impl FunctionCode {
    const ALL: [FunctionCode; 40] = [
        FunctionCode::NoOp,
        FunctionCode::SetDefaults,
        FunctionCode::CameraReset,
        FunctionCode::RestoreFactoryDefaults,
        FunctionCode::SerialNumber,
        FunctionCode::GetRevision,
        FunctionCode::GainMode,
        FunctionCode::FfcModeSelect,
        FunctionCode::DoFfc,
        FunctionCode::FfcPeriod,
        FunctionCode::FfcTempDelta,
        FunctionCode::VideoMode,
        FunctionCode::VideoPalette,
        FunctionCode::VideoOrientation,
        FunctionCode::DigitalOutputMode,
        FunctionCode::AgcType,
        FunctionCode::Contrast,
        FunctionCode::Brightness,
        FunctionCode::BrightnessBias,
        FunctionCode::SpotMeterMode,
        FunctionCode::ReadSensor,
        FunctionCode::ExternalSync,
        FunctionCode::Isotherm,
        FunctionCode::IsothermThresholds,
        FunctionCode::TestPattern,
        FunctionCode::VideoColorMode,
        FunctionCode::GetSpotMeter,
        FunctionCode::SpotDisplay,
        FunctionCode::DdeGain,
        FunctionCode::FfcWarnTime,
        FunctionCode::AgcFilter,
        FunctionCode::PlateauLevel,
        FunctionCode::ShutterTemp,
        FunctionCode::AgcMidpoint,
        FunctionCode::CameraPart,
        FunctionCode::MaxAgcGain,
        FunctionCode::VideoStandard,
        FunctionCode::Radiometry,
        FunctionCode::SpatialThreshold,
        FunctionCode::LensResponseParams,
    ];

    /// The function byte as it appears on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a function byte. Returns `None` for codes this driver does
    /// not know.
    pub fn from_code(code: u8) -> Option<FunctionCode> {
        FunctionCode::ALL.iter().copied().find(|f| f.code() == code)
    }
}

/// An outgoing command: function code plus argument bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    function: FunctionCode,
    args: Vec<u8>,
}

impl CommandFrame {
    /// Build a command, rejecting argument blocks longer than the
    /// byte-count field can describe.
    pub fn new(function: FunctionCode, args: Vec<u8>) -> Result<Self> {
        if args.len() > MAX_ARGUMENT_LEN {
            return Err(Error::InvalidParameter(format!(
                "argument block of {} bytes exceeds {MAX_ARGUMENT_LEN}",
                args.len()
            )));
        }
        Ok(CommandFrame { function, args })
    }

    /// A command without arguments. This is how every query and action is sent.
    pub fn bare(function: FunctionCode) -> Self {
        CommandFrame {
            function,
            args: Vec::new(),
        }
    }

    pub fn function(&self) -> FunctionCode {
        self.function
    }

    pub fn args(&self) -> &[u8] {
        &self.args
    }

    pub fn byte_count(&self) -> u16 {
        self.args.len() as u16
    }

    /// Encode into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        write_frame(0x00, self.function.code(), &self.args)
    }
}

/// A validated frame received from the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub status: ResponseStatus,
    /// Function byte echoed by the camera. Kept raw so replies carrying
    /// codes this driver does not know can still be matched and discarded.
    pub function: u8,
    pub payload: Vec<u8>,
    /// The trailing frame CRC.
    pub checksum: u16,
}

impl ResponseFrame {
    pub fn function_code(&self) -> Option<FunctionCode> {
        FunctionCode::from_code(self.function)
    }
}

/// Why a byte buffer did not decode into a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ends before the frame does.
    #[error("truncated frame: {needed} more bytes needed")]
    Truncated { needed: usize },

    /// A CRC did not match. `consumed` is how many bytes to discard before
    /// trying again: the whole frame when the header was intact, otherwise
    /// only the first byte, because the byte count cannot be trusted.
    #[error("checksum mismatch: computed {computed:#06X}, received {received:#06X}")]
    ChecksumMismatch {
        computed: u16,
        received: u16,
        consumed: usize,
    },

    /// The header CRC matched but the frame does not start with the
    /// process code.
    #[error("unexpected process code {0:#04X}")]
    UnexpectedProcessCode(u8),
}

/// Encode a command frame into raw bytes ready for transmission.
///
/// # Example
///
/// ```
/// use taulib_wic::frame::{encode_frame, FunctionCode};
///
/// // Query the FFC mode
/// let bytes = encode_frame(FunctionCode::FfcModeSelect, &[]).unwrap();
/// assert_eq!(bytes, vec![0x6E, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x2F, 0x4A, 0x00, 0x00]);
/// ```
pub fn encode_frame(function: FunctionCode, args: &[u8]) -> Result<Vec<u8>> {
    Ok(CommandFrame::new(function, args.to_vec())?.encode())
}

/// Encode a reply frame as the camera would send it.
///
/// Used by simulators and tests scripting a mock camera.
pub fn encode_response(
    status: ResponseStatus,
    function: FunctionCode,
    payload: &[u8],
) -> Result<Vec<u8>> {
    if payload.len() > MAX_ARGUMENT_LEN {
        return Err(Error::InvalidParameter(format!(
            "payload of {} bytes exceeds {MAX_ARGUMENT_LEN}",
            payload.len()
        )));
    }
    Ok(write_frame(status.code(), function.code(), payload))
}

fn write_frame(status: u8, function: u8, args: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(MIN_FRAME_LEN + args.len());
    buf.put_u8(PROCESS_CODE);
    buf.put_u8(status);
    buf.put_u8(0x00);
    buf.put_u8(function);
    buf.put_u16(args.len() as u16);
    let header_crc = crc16(&buf);
    buf.put_u16(header_crc);
    buf.put_slice(args);
    let frame_crc = crc16(&buf);
    buf.put_u16(frame_crc);
    buf.to_vec()
}

/// Decode one frame that starts at `buf[0]`.
///
/// On success returns the frame and the number of bytes it occupied. The
/// header CRC is verified before the byte count is trusted, so corruption
/// anywhere in the frame is reported as [`DecodeError::ChecksumMismatch`].
///
/// # Example
///
/// ```
/// use taulib_wic::frame::decode_frame;
///
/// // FFC mode reply carrying 0x0001 (auto)
/// let buf = [0x6E, 0x00, 0x00, 0x0B, 0x00, 0x02, 0x0F, 0x08, 0x00, 0x01, 0x10, 0x21];
/// let (frame, consumed) = decode_frame(&buf).unwrap();
/// assert!(frame.status.is_ok());
/// assert_eq!(frame.payload, vec![0x00, 0x01]);
/// assert_eq!(consumed, 12);
/// ```
pub fn decode_frame(buf: &[u8]) -> std::result::Result<(ResponseFrame, usize), DecodeError> {
    if buf.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            needed: HEADER_LEN - buf.len(),
        });
    }

    let computed = crc16(&buf[..6]);
    let received = u16::from_be_bytes([buf[6], buf[7]]);
    if computed != received {
        return Err(DecodeError::ChecksumMismatch {
            computed,
            received,
            consumed: 1,
        });
    }
    if buf[0] != PROCESS_CODE {
        return Err(DecodeError::UnexpectedProcessCode(buf[0]));
    }

    let byte_count = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    let total = HEADER_LEN + byte_count + CRC_LEN;
    if buf.len() < total {
        return Err(DecodeError::Truncated {
            needed: total - buf.len(),
        });
    }

    let computed = crc16(&buf[..total - CRC_LEN]);
    let received = u16::from_be_bytes([buf[total - 2], buf[total - 1]]);
    if computed != received {
        return Err(DecodeError::ChecksumMismatch {
            computed,
            received,
            consumed: total,
        });
    }

    let frame = ResponseFrame {
        status: ResponseStatus::from_code(buf[1]),
        function: buf[3],
        payload: buf[HEADER_LEN..HEADER_LEN + byte_count].to_vec(),
        checksum: received,
    };
    Ok((frame, total))
}

/// Position of the first process-code byte, where a frame may begin.
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == PROCESS_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic byte pattern without pulling in an RNG.
    fn pattern(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // CRC
    // ---------------------------------------------------------------

    #[test]
    fn crc_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
        assert_eq!(crc16(&[]), 0x0000);
    }

    #[test]
    fn crc_over_frame_including_its_crc_is_zero() {
        let header = [PROCESS_CODE, 0x00, 0x00, 0x14, 0x00, 0x00];
        let crc = crc16(&header);
        let mut with_crc = header.to_vec();
        with_crc.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(crc16(&with_crc), 0);
    }

    // ---------------------------------------------------------------
    // Encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_query_without_arguments() {
        let bytes = encode_frame(FunctionCode::FfcModeSelect, &[]).unwrap();
        assert_eq!(
            bytes,
            vec![0x6E, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x2F, 0x4A, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_lays_out_header_and_arguments() {
        let bytes = encode_frame(FunctionCode::Contrast, &[0x00, 0x80]).unwrap();
        assert_eq!(bytes.len(), MIN_FRAME_LEN + 2);
        assert_eq!(bytes[0], PROCESS_CODE);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[3], 0x14);
        assert_eq!(&bytes[4..6], &[0x00, 0x02]);
        assert_eq!(&bytes[8..10], &[0x00, 0x80]);
        assert_eq!(crc16(&bytes), 0);
    }

    #[test]
    fn command_frame_reports_byte_count() {
        let frame = CommandFrame::new(FunctionCode::IsothermThresholds, vec![0; 6]).unwrap();
        assert_eq!(frame.byte_count(), 6);
        assert_eq!(frame.function(), FunctionCode::IsothermThresholds);
        assert_eq!(CommandFrame::bare(FunctionCode::DoFfc).byte_count(), 0);
    }

    #[test]
    fn oversized_arguments_rejected() {
        let result = CommandFrame::new(FunctionCode::NoOp, vec![0; MAX_ARGUMENT_LEN + 1]);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    // ---------------------------------------------------------------
    // Decoding
    // ---------------------------------------------------------------

    #[test]
    fn decode_recovers_function_and_arguments() {
        for len in 0..=255usize {
            let args = pattern(len, len as u32);
            let bytes = encode_frame(FunctionCode::LensResponseParams, &args).unwrap();
            let (frame, consumed) = decode_frame(&bytes).unwrap();
            assert_eq!(frame.function_code(), Some(FunctionCode::LensResponseParams));
            assert_eq!(frame.payload, args);
            assert_eq!(frame.status, ResponseStatus::Ok);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn every_single_bit_flip_is_a_checksum_mismatch() {
        for len in [0usize, 1, 2, 6, 17, 255] {
            let bytes = encode_frame(FunctionCode::CameraPart, &pattern(len, 7)).unwrap();
            for bit in 0..bytes.len() * 8 {
                let mut corrupted = bytes.clone();
                corrupted[bit / 8] ^= 1 << (bit % 8);
                let result = decode_frame(&corrupted);
                assert!(
                    matches!(result, Err(DecodeError::ChecksumMismatch { .. })),
                    "len {len} bit {bit}: {result:?}"
                );
            }
        }
    }

    #[test]
    fn decode_reply_status() {
        let bytes = encode_response(ResponseStatus::RangeError, FunctionCode::Contrast, &[]).unwrap();
        let (frame, _) = decode_frame(&bytes).unwrap();
        assert_eq!(frame.status, ResponseStatus::RangeError);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn decode_unknown_status_kept_verbatim() {
        let mut bytes = write_frame(0x42, FunctionCode::NoOp.code(), &[]);
        let (frame, _) = decode_frame(&bytes).unwrap();
        assert_eq!(frame.status, ResponseStatus::Unknown(0x42));

        bytes = write_frame(0x00, 0xF0, &[]);
        let (frame, _) = decode_frame(&bytes).unwrap();
        assert_eq!(frame.function, 0xF0);
        assert_eq!(frame.function_code(), None);
    }

    #[test]
    fn decode_short_header_is_truncated() {
        let bytes = encode_frame(FunctionCode::Brightness, &[0x01, 0x00]).unwrap();
        assert_eq!(
            decode_frame(&bytes[..5]),
            Err(DecodeError::Truncated { needed: 3 })
        );
    }

    #[test]
    fn decode_short_payload_is_truncated() {
        let bytes = encode_frame(FunctionCode::Brightness, &[0x01, 0x00]).unwrap();
        assert_eq!(
            decode_frame(&bytes[..bytes.len() - 1]),
            Err(DecodeError::Truncated { needed: 1 })
        );
    }

    #[test]
    fn payload_corruption_consumes_whole_frame() {
        let mut bytes = encode_frame(FunctionCode::Brightness, &[0x01, 0x00]).unwrap();
        bytes[9] ^= 0xFF;
        match decode_frame(&bytes) {
            Err(DecodeError::ChecksumMismatch { consumed, .. }) => {
                assert_eq!(consumed, bytes.len())
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn decode_consumes_only_first_frame() {
        let mut bytes = encode_frame(FunctionCode::NoOp, &[]).unwrap();
        let first_len = bytes.len();
        bytes.extend(encode_frame(FunctionCode::DoFfc, &[]).unwrap());
        let (frame, consumed) = decode_frame(&bytes).unwrap();
        assert_eq!(frame.function_code(), Some(FunctionCode::NoOp));
        assert_eq!(consumed, first_len);
    }

    #[test]
    fn find_sync_skips_garbage() {
        assert_eq!(find_sync(&[0x00, 0xFF, PROCESS_CODE, 0x00]), Some(2));
        assert_eq!(find_sync(&[0x00, 0x01]), None);
    }

    #[test]
    fn function_code_lookup() {
        assert_eq!(FunctionCode::from_code(0x8E), Some(FunctionCode::Radiometry));
        assert_eq!(FunctionCode::from_code(0xE5), Some(FunctionCode::LensResponseParams));
        assert_eq!(FunctionCode::from_code(0x06), None);
        for f in FunctionCode::ALL {
            assert_eq!(FunctionCode::from_code(f.code()), Some(f));
        }
    }
}
