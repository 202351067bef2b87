//! Camera response status codes.

use std::fmt;

/// Outcome reported by the camera in the status byte of a reply frame.
///
/// Only [`ResponseStatus::Ok`] carries a trustworthy payload. Codes the
/// firmware documents are mapped to named variants; anything else is kept
/// verbatim in [`ResponseStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    Ok,
    RangeError,
    ChecksumError,
    UndefinedProcessError,
    UndefinedFunctionError,
    TimeoutError,
    ByteCountError,
    FeatureNotEnabled,
    WriteOnly,
    ReadOnly,
    Unknown(u8),
}

impl ResponseStatus {
    /// Decode a status byte.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => ResponseStatus::Ok,
            0x03 => ResponseStatus::RangeError,
            0x04 => ResponseStatus::ChecksumError,
            0x05 => ResponseStatus::UndefinedProcessError,
            0x06 => ResponseStatus::UndefinedFunctionError,
            0x07 => ResponseStatus::TimeoutError,
            0x09 => ResponseStatus::ByteCountError,
            0x0A => ResponseStatus::FeatureNotEnabled,
            0x0B => ResponseStatus::WriteOnly,
            0x0C => ResponseStatus::ReadOnly,
            other => ResponseStatus::Unknown(other),
        }
    }

    /// The status byte as it appears on the wire.
    pub fn code(&self) -> u8 {
        match self {
            ResponseStatus::Ok => 0x00,
            ResponseStatus::RangeError => 0x03,
            ResponseStatus::ChecksumError => 0x04,
            ResponseStatus::UndefinedProcessError => 0x05,
            ResponseStatus::UndefinedFunctionError => 0x06,
            ResponseStatus::TimeoutError => 0x07,
            ResponseStatus::ByteCountError => 0x09,
            ResponseStatus::FeatureNotEnabled => 0x0A,
            ResponseStatus::WriteOnly => 0x0B,
            ResponseStatus::ReadOnly => 0x0C,
            ResponseStatus::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseStatus::Ok)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Ok => write!(f, "OK"),
            ResponseStatus::RangeError => write!(f, "RANGE_ERROR"),
            ResponseStatus::ChecksumError => write!(f, "CHECKSUM_ERROR"),
            ResponseStatus::UndefinedProcessError => write!(f, "UNDEFINED_PROCESS_ERROR"),
            ResponseStatus::UndefinedFunctionError => write!(f, "UNDEFINED_FUNCTION_ERROR"),
            ResponseStatus::TimeoutError => write!(f, "TIMEOUT_ERROR"),
            ResponseStatus::ByteCountError => write!(f, "BYTE_COUNT_ERROR"),
            ResponseStatus::FeatureNotEnabled => write!(f, "FEATURE_NOT_ENABLED"),
            ResponseStatus::WriteOnly => write!(f, "WRITE_ONLY"),
            ResponseStatus::ReadOnly => write!(f, "READ_ONLY"),
            ResponseStatus::Unknown(code) => write!(f, "UNKNOWN(0x{code:02X})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for code in [0x00, 0x03, 0x04, 0x05, 0x06, 0x07, 0x09, 0x0A, 0x0B, 0x0C] {
            let status = ResponseStatus::from_code(code);
            assert!(!matches!(status, ResponseStatus::Unknown(_)), "{code:#04X}");
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn unassigned_codes_are_unknown() {
        assert_eq!(ResponseStatus::from_code(0x02), ResponseStatus::Unknown(0x02));
        assert_eq!(ResponseStatus::from_code(0xFF).code(), 0xFF);
    }

    #[test]
    fn display_names() {
        assert_eq!(ResponseStatus::WriteOnly.to_string(), "WRITE_ONLY");
        assert_eq!(ResponseStatus::Unknown(0x42).to_string(), "UNKNOWN(0x42)");
    }

    #[test]
    fn only_ok_is_ok() {
        assert!(ResponseStatus::Ok.is_ok());
        assert!(!ResponseStatus::RangeError.is_ok());
    }
}
