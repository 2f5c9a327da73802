//! Extension values and the timestamp extension.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use msgpack_buffers::Reader;

use crate::constants::TIMESTAMP_EXT_TYPE;
use crate::error::MsgPackError;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// An application-defined extension: a typecode and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtType {
    pub code: i8,
    pub data: Vec<u8>,
}

impl ExtType {
    pub fn new(code: i8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }
}

/// A point in time carried by ext type -1.
///
/// Seconds count from the Unix epoch and may be negative; nanoseconds are
/// always in `0..1_000_000_000`, so `(-1, 500_000_000)` is half a second
/// before the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    seconds: i64,
    nanoseconds: u32,
}

impl Timestamp {
    pub const EXT_TYPE: i8 = TIMESTAMP_EXT_TYPE;

    pub fn new(seconds: i64, nanoseconds: u32) -> Result<Self, MsgPackError> {
        if nanoseconds >= NANOS_PER_SEC {
            return Err(MsgPackError::InvalidNanoseconds(u64::from(nanoseconds)));
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    /// Parses a timestamp ext payload.
    ///
    /// - 4 bytes: u32 seconds.
    /// - 8 bytes: u64 with nanoseconds in the top 30 bits and seconds in the
    ///   low 34 bits.
    /// - 12 bytes: u32 nanoseconds followed by i64 seconds.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MsgPackError> {
        let mut reader = Reader::new(data);
        match data.len() {
            4 => Ok(Self {
                seconds: i64::from(reader.u32()?),
                nanoseconds: 0,
            }),
            8 => {
                let data64 = reader.u64()?;
                let nanoseconds = data64 >> 34;
                if nanoseconds >= u64::from(NANOS_PER_SEC) {
                    return Err(MsgPackError::InvalidNanoseconds(nanoseconds));
                }
                Ok(Self {
                    seconds: (data64 & 0x0000_0003_ffff_ffff) as i64,
                    nanoseconds: nanoseconds as u32,
                })
            }
            12 => {
                let nanoseconds = reader.u32()?;
                let seconds = reader.i64()?;
                Self::new(seconds, nanoseconds)
            }
            len => Err(MsgPackError::InvalidTimestamp(len)),
        }
    }

    /// Serializes to the smallest of the three payload forms that can hold
    /// this value.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.seconds >> 34 == 0 {
            let data64 = (u64::from(self.nanoseconds) << 34) | self.seconds as u64;
            if data64 & 0xffff_ffff_0000_0000 == 0 {
                (data64 as u32).to_be_bytes().to_vec()
            } else {
                data64.to_be_bytes().to_vec()
            }
        } else {
            let mut bytes = Vec::with_capacity(12);
            bytes.extend_from_slice(&self.nanoseconds.to_be_bytes());
            bytes.extend_from_slice(&self.seconds.to_be_bytes());
            bytes
        }
    }

    pub fn from_unix_nanos(nanos: i128) -> Result<Self, MsgPackError> {
        let per_sec = i128::from(NANOS_PER_SEC);
        let seconds = i64::try_from(nanos.div_euclid(per_sec))
            .map_err(|_| MsgPackError::TimestampOutOfRange)?;
        Ok(Self {
            seconds,
            nanoseconds: nanos.rem_euclid(per_sec) as u32,
        })
    }

    pub fn to_unix_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SEC) + i128::from(self.nanoseconds)
    }

    /// Converts from float seconds since the epoch, rounding to the nearest
    /// nanosecond.
    pub fn from_f64(unix: f64) -> Result<Self, MsgPackError> {
        if !unix.is_finite() || unix < i64::MIN as f64 || unix >= i64::MAX as f64 {
            return Err(MsgPackError::TimestampOutOfRange);
        }
        let floor = unix.floor();
        let mut seconds = floor as i64;
        let mut nanoseconds = ((unix - floor) * f64::from(NANOS_PER_SEC)).round() as u32;
        if nanoseconds >= NANOS_PER_SEC {
            seconds = seconds
                .checked_add(1)
                .ok_or(MsgPackError::TimestampOutOfRange)?;
            nanoseconds = 0;
        }
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    pub fn to_f64(&self) -> f64 {
        self.seconds as f64 + f64::from(self.nanoseconds) / f64::from(NANOS_PER_SEC)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self {
                seconds: after.as_secs() as i64,
                nanoseconds: after.subsec_nanos(),
            },
            Err(err) => {
                let before = err.duration();
                let seconds = -(before.as_secs() as i64);
                match before.subsec_nanos() {
                    0 => Self {
                        seconds,
                        nanoseconds: 0,
                    },
                    ns => Self {
                        seconds: seconds - 1,
                        nanoseconds: NANOS_PER_SEC - ns,
                    },
                }
            }
        }
    }
}

impl TryFrom<Timestamp> for SystemTime {
    type Error = MsgPackError;

    fn try_from(ts: Timestamp) -> Result<Self, Self::Error> {
        let base = if ts.seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(ts.seconds as u64))
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(ts.seconds.unsigned_abs()))
        };
        base.and_then(|t| t.checked_add(Duration::from_nanos(u64::from(ts.nanoseconds))))
            .ok_or(MsgPackError::TimestampOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_nanoseconds_overflow() {
        assert_eq!(
            Timestamp::new(0, 1_000_000_000),
            Err(MsgPackError::InvalidNanoseconds(1_000_000_000))
        );
    }

    #[test]
    fn test_payload_forms() {
        assert_eq!(Timestamp::new(0, 0).unwrap().to_bytes(), [0, 0, 0, 0]);
        assert_eq!(
            Timestamp::new(u32::MAX as i64, 0).unwrap().to_bytes(),
            [0xff, 0xff, 0xff, 0xff]
        );
        assert_eq!(Timestamp::new(1, 1).unwrap().to_bytes().len(), 8);
        assert_eq!(Timestamp::new((1 << 34) - 1, 0).unwrap().to_bytes().len(), 8);
        assert_eq!(Timestamp::new(1 << 34, 0).unwrap().to_bytes().len(), 12);
        assert_eq!(Timestamp::new(-1, 0).unwrap().to_bytes().len(), 12);
    }

    #[test]
    fn test_bytes_roundtrip() {
        for (s, ns) in [
            (0, 0),
            (u32::MAX as i64, 0),
            (u32::MAX as i64 + 1, 0),
            ((1 << 34) - 1, 999_999_999),
            (1 << 34, 0),
            (-1, 0),
            (-1, 999_999_999),
            (i64::MIN, 0),
            (i64::MAX, 999_999_999),
        ] {
            let ts = Timestamp::new(s, ns).unwrap();
            assert_eq!(Timestamp::from_bytes(&ts.to_bytes()).unwrap(), ts);
        }
    }

    #[test]
    fn test_from_bytes_invalid_length() {
        assert_eq!(
            Timestamp::from_bytes(&[0; 5]),
            Err(MsgPackError::InvalidTimestamp(5))
        );
    }

    #[test]
    fn test_from_bytes_invalid_nanoseconds() {
        let data64 = 1_000_000_000u64 << 34;
        assert!(matches!(
            Timestamp::from_bytes(&data64.to_be_bytes()),
            Err(MsgPackError::InvalidNanoseconds(_))
        ));
    }

    #[test]
    fn test_unix_nanos() {
        let ts = Timestamp::from_unix_nanos(-1).unwrap();
        assert_eq!((ts.seconds(), ts.nanoseconds()), (-1, 999_999_999));
        assert_eq!(ts.to_unix_nanos(), -1);
        let ts = Timestamp::from_unix_nanos(1_500_000_000).unwrap();
        assert_eq!((ts.seconds(), ts.nanoseconds()), (1, 500_000_000));
        assert!(Timestamp::from_unix_nanos(i128::MAX).is_err());
    }

    #[test]
    fn test_f64() {
        let ts = Timestamp::from_f64(-2.5).unwrap();
        assert_eq!((ts.seconds(), ts.nanoseconds()), (-3, 500_000_000));
        assert_eq!(ts.to_f64(), -2.5);
        let ts = Timestamp::from_f64(1.25).unwrap();
        assert_eq!((ts.seconds(), ts.nanoseconds()), (1, 250_000_000));
        assert!(Timestamp::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_system_time() {
        let before = UNIX_EPOCH - Duration::from_millis(1500);
        let ts = Timestamp::from(before);
        assert_eq!((ts.seconds(), ts.nanoseconds()), (-2, 500_000_000));
        assert_eq!(SystemTime::try_from(ts).unwrap(), before);

        let after = UNIX_EPOCH + Duration::new(10, 7);
        assert_eq!(SystemTime::try_from(Timestamp::from(after)).unwrap(), after);
    }
}
