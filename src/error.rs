//! The error type shared by every fallible operation in the crate.

use std::{borrow::Cow, error::Error, fmt};

/// Everything that can go wrong between reading a depth frame and writing
/// out a cue. None of these are fatal to a running sweep: the pipeline drops
/// the offending frame and keeps playing the previous proximity vector.
#[derive(Debug)]
pub enum SonifyError {
    /// Returned when a depth buffer is not 16-bit half-float depth, or when
    /// its byte length does not match its dimensions.
    InvalidFormat(String),

    /// Returned when a [crate::config::SonifyConfig] fails validation.
    InvalidConfig(String),

    /// Returned when the text header of a frame dump cannot be parsed.
    FrameHeader(String),

    /// Returned when reading a proximity log, but we are not able to find
    /// the delimiter between the header and sample binary.
    NoDelimiter,

    /// Returned when the sample section of a proximity log is not made of
    /// whole `f32`s, or does not divide into whole frames.
    TryInto,

    /// Returned when io fails when reading or writing files.
    Io(std::io::Error),

    /// Returned when serialization of a RON document fails.
    Ron(ron::Error),

    /// Returned when deserialization of a RON document fails.
    RonSpanned(ron::de::SpannedError),

    /// Returned when hound fails to write rendered audio.
    Wav(hound::Error),
}

impl fmt::Display for SonifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SonifyError as SE;
        let msg = match self {
            SE::InvalidFormat(why) => Cow::from(format!("invalid depth format: {}", why)),
            SE::InvalidConfig(why) => Cow::from(format!("invalid configuration: {}", why)),
            SE::FrameHeader(why) => Cow::from(format!("bad frame header: {}", why)),
            SE::NoDelimiter => Cow::from("no delimiter in proximity log"),
            SE::TryInto => Cow::from("something went wrong while parsing f32s"),
            SE::Io(error) => Cow::from(format!("io error: {}", error)),
            SE::Ron(error) => Cow::from(format!("ron error: {}", error)),
            SE::RonSpanned(error) => Cow::from(format!("ron spanning error: {}", error)),
            SE::Wav(error) => Cow::from(format!("wav error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl Error for SonifyError {}

impl From<std::io::Error> for SonifyError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ron::Error> for SonifyError {
    fn from(value: ron::Error) -> Self {
        Self::Ron(value)
    }
}

impl From<ron::de::SpannedError> for SonifyError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpanned(value)
    }
}

impl From<hound::Error> for SonifyError {
    fn from(value: hound::Error) -> Self {
        Self::Wav(value)
    }
}
