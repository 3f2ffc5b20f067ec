pub mod aac;
pub mod h264;

// Re-export common types and functions
pub use aac::{adts_header, AACParser};
pub use h264::{NALUnit, NAL_HEADER, SHORT_NAL_HEADER};
