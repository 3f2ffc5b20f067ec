//! # H.264/AVC Bitstream Constants
//!
//! Annex-B start codes, default parameter sets and NAL unit
//! classification used when packetizing H.264 elementary streams.
//! Which start code to prepend is the payload producer's decision;
//! this module only supplies both.

/// NAL unit types and bytestream constants
pub mod types;

pub use types::{NALUnit, NALUnitType, DEFAULT_PPS, DEFAULT_SPS, NAL_HEADER, SHORT_NAL_HEADER};
