//! # MPEG Transport Stream (TS) Implementation
//!
//! This module implements the MPEG-2 transport stream cell format
//! (ISO/IEC 13818-1): fixed 188-byte packets with bit-packed headers,
//! adaptation fields and stuffing, plus the system tables and PES
//! framing needed to produce streams that third-party players and
//! demuxers consume byte-for-byte.
//!
//! ## Core pieces
//!
//! - **[`TSPacket`]**: one 188-byte cell with field-level accessors
//!   (PID, continuity counter, adaptation field, PCR, stuffing)
//! - **[`tables`]**: byte-exact default PAT/PMT/SDT templates and
//!   in-place PID patching
//! - **[`pes`]**: PES lead-in construction and timestamp parsing
//! - **[`TSMuxer`]**: async muxer driving the packet engine
//!
//! ## Example: building a cell by hand
//!
//! ```rust
//! use tsio::format::ts::TSPacket;
//! use bytes::BytesMut;
//!
//! let mut cell = TSPacket::new();
//! cell.set_pid(0x100);
//! cell.set_unit_start(true);
//! cell.pes_video_lead_in(128);
//! let mut frame = BytesMut::from(&[0u8; 128][..]);
//! cell.fill_free(&mut frame);
//!
//! assert_eq!(cell.bytes_free(), 0);
//! assert_eq!(cell.as_bytes().len(), 188);
//! ```

/// TS muxer implementation for creating MPEG-TS packet streams
pub mod muxer;

/// The 188-byte packet buffer engine
pub mod packet;

/// PSI section parsing and metadata conversion
pub mod parser;

/// PES packet handling and lead-in construction
pub mod pes;

/// Fixed default PAT/PMT/SDT tables
pub mod tables;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use muxer::TSMuxer;
pub use packet::{TSPacket, ADAPT_BOTH, ADAPT_FIELD_ONLY, ADAPT_PAYLOAD_ONLY, SYNC_BYTE};
pub use parser::{to_stream_meta, TSPacketParser};
pub use pes::{audio_lead_in, video_lead_in, PESHeader, FFMPEG_HEADER};
pub use tables::{parse_pat_cell, parse_pmt_cell, DEFAULT_PAT, DEFAULT_PMT, DEFAULT_SDT};
pub use types::{
    PID_PAT, PID_PMT, PID_SDT, STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_H265,
    TS_PACKET_SIZE,
};
