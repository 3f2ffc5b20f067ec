#![doc(html_root_url = "https://docs.rs/tsio/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # tsio - MPEG Transport Stream Packetization Toolkit
//!
//! `tsio` is the transport-stream output layer of a media streaming
//! server, extracted as a standalone crate. It builds and parses the
//! fixed 188-byte MPEG-TS cells (ISO/IEC 13818-1) that carry every
//! media frame delivered over TS-based outputs such as HLS segments,
//! with byte-exact system tables so that players keyed off a reference
//! encoder's output keep working.
//!
//! ## Features
//!
//! - 188-byte packet codec with field-level accessors: PID, continuity
//!   counter, adaptation field, PCR, random access, stuffing
//! - Byte-exact default PAT/PMT/SDT tables with in-place PID patching
//!   and CRC refresh
//! - PES lead-in construction for audio and video, including 33-bit
//!   PTS encoding and re-extraction
//! - 7-byte ADTS audio headers and Annex-B NAL start codes
//! - An async TS muxer interleaving tables, PCR and elementary streams
//!
//! ## Quick Start
//!
//! ```rust
//! use tsio::format::ts::TSPacket;
//!
//! let mut cell = TSPacket::new();
//! cell.set_pid(0x100);
//! cell.set_continuity_counter(7);
//! cell.add_stuffing(184);
//!
//! let wire = cell.as_bytes();
//! assert_eq!(wire[0], 0x47);
//!
//! let parsed = TSPacket::from_bytes(wire).unwrap();
//! assert_eq!(parsed.pid(), 0x100);
//! ```
//!
//! ## Module Overview
//!
//! - `av`: media packet and stream metadata model shared with the
//!   server core
//! - `codec`: ADTS audio headers and H.264 bytestream constants
//! - `format`: the transport stream packet engine, tables, PES framing
//!   and muxer
//! - `error`: error types and the crate-wide [`Result`] alias
//! - `utils`: bit-level reading and MPEG-2 CRC32

/// Audio/Video base types and stream metadata
pub mod av;

/// Codec-level helpers (ADTS headers, NAL start codes)
pub mod codec;

/// Error types and utilities
pub mod error;

/// Media format implementations (MPEG-TS)
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use error::{Result, TsioError};
