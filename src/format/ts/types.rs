use std::time::Duration;

// Stream IDs
pub const STREAM_ID_H264: u8 = 0xe0;
pub const STREAM_ID_H265: u8 = 0xe1;
pub const STREAM_ID_AAC: u8 = 0xc0;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_SDT: u16 = 0x0011;
pub const PID_PMT: u16 = 0x1000;
pub const PID_VIDEO: u16 = 0x0100;
pub const PID_AUDIO: u16 = 0x0101;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;
pub const TABLE_ID_SDT: u8 = 0x42;

// Elementary Stream Types
pub const STREAM_TYPE_MPEG2_VIDEO: u8 = 0x02;
pub const STREAM_TYPE_MP3: u8 = 0x03;
pub const STREAM_TYPE_AAC: u8 = 0x0f;
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;
pub const STREAM_TYPE_AC3: u8 = 0x81;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
pub const PTS_HZ: u64 = 90_000;
pub const PCR_HZ: u64 = 27_000_000;

#[derive(Debug, Clone)]
pub struct PATEntry {
    pub program_number: u16,
    pub network_pid: u16,
    pub program_map_pid: u16,
}

#[derive(Debug, Clone, Default)]
pub struct PAT {
    pub entries: Vec<PATEntry>,
}

impl PAT {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    pub tag: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ElementaryStreamInfo {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct PMT {
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub elementary_stream_infos: Vec<ElementaryStreamInfo>,
}

impl PMT {
    pub fn new() -> Self {
        Self {
            pcr_pid: 0,
            program_descriptors: Vec::new(),
            elementary_stream_infos: Vec::new(),
        }
    }
}

/// True for stream types this library treats as video tracks.
pub fn is_video_stream_type(stream_type: u8) -> bool {
    matches!(
        stream_type,
        STREAM_TYPE_MPEG2_VIDEO | STREAM_TYPE_H264 | STREAM_TYPE_H265
    )
}

/// True for stream types this library treats as audio tracks.
pub fn is_audio_stream_type(stream_type: u8) -> bool {
    matches!(
        stream_type,
        STREAM_TYPE_MP3 | STREAM_TYPE_AAC | STREAM_TYPE_AC3
    )
}

// Time conversion utilities. PCR values are 27 MHz ticks (33-bit base
// times 300 plus 9-bit extension), PTS values are 90 kHz ticks.
pub fn pcr_to_time(pcr: u64) -> Duration {
    Duration::from_nanos((pcr * 1_000_000_000) / PCR_HZ)
}

pub fn time_to_pcr(time: Duration) -> u64 {
    (time.as_nanos() as u64) * PCR_HZ / 1_000_000_000
}

pub fn pts_to_time(pts: u64) -> Duration {
    Duration::from_nanos((pts * 1_000_000_000) / PTS_HZ)
}

pub fn time_to_pts(time: Duration) -> u64 {
    (time.as_nanos() as u64) * PTS_HZ / 1_000_000_000
}
