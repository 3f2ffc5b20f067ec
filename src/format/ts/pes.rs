use super::packet::TSPacket;
use super::types::{STREAM_ID_AAC, STREAM_ID_H264};
use crate::error::{Result, TsioError};
use bytes::{BufMut, BytesMut};

/// A PES lead-in as emitted by the FFMPEG reference encoder.
///
/// Functionally a video lead-in with zeroed PTS/DTS fields; kept
/// byte-identical for players that key off the reference framing.
pub const FFMPEG_HEADER: [u8; 19] = [
    0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0xC0, 0x0A, 0x31, 0x00, 0x01, 0x00, 0x01, 0x11,
    0x00, 0x01, 0x00, 0x01,
];

/// Packetized Elementary Stream (PES) header structure
///
/// Contains the fields defined in the MPEG-TS specification for PES
/// headers, including timing information and control flags.
#[derive(Debug, Clone)]
pub struct PESHeader {
    /// Stream identifier indicating content type (video/audio/etc.)
    pub stream_id: u8,
    /// Length of the PES packet after the length field, 0 for unbounded video
    pub packet_length: u16,
    /// Control field for scrambling mode
    pub scrambling_control: u8,
    /// Priority flag for the packet
    pub priority: bool,
    /// Data alignment indicator
    pub data_alignment: bool,
    /// Copyright indicator
    pub copyright: bool,
    /// Original/copy indicator
    pub original: bool,
    /// Two-bit field indicating presence of PTS/DTS (`10` = PTS, `11` = both)
    pub pts_dts_flags: u8,
    /// Length of the optional header data following this field
    pub header_data_length: u8,
    /// Presentation Time Stamp (33 bits, 90 kHz)
    pub pts: Option<u64>,
    /// Decoding Time Stamp (33 bits, 90 kHz)
    pub dts: Option<u64>,
}

impl Default for PESHeader {
    fn default() -> Self {
        Self {
            stream_id: 0,
            packet_length: 0,
            scrambling_control: 0,
            priority: false,
            data_alignment: false,
            copyright: false,
            original: false,
            pts_dts_flags: 0,
            header_data_length: 0,
            pts: None,
            dts: None,
        }
    }
}

impl PESHeader {
    /// Creates a new PES header with a specific stream ID.
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    /// Sets the presentation timestamp, in 90 kHz ticks.
    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts & 0x1_FFFF_FFFF);
        self.pts_dts_flags |= 0b10;
        self
    }

    /// Sets the decoding timestamp, in 90 kHz ticks.
    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts & 0x1_FFFF_FFFF);
        self.pts_dts_flags |= 0b01;
        self
    }

    /// Encodes the header into `buf` according to PES syntax.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        // Start code prefix (3 bytes)
        buf.put_u8(0x00);
        buf.put_u8(0x00);
        buf.put_u8(0x01);

        buf.put_u8(self.stream_id);
        buf.put_u16(self.packet_length);

        // First flags byte: '10' marker + scrambling + indicators
        let mut flags = 0x80u8;
        flags |= (self.scrambling_control & 0x03) << 4;
        if self.priority {
            flags |= 0x08;
        }
        if self.data_alignment {
            flags |= 0x04;
        }
        if self.copyright {
            flags |= 0x02;
        }
        if self.original {
            flags |= 0x01;
        }
        buf.put_u8(flags);

        // Second flags byte: PTS/DTS presence in the top two bits
        buf.put_u8((self.pts_dts_flags & 0x03) << 6);

        let header_data_length = (if self.pts.is_some() { 5u8 } else { 0 })
            + (if self.dts.is_some() { 5 } else { 0 });
        buf.put_u8(header_data_length);

        if let Some(pts) = self.pts {
            let marker = if self.dts.is_some() { 0x30 } else { 0x20 };
            write_timestamp(buf, marker, pts);
        }
        if let Some(dts) = self.dts {
            write_timestamp(buf, 0x10, dts);
        }

        Ok(())
    }

    /// Parses a PES lead-in from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<PESHeader> {
        if data.len() < 9 {
            return Err(TsioError::Parser("PES header too short".into()));
        }
        if data[0] != 0x00 || data[1] != 0x00 || data[2] != 0x01 {
            return Err(TsioError::Parser("Invalid PES start code".into()));
        }

        let flags = data[6];
        let pts_dts_flags = data[7] >> 6;
        let mut header = PESHeader {
            stream_id: data[3],
            packet_length: ((data[4] as u16) << 8) | data[5] as u16,
            scrambling_control: (flags >> 4) & 0x03,
            priority: flags & 0x08 != 0,
            data_alignment: flags & 0x04 != 0,
            copyright: flags & 0x02 != 0,
            original: flags & 0x01 != 0,
            pts_dts_flags,
            header_data_length: data[8],
            pts: None,
            dts: None,
        };

        if pts_dts_flags & 0b10 != 0 {
            if data.len() < 14 {
                return Err(TsioError::Parser("PES timestamp data too short".into()));
            }
            header.pts = Some(read_timestamp(&data[9..14]));
            if pts_dts_flags == 0b11 {
                if data.len() < 19 {
                    return Err(TsioError::Parser("PES timestamp data too short".into()));
                }
                header.dts = Some(read_timestamp(&data[14..19]));
            }
        }

        Ok(header)
    }
}

/// Builds the lead-in bytes preceding one video access unit.
///
/// No timestamp fields are emitted for this variant; the packet length
/// falls back to 0 (unbounded) when the frame does not fit the 16-bit
/// field.
pub fn video_lead_in(frame_len: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(9);
    let total = frame_len + 3;
    let packet_length = if total > u16::MAX as usize {
        0
    } else {
        total as u16
    };
    buf.put_slice(&[0x00, 0x00, 0x01, STREAM_ID_H264]);
    buf.put_u16(packet_length);
    buf.put_slice(&[0x80, 0x00, 0x00]);
    buf
}

/// Builds the lead-in bytes preceding one audio frame.
///
/// A nonzero `pts` is encoded as the 5-byte PTS-only timestamp field;
/// a zero `pts` omits the field and marks the flags accordingly.
pub fn audio_lead_in(frame_len: usize, pts: u64) -> BytesMut {
    let mut buf = BytesMut::with_capacity(14);
    buf.put_slice(&[0x00, 0x00, 0x01, STREAM_ID_AAC]);
    if pts != 0 {
        buf.put_u16(((frame_len + 8) & 0xFFFF) as u16);
        buf.put_slice(&[0x80, 0x80, 0x05]);
        write_timestamp(&mut buf, 0x20, pts);
    } else {
        buf.put_u16(((frame_len + 3) & 0xFFFF) as u16);
        buf.put_slice(&[0x80, 0x00, 0x00]);
    }
    buf
}

impl TSPacket {
    /// Writes a video PES lead-in for a `frame_len`-byte access unit
    /// into the payload region.
    pub fn pes_video_lead_in(&mut self, frame_len: usize) {
        self.write_payload(&video_lead_in(frame_len));
    }

    /// Writes an audio PES lead-in for a `frame_len`-byte frame into
    /// the payload region, with an optional PTS.
    pub fn pes_audio_lead_in(&mut self, frame_len: usize, pts: u64) {
        self.write_payload(&audio_lead_in(frame_len, pts));
    }

    /// Writes the FFMPEG-compatible lead-in variant into the payload
    /// region.
    pub fn ffmpeg_header(&mut self) {
        self.write_payload(&FFMPEG_HEADER);
    }

    /// Re-extracts the PTS from a PES lead-in carried in this packet's
    /// payload. Returns 0 when no lead-in or no timestamp is present.
    pub fn pes_timestamp(&self) -> u64 {
        match PESHeader::parse(self.payload()) {
            Ok(header) => header.pts.unwrap_or(0),
            Err(_) => 0,
        }
    }
}

/// Writes a 5-byte PTS/DTS field: 4-bit marker, then the 33-bit
/// timestamp in three groups separated by marker bits.
fn write_timestamp(buf: &mut BytesMut, marker: u8, ts: u64) {
    let ts = ts & 0x1_FFFF_FFFF;
    buf.put_u8(marker | ((ts >> 29) & 0x0E) as u8 | 0x01);
    buf.put_u16((((ts >> 14) & 0xFFFE) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xFFFE) | 0x01) as u16);
}

/// Reads back a 5-byte PTS/DTS field.
fn read_timestamp(data: &[u8]) -> u64 {
    (((data[0] >> 1) & 0x07) as u64) << 30
        | (data[1] as u64) << 22
        | (((data[2] >> 1) & 0x7F) as u64) << 15
        | (data[3] as u64) << 7
        | (data[4] >> 1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_video_lead_in_layout() {
        let buf = video_lead_in(10);
        assert_eq!(&buf[0..4], &[0x00, 0x00, 0x01, 0xE0]);
        assert_eq!(&buf[4..6], &[0x00, 13]);
        // No timestamps, empty header data
        assert_eq!(&buf[6..9], &[0x80, 0x00, 0x00]);

        // Oversized frames fall back to the unbounded convention
        let buf = video_lead_in(0x1_0000);
        assert_eq!(&buf[4..6], &[0x00, 0x00]);
    }

    #[test]
    fn test_audio_lead_in_with_pts() {
        let buf = audio_lead_in(188, 1000);
        assert_eq!(buf.len(), 14);
        assert_eq!(&buf[0..4], &[0x00, 0x00, 0x01, 0xC0]);
        // 188 + 8 trailing header bytes
        assert_eq!(((buf[4] as u16) << 8) | buf[5] as u16, 196);
        assert_eq!(&buf[6..9], &[0x80, 0x80, 0x05]);

        let header = PESHeader::parse(&buf).unwrap();
        assert_eq!(header.pts, Some(1000));
        assert_eq!(header.dts, None);
    }

    #[test]
    fn test_audio_lead_in_without_pts() {
        let buf = audio_lead_in(100, 0);
        assert_eq!(buf.len(), 9);
        assert_eq!(((buf[4] as u16) << 8) | buf[5] as u16, 103);
        assert_eq!(&buf[6..9], &[0x80, 0x00, 0x00]);

        let header = PESHeader::parse(&buf).unwrap();
        assert_eq!(header.pts, None);
    }

    #[test]
    fn test_packet_pes_timestamp_round_trip() {
        let mut packet = TSPacket::new();
        packet.set_pid(0x101);
        packet.set_unit_start(true);
        packet.pes_audio_lead_in(188, 1000);
        assert_eq!(packet.pes_timestamp(), 1000);

        // Timestamp survives the rest of the cell being filled
        let mut data = BytesMut::from(&[0x33; 188][..]);
        packet.fill_free(&mut data);
        assert_eq!(packet.pes_timestamp(), 1000);
    }

    #[test]
    fn test_pes_timestamp_absent() {
        let mut packet = TSPacket::new();
        packet.pes_video_lead_in(100);
        assert_eq!(packet.pes_timestamp(), 0);

        let empty = TSPacket::new();
        assert_eq!(empty.pes_timestamp(), 0);
    }

    #[test]
    fn test_pes_header_write_parse_round_trip() {
        let mut buf = BytesMut::new();
        let header = PESHeader::new(0xE0).with_pts(123_456).with_dts(123_000);
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 19);

        let parsed = PESHeader::parse(&buf).unwrap();
        assert_eq!(parsed.stream_id, 0xE0);
        assert_eq!(parsed.pts_dts_flags, 0b11);
        assert_eq!(parsed.header_data_length, 10);
        assert_eq!(parsed.pts, Some(123_456));
        assert_eq!(parsed.dts, Some(123_000));
    }

    #[test]
    fn test_timestamp_masked_to_33_bits() {
        let mut buf = BytesMut::new();
        let header = PESHeader::new(0xC0).with_pts(0x2_0000_0001);
        header.write_to(&mut buf).unwrap();
        let parsed = PESHeader::parse(&buf).unwrap();
        assert_eq!(parsed.pts, Some(1));
    }

    #[test]
    fn test_ffmpeg_header_is_parseable() {
        let header = PESHeader::parse(&FFMPEG_HEADER).unwrap();
        assert_eq!(header.stream_id, 0xE0);
        assert_eq!(header.pts_dts_flags, 0b11);
        assert_eq!(header.header_data_length, 10);
        assert_eq!(header.pts, Some(0));

        let mut packet = TSPacket::new();
        packet.ffmpeg_header();
        assert_eq!(&packet.payload()[..], &FFMPEG_HEADER[..]);
    }

    #[test]
    fn test_parse_rejects_bad_start_code() {
        assert!(PESHeader::parse(&[0, 0, 2, 0xE0, 0, 0, 0x80, 0, 0]).is_err());
        assert!(PESHeader::parse(&[0, 0]).is_err());
    }
}
