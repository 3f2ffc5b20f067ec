//! Fixed Program Specific Information tables.
//!
//! The default PAT, PMT and SDT are byte-identical to the tables a
//! well-known reference encoder (FFMPEG) emits, so players that key
//! off exact table content keep interoperating. They carry no
//! per-stream state; when a stream's PID assignment differs from the
//! defaults, the template is patched in place and its section CRC
//! refreshed rather than recomputing the whole table.

use super::packet::TSPacket;
use super::parser::TSPacketParser;
use super::types::{
    is_audio_stream_type, is_video_stream_type, PAT, PMT, TABLE_ID_PAT, TABLE_ID_PMT,
    TS_PACKET_SIZE,
};
use crate::error::{Result, TsioError};
use crate::utils::Crc32Mpeg2;

/// A standard Program Association Table, as generated by FFMPEG.
/// Seems to be independent of the stream.
pub static DEFAULT_PAT: [u8; TS_PACKET_SIZE] = [
    0x47, 0x40, 0x00, 0x10, 0x00, 0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01,
    0xF0, 0x00, 0x2A, 0xB1, 0x04, 0xB2, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// A standard Program Mapping Table, as generated by FFMPEG.
/// Contains both audio and video mappings, works also on video- or
/// audio-only streams.
pub static DEFAULT_PMT: [u8; TS_PACKET_SIZE] = [
    0x47, 0x50, 0x00, 0x10, 0x00, 0x02, 0xB0, 0x1D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0xE1, 0x00,
    0xF0, 0x00, 0x1B, 0xE1, 0x00, 0xF0, 0x00, 0x0F, 0xE1, 0x01, 0xF0, 0x06, 0x0A, 0x04, 0x65,
    0x6E, 0x67, 0x00, 0x8D, 0x82, 0x9A, 0x07, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// A standard Service Description Table, as generated by FFMPEG.
/// Not consumed by this library's own outputs, provided for
/// compatibility with decoders that require it present.
pub static DEFAULT_SDT: [u8; TS_PACKET_SIZE] = [
    0x47, 0x40, 0x11, 0x10, 0x00, 0x42, 0xF0, 0x25, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01,
    0xFF, 0x00, 0x01, 0xFC, 0x80, 0x14, 0x48, 0x12, 0x01, 0x06, 0x46, 0x46, 0x6D, 0x70, 0x65,
    0x67, 0x09, 0x53, 0x65, 0x72, 0x76, 0x69, 0x63, 0x65, 0x30, 0x31, 0xA7, 0x79, 0xA0, 0x03,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Locates the PSI section inside a table cell.
///
/// Returns the table id and the absolute buffer range of the section,
/// CRC included.
pub(crate) fn section_bounds(packet: &TSPacket) -> Result<(u8, usize, usize)> {
    let bytes = packet.as_bytes();
    let offset = packet.payload_offset();
    if offset + 4 > TS_PACKET_SIZE {
        return Err(TsioError::Parser("PSI pointer field out of bounds".into()));
    }
    let pointer = bytes[offset] as usize;
    let start = offset + 1 + pointer;
    if start + 3 > TS_PACKET_SIZE {
        return Err(TsioError::Parser("PSI section header out of bounds".into()));
    }
    let section_length = (((bytes[start + 1] & 0x0F) as usize) << 8) | bytes[start + 2] as usize;
    let end = start + 3 + section_length;
    if section_length < 9 || end > TS_PACKET_SIZE {
        return Err(TsioError::Parser("PSI section length out of bounds".into()));
    }
    Ok((bytes[start], start, end))
}

/// Compares the section's stored CRC against a fresh calculation.
/// Mismatches are tolerated but logged, favoring pipeline resilience.
fn check_section_crc(packet: &TSPacket, start: usize, end: usize) {
    let bytes = packet.as_bytes();
    let computed = Crc32Mpeg2::new().calculate(&bytes[start..end - 4]);
    let stored = u32::from_be_bytes([
        bytes[end - 4],
        bytes[end - 3],
        bytes[end - 2],
        bytes[end - 1],
    ]);
    if computed != stored {
        log::warn!(
            "PSI section CRC mismatch on PID {:#06x}: stored {:#010x}, computed {:#010x}",
            packet.pid(),
            stored,
            computed
        );
    }
}

fn refresh_section_crc(packet: &mut TSPacket, start: usize, end: usize) {
    let computed = Crc32Mpeg2::new().calculate(&packet.as_bytes()[start..end - 4]);
    packet.buffer_mut()[end - 4..end].copy_from_slice(&computed.to_be_bytes());
}

/// Parses the program association section out of a PAT cell.
pub fn parse_pat_cell(packet: &TSPacket) -> Result<PAT> {
    let (table_id, start, end) = section_bounds(packet)?;
    if table_id != TABLE_ID_PAT {
        return Err(TsioError::InvalidData(format!(
            "expected PAT table id, got {:#04x}",
            table_id
        )));
    }
    check_section_crc(packet, start, end);
    let parser = TSPacketParser::new();
    parser.parse_pat(packet.as_bytes(), start + 8, end - 4 - (start + 8))
}

/// Parses the program map section out of a PMT cell.
pub fn parse_pmt_cell(packet: &TSPacket) -> Result<PMT> {
    let (table_id, start, end) = section_bounds(packet)?;
    if table_id != TABLE_ID_PMT {
        return Err(TsioError::InvalidData(format!(
            "expected PMT table id, got {:#04x}",
            table_id
        )));
    }
    check_section_crc(packet, start, end);
    let parser = TSPacketParser::new();
    parser.parse_pmt(packet.as_bytes(), start + 8, end - 4 - (start + 8))
}

impl TSPacket {
    /// Overwrites the cell with the default Program Association Table.
    pub fn default_pat(&mut self) {
        self.load(&DEFAULT_PAT);
    }

    /// Overwrites the cell with the default Program Mapping Table.
    pub fn default_pmt(&mut self) {
        self.load(&DEFAULT_PMT);
    }

    /// Overwrites the cell with the default Service Description Table.
    pub fn default_sdt(&mut self) {
        self.load(&DEFAULT_SDT);
    }

    /// The PID the PAT in this cell assigns to the program map table.
    pub fn program_map_pid(&self) -> Result<u16> {
        let pat = parse_pat_cell(self)?;
        pat.entries
            .iter()
            .find(|entry| entry.program_number != 0)
            .map(|entry| entry.program_map_pid)
            .ok_or_else(|| TsioError::Parser("PAT carries no program entry".into()))
    }

    /// Reads the video and audio PID assignments out of the PMT in
    /// this cell, updating the caller's bookkeeping in place. PIDs of
    /// unrecognized stream types are left untouched.
    pub fn update_stream_pid(&self, video_pid: &mut u16, audio_pid: &mut u16) -> Result<()> {
        let pmt = parse_pmt_cell(self)?;
        for info in &pmt.elementary_stream_infos {
            if is_video_stream_type(info.stream_type) {
                *video_pid = info.elementary_pid;
            } else if is_audio_stream_type(info.stream_type) {
                *audio_pid = info.elementary_pid;
            }
        }
        Ok(())
    }

    /// Rewrites the PID fields of the PMT in this cell and refreshes
    /// the section CRC. The PCR PID follows the video track; table
    /// structure is not re-derived.
    pub fn patch_stream_pids(&mut self, video_pid: u16, audio_pid: u16) -> Result<()> {
        let (table_id, start, end) = section_bounds(self)?;
        if table_id != TABLE_ID_PMT {
            return Err(TsioError::InvalidData(format!(
                "expected PMT table id, got {:#04x}",
                table_id
            )));
        }
        let video_pid = video_pid & 0x1FFF;
        let audio_pid = audio_pid & 0x1FFF;

        let buffer = self.buffer_mut();
        buffer[start + 8] = 0xE0 | (video_pid >> 8) as u8;
        buffer[start + 9] = (video_pid & 0xFF) as u8;

        let program_info_length =
            (((buffer[start + 10] & 0x0F) as usize) << 8) | buffer[start + 11] as usize;
        let mut pos = start + 12 + program_info_length;
        while pos + 5 <= end - 4 {
            let stream_type = buffer[pos];
            let pid = if is_video_stream_type(stream_type) {
                Some(video_pid)
            } else if is_audio_stream_type(stream_type) {
                Some(audio_pid)
            } else {
                None
            };
            if let Some(pid) = pid {
                buffer[pos + 1] = 0xE0 | (pid >> 8) as u8;
                buffer[pos + 2] = (pid & 0xFF) as u8;
            }
            let es_info_length =
                (((buffer[pos + 3] & 0x0F) as usize) << 8) | buffer[pos + 4] as usize;
            pos += 5 + es_info_length;
        }

        refresh_section_crc(self, start, end);
        Ok(())
    }

    /// Rewrites the program map PID of the PAT in this cell and
    /// refreshes the section CRC.
    pub fn patch_program_map_pid(&mut self, pmt_pid: u16) -> Result<()> {
        let (table_id, start, end) = section_bounds(self)?;
        if table_id != TABLE_ID_PAT {
            return Err(TsioError::InvalidData(format!(
                "expected PAT table id, got {:#04x}",
                table_id
            )));
        }
        let pmt_pid = pmt_pid & 0x1FFF;

        let buffer = self.buffer_mut();
        let mut pos = start + 8;
        while pos + 4 <= end - 4 {
            let program_number = ((buffer[pos] as u16) << 8) | buffer[pos + 1] as u16;
            if program_number != 0 {
                buffer[pos + 2] = 0xE0 | (pmt_pid >> 8) as u8;
                buffer[pos + 3] = (pmt_pid & 0xFF) as u8;
            }
            pos += 4;
        }

        refresh_section_crc(self, start, end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::types::{PID_AUDIO, PID_PMT, PID_VIDEO};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_pat_bytes() {
        let mut packet = TSPacket::new();
        packet.default_pat();
        assert_eq!(&packet.as_bytes()[..], &DEFAULT_PAT[..]);
        assert_eq!(packet.as_bytes()[0], 0x47);
        assert_eq!(&packet.as_bytes()[1..4], &[0x40, 0x00, 0x10]);
        assert_eq!(packet.bytes_free(), 0);
        assert!(packet.unit_start());
    }

    #[test]
    fn test_default_table_pids() {
        let mut packet = TSPacket::new();
        packet.default_pat();
        assert_eq!(packet.pid(), 0x0000);
        packet.default_pmt();
        assert_eq!(packet.pid(), PID_PMT);
        packet.default_sdt();
        assert_eq!(packet.pid(), 0x0011);
    }

    #[test]
    fn test_templates_carry_valid_crc() {
        let crc = Crc32Mpeg2::new();
        // PAT section spans bytes 5..21, CRC stored in the last 4
        assert_eq!(
            crc.calculate(&DEFAULT_PAT[5..17]).to_be_bytes(),
            DEFAULT_PAT[17..21]
        );
        // PMT section spans bytes 5..37
        assert_eq!(
            crc.calculate(&DEFAULT_PMT[5..33]).to_be_bytes(),
            DEFAULT_PMT[33..37]
        );
        // SDT section spans bytes 5..45
        assert_eq!(
            crc.calculate(&DEFAULT_SDT[5..41]).to_be_bytes(),
            DEFAULT_SDT[41..45]
        );
    }

    #[test]
    fn test_program_map_pid() {
        let mut packet = TSPacket::new();
        packet.default_pat();
        assert_eq!(packet.program_map_pid().unwrap(), PID_PMT);

        // Not a PAT
        packet.default_pmt();
        assert!(packet.program_map_pid().is_err());
    }

    #[test]
    fn test_update_stream_pid_reads_defaults() {
        let mut packet = TSPacket::new();
        packet.default_pmt();

        let mut video_pid = 0u16;
        let mut audio_pid = 0u16;
        packet
            .update_stream_pid(&mut video_pid, &mut audio_pid)
            .unwrap();
        assert_eq!(video_pid, PID_VIDEO);
        assert_eq!(audio_pid, PID_AUDIO);

        packet.default_pat();
        assert!(packet
            .update_stream_pid(&mut video_pid, &mut audio_pid)
            .is_err());
    }

    #[test]
    fn test_patch_with_default_pids_is_identity() {
        let mut packet = TSPacket::new();
        packet.default_pmt();
        packet.patch_stream_pids(PID_VIDEO, PID_AUDIO).unwrap();
        assert_eq!(&packet.as_bytes()[..], &DEFAULT_PMT[..]);

        packet.default_pat();
        packet.patch_program_map_pid(PID_PMT).unwrap();
        assert_eq!(&packet.as_bytes()[..], &DEFAULT_PAT[..]);
    }

    #[test]
    fn test_patch_stream_pids_round_trip() {
        let mut packet = TSPacket::new();
        packet.default_pmt();
        packet.patch_stream_pids(0x1E1, 0x1E2).unwrap();

        let mut video_pid = 0u16;
        let mut audio_pid = 0u16;
        packet
            .update_stream_pid(&mut video_pid, &mut audio_pid)
            .unwrap();
        assert_eq!(video_pid, 0x1E1);
        assert_eq!(audio_pid, 0x1E2);

        // PCR PID follows the video track, reserved bits kept
        assert_eq!(packet.as_bytes()[13], 0xE1);
        assert_eq!(packet.as_bytes()[14], 0xE1);

        // Refreshed CRC is self-consistent
        let (_, start, end) = section_bounds(&packet).unwrap();
        let computed = Crc32Mpeg2::new().calculate(&packet.as_bytes()[start..end - 4]);
        assert_eq!(
            computed.to_be_bytes(),
            packet.as_bytes()[end - 4..end]
        );
    }

    #[test]
    fn test_patch_program_map_pid_round_trip() {
        let mut packet = TSPacket::new();
        packet.default_pat();
        packet.patch_program_map_pid(0x0FFF).unwrap();
        assert_eq!(packet.program_map_pid().unwrap(), 0x0FFF);

        let pat = parse_pat_cell(&packet).unwrap();
        assert_eq!(pat.entries.len(), 1);
        assert_eq!(pat.entries[0].program_number, 1);
    }

    #[test]
    fn test_section_bounds_rejects_junk() {
        // A cleared cell has no section to find (zeroed payload parses
        // as a section with length 0)
        let packet = TSPacket::new();
        assert!(section_bounds(&packet).is_err());
    }
}
