use super::packet::TSPacket;
use super::pes::PESHeader;
use super::tables::parse_pmt_cell;
use super::types::*;
use crate::av::{self, CodecType, StreamMeta, TrackKind, TrackMeta};
use crate::error::{Result, TsioError};
use bytes::Bytes;

/// Parser for the Program Specific Information sections carried in
/// table cells.
pub struct TSPacketParser;

impl TSPacketParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_pat(&self, data: &[u8], offset: usize, length: usize) -> Result<PAT> {
        let mut pat = PAT::new();
        let mut pos = offset;
        let end = offset + length;

        while pos + 4 <= end {
            let program_number = ((data[pos] as u16) << 8) | data[pos + 1] as u16;
            let pid = (((data[pos + 2] & 0x1F) as u16) << 8) | data[pos + 3] as u16;
            pat.entries.push(PATEntry {
                program_number,
                network_pid: if program_number == 0 { pid } else { 0 },
                program_map_pid: if program_number != 0 { pid } else { 0 },
            });
            pos += 4;
        }

        Ok(pat)
    }

    pub fn parse_pmt(&self, data: &[u8], offset: usize, length: usize) -> Result<PMT> {
        let mut pmt = PMT::new();
        let mut pos = offset;
        let end = offset + length;

        if pos + 2 > end {
            return Err(TsioError::InvalidData("PMT too short for PCR PID".into()));
        }

        pmt.pcr_pid = (((data[pos] & 0x1F) as u16) << 8) | data[pos + 1] as u16;
        pos += 2;

        if pos + 2 > end {
            return Err(TsioError::InvalidData(
                "PMT too short for program info length".into(),
            ));
        }

        let program_info_length = ((data[pos] as usize & 0x0F) << 8) | data[pos + 1] as usize;
        pos += 2;

        if program_info_length > 0 {
            if pos + program_info_length > end {
                return Err(TsioError::InvalidData("Program info data too short".into()));
            }
            pmt.program_descriptors =
                self.parse_descriptors(&data[pos..pos + program_info_length])?;
            pos += program_info_length;
        }

        while pos + 5 <= end {
            let stream_type = data[pos];
            let elementary_pid = (((data[pos + 1] & 0x1F) as u16) << 8) | data[pos + 2] as u16;
            let es_info_length = ((data[pos + 3] as usize & 0x0F) << 8) | data[pos + 4] as usize;
            pos += 5;

            if pos + es_info_length > end {
                return Err(TsioError::InvalidData("ES info data too short".into()));
            }

            let descriptors = self.parse_descriptors(&data[pos..pos + es_info_length])?;
            pos += es_info_length;

            pmt.elementary_stream_infos.push(ElementaryStreamInfo {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        Ok(pmt)
    }

    fn parse_descriptors(&self, data: &[u8]) -> Result<Vec<Descriptor>> {
        let mut descriptors = Vec::new();
        let mut pos = 0;

        while pos + 2 <= data.len() {
            let tag = data[pos];
            let length = data[pos + 1] as usize;
            pos += 2;

            if pos + length > data.len() {
                return Err(TsioError::InvalidData("Descriptor data too short".into()));
            }

            descriptors.push(Descriptor {
                tag,
                data: data[pos..pos + length].to_vec(),
            });
            pos += length;
        }

        Ok(descriptors)
    }
}

impl Default for TSPacketParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the server's internal stream description from a parsed
/// PAT/PMT cell pair.
///
/// Tracks with stream types this library does not map to a codec are
/// skipped with a log message rather than failing the whole stream.
pub fn to_stream_meta(pat_packet: &TSPacket, pmt_packet: &TSPacket) -> Result<StreamMeta> {
    let pmt_pid = pat_packet.program_map_pid()?;
    if pmt_packet.pid() != pmt_pid {
        log::warn!(
            "PMT cell arrived on PID {:#06x}, PAT announced {:#06x}",
            pmt_packet.pid(),
            pmt_pid
        );
    }

    let pmt = parse_pmt_cell(pmt_packet)?;
    let mut meta = StreamMeta::new();
    for info in &pmt.elementary_stream_infos {
        let codec = match info.stream_type {
            STREAM_TYPE_H264 => CodecType::H264,
            STREAM_TYPE_H265 => CodecType::H265,
            STREAM_TYPE_AAC => CodecType::AAC,
            other => {
                log::debug!(
                    "skipping unmapped stream type {:#04x} on PID {:#06x}",
                    other,
                    info.elementary_pid
                );
                continue;
            }
        };
        let kind = if is_video_stream_type(info.stream_type) {
            TrackKind::Video
        } else {
            TrackKind::Audio
        };
        meta.tracks
            .push(TrackMeta::new(info.elementary_pid, kind, codec));
    }
    Ok(meta)
}

impl TSPacket {
    /// Converts this packet's payload into the server's internal media
    /// packet representation.
    ///
    /// When the packet starts a payload unit, the PES lead-in is
    /// stripped and its PTS carried over; continuation packets yield
    /// their raw payload.
    pub fn to_media_packet(&self, meta: &StreamMeta, kind: TrackKind) -> Result<av::Packet> {
        let track = match kind {
            TrackKind::Video => meta.video(),
            TrackKind::Audio => meta.audio(),
        }
        .ok_or_else(|| TsioError::InvalidData("stream metadata has no such track".into()))?;

        let payload = self.payload();
        let mut data = payload;
        let mut pts = None;
        if self.unit_start() {
            if let Ok(header) = PESHeader::parse(payload) {
                let lead_in = 9 + header.header_data_length as usize;
                if lead_in <= payload.len() {
                    data = &payload[lead_in..];
                }
                pts = header.pts.map(|p| p as i64);
            }
        }

        let mut packet = av::Packet::new(Bytes::copy_from_slice(data))
            .with_stream_index(meta.index_of_pid(track.pid).unwrap_or(0))
            .with_key_flag(self.random_access());
        packet.pts = pts;
        Ok(packet)
    }
}
