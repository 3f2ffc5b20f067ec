use super::packet::TSPacket;
use super::types::*;
use crate::av::{CodecData, CodecType, Packet};
use crate::error::{Result, TsioError};
use crate::format::Muxer;
use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, trace};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// ~25 PCR updates per second
const PCR_INTERVAL: Duration = Duration::from_millis(40);

/// Access units between PAT/PMT re-emissions.
const TABLE_INTERVAL: u32 = 40;

/// Multiplexes elementary streams into an MPEG transport stream.
///
/// Each access unit is wrapped in a PES lead-in and spread over
/// 188-byte cells built with [`TSPacket`]; PAT/PMT cells are
/// interleaved on a fixed cadence and the PCR rides the video PID.
///
/// ```rust,no_run
/// use tsio::format::ts::TSMuxer;
/// use tsio::format::Muxer;
/// use tsio::av::Packet;
///
/// # async fn mux(video: Box<dyn tsio::av::CodecData>) -> tsio::Result<()> {
/// let mut muxer = TSMuxer::new(tokio::io::sink());
/// muxer.add_stream(video).await?;
/// muxer.write_header(&[]).await?;
/// muxer
///     .write_packet(Packet::new(vec![0u8; 1024]).with_pts(0).with_key_flag(true))
///     .await?;
/// muxer.write_trailer().await?;
/// # Ok(())
/// # }
/// ```
pub struct TSMuxer<W: AsyncWrite + Unpin + Send> {
    writer: tokio::io::BufWriter<W>,
    streams: Vec<StreamConfig>,
    continuity_counters: Vec<u8>,
    table_counters: [u8; 2],
    current_pcr: Duration,
    last_pcr_write: Option<Duration>,
    units_since_tables: u32,
}

struct StreamConfig {
    codec: Box<dyn CodecData>,
    pid: u16,
}

impl<W: AsyncWrite + Unpin + Send> TSMuxer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::io::BufWriter::new(writer),
            streams: Vec::new(),
            continuity_counters: Vec::new(),
            table_counters: [0; 2],
            current_pcr: Duration::ZERO,
            last_pcr_write: None,
            units_since_tables: 0,
        }
    }

    /// Registers an elementary stream, returning its assigned PID.
    pub async fn add_stream(&mut self, codec: Box<dyn CodecData>) -> Result<u16> {
        let pid = PID_VIDEO + self.streams.len() as u16;
        debug!("added {:?} stream on PID {:#06x}", codec.codec_type(), pid);
        self.streams.push(StreamConfig { codec, pid });
        self.continuity_counters.push(0);
        Ok(pid)
    }

    pub fn reset_pcr(&mut self) {
        self.current_pcr = Duration::ZERO;
        self.last_pcr_write = None;
    }

    /// Unwraps the muxer, returning the underlying writer. Call
    /// [`write_trailer`](Muxer::write_trailer) first so buffered cells
    /// are flushed.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn video_pid(&self) -> u16 {
        self.streams
            .iter()
            .find(|s| is_video_codec(s.codec.codec_type()))
            .map(|s| s.pid)
            .unwrap_or(PID_VIDEO)
    }

    fn audio_pid(&self) -> u16 {
        self.streams
            .iter()
            .find(|s| !is_video_codec(s.codec.codec_type()))
            .map(|s| s.pid)
            .unwrap_or(PID_AUDIO)
    }

    fn next_continuity_counter(&mut self, stream_index: usize) -> u8 {
        let counter = &mut self.continuity_counters[stream_index];
        let current = *counter;
        *counter = (*counter + 1) & 0x0F;
        current
    }

    fn pcr_due(&self) -> bool {
        match self.last_pcr_write {
            Some(last) => self.current_pcr >= last + PCR_INTERVAL,
            None => true,
        }
    }

    /// Emits one PAT and one PMT cell, patched for the actual PID
    /// assignment. Table cells carry payload, so their continuity
    /// counters advance like any other PID's.
    async fn write_tables(&mut self) -> Result<()> {
        let video_pid = self.video_pid();
        let audio_pid = self.audio_pid();

        let mut cell = TSPacket::new();
        cell.default_pat();
        cell.set_continuity_counter(self.table_counters[0]);
        self.table_counters[0] = (self.table_counters[0] + 1) & 0x0F;
        self.writer.write_all(cell.as_bytes()).await?;

        cell.default_pmt();
        cell.patch_stream_pids(video_pid, audio_pid)?;
        cell.set_continuity_counter(self.table_counters[1]);
        self.table_counters[1] = (self.table_counters[1] + 1) & 0x0F;
        self.writer.write_all(cell.as_bytes()).await?;

        self.units_since_tables = 0;
        trace!("wrote PAT/PMT (video {:#06x}, audio {:#06x})", video_pid, audio_pid);
        Ok(())
    }
}

fn is_video_codec(codec_type: CodecType) -> bool {
    matches!(codec_type, CodecType::H264 | CodecType::H265)
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Muxer for TSMuxer<W> {
    async fn write_header(&mut self, _streams: &[Box<dyn CodecData>]) -> Result<()> {
        debug!("writing TS header tables for {} streams", self.streams.len());

        // SDT once up front, for decoders that expect it present
        let mut cell = TSPacket::new();
        cell.default_sdt();
        self.writer.write_all(cell.as_bytes()).await?;

        self.write_tables().await?;
        self.reset_pcr();
        Ok(())
    }

    async fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let (pid, is_video) = {
            let stream = self.streams.get(packet.stream_index).ok_or_else(|| {
                TsioError::InvalidData(format!("unknown stream index {}", packet.stream_index))
            })?;
            (stream.pid, is_video_codec(stream.codec.codec_type()))
        };

        if self.units_since_tables >= TABLE_INTERVAL {
            self.write_tables().await?;
        }
        self.units_since_tables += 1;

        let pts = packet.pts.unwrap_or(0).max(0) as u64;
        if packet.pts.is_some() {
            self.current_pcr = pts_to_time(pts);
        }

        let mut payload = BytesMut::from(&packet.data[..]);
        let mut first = true;
        while first || !payload.is_empty() {
            let mut cell = TSPacket::new();
            cell.set_pid(pid);
            cell.set_continuity_counter(self.next_continuity_counter(packet.stream_index));

            if first {
                cell.set_unit_start(true);
                if packet.is_key {
                    cell.set_random_access(true);
                }
                if is_video && self.pcr_due() {
                    cell.set_pcr(time_to_pcr(self.current_pcr));
                    self.last_pcr_write = Some(self.current_pcr);
                }
                if is_video {
                    cell.pes_video_lead_in(packet.data.len());
                } else {
                    cell.pes_audio_lead_in(packet.data.len(), pts);
                }
                first = false;
            }

            cell.fill_free(&mut payload);
            trace!("{}", cell);
            self.writer.write_all(cell.as_bytes()).await?;
        }

        Ok(())
    }

    async fn write_trailer(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
