use super::types::{TS_HEADER_SIZE, TS_PACKET_SIZE, TS_PAYLOAD_SIZE};
use crate::error::{Result, TsioError};
use bytes::{Bytes, BytesMut};
use std::fmt;

/// First byte of every transport stream packet.
pub const SYNC_BYTE: u8 = 0x47;

/// Adaptation field control: payload only, no adaptation field.
pub const ADAPT_PAYLOAD_ONLY: u8 = 0b01;
/// Adaptation field control: adaptation field only, no payload.
pub const ADAPT_FIELD_ONLY: u8 = 0b10;
/// Adaptation field control: adaptation field followed by payload.
pub const ADAPT_BOTH: u8 = 0b11;

/// A single 188-byte MPEG transport stream packet.
///
/// Owns one fixed-size cell and exposes field-level accessors over the
/// bit-packed header, the optional adaptation field and the payload
/// region. A cell is built up for one TS packet, serialized with
/// [`as_bytes`](TSPacket::as_bytes), then reused via
/// [`clear`](TSPacket::clear).
///
/// Setters are total functions: out-of-range values are masked to their
/// field width rather than rejected, so a misbehaving upstream never
/// stalls the packetization loop.
///
/// ```
/// use tsio::format::ts::TSPacket;
///
/// let mut packet = TSPacket::new();
/// packet.set_pid(0x100);
/// packet.set_unit_start(true);
/// assert_eq!(packet.pid(), 0x100);
/// assert_eq!(packet.bytes_free(), 184);
/// ```
pub struct TSPacket {
    /// The actual cell data
    buffer: [u8; TS_PACKET_SIZE],
    /// Payload bytes still writable with the current header layout
    free: usize,
}

impl TSPacket {
    /// Creates an empty packet: sync byte set, payload-only, 184 bytes free.
    pub fn new() -> Self {
        let mut packet = Self {
            buffer: [0u8; TS_PACKET_SIZE],
            free: TS_PAYLOAD_SIZE,
        };
        packet.clear();
        packet
    }

    /// Resets the packet to its empty state.
    ///
    /// Byte 3 is initialized to payload-only adaptation control; the
    /// reserved `00` control value is never emitted by this writer.
    pub fn clear(&mut self) {
        self.buffer = [0u8; TS_PACKET_SIZE];
        self.buffer[0] = SYNC_BYTE;
        self.buffer[3] = (ADAPT_PAYLOAD_ONLY) << 4;
        self.free = TS_PAYLOAD_SIZE;
    }

    /// Parses an externally supplied 188-byte cell into this packet.
    ///
    /// Fails if the length is not 188 or the sync byte is wrong; the
    /// current buffer is left unmodified on failure. A parsed packet
    /// has no free payload space.
    pub fn parse(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != TS_PACKET_SIZE {
            return Err(TsioError::InvalidData(format!(
                "TS packet must be {} bytes, got {}",
                TS_PACKET_SIZE,
                data.len()
            )));
        }
        if data[0] != SYNC_BYTE {
            return Err(TsioError::InvalidData("Invalid sync byte".into()));
        }
        self.buffer.copy_from_slice(data);
        self.free = 0;
        Ok(())
    }

    /// Parses a 188-byte cell into a fresh packet.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut packet = Self::new();
        packet.parse(data)?;
        Ok(packet)
    }

    /// The serialized 188-byte frame, sync byte through trailing stuffing.
    pub fn as_bytes(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.buffer
    }

    /// Copies the serialized frame out as [`Bytes`].
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer)
    }

    /// The 13-bit packet identifier.
    pub fn pid(&self) -> u16 {
        (((self.buffer[1] & 0x1F) as u16) << 8) | self.buffer[2] as u16
    }

    /// Sets the PID, masking to 13 bits.
    pub fn set_pid(&mut self, pid: u16) {
        self.buffer[1] = (self.buffer[1] & 0xE0) | ((pid >> 8) & 0x1F) as u8;
        self.buffer[2] = (pid & 0xFF) as u8;
    }

    /// The 4-bit continuity counter.
    pub fn continuity_counter(&self) -> u8 {
        self.buffer[3] & 0x0F
    }

    /// Sets the continuity counter, masking to 4 bits.
    pub fn set_continuity_counter(&mut self, counter: u8) {
        self.buffer[3] = (self.buffer[3] & 0xF0) | (counter & 0x0F);
    }

    /// The 2-bit adaptation field control value.
    pub fn adaptation_field(&self) -> u8 {
        (self.buffer[3] >> 4) & 0x03
    }

    /// Rewrites the adaptation field control bits and recomputes the
    /// free payload capacity.
    ///
    /// Turning the field on creates an empty (length 0) field; turning
    /// it off reclaims its bytes. Payload already written is moved so
    /// it stays directly after the header layout.
    pub fn set_adaptation_field(&mut self, control: u8) {
        let control = control & 0x03;
        let had_field = self.has_adaptation_field();
        let written = self.payload_written();
        let old_offset = self.payload_offset();

        if control & 0x02 != 0 {
            if !had_field {
                if self.free == 0 {
                    log::warn!("no room left for an adaptation field, control unchanged");
                    return;
                }
                if written > 0 {
                    self.buffer
                        .copy_within(old_offset..old_offset + written, old_offset + 1);
                }
                self.buffer[4] = 0;
                self.free -= 1;
            }
        } else if had_field {
            if written > 0 {
                self.buffer
                    .copy_within(old_offset..old_offset + written, TS_HEADER_SIZE);
            }
            self.free = TS_PAYLOAD_SIZE - written;
        }
        self.buffer[3] = (self.buffer[3] & 0xCF) | (control << 4);
    }

    /// The adaptation field's declared length byte, 0 when absent.
    pub fn adaptation_field_len(&self) -> usize {
        if self.has_adaptation_field() {
            self.buffer[4] as usize
        } else {
            0
        }
    }

    /// The program clock reference in 27 MHz ticks, when present.
    pub fn pcr(&self) -> Option<u64> {
        if !self.has_adaptation_field()
            || self.adaptation_field_len() < 7
            || self.buffer[5] & 0x10 == 0
        {
            return None;
        }
        let base = ((self.buffer[6] as u64) << 25)
            | ((self.buffer[7] as u64) << 17)
            | ((self.buffer[8] as u64) << 9)
            | ((self.buffer[9] as u64) << 1)
            | ((self.buffer[10] as u64) >> 7);
        let ext = (((self.buffer[10] & 0x01) as u64) << 8) | self.buffer[11] as u64;
        Some(base * 300 + ext)
    }

    /// Writes the program clock reference, given in 27 MHz ticks.
    ///
    /// The adaptation field is created lazily and grown to hold the
    /// 6 PCR bytes directly after the flags byte; the 33-bit base and
    /// 9-bit extension are packed with the 6 reserved bits set.
    pub fn set_pcr(&mut self, clock: u64) {
        if !self.ensure_adaptation_field() || !self.ensure_adaptation_flags() {
            return;
        }
        if self.buffer[5] & 0x10 == 0 {
            if !self.grow_adaptation(1, 6) {
                log::warn!("no room left for a PCR, packet unchanged");
                return;
            }
            self.buffer[5] |= 0x10;
        }
        let base = (clock / 300) & 0x1_FFFF_FFFF;
        let ext = (clock % 300) as u16;
        self.buffer[6] = (base >> 25) as u8;
        self.buffer[7] = (base >> 17) as u8;
        self.buffer[8] = (base >> 9) as u8;
        self.buffer[9] = (base >> 1) as u8;
        self.buffer[10] = (((base & 0x01) << 7) as u8) | 0x7E | ((ext >> 8) as u8 & 0x01);
        self.buffer[11] = (ext & 0xFF) as u8;
    }

    /// The payload unit start indicator.
    pub fn unit_start(&self) -> bool {
        self.buffer[1] & 0x40 != 0
    }

    /// Sets the payload unit start indicator.
    pub fn set_unit_start(&mut self, start: bool) {
        if start {
            self.buffer[1] |= 0x40;
        } else {
            self.buffer[1] &= !0x40;
        }
    }

    /// The random access indicator inside the adaptation field.
    pub fn random_access(&self) -> bool {
        self.has_adaptation_field() && self.adaptation_field_len() >= 1 && self.buffer[5] & 0x40 != 0
    }

    /// Sets the random access indicator, creating a minimal adaptation
    /// field when none is present yet.
    pub fn set_random_access(&mut self, random_access: bool) {
        if !self.ensure_adaptation_field() || !self.ensure_adaptation_flags() {
            return;
        }
        if random_access {
            self.buffer[5] |= 0x40;
        } else {
            self.buffer[5] &= !0x40;
        }
    }

    /// Payload bytes still writable in the current buffer state.
    pub fn bytes_free(&self) -> usize {
        self.free
    }

    /// Consumes `num_bytes` of payload capacity with `0xFF` filler in
    /// the adaptation field.
    ///
    /// Creating the field spends the length byte (and flags byte) out
    /// of `num_bytes`; the rest is written as filler. Requests larger
    /// than [`bytes_free`](TSPacket::bytes_free) are clamped, leaving
    /// the header bytes untouched.
    pub fn add_stuffing(&mut self, num_bytes: usize) {
        let mut left = num_bytes.min(self.free);
        if left == 0 {
            return;
        }
        if !self.has_adaptation_field() {
            self.ensure_adaptation_field();
            left -= 1;
            if left == 0 {
                return;
            }
        }
        if self.adaptation_field_len() == 0 {
            self.ensure_adaptation_flags();
            left -= 1;
            if left == 0 {
                return;
            }
        }
        let len = self.buffer[4] as usize;
        if self.grow_adaptation(len, left) {
            self.buffer[5 + len..5 + len + left].fill(0xFF);
        }
    }

    /// Fills the remaining payload capacity from the front of `data`.
    ///
    /// Writes as much of `data` as fits, consuming the written bytes
    /// from the caller's buffer. If `data` is exhausted before the cell
    /// is full, stuffing absorbs the difference first so the cell is
    /// always completely occupied afterwards.
    pub fn fill_free(&mut self, data: &mut BytesMut) {
        if data.len() < self.free {
            self.add_stuffing(self.free - data.len());
        }
        let take = self.free.min(data.len());
        if take == 0 {
            return;
        }
        let chunk = data.split_to(take);
        let offset = TS_PACKET_SIZE - self.free;
        self.buffer[offset..offset + take].copy_from_slice(&chunk);
        self.free -= take;
    }

    /// The payload region written so far (everything after the header
    /// and adaptation field, up to the free space).
    pub fn payload(&self) -> &[u8] {
        let end = TS_PACKET_SIZE - self.free;
        let offset = self.payload_offset().min(end);
        &self.buffer[offset..end]
    }

    /// Writes raw bytes into the payload region without stuffing,
    /// returning how many were taken. Used for PES lead-ins that are
    /// followed by more payload.
    pub(crate) fn write_payload(&mut self, data: &[u8]) -> usize {
        let take = data.len().min(self.free);
        let offset = TS_PACKET_SIZE - self.free;
        self.buffer[offset..offset + take].copy_from_slice(&data[..take]);
        self.free -= take;
        take
    }

    /// Replaces the whole cell with a prebuilt 188-byte frame,
    /// discarding any in-progress payload state.
    pub(crate) fn load(&mut self, cell: &[u8; TS_PACKET_SIZE]) {
        self.buffer.copy_from_slice(cell);
        self.free = 0;
    }

    /// Mutable access to the raw cell, for in-place table patching.
    pub(crate) fn buffer_mut(&mut self) -> &mut [u8; TS_PACKET_SIZE] {
        &mut self.buffer
    }

    pub(crate) fn has_adaptation_field(&self) -> bool {
        self.buffer[3] & 0x20 != 0
    }

    /// Offset of the payload region: header plus adaptation field.
    pub(crate) fn payload_offset(&self) -> usize {
        if self.has_adaptation_field() {
            TS_HEADER_SIZE + 1 + self.buffer[4] as usize
        } else {
            TS_HEADER_SIZE
        }
    }

    fn payload_written(&self) -> usize {
        TS_PACKET_SIZE - self.payload_offset().min(TS_PACKET_SIZE) - self.free
    }

    /// Raises the adaptation-field-present bit, creating an empty field.
    /// Keeps the payload bit as it was.
    fn ensure_adaptation_field(&mut self) -> bool {
        if self.has_adaptation_field() {
            return true;
        }
        if self.free == 0 {
            log::warn!("no room left for an adaptation field");
            return false;
        }
        let written = self.payload_written();
        if written > 0 {
            self.buffer
                .copy_within(TS_HEADER_SIZE..TS_HEADER_SIZE + written, TS_HEADER_SIZE + 1);
        }
        self.buffer[3] |= 0x20;
        self.buffer[4] = 0;
        self.free -= 1;
        true
    }

    /// Grows a zero-length adaptation field to hold its flags byte.
    fn ensure_adaptation_flags(&mut self) -> bool {
        if self.buffer[4] >= 1 {
            return true;
        }
        if !self.grow_adaptation(0, 1) {
            log::warn!("no room left for adaptation field flags");
            return false;
        }
        self.buffer[5] = 0;
        true
    }

    /// Opens up `count` bytes inside the adaptation field body at
    /// `body_offset`, moving any later field bytes and written payload
    /// right. The field must already exist.
    fn grow_adaptation(&mut self, body_offset: usize, count: usize) -> bool {
        if count == 0 {
            return true;
        }
        if count > self.free {
            return false;
        }
        let len = self.buffer[4] as usize;
        debug_assert!(body_offset <= len);
        let insert_at = 5 + body_offset;
        let tail = 5 + len;
        let written = TS_PACKET_SIZE - tail - self.free;
        self.buffer
            .copy_within(insert_at..tail + written, insert_at + count);
        self.buffer[4] = (len + count) as u8;
        self.free -= count;
        true
    }
}

impl Default for TSPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic dump of the current header field values.
impl fmt::Display for TSPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[PID {:#06x}] cc={} unit_start={} adapt={:02b} free={}",
            self.pid(),
            self.continuity_counter(),
            self.unit_start(),
            self.adaptation_field(),
            self.free
        )?;
        if self.has_adaptation_field() {
            write!(f, " adapt_len={}", self.adaptation_field_len())?;
        }
        if self.random_access() {
            write!(f, " random_access")?;
        }
        if let Some(pcr) = self.pcr() {
            write!(f, " pcr={}", pcr)?;
        }
        Ok(())
    }
}
