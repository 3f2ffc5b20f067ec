use super::CodecType;

/// Track category inside a multiplexed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Description of a single elementary track.
///
/// This is the server-side stream model the TS layer bridges into:
/// a parsed PAT/PMT pair yields one `TrackMeta` per elementary stream,
/// keyed by its PID.
#[derive(Debug, Clone)]
pub struct TrackMeta {
    /// Server-assigned track identifier. The TS bridge uses the PID.
    pub track_id: u32,
    pub kind: TrackKind,
    pub codec: CodecType,
    /// PID carrying this track in the transport stream.
    pub pid: u16,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

impl TrackMeta {
    pub fn new(pid: u16, kind: TrackKind, codec: CodecType) -> Self {
        Self {
            track_id: pid as u32,
            kind,
            codec,
            pid,
            width: None,
            height: None,
            sample_rate: None,
            channels: None,
        }
    }
}

/// Description of a complete multiplexed stream.
#[derive(Debug, Clone, Default)]
pub struct StreamMeta {
    pub tracks: Vec<TrackMeta>,
}

impl StreamMeta {
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    /// First video track, if any.
    pub fn video(&self) -> Option<&TrackMeta> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }

    /// First audio track, if any.
    pub fn audio(&self) -> Option<&TrackMeta> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Audio)
    }

    /// Position of the track carried on `pid` in the track list.
    pub fn index_of_pid(&self, pid: u16) -> Option<usize> {
        self.tracks.iter().position(|t| t.pid == pid)
    }
}
