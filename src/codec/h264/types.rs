use bytes::Bytes;

/// The full bytestream NAL start code, prepended to parameter sets and
/// access units when emitting Annex-B formatted elementary streams.
pub const NAL_HEADER: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// The shortened bytestream NAL start code.
pub const SHORT_NAL_HEADER: [u8; 3] = [0x00, 0x00, 0x01];

/// A standard Sequence Parameter Set, as generated by FFMPEG.
/// Seems to be stream-independent.
pub const DEFAULT_SPS: [u8; 8] = [0x00, 0x00, 0x00, 0x01, 0x28, 0xCE, 0x09, 0xC8];

/// A standard Picture Parameter Set, as generated by FFMPEG.
/// Seems to be stream-independent.
pub const DEFAULT_PPS: [u8; 24] = [
    0x00, 0x00, 0x00, 0x01, 0x27, 0x4D, 0x40, 0x1F, 0xA9, 0x18, 0x0A, 0x00, 0xB7, 0x60, 0x0D,
    0x40, 0x40, 0x40, 0x4C, 0x2B, 0x5E, 0xF7, 0xC0, 0x40,
];

#[derive(Debug)]
pub struct NALUnit {
    pub nal_type: u8,
    pub nal_ref_idc: u8,
    pub data: Bytes,
}

impl NALUnit {
    pub fn new(data: Bytes) -> Self {
        let header = data[0];
        Self {
            nal_type: header & 0x1F,
            nal_ref_idc: (header >> 5) & 0x03,
            data,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        self.nal_type == 5 || self.nal_type == 7 || self.nal_type == 8
    }
}

#[derive(Debug)]
pub enum NALUnitType {
    Unspecified = 0,
    CodedSliceNonIDR = 1,
    CodedSliceDataPartitionA = 2,
    CodedSliceDataPartitionB = 3,
    CodedSliceDataPartitionC = 4,
    CodedSliceIDR = 5,
    SEI = 6,
    SPS = 7,
    PPS = 8,
    AccessUnitDelimiter = 9,
    EndOfSequence = 10,
    EndOfStream = 11,
    FillerData = 12,
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            _ => NALUnitType::Unspecified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_start_codes() {
        assert_eq!(&NAL_HEADER[1..], &SHORT_NAL_HEADER[..]);
        assert!(DEFAULT_SPS.starts_with(&NAL_HEADER));
        assert!(DEFAULT_PPS.starts_with(&NAL_HEADER));
    }

    #[test]
    fn test_nal_unit_classification() {
        // nal_ref_idc = 3, nal_type = 5 (IDR slice)
        let nal = NALUnit::new(Bytes::from_static(&[0x65, 0x00]));
        assert_eq!(nal.nal_type, 5);
        assert!(nal.is_keyframe());

        // nal_type = 1 (non-IDR slice)
        let nal = NALUnit::new(Bytes::from_static(&[0x41, 0x00]));
        assert_eq!(nal.nal_type, 1);
        assert!(!nal.is_keyframe());

        assert!(matches!(NALUnitType::from(5), NALUnitType::CodedSliceIDR));
        assert!(matches!(NALUnitType::from(30), NALUnitType::Unspecified));
    }
}
