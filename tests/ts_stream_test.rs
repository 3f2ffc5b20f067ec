#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Cursor;
    use tsio::av::{CodecData, CodecType, Packet, TrackKind};
    use tsio::codec::aac::{adts_header, AACParser};
    use tsio::codec::h264::NAL_HEADER;
    use tsio::format::ts::{
        to_stream_meta, TSMuxer, TSPacket, PID_PAT, PID_PMT, TS_PACKET_SIZE,
    };
    use tsio::format::Muxer;

    const VIDEO_PID: u16 = 0x100;
    const AUDIO_PID: u16 = 0x101;

    struct TestVideo;
    impl CodecData for TestVideo {
        fn codec_type(&self) -> CodecType {
            CodecType::H264
        }
        fn width(&self) -> Option<u32> {
            Some(1280)
        }
        fn height(&self) -> Option<u32> {
            Some(720)
        }
        fn extra_data(&self) -> Option<&[u8]> {
            None
        }
    }

    struct TestAudio;
    impl CodecData for TestAudio {
        fn codec_type(&self) -> CodecType {
            CodecType::AAC
        }
        fn width(&self) -> Option<u32> {
            None
        }
        fn height(&self) -> Option<u32> {
            None
        }
        fn extra_data(&self) -> Option<&[u8]> {
            None
        }
    }

    /// One video access unit (Annex-B framed) and one ADTS-framed audio
    /// frame, as the server's payload producers hand them over.
    fn video_frame(len: usize) -> Vec<u8> {
        let mut frame = NAL_HEADER.to_vec();
        frame.push(0x65); // IDR slice
        frame.extend((0..len as u32).map(|i| (i % 199) as u8));
        frame
    }

    fn audio_frame(len: usize) -> Vec<u8> {
        let raw: Vec<u8> = (0..len as u32).map(|i| (i % 211) as u8).collect();
        let mut frame = adts_header(raw.len()).to_vec();
        frame.extend(raw);
        frame
    }

    async fn mux_sample_stream() -> Vec<u8> {
        let mut muxer = TSMuxer::new(Cursor::new(Vec::new()));
        assert_eq!(
            muxer.add_stream(Box::new(TestVideo)).await.unwrap(),
            VIDEO_PID
        );
        assert_eq!(
            muxer.add_stream(Box::new(TestAudio)).await.unwrap(),
            AUDIO_PID
        );
        muxer.write_header(&[]).await.unwrap();

        for i in 0..4i64 {
            muxer
                .write_packet(
                    Packet::new(video_frame(700))
                        .with_stream_index(0)
                        .with_pts(i * 3_000)
                        .with_key_flag(i == 0),
                )
                .await
                .unwrap();
            muxer
                .write_packet(
                    Packet::new(audio_frame(300))
                        .with_stream_index(1)
                        .with_pts(i * 1_920),
                )
                .await
                .unwrap();
        }
        muxer.write_trailer().await.unwrap();
        muxer.into_inner().into_inner()
    }

    fn cells(output: &[u8]) -> Vec<TSPacket> {
        assert_eq!(output.len() % TS_PACKET_SIZE, 0);
        output
            .chunks(TS_PACKET_SIZE)
            .map(|cell| TSPacket::from_bytes(cell).unwrap())
            .collect()
    }

    #[test]
    fn test_stream_is_standards_shaped() {
        let output = tokio_test::block_on(mux_sample_stream());
        let cells = cells(&output);

        // Every cell is 188 bytes with a valid sync byte (checked by
        // the parser), and continuity counters advance mod 16 per PID
        let mut counters: HashMap<u16, u8> = HashMap::new();
        for cell in &cells {
            if let Some(previous) = counters.insert(cell.pid(), cell.continuity_counter()) {
                assert_eq!(
                    cell.continuity_counter(),
                    (previous + 1) & 0x0F,
                    "continuity break on PID {:#06x}",
                    cell.pid()
                );
            }
        }

        // System PIDs all present
        assert!(counters.contains_key(&PID_PAT));
        assert!(counters.contains_key(&PID_PMT));
        assert!(counters.contains_key(&0x0011)); // SDT
        assert!(counters.contains_key(&VIDEO_PID));
        assert!(counters.contains_key(&AUDIO_PID));
    }

    #[test]
    fn test_emitted_tables_describe_the_streams() {
        let output = tokio_test::block_on(mux_sample_stream());
        let cells = cells(&output);

        let pat = cells.iter().find(|c| c.pid() == PID_PAT).unwrap();
        assert_eq!(pat.program_map_pid().unwrap(), PID_PMT);

        let pmt = cells.iter().find(|c| c.pid() == PID_PMT).unwrap();
        let mut video_pid = 0u16;
        let mut audio_pid = 0u16;
        pmt.update_stream_pid(&mut video_pid, &mut audio_pid).unwrap();
        assert_eq!(video_pid, VIDEO_PID);
        assert_eq!(audio_pid, AUDIO_PID);

        let meta = to_stream_meta(pat, pmt).unwrap();
        assert_eq!(meta.tracks.len(), 2);
        assert_eq!(meta.video().unwrap().pid, VIDEO_PID);
        assert_eq!(meta.audio().unwrap().pid, AUDIO_PID);
    }

    #[test]
    fn test_video_access_unit_round_trips() {
        let output = tokio_test::block_on(mux_sample_stream());
        let cells = cells(&output);

        let pat = cells.iter().find(|c| c.pid() == PID_PAT).unwrap();
        let pmt = cells.iter().find(|c| c.pid() == PID_PMT).unwrap();
        let meta = to_stream_meta(pat, pmt).unwrap();

        // First video cell opens the unit with a lead-in, a random
        // access marker and a PCR
        let first = cells
            .iter()
            .find(|c| c.pid() == VIDEO_PID && c.unit_start())
            .unwrap();
        assert!(first.random_access());
        assert!(first.pcr().is_some());
        assert_eq!(&first.payload()[..4], &[0x00, 0x00, 0x01, 0xE0]);
        // The video lead-in variant carries no timestamp
        assert_eq!(first.pes_timestamp(), 0);

        // Reassembling the first access unit restores the Annex-B frame
        let mut frame = Vec::new();
        for cell in &cells {
            if cell.pid() != VIDEO_PID {
                continue;
            }
            if cell.unit_start() && !frame.is_empty() {
                break;
            }
            let media = cell.to_media_packet(&meta, TrackKind::Video).unwrap();
            frame.extend_from_slice(&media.data);
        }
        assert_eq!(frame, video_frame(700));
        assert!(frame.starts_with(&NAL_HEADER));
    }

    #[test]
    fn test_audio_frames_carry_pts_and_adts() {
        let output = tokio_test::block_on(mux_sample_stream());
        let cells = cells(&output);

        let pat = cells.iter().find(|c| c.pid() == PID_PAT).unwrap();
        let pmt = cells.iter().find(|c| c.pid() == PID_PMT).unwrap();
        let meta = to_stream_meta(pat, pmt).unwrap();

        let mut timestamps = Vec::new();
        let mut first_frame = Vec::new();
        for cell in &cells {
            if cell.pid() != AUDIO_PID {
                continue;
            }
            if cell.unit_start() {
                timestamps.push(cell.pes_timestamp());
            }
            if timestamps.len() == 1 {
                let media = cell.to_media_packet(&meta, TrackKind::Audio).unwrap();
                first_frame.extend_from_slice(&media.data);
            }
        }
        // PTS 0 is encoded as "no timestamp" in the audio lead-in
        assert_eq!(timestamps, vec![0, 1_920, 3_840, 5_760]);

        // The reassembled frame parses as ADTS with the right length
        assert_eq!(first_frame, audio_frame(300));
        let mut parser = AACParser::new();
        let header = parser.parse_adts_header(&first_frame[..7]).unwrap();
        assert!(header.sync_word_valid());
        assert_eq!(header.frame_length as usize, 307);
    }
}
