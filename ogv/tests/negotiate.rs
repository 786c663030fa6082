mod common;

use std::io::Write;

use common::*;
use ogv::process::OpenOptions;
use ogv::process::demux::Demuxer;
use ogv::process::negotiate::{NegotiationState, Negotiator};
use ogv::process::session::Session;
use ogv::structs::page::HEADER_TYPE_BOS;
use ogv::structs::theora::decoder::FrameKind;
use ogv::structs::theora::info::{ColorSpace, PixelFormat};
use ogv::utils::errors::{ErrorDomain, HeaderError, HeaderKind, SessionError};

fn open(bytes: &[u8]) -> Result<Session<&[u8]>, SessionError> {
    Session::from_reader(bytes, &OpenOptions::default())
}

#[test]
fn opens_single_theora_stream() {
    let params = VideoParams::default();
    let bytes = theora_file(&params, 3);

    let mut session = open(&bytes).unwrap();

    let info = session.info();
    assert_eq!((info.frame_width, info.frame_height), (320, 240));
    assert_eq!((info.pic_width, info.pic_height), (318, 236));
    assert_eq!((info.pic_x, info.pic_y), (1, 1));
    assert_eq!((info.fps_numerator, info.fps_denominator), (30000, 1001));
    assert_eq!(info.colorspace, ColorSpace::ItuRec470BG);
    assert_eq!(info.pixel_format, PixelFormat::Yuv420);
    assert_eq!(info.quality, 38);
    assert_eq!(info.keyframe_granule_shift, 6);

    let comment = session.comment();
    assert_eq!(comment.vendor, "Xiph.Org libtheora 1.1 20090822 (Thusnelda)");
    assert_eq!(comment.query("title").collect::<Vec<_>>(), ["Test pattern"]);

    assert_eq!(session.target_serial(), VIDEO_SERIAL);
    assert_eq!(session.registry().len(), 1);
    assert!(session.target_stream().is_some());
    assert!(!session.is_eof());

    let mut kinds = Vec::new();
    let mut frames = Vec::new();
    while let Some(packet) = session.next_packet().unwrap() {
        kinds.push(session.decoder().frame_kind(&packet));
        frames.push(session.decoder().granule_frame(packet.granule_position));
    }

    assert_eq!(
        kinds,
        [
            Some(FrameKind::Intra),
            Some(FrameKind::Inter),
            Some(FrameKind::Inter)
        ]
    );
    assert_eq!(frames, [0, 1, 2]);
    assert!(session.is_eof());
    assert!(session.target_stream().unwrap().is_eos());
    assert_eq!(session.pages_read(), 5);
}

#[test]
fn opening_stops_at_first_content_packet() {
    let bytes = theora_file(&VideoParams::default(), 4);
    let session = open(&bytes).unwrap();

    // Headers on pages 0 and 1, first frame on page 2.
    assert_eq!(session.pages_read(), 3);
    assert_eq!(session.target_stream().unwrap().pending(), 0);

    let packets: Vec<_> = session.map(Result::unwrap).collect();
    assert_eq!(packets.len(), 4);
    assert_eq!(packets[0].data.len(), 40);
    assert!(packets[3].eos);
}

#[test]
fn finds_theora_among_other_streams() {
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let mut audio = StreamWriter::new(AUDIO_SERIAL);
    let mut other = StreamWriter::new(0x0000_0077);

    let vorbis = vorbis_identification();
    let mut bytes = audio.bos(&vorbis);
    bytes.extend(video.bos(&id));
    bytes.extend(other.bos(b"fishead\0"));

    bytes.extend(audio.page(0, 0, &[b"\x03vorbis comments", b"\x05vorbis setup"]));
    bytes.extend(video.page(0, -1, &[&comment]));
    bytes.extend(other.page(0, 0, &[b"fisbone\0"]));
    bytes.extend(video.spanning(&setup, 0));
    bytes.extend(audio.page(0, 1024, &[&[0u8; 100]]));
    bytes.extend(video.page(0, 1 << 6, &[&frame(true, 64), &frame(false, 12)]));
    bytes.extend(audio.eos(2048, &[&[0u8; 90]]));
    bytes.extend(video.eos(1 << 6 | 2, &[&frame(false, 8)]));

    let mut session = open(&bytes).unwrap();
    assert_eq!(session.target_serial(), VIDEO_SERIAL);
    assert_eq!(session.registry().serials().collect::<Vec<_>>(), [VIDEO_SERIAL]);
    assert_eq!(session.registry().evicted(), 2);

    let sizes: Vec<_> = std::iter::from_fn(|| session.next_packet().unwrap())
        .map(|packet| packet.data.len())
        .collect();
    assert_eq!(sizes, [64, 12, 8]);
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn audio_stream_first_is_evicted_on_inspection() {
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let mut audio = StreamWriter::new(AUDIO_SERIAL);

    let mut bytes = audio.bos(&vorbis_identification());
    bytes.extend(video.bos(&id));
    bytes.extend(audio.page(0, 0, &[b"\x03vorbis"]));
    bytes.extend(video.page(0, 0, &[&comment, &setup]));
    bytes.extend(audio.page(0, 512, &[&[1u8; 20]]));
    bytes.extend(video.page(0, 1 << 6, &[&frame(true, 30)]));

    let mut demux = Demuxer::new(bytes.as_slice(), &OpenOptions::default());
    let mut negotiator = Negotiator::new(&OpenOptions::default());
    assert_eq!(negotiator.state(), NegotiationState::SeekingTarget);

    let negotiated = negotiator.run(&mut demux).unwrap();
    assert_eq!(negotiator.state(), NegotiationState::Ready);
    assert_eq!(negotiator.target(), Some(VIDEO_SERIAL));
    assert_eq!(negotiated.serial, VIDEO_SERIAL);
    assert_eq!(negotiated.first_packet.data.len(), 30);
    assert!(!demux.registry().contains(AUDIO_SERIAL));
    assert_eq!(demux.registry().len(), 1);
}

#[test]
fn no_theora_stream() {
    let mut audio = StreamWriter::new(AUDIO_SERIAL);
    let mut bytes = audio.bos(&vorbis_identification());
    bytes.extend(audio.page(0, 0, &[b"\x03vorbis"]));

    let err = open(&bytes).unwrap_err();
    assert!(matches!(err, SessionError::NoTargetStreamFound { discarded: 1 }));
    assert_eq!(err.domain(), ErrorDomain::Format);
    assert_eq!(err.code(), 2);

    let err = open(&[]).unwrap_err();
    assert!(matches!(err, SessionError::NoTargetStreamFound { discarded: 0 }));
}

#[test]
fn theora_after_cutoff_is_not_found() {
    let [id, ..] = theora_headers(&VideoParams::default());
    let mut audio = StreamWriter::new(AUDIO_SERIAL);
    let mut video = StreamWriter::new(VIDEO_SERIAL);

    let mut bytes = audio.bos(&vorbis_identification());
    bytes.extend(audio.page(0, 0, &[b"\x03vorbis"]));
    bytes.extend(video.bos(&id));

    let mut demux = Demuxer::new(bytes.as_slice(), &OpenOptions::default());
    let mut negotiator = Negotiator::new(&OpenOptions::default());

    assert!(matches!(
        negotiator.run(&mut demux),
        Err(SessionError::NoTargetStreamFound { .. })
    ));
    assert_eq!(negotiator.state(), NegotiationState::Failed);
    assert_eq!(negotiator.target(), None);
}

#[test]
fn truncated_headers() {
    let [id, comment, _] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);

    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&comment]));

    let err = open(&bytes).unwrap_err();
    assert!(matches!(err, SessionError::IncompleteHeaders { serial: VIDEO_SERIAL }));
    assert_eq!(err.code(), 3);

    // All three headers but no content packet.
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&comment, &setup]));

    assert!(matches!(
        open(&bytes),
        Err(SessionError::IncompleteHeaders { .. })
    ));

    // Cut inside the setup page.
    let full = theora_file(&VideoParams::default(), 2);
    let cut = full.len() / 2;
    assert!(matches!(
        open(&full[..cut]),
        Err(SessionError::IncompleteHeaders { .. })
    ));
}

#[test]
fn corrupted_identification_header() {
    let params = VideoParams {
        version: (4, 0, 0),
        ..Default::default()
    };
    let bytes = theora_file(&params, 1);

    let err = open(&bytes).unwrap_err();
    let SessionError::BadHeaders { serial, reason } = &err else {
        panic!("unexpected error {err}");
    };
    assert_eq!(*serial, VIDEO_SERIAL);
    assert!(matches!(
        reason,
        HeaderError::Invalid {
            kind: HeaderKind::Identification,
            ..
        }
    ));
    assert_eq!(err.code(), 1);

    let params = VideoParams {
        pic_width: 400,
        ..Default::default()
    };
    assert!(matches!(
        open(&theora_file(&params, 1)),
        Err(SessionError::BadHeaders { .. })
    ));

    let params = VideoParams {
        pixel_format: 1,
        ..Default::default()
    };
    assert!(matches!(
        open(&theora_file(&params, 1)),
        Err(SessionError::BadHeaders { .. })
    ));
}

#[test]
fn truncated_identification_packet() {
    let mut id = identification(&VideoParams::default());
    id.truncate(30);

    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let bytes = video.bos(&id);

    assert!(matches!(
        open(&bytes),
        Err(SessionError::BadHeaders {
            reason: HeaderError::Invalid { .. },
            ..
        })
    ));
}

#[test]
fn bos_page_without_complete_packet() {
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let bytes = video.raw_page(HEADER_TYPE_BOS, 0, &[255], &[0x80; 255]);

    let err = open(&bytes).unwrap_err();
    assert!(matches!(
        err,
        SessionError::BadHeaders {
            reason: HeaderError::MissingFirstPacket,
            ..
        }
    ));
}

#[test]
fn malformed_setup_header() {
    let [id, comment, _] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);

    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&comment, &setup_with_range(64)]));
    bytes.extend(video.page(0, 1 << 6, &[&frame(true, 10)]));

    let err = open(&bytes).unwrap_err();
    assert!(matches!(
        err,
        SessionError::BadHeaders {
            reason: HeaderError::Invalid {
                kind: HeaderKind::Setup,
                ..
            },
            ..
        }
    ));
}

#[test]
fn headers_out_of_order() {
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);

    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&setup, &comment]));

    assert!(matches!(
        open(&bytes),
        Err(SessionError::BadHeaders {
            reason: HeaderError::OutOfOrder {
                kind: HeaderKind::Setup,
                missing: HeaderKind::Comment,
            },
            ..
        })
    ));

    // Content before the setup header.
    let [id, comment, _] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&comment, &frame(true, 5)]));

    assert!(matches!(
        open(&bytes),
        Err(SessionError::BadHeaders {
            reason: HeaderError::UnexpectedDataPacket,
            ..
        })
    ));
}

#[test]
fn source_released_exactly_once() {
    let (source, drops) = TrackedSource::new(std::io::Cursor::new(Vec::new()));
    assert!(Session::from_reader(source, &OpenOptions::default()).is_err());
    assert_eq!(drops.get(), 1);

    let bytes = theora_file(&VideoParams::default(), 2);
    let (source, drops) = TrackedSource::new(std::io::Cursor::new(bytes));
    let session = Session::from_reader(source, &OpenOptions::default()).unwrap();
    assert_eq!(drops.get(), 0);
    drop(session);
    assert_eq!(drops.get(), 1);
}

#[test]
fn read_error_is_reported() {
    let bytes = theora_file(&VideoParams::default(), 2);
    let source = FailingSource {
        data: &bytes,
        limit: 100,
    };

    let err = Session::from_reader(source, &OpenOptions::default()).unwrap_err();
    assert!(matches!(err, SessionError::Io { action: "read", .. }));
    assert_eq!(err.domain(), ErrorDomain::Io);
    assert_eq!(err.code(), 5);
    assert!(err.to_string().starts_with("Failed to read video"));
}

#[test]
fn late_streams_are_ignored() {
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let mut late = StreamWriter::new(0x1A7E);

    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&comment]));
    bytes.extend(late.bos(&vorbis_identification()));
    bytes.extend(video.page(0, 0, &[&setup]));
    bytes.extend(late.bos(b"again"));
    bytes.extend(video.page(0, 1 << 6, &[&frame(true, 10)]));
    bytes.extend(StreamWriter::new(0x2B7E).bos(b"mid-file"));
    bytes.extend(video.eos(1 << 6 | 1, &[&frame(false, 10)]));

    let mut session = open(&bytes).unwrap();
    assert_eq!(session.registry().len(), 1);

    while session.next_packet().unwrap().is_some() {}
    assert_eq!(session.registry().serials().collect::<Vec<_>>(), [VIDEO_SERIAL]);
}

#[test]
fn checksum_failures() {
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);
    let mut audio = StreamWriter::new(AUDIO_SERIAL);

    let mut bytes = video.bos(&id);
    let mut audio_bos = audio.bos(&vorbis_identification());
    let last = audio_bos.len() - 1;
    audio_bos[last] ^= 0xFF;
    bytes.extend(audio_bos);
    bytes.extend(video.page(0, 0, &[&comment, &setup]));
    bytes.extend(video.page(0, 1 << 6, &[&frame(true, 10)]));

    let session = open(&bytes).unwrap();
    assert!(session.bytes_skipped() > 0);
    assert_eq!(session.registry().len(), 1);

    let strict = OpenOptions::default().strict(true);
    let err = Session::from_reader(bytes.as_slice(), &strict).unwrap_err();
    assert!(matches!(err, SessionError::Corrupt(_)));
    assert_eq!(err.code(), 4);
}

#[test]
fn stray_capture_pattern_is_skipped_in_strict_mode() {
    let mut bytes = b"OggS\x01junk".to_vec();
    bytes.extend(theora_file(&VideoParams::default(), 2));

    let strict = OpenOptions::default().strict(true);
    let mut session = Session::from_reader(bytes.as_slice(), &strict).unwrap();
    assert_eq!(session.bytes_skipped(), 8);
    assert_eq!(session.target_serial(), VIDEO_SERIAL);
    assert!(session.next_packet().unwrap().is_some());
}

#[test]
fn lost_header_page_is_fatal_in_strict_mode() {
    let [id, comment, setup] = theora_headers(&VideoParams::default());
    let mut video = StreamWriter::new(VIDEO_SERIAL);

    let mut bytes = video.bos(&id);
    // Sequence 1 never reaches the demuxer.
    let _ = video.page(0, 0, &[b"lost"]);
    bytes.extend(video.page(0, 0, &[&comment, &setup]));
    bytes.extend(video.page(0, 1 << 6, &[&frame(true, 10)]));

    assert!(open(&bytes).is_ok());

    let strict = OpenOptions::default().strict(true);
    assert!(matches!(
        Session::from_reader(bytes.as_slice(), &strict),
        Err(SessionError::BadHeaders {
            reason: HeaderError::Stream(_),
            ..
        })
    ));
}

#[test]
fn small_read_chunks() {
    let bytes = theora_file(&VideoParams::default(), 5);
    let options = OpenOptions::default().read_chunk_size(3);

    let session = Session::from_reader(bytes.as_slice(), &options).unwrap();
    assert_eq!(session.count(), 5);
}

#[test]
fn open_file() {
    let bytes = theora_file(&VideoParams::default(), 2);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let session = Session::open(file.path()).unwrap();
    assert_eq!(session.info().pic_width, 318);

    let missing = file.path().with_extension("missing");
    let err = Session::open(missing).unwrap_err();
    assert!(matches!(err, SessionError::Io { action: "open", .. }));
    assert_eq!(err.domain(), ErrorDomain::Io);
    assert!(err.to_string().starts_with("Failed to open video"));
}
