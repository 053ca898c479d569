use edfslice::doctest_utils::{FixtureBuilder, FixtureSignal};
use edfslice::{EdfError, EdfReader, FileType, ReaderOptions, SignalGroupMode};
use tempfile::NamedTempFile;

// 把夹具写入临时文件
fn write_fixture(builder: FixtureBuilder) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    builder.write_to(file.path()).unwrap();
    file
}

// 参考场景：2通道，1秒记录，每记录256样本，数字范围[-2048, 2047]，物理范围[-500, 500] mV
fn reference_recording(records: u64) -> FixtureBuilder {
    FixtureBuilder::new()
        .signal(FixtureSignal::new("EEG Fp1", 256).samples(|r, s| ((r * 256 + s) % 4096) as i32 - 2048))
        .signal(FixtureSignal::new("EEG Fp2", 256).samples(|_, s| if s % 2 == 0 { 0 } else { 2047 }))
        .records(records)
}

#[test]
fn test_open_reference_recording() {
    let file = write_fixture(reference_recording(2));
    let reader = EdfReader::open(file.path()).unwrap();

    assert_eq!(reader.header().file_type, FileType::Edf);
    assert_eq!(reader.channel_count(), 2);
    assert_eq!(reader.channel_headers()[0].label, "EEG Fp1");
    assert_eq!(reader.channel_headers()[1].physical_dimension, "mV");
    assert_eq!(reader.duration(), 2.0);
    assert_eq!(reader.layout().record_length(), 2 * 256 * 2);

    let spans: usize = reader.layout().channels().iter().map(|c| c.span()).sum();
    assert_eq!(spans, reader.layout().record_length());
}

#[test]
fn test_reference_calibration_values() {
    let file = write_fixture(reference_recording(1));
    let mut reader = EdfReader::open(file.path()).unwrap();

    let cal = reader.calibration(1).unwrap();
    assert!((cal.gain - 1000.0 / 4095.0).abs() < 1e-12);

    let slice = reader.read_slice(&[1], None, None).unwrap();
    let values = &slice[&1];
    assert_eq!(values.len(), 256);

    // raw 0 -> 0.122 mV, raw 2047 -> 500 mV
    let expected_zero = -500.0 + 2048.0 * (1000.0 / 4095.0);
    assert!((values[0] - expected_zero).abs() < 1e-6);
    assert!((values[1] - 500.0).abs() < 1e-6);
}

#[test]
fn test_calibration_boundaries_through_file() {
    let file = write_fixture(
        FixtureBuilder::new()
            .signal(
                FixtureSignal::new("ECG", 4)
                    .physical_range(-5.0, 5.0)
                    .digital_range(-32768, 32767)
                    .samples(|_, s| if s % 2 == 0 { -32768 } else { 32767 }),
            )
            .signal(
                FixtureSignal::new("Temp", 2)
                    .physical_range(34.0, 42.0)
                    .digital_range(0, 1000)
                    .dimension("degC")
                    .samples(|_, s| if s == 0 { 0 } else { 1000 }),
            ),
    );

    let mut reader = EdfReader::open(file.path()).unwrap();
    let slice = reader.read_slice(&[0, 1], None, None).unwrap();

    assert!((slice[&0][0] + 5.0).abs() < 1e-6);
    assert!((slice[&0][1] - 5.0).abs() < 1e-6);
    assert!((slice[&1][0] - 34.0).abs() < 1e-6);
    assert!((slice[&1][1] - 42.0).abs() < 1e-6);
}

#[test]
fn test_time_slice_500_to_800_ms() {
    let file = write_fixture(reference_recording(2));
    let mut reader = EdfReader::open(file.path()).unwrap();

    let blocks = reader.read_slice_grouped(&[0, 1], Some(0.5), Some(0.8)).unwrap();
    assert_eq!(blocks.len(), 1);

    let block = &blocks[0];
    assert_eq!(block.channels, vec![0, 1]);
    assert!((block.len() as f64 - 0.3 * 256.0).abs() <= 1.0);
    assert!((block.t_start - 0.5).abs() < 5e-3);

    let t_stop = block.t_start + block.len() as f64 / block.sampling_rate;
    assert!((t_stop - 0.8).abs() < 5e-3);
}

#[test]
fn test_abutting_slices_match_full_read() {
    let file = write_fixture(
        FixtureBuilder::new()
            .signal(FixtureSignal::new("EEG", 256))
            .signal(FixtureSignal::new("EMG", 200))
            .signal(FixtureSignal::new("Resp", 25))
            .records(3),
    );
    let mut reader = EdfReader::open(file.path()).unwrap();
    let all = reader.all_channels();
    let whole = reader.read_slice(&all, None, None).unwrap();

    for tm in [0.013, 0.5, 1.004, 1.777, 2.5001] {
        let left = reader.read_slice(&all, Some(0.0), Some(tm)).unwrap();
        let right = reader.read_slice(&all, Some(tm), Some(3.0)).unwrap();

        for &channel in &all {
            let mut joined = left[&channel].clone();
            joined.extend_from_slice(&right[&channel]);
            assert_eq!(joined, whole[&channel], "channel {} split at {}", channel, tm);
        }
    }
}

#[test]
fn test_empty_and_inverted_ranges() {
    let file = write_fixture(reference_recording(2));
    let mut reader = EdfReader::open(file.path()).unwrap();

    let slice = reader.read_slice(&[0, 1], Some(0.7), Some(0.7)).unwrap();
    assert!(slice[&0].is_empty());
    assert!(slice[&1].is_empty());

    let err = reader.read_slice(&[0], Some(0.8), Some(0.5)).unwrap_err();
    assert!(matches!(err, EdfError::OutOfRange(_)));

    // 会话在 OutOfRange 之后仍然可用
    let slice = reader.read_slice(&[0], Some(1.0), Some(1.5)).unwrap();
    assert_eq!(slice[&0].len(), 128);
}

#[test]
fn test_require_non_empty_option() {
    let file = write_fixture(reference_recording(2));

    let mut lenient = EdfReader::open(file.path()).unwrap();
    let slice = lenient.read_slice(&[0], Some(10.0), Some(12.0)).unwrap();
    assert!(slice[&0].is_empty());

    let options = ReaderOptions::new().require_non_empty(true);
    let mut strict = EdfReader::open_with_options(file.path(), options).unwrap();
    let err = strict.read_slice(&[0], Some(10.0), Some(12.0)).unwrap_err();
    assert!(matches!(err, EdfError::OutOfRange(_)));
}

#[test]
fn test_header_size_mismatch_is_malformed() {
    let file = write_fixture(reference_recording(1).declared_header_size(Some(80 + 2 * 256)));
    let err = EdfReader::open(file.path()).err().unwrap();
    assert!(matches!(err, EdfError::MalformedHeader(_)), "{:?}", err);
}

#[test]
fn test_unknown_record_count_resolved() {
    let file = write_fixture(reference_recording(3).declared_records(Some(-1)));
    let reader = EdfReader::open(file.path()).unwrap();
    assert_eq!(reader.record_count(), 3);
    assert_eq!(reader.duration(), 3.0);
}

#[test]
fn test_truncated_recording() {
    let file = NamedTempFile::new().unwrap();
    let mut bytes = reference_recording(2).declared_records(Some(-1)).build();
    bytes.truncate(bytes.len() - 10);
    std::fs::write(file.path(), &bytes).unwrap();

    let err = EdfReader::open(file.path()).err().unwrap();
    assert!(matches!(err, EdfError::TruncatedFile(_)), "{:?}", err);

    let mut bytes = reference_recording(2).build();
    bytes.truncate(bytes.len() - 1024);
    std::fs::write(file.path(), &bytes).unwrap();

    let err = EdfReader::open(file.path()).err().unwrap();
    assert!(matches!(err, EdfError::TruncatedFile(_)), "{:?}", err);
}

#[test]
fn test_missing_file() {
    match EdfReader::open("does/not/exist.edf") {
        Err(EdfError::FileNotFound(msg)) => assert!(msg.contains("exist.edf")),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("opened a missing file"),
    }
}

#[test]
fn test_fractional_record_duration() {
    let file = write_fixture(
        FixtureBuilder::new()
            .signal(FixtureSignal::new("EEG", 50))
            .signal(FixtureSignal::new("SpO2", 1))
            .record_duration("0.5")
            .records(4),
    );
    let mut reader = EdfReader::open(file.path()).unwrap();

    assert_eq!(reader.duration(), 2.0);
    assert_eq!(reader.sampling_rate(0).unwrap(), 100.0);
    assert_eq!(reader.sampling_rate(1).unwrap(), 2.0);

    let slice = reader.read_slice(&[0, 1], Some(0.25), Some(1.25)).unwrap();
    assert_eq!(slice[&0].len(), 100);
    assert_eq!(slice[&1].len(), 2);
}

#[test]
fn test_bdf_recording() {
    let file = write_fixture(
        FixtureBuilder::new()
            .bdf()
            .signal(
                FixtureSignal::new("EXG1", 8)
                    .physical_range(-262144.0, 262143.0)
                    .digital_range(-8388608, 8388607)
                    .dimension("uV")
                    .samples(|r, s| if s == 0 { -8388608 } else { (r * 100_000 + s) as i32 }),
            )
            .records(2),
    );
    let mut reader = EdfReader::open(file.path()).unwrap();
    assert_eq!(reader.header().file_type, FileType::Bdf);
    assert_eq!(reader.layout().channels()[0].sample_width, 3);

    let raw = reader.read_raw_slice(&[0], None, None).unwrap();
    assert_eq!(raw.channels[0].samples[0], -8388608);
    assert_eq!(raw.channels[0].samples[9], 100_001);

    let slice = reader.read_slice(&[0], None, Some(0.5)).unwrap();
    assert!((slice[&0][0] + 262144.0).abs() < 1e-6);
}

#[test]
fn test_edf_plus_with_annotations() {
    let file = NamedTempFile::new().unwrap();
    edfslice::doctest_utils::create_multi_channel_test_file(file.path()).unwrap();

    let mut reader = EdfReader::open(file.path()).unwrap();
    assert_eq!(reader.header().file_type, FileType::EdfPlus);
    assert_eq!(reader.channel_count(), 2);
    assert!(reader.channel_headers().iter().all(|s| !s.is_annotation()));
    assert_eq!(reader.groups().len(), 2);

    let blocks = reader.read_slice_grouped(&[0, 1], None, None).unwrap();
    assert_eq!(blocks[0].len(), 512);
    assert_eq!(blocks[1].len(), 256);
    assert_eq!(blocks[1].sampling_rate, 128.0);
}

#[test]
fn test_split_all_mode() {
    let file = write_fixture(reference_recording(1));
    let options = ReaderOptions::new().group_mode(SignalGroupMode::SplitAll);
    let mut reader = EdfReader::open_with_options(file.path(), options).unwrap();

    let blocks = reader.read_slice_grouped(&[1, 0], None, None).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].channels, vec![1]);
    assert_eq!(blocks[1].channels, vec![0]);
    assert!(blocks.iter().all(|b| b.data.len() == 1 && b.len() == 256));
}

#[test]
fn test_invalid_channel_index() {
    let file = write_fixture(reference_recording(1));
    let mut reader = EdfReader::open(file.path()).unwrap();
    let err = reader.read_slice(&[0, 7], None, None).unwrap_err();
    assert!(matches!(err, EdfError::InvalidSignalIndex(7)));
}

#[test]
fn test_garbled_record_duration_fails_open() {
    let file = NamedTempFile::new().unwrap();
    let mut bytes = reference_recording(1).build();
    bytes[244..252].copy_from_slice(b"1.12345\xFF");
    std::fs::write(file.path(), &bytes).unwrap();

    let err = EdfReader::open(file.path()).err().unwrap();
    assert!(matches!(err, EdfError::MalformedHeader(_)), "{:?}", err);

    let file = write_fixture(reference_recording(1).record_duration("--1"));
    let err = EdfReader::open(file.path()).err().unwrap();
    assert!(matches!(err, EdfError::MalformedHeader(_)), "{:?}", err);
}
