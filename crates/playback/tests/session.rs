use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use omaf_model::{PicResolution, ProjectionFormat, SourceInfo, status};
use packing::{
    ExtractorTrack, InitialInfo, MediaStream, TwoResExtractorTrackGenerator, VideoStream,
};
use playback::{
    CountingSink, DecodeRequest, DecoderFeeder, ExtractorTracksSelector, PlaybackError,
    PlayerConfig, PlayerSession, PoseSample, TrackSelection,
};
use pretty_assertions::assert_eq;
use quality_monitor::QualityState;
use render_target::{RecordingBackend, region_data_channel};
use scvp::{ErpScvp, ViewportInformation};
use viewport::Pose;

fn main_source() -> SourceInfo {
    SourceInfo {
        width: 3840,
        height: 1920,
        tile_columns: 4,
        tile_rows: 2,
    }
}

fn video(stream_idx: u8, width: u32, height: u32, columns: u32, rows: u32) -> MediaStream {
    MediaStream::Video(VideoStream::with_minimal_parameter_sets(
        stream_idx,
        PicResolution::new(width, height),
        columns,
        rows,
        ProjectionFormat::Equirectangular,
    ))
}

fn tracks() -> BTreeMap<u16, ExtractorTrack> {
    let streams = BTreeMap::from([(0, video(0, 3840, 1920, 4, 2)), (1, video(1, 1920, 960, 2, 1))]);
    let mut generator =
        TwoResExtractorTrackGenerator::new(InitialInfo::default(), &streams, ErpScvp::new());
    generator.initialize().expect("initialize");
    generator.generate_extractor_tracks().expect("tracks")
}

fn viewport_info() -> ViewportInformation {
    ViewportInformation {
        in_width: 3840,
        in_height: 1920,
        tile_in_row: 4,
        tile_in_col: 2,
        ..ViewportInformation::default()
    }
}

fn pose(yaw: f32) -> Pose {
    Pose::new(yaw, 0.0).expect("pose")
}

fn trace(yaws: &[f32]) -> Vec<PoseSample> {
    yaws.iter().map(|yaw| PoseSample { yaw: *yaw, pitch: 0.0 }).collect()
}

#[test]
fn selector_picks_the_track_around_the_pose() {
    let mut selector =
        ExtractorTracksSelector::new(ErpScvp::new(), &viewport_info(), &tracks()).expect("selector");

    assert_eq!(selector.select(pose(0.0)).expect("front"), Some(1));
    assert_eq!(selector.select(pose(0.0)).expect("unchanged"), None);
    assert_eq!(selector.select(pose(180.0)).expect("back"), Some(3));
    assert_eq!(selector.select(pose(540.0)).expect("back again"), Some(3));
    assert_eq!(selector.selected(), Some(3));
}

#[test]
fn selector_needs_tracks_and_a_valid_service_setup() {
    assert_eq!(
        ExtractorTracksSelector::new(ErpScvp::new(), &viewport_info(), &BTreeMap::new())
            .unwrap_err(),
        PlaybackError::NoTracks
    );
    let no_grid = ViewportInformation {
        tile_in_row: 0,
        ..viewport_info()
    };
    let error = ExtractorTracksSelector::new(ErpScvp::new(), &no_grid, &tracks()).unwrap_err();
    assert!(matches!(error, PlaybackError::Scvp(_)));
}

#[test]
fn feeder_delivers_the_track_selected_latency_frames_ago() {
    let tracks = Arc::new(tracks());
    let (output, mut source) = region_data_channel(0, 8);
    let feeder = DecoderFeeder::spawn(output, Arc::clone(&tracks), 1).expect("feeder");

    for (pts, viewport_idx) in [(0, 1), (1, 3), (2, 3)] {
        feeder
            .request(DecodeRequest { pts, viewport_idx })
            .expect("request");
    }

    let mut delivered = Vec::new();
    for _ in 0..3 {
        let data = source
            .acquire_timeout(Duration::from_secs(5))
            .expect("region data");
        delivered.push((data.pts(), data.region_wise_packing().clone()));
        source.release();
    }
    drop(source);
    drop(feeder);

    assert_eq!(
        delivered,
        vec![
            (0, tracks[&1].rwpk.clone()),
            (1, tracks[&1].rwpk.clone()),
            (2, tracks[&3].rwpk.clone()),
        ]
    );
}

#[test]
fn session_reports_a_switch_after_the_decode_latency() {
    let config = PlayerConfig {
        decode_latency_frames: 2,
        frame_rate: 30,
        feedback_interval_ms: 5,
        pose_trace: trace(&[0.0, 0.0, 0.0, 180.0]),
        ..PlayerConfig::default()
    };
    let mut session = PlayerSession::new(
        config,
        tracks(),
        main_source(),
        ErpScvp::new(),
        RecordingBackend::new(),
    )
    .expect("session");

    let report = session.run(10, CountingSink::new()).expect("run");

    assert_eq!(report.frames, 10);
    assert_eq!(report.frames_rendered, 10);
    assert_eq!(report.frames_skipped, 0);
    assert_eq!(
        report.selections,
        vec![
            TrackSelection {
                frame: 0,
                viewport_idx: 1
            },
            TrackSelection {
                frame: 3,
                viewport_idx: 3
            },
        ]
    );
    assert_eq!(report.quality_transitions, 2);
    assert_eq!(report.avg_changed_time_ms, 66.0);
    assert_eq!(report.final_state, QualityState::AllHigh);
    assert_eq!(session.backend().commands().len(), 6);
    assert_eq!(session.pose_lock().get(), pose(180.0));
}

#[test]
fn session_without_latency_never_drops_quality() {
    let config = PlayerConfig {
        decode_latency_frames: 0,
        pose_trace: trace(&[0.0, 90.0, 180.0, -90.0]),
        ..PlayerConfig::default()
    };
    let mut session = PlayerSession::new(
        config,
        tracks(),
        main_source(),
        ErpScvp::new(),
        RecordingBackend::new(),
    )
    .expect("session");

    let report = session.run(4, CountingSink::new()).expect("run");

    assert_eq!(report.quality_transitions, 0);
    assert_eq!(report.selections.len(), 4);
}

#[test]
fn session_rejects_bad_configuration() {
    let zero_fov = PlayerConfig {
        h_fov: 0.0,
        ..PlayerConfig::default()
    };
    let error = PlayerSession::new(
        zero_fov,
        tracks(),
        main_source(),
        ErpScvp::new(),
        RecordingBackend::new(),
    )
    .err()
    .expect("rejected");
    assert_eq!(error.code(), status::RENDER_ERROR);

    let still = PlayerConfig {
        frame_rate: 0,
        ..PlayerConfig::default()
    };
    assert!(matches!(
        PlayerSession::new(
            still,
            tracks(),
            main_source(),
            ErpScvp::new(),
            RecordingBackend::new()
        ),
        Err(PlaybackError::InvalidConfig(_))
    ));
}
