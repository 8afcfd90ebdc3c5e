use omaf_model::{
    PixelRect, QualityRankingInfo, RectRegionPacking, RegionData, RegionWisePacking,
    ResolutionTier, SourceInfo, SourceResolution, TileInformation, status,
};
use pretty_assertions::assert_eq;
use quality_monitor::{QualityState, QualityTransition};
use viewport::ViewportError;

use super::*;

const TILE: u32 = 960;

fn main_source() -> SourceInfo {
    SourceInfo {
        width: 3840,
        height: 1920,
        tile_columns: 4,
        tile_rows: 2,
    }
}

fn geometry() -> RenderGeometry {
    RenderGeometry::new(main_source()).expect("geometry")
}

/// Two high columns of the 4x2 grid packed column-major on the left, the two
/// tiles of a 2x1 low stream stacked on the right.
fn viewport_rwpk(columns: [u32; 2], tagged: bool) -> RegionWisePacking {
    let mut regions = Vec::new();
    for (slot_column, column) in columns.into_iter().enumerate() {
        for row in 0..2 {
            regions.push(RectRegionPacking {
                proj: PixelRect::new(column * TILE, row * TILE, TILE, TILE),
                packed: PixelRect::new(slot_column as u32 * TILE, row * TILE, TILE, TILE),
                transform_type: 0,
                tier: tagged.then_some(ResolutionTier::High),
            });
        }
    }
    for low in 0..2 {
        regions.push(RectRegionPacking {
            proj: PixelRect::new(low * 2 * TILE, 0, 2 * TILE, 2 * TILE),
            packed: PixelRect::new(2 * TILE, low * TILE, TILE, TILE),
            transform_type: 0,
            tier: tagged.then_some(ResolutionTier::Low),
        });
    }
    RegionWisePacking {
        constituent_pic_matching: false,
        proj_pic_width: 3840,
        proj_pic_height: 1920,
        packed_pic_width: 3 * TILE,
        packed_pic_height: 2 * TILE,
        regions,
    }
}

fn packed_sources() -> Vec<SourceResolution> {
    vec![
        SourceResolution {
            quality_ranking: 1,
            left: 0,
            top: 0,
            width: 2 * TILE,
            height: 2 * TILE,
        },
        SourceResolution {
            quality_ranking: 2,
            left: 2 * TILE,
            top: 0,
            width: TILE,
            height: 2 * TILE,
        },
    ]
}

fn frame(pts: u64, columns: [u32; 2]) -> RegionData {
    RegionData::new(0, pts, viewport_rwpk(columns, true), packed_sources())
}

fn request(yaw: f32, pts: u64, timestamp_ms: u64) -> FrameRequest {
    FrameRequest {
        yaw,
        pitch: 0.0,
        h_fov: 80.0,
        v_fov: 80.0,
        pts,
        timestamp_ms,
    }
}

fn tile_ids(info: &QualityRankingInfo, quality: i32) -> Vec<u32> {
    info.selection[&quality]
        .iter()
        .map(|tile| tile.tile_id)
        .collect()
}

fn transferred(data: &RegionData) -> QualityRankingInfo {
    let mut info = calc_quality_ranking([data]).expect("ranking");
    assert!(transfer_region_info(data, &geometry(), &mut info));
    info
}

#[test]
fn quality_ranking_uses_smallest_ranking_as_main() {
    let data = frame(0, [1, 2]);

    let info = calc_quality_ranking([&data]).expect("ranking");

    assert_eq!(info.main_quality_ranking, 1);
    assert_eq!(info.num_quality(), 2);
    assert!(info.selection.values().all(Vec::is_empty));
}

#[test]
fn quality_ranking_rejects_when_every_source_is_invalid() {
    let no_sources = RegionData::new(0, 0, viewport_rwpk([1, 2], true), Vec::new());
    let mut three = packed_sources();
    three.push(three[0]);
    let too_many = RegionData::new(1, 0, viewport_rwpk([1, 2], true), three);

    let error = calc_quality_ranking([&no_sources, &too_many]).unwrap_err();

    assert_eq!(error, RenderError::NoValidRegionInfo);
    assert_eq!(error.code(), status::RENDER_ERROR);
    assert_eq!(
        calc_quality_ranking(std::iter::empty()),
        Err(RenderError::NoValidRegionInfo)
    );
}

#[test]
fn transfer_files_tagged_regions_by_tier() {
    let info = transferred(&frame(0, [1, 2]));

    assert_eq!(tile_ids(&info, 1), vec![2, 6, 3, 7]);
    assert_eq!(tile_ids(&info, 2), vec![1, 2]);
    assert!(info.selection[&2].iter().all(|tile| tile.tier == ResolutionTier::Low));
    assert_eq!(info.main_tiles()[0].packed_pic_width, 2880);
}

#[test]
fn transfer_falls_back_to_source_areas() {
    let data = RegionData::new(0, 0, viewport_rwpk([1, 2], false), packed_sources());

    let info = transferred(&data);

    assert_eq!(tile_ids(&info, 1), vec![2, 6, 3, 7]);
    assert_eq!(tile_ids(&info, 2), vec![1, 2]);
    assert_eq!(info.main_tiles()[0].tier, ResolutionTier::High);
    assert_eq!(info.selection[&2][0].tier, ResolutionTier::Low);
}

#[test]
fn transfer_falls_back_to_region_order() {
    let nowhere = vec![SourceResolution {
        quality_ranking: 1,
        left: 5000,
        top: 5000,
        width: 1,
        height: 1,
    }];
    let data = RegionData::new(0, 0, viewport_rwpk([0, 1], false), nowhere);

    let info = transferred(&data);

    assert_eq!(tile_ids(&info, 1), vec![1, 5, 2, 6]);
    assert_eq!(tile_ids(&info, 2), vec![1, 2]);
}

#[test]
fn transfer_skips_invalid_region_information() {
    let valid = frame(0, [1, 2]);
    let invalid = RegionData::new(3, 0, viewport_rwpk([1, 2], true), Vec::new());
    let mut info = calc_quality_ranking([&valid]).expect("ranking");

    assert!(!transfer_region_info(&invalid, &geometry(), &mut info));
    assert!(info.selection.values().all(Vec::is_empty));
}

#[test]
fn plan_draws_background_before_main_quality() {
    let info = transferred(&frame(0, [1, 2]));

    let commands = plan_blits(&info, &geometry());

    let qualities: Vec<i32> = commands.iter().map(|command| command.quality_ranking).collect();
    assert_eq!(qualities, vec![2, 2, 1, 1, 1, 1]);
    assert_eq!(commands[0].dst, PixelRect::new(0, 0, 1920, 1920));
    assert_eq!(commands[0].src, PixelRect::new(1920, 0, 960, 960));
    assert_eq!(commands[2].dst, PixelRect::new(960, 0, 960, 960));
}

#[test]
fn registered_tier_is_stretched_to_main_space() {
    let low = SourceInfo {
        width: 1920,
        height: 960,
        tile_columns: 2,
        tile_rows: 1,
    };
    let geometry = geometry().with_tier(2, low).expect("tier");
    let mut info = QualityRankingInfo {
        main_quality_ranking: 1,
        ..QualityRankingInfo::default()
    };
    info.selection.insert(
        2,
        vec![TileInformation {
            video_id: 0,
            tile_id: 2,
            tier: ResolutionTier::Low,
            proj: PixelRect::new(960, 0, 960, 960),
            packed: PixelRect::new(1920, 960, 960, 960),
            packed_pic_width: 2880,
            packed_pic_height: 1920,
        }],
    );

    let commands = plan_blits(&info, &geometry);

    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].dst, PixelRect::new(1920, 0, 1920, 1920));
    assert_eq!(geometry.tier_columns(2), 2);
    assert_eq!(geometry.tier_columns(1), 4);
}

#[test]
fn geometry_without_tile_grid_is_rejected() {
    let broken = SourceInfo {
        tile_rows: 0,
        ..main_source()
    };
    assert_eq!(RenderGeometry::new(broken), Err(RenderError::InvalidGeometry));
}

#[test]
fn update_composites_front_view_and_releases_snapshot() {
    let (sender, source) = region_data_channel(0, 4);
    let mut sources = vec![source];
    let mut backend = RecordingBackend::new();
    let mut target = ErpRenderTarget::new(geometry());
    sender.send(frame(7, [1, 2])).expect("send");

    let outcome = target
        .update(&mut backend, &mut sources, request(0.0, 7, 0))
        .expect("update");

    assert_eq!(
        outcome,
        FrameOutcome {
            pts: 7,
            state: QualityState::AllHigh,
            transition: None,
            required_tiles: vec![2, 3, 6, 7],
            blits: 6,
        }
    );
    assert_eq!(backend.clears(), 1);
    assert_eq!(backend.commands().len(), 6);
    assert!(sources[0].current().is_none());
    assert_eq!(target.quality_ranking_info().main_quality_ranking, 1);
}

#[test]
fn update_without_data_reports_no_frame() {
    let (_sender, source) = region_data_channel(0, 4);
    let mut sources = vec![source];
    let mut target = ErpRenderTarget::new(geometry());

    let error = target
        .update(&mut RecordingBackend::new(), &mut sources, request(0.0, 0, 0))
        .unwrap_err();

    assert_eq!(error, RenderError::NoFrame);
    assert_eq!(error.code(), status::RENDER_NO_FRAME);
    assert_eq!(target.transition_count(), 0);
}

#[test]
fn turning_away_drops_quality_until_matching_data_arrives() {
    let (sender, source) = region_data_channel(0, 4);
    let mut sources = vec![source];
    let mut backend = RecordingBackend::new();
    let mut target = ErpRenderTarget::new(geometry());

    sender.send(frame(0, [1, 2])).expect("send");
    target
        .update(&mut backend, &mut sources, request(0.0, 0, 0))
        .expect("front");

    sender.send(frame(1, [1, 2])).expect("send");
    let dropped = target
        .update(&mut backend, &mut sources, request(180.0, 1, 33))
        .expect("turned");
    assert_eq!(dropped.required_tiles, vec![1, 4, 5, 8]);
    assert_eq!(dropped.state, QualityState::PartialLow);
    assert_eq!(dropped.transition, Some(QualityTransition::DroppedToLow));

    sender.send(frame(2, [3, 0])).expect("send");
    let recovered = target
        .update(&mut backend, &mut sources, request(180.0, 2, 100))
        .expect("recovered");
    assert_eq!(
        recovered.transition,
        Some(QualityTransition::RecoveredToHigh { switch_time_ms: 67 })
    );
    assert_eq!(target.quality_state(), QualityState::AllHigh);
    assert_eq!(target.transition_count(), 2);
    assert_eq!(target.avg_changed_time_ms(), 67.0);
}

#[test]
fn invalid_fov_is_rejected_before_consuming_data() {
    let (sender, source) = region_data_channel(0, 4);
    let mut sources = vec![source];
    let mut target = ErpRenderTarget::new(geometry());
    sender.send(frame(0, [1, 2])).expect("send");

    let mut bad = request(0.0, 0, 0);
    bad.h_fov = 0.0;
    assert_eq!(
        target.update(&mut RecordingBackend::new(), &mut sources, bad),
        Err(RenderError::Viewport(ViewportError::InvalidFov))
    );
    assert_eq!(sources[0].pending(), 1);

    target
        .update(&mut RecordingBackend::new(), &mut sources, request(0.0, 0, 0))
        .expect("valid update");
}

#[test]
fn invalid_region_information_is_released() {
    let (sender, source) = region_data_channel(0, 4);
    let mut sources = vec![source];
    let mut target = ErpRenderTarget::new(geometry());
    sender
        .send(RegionData::new(0, 0, viewport_rwpk([1, 2], true), Vec::new()))
        .expect("send");

    let mut backend = RecordingBackend::new();
    assert_eq!(
        target.update(&mut backend, &mut sources, request(0.0, 0, 0)),
        Err(RenderError::NoValidRegionInfo)
    );
    assert_eq!(
        target.update(&mut backend, &mut sources, request(0.0, 1, 33)),
        Err(RenderError::NoFrame)
    );
    assert_eq!(target.quality_state(), QualityState::AllHigh);
    assert_eq!(backend.clears(), 0);
}

#[test]
fn sender_checks_video_id_and_closed_queue() {
    let (sender, source) = region_data_channel(1, 1);

    assert_eq!(
        sender.send(frame(0, [1, 2])),
        Err(RenderError::VideoIdMismatch {
            expected: 1,
            found: 0
        })
    );
    drop(source);
    let error = sender
        .send(RegionData::new(1, 0, viewport_rwpk([1, 2], true), packed_sources()))
        .unwrap_err();
    assert_eq!(error, RenderError::SourceClosed { video_id: 1 });
    assert_eq!(error.code(), status::RENDER_NULL_HANDLE);
}

#[test]
fn software_compositor_copies_nearest_neighbour() {
    let mut decoded = RgbFrame::new(4, 2, [0, 0, 0]);
    decoded.set_pixel(0, 0, [255, 0, 0]);
    decoded.set_pixel(1, 0, [0, 255, 0]);
    let mut compositor = SoftwareCompositor::new(8, 4);
    compositor.set_frame(0, decoded);

    compositor.clear();
    compositor
        .blit(&BlitCommand {
            video_id: 0,
            quality_ranking: 1,
            src: PixelRect::new(0, 0, 2, 1),
            dst: PixelRect::new(2, 1, 4, 2),
        })
        .expect("blit");

    let surface = compositor.surface();
    assert_eq!(surface.pixel(2, 1), Some([255, 0, 0]));
    assert_eq!(surface.pixel(3, 2), Some([255, 0, 0]));
    assert_eq!(surface.pixel(4, 1), Some([0, 255, 0]));
    assert_eq!(surface.pixel(5, 2), Some([0, 255, 0]));
    assert_eq!(surface.pixel(6, 1), Some([0, 0, 0]));
    assert_eq!(surface.pixel(8, 0), None);
}

#[test]
fn software_compositor_rejects_missing_and_oversized_sources() {
    let mut compositor = SoftwareCompositor::new(8, 4);
    let command = BlitCommand {
        video_id: 3,
        quality_ranking: 1,
        src: PixelRect::new(0, 0, 4, 4),
        dst: PixelRect::new(0, 0, 4, 4),
    };
    assert_eq!(
        compositor.blit(&command),
        Err(RenderError::MissingFrame { video_id: 3 })
    );

    compositor.set_frame(3, RgbFrame::new(4, 2, [9, 9, 9]));
    assert_eq!(
        compositor.blit(&command),
        Err(RenderError::BlitOutOfBounds {
            video_id: 3,
            rect: PixelRect::new(0, 0, 4, 4)
        })
    );
}
