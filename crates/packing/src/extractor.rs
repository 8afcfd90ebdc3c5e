use std::collections::BTreeMap;

use omaf_model::{
    ContentCoverage, MAX_TILES_NUM_IN_VIEWPORT, Nalu, PicResolution, PixelRect, ProjectionFormat,
    RegionWisePacking, ResolutionTier, SourceResolution, SphereRegion, TilesMergeDirection,
};
use scvp::hevc::nalu_from_annex_b;
use scvp::sei::{encode_projection_sei, encode_rwpk_sei};
use scvp::{ScvpError, ScvpService};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::rwpk::TwoResRegionWisePackingGenerator;
use crate::stream::{InitialInfo, MediaStream, VideoStream, video_stream};
use crate::{PackingError, Result};

/// Everything a packager needs to write one viewport's extractor track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorTrack {
    pub viewport_idx: u16,
    pub projection: ProjectionFormat,
    pub rwpk: RegionWisePacking,
    pub tiles_merge_direction: TilesMergeDirection,
    pub coverage: ContentCoverage,
    pub vps: Nalu,
    pub sps: Nalu,
    pub pps: Nalu,
    pub projection_sei: Nalu,
    pub rwpk_sei: Nalu,
    pub dst_width: u32,
    pub dst_height: u32,
    /// High resolution first.
    pub pic_resolutions: Vec<PicResolution>,
    pub source_resolutions: Vec<SourceResolution>,
}

fn source_resolution(tier: ResolutionTier, block: PixelRect) -> SourceResolution {
    SourceResolution {
        quality_ranking: tier.quality_ranking(),
        left: block.left,
        top: block.top,
        width: block.width,
        height: block.height,
    }
}

fn tracks_per_seg_thread(tiles: u32) -> u16 {
    [4, 3, 2]
        .into_iter()
        .find(|divisor| tiles % *divisor as u32 == 0)
        .unwrap_or(1)
}

pub struct TwoResExtractorTrackGenerator<'a, S> {
    init_info: InitialInfo,
    streams: &'a BTreeMap<u8, MediaStream>,
    scvp: S,
    video_idx_in_media: [u8; 2],
    projection: ProjectionFormat,
    high_resolution: PicResolution,
    low_resolution: PicResolution,
    rwpk_gen: Option<TwoResRegionWisePackingGenerator>,
}

impl<'a, S: ScvpService> TwoResExtractorTrackGenerator<'a, S> {
    pub fn new(init_info: InitialInfo, streams: &'a BTreeMap<u8, MediaStream>, scvp: S) -> Self {
        Self {
            init_info,
            streams,
            scvp,
            video_idx_in_media: [0, 1],
            projection: ProjectionFormat::Equirectangular,
            high_resolution: PicResolution::default(),
            low_resolution: PicResolution::default(),
            rwpk_gen: None,
        }
    }

    pub fn init_info(&self) -> &InitialInfo {
        &self.init_info
    }

    /// Stream indices, high resolution first.
    pub fn video_idx_in_media(&self) -> [u8; 2] {
        self.video_idx_in_media
    }

    pub fn rwpk_generator(&self) -> Option<&TwoResRegionWisePackingGenerator> {
        self.rwpk_gen.as_ref()
    }

    fn rwpk_gen(&self) -> Result<&TwoResRegionWisePackingGenerator> {
        self.rwpk_gen
            .as_ref()
            .ok_or(PackingError::NullPointer("generator is not initialized"))
    }

    fn high_stream(&self) -> Result<&'a VideoStream> {
        video_stream(self.streams, self.video_idx_in_media[0])
    }

    /// Validates the two video streams and fills the viewport parameters from
    /// the larger one, which becomes index 0 of [`Self::video_idx_in_media`].
    pub fn check_and_fill_init_info(&mut self) -> Result<()> {
        let declared = self.init_info.bs_num_video as usize;
        if declared != 2 {
            return Err(PackingError::VideoNum { found: declared });
        }
        let indices = self.init_info.video_indices();
        if indices.len() != declared {
            return Err(PackingError::VideoNum {
                found: indices.len(),
            });
        }
        let first = video_stream(self.streams, indices[0])?;
        let second = video_stream(self.streams, indices[1])?;
        if first.resolution == second.resolution
            || first.resolution.area() == second.resolution.area()
        {
            return Err(PackingError::VideoResolution);
        }
        let (high, low, video_idx_in_media) =
            if first.resolution.area() > second.resolution.area() {
                (first, second, [indices[0], indices[1]])
            } else {
                (second, first, [indices[1], indices[0]])
            };
        self.video_idx_in_media = video_idx_in_media;

        let viewport = &mut self.init_info.viewport;
        viewport.in_width = high.resolution.width;
        viewport.in_height = high.resolution.height;
        viewport.tile_in_row = high.tile_in_row;
        viewport.tile_in_col = high.tile_in_col;
        viewport.out_geo_type = 2;
        viewport.projection = high.projection;

        self.projection = high.projection;
        self.high_resolution = high.resolution;
        self.low_resolution = low.resolution;

        let segmentation = &mut self.init_info.segmentation;
        if segmentation.extractor_tracks_per_seg_thread == 0 {
            segmentation.extractor_tracks_per_seg_thread =
                tracks_per_seg_thread(high.tile_in_row * high.tile_in_col);
        }
        Ok(())
    }

    /// Asks the tile selection service for the default viewport's tiles and
    /// sets up the packing generator from them.
    pub fn initialize(&mut self) -> Result<()> {
        self.check_and_fill_init_info()?;
        let viewport = self.init_info.viewport;

        self.scvp.init(&viewport).map_err(|err| {
            error!(error = %err, "tile selection init failed");
            PackingError::ScvpInitFailed(err)
        })?;
        self.scvp
            .set_viewport(viewport.yaw, viewport.pitch)
            .map_err(|err| {
                error!(error = %err, "tile selection rejected the viewport");
                PackingError::ScvpSetFailed(err)
            })?;
        self.scvp.process().map_err(|err| {
            error!(error = %err, "tile selection failed");
            PackingError::ScvpProcessFailed(err)
        })?;
        let selection = self.scvp.fixed_num_tiles().map_err(|err| {
            error!(error = %err, "tile selection returned no tiles");
            PackingError::ScvpProcessFailed(err)
        })?;
        let count = selection.tiles.len();
        if count == 0 || count > MAX_TILES_NUM_IN_VIEWPORT {
            return Err(PackingError::ScvpIncorrectResult { count });
        }
        info!(
            width = selection.dst_width,
            height = selection.dst_height,
            tiles = count,
            "calculated viewport"
        );

        self.rwpk_gen = Some(TwoResRegionWisePackingGenerator::initialize(
            self.streams,
            &self.video_idx_in_media,
            &selection.tiles,
            selection.dst_width,
            selection.dst_height,
        )?);
        Ok(())
    }

    /// One viewport per high resolution tile position. Grids above
    /// [`MAX_TILES_NUM_IN_VIEWPORT`] tiles are rejected by [`Self::initialize`].
    pub fn calculate_viewport_num(&self) -> u16 {
        let viewport = &self.init_info.viewport;
        let tiles = viewport.tile_in_row as u64 * viewport.tile_in_col as u64;
        u16::try_from(tiles).unwrap_or(u16::MAX)
    }

    pub fn fill_dst_region_wise_packing(&self, viewport_idx: u16) -> Result<RegionWisePacking> {
        self.rwpk_gen()?.generate_dst_rwpk(viewport_idx)
    }

    pub fn fill_tiles_merge_direction(&self, viewport_idx: u16) -> Result<TilesMergeDirection> {
        self.rwpk_gen()?.generate_tiles_merge_direction(viewport_idx)
    }

    /// Sphere region of the high resolution block of `viewport_idx`. A block
    /// running past the right edge keeps its width and wraps in azimuth.
    pub fn fill_dst_content_coverage(&self, viewport_idx: u16) -> Result<ContentCoverage> {
        let generator = self.rwpk_gen()?;
        let layout = generator.high_layout();
        let origin = generator.high_block_origin(viewport_idx)?;
        let tile_width = layout.tile_width();
        let tile_height = layout.tile_height();
        let block = PixelRect::new(
            origin.x * tile_width,
            origin.y * tile_height,
            generator.tiles_num_in_viewport_row() * tile_width,
            generator.tile_row_num_in_viewport() * tile_height,
        );
        let region = SphereRegion::from_pixel_box(block, layout.picture())
            .map_err(|_| PackingError::InvalidData("coverage of an empty picture"))?;
        Ok(ContentCoverage::single(self.projection, region))
    }

    pub fn generate_new_sps(&self) -> Result<Nalu> {
        let generator = self.rwpk_gen()?;
        let (width, height) = (generator.packed_pic_width(), generator.packed_pic_height());
        if width == 0 || height == 0 {
            return Err(PackingError::BadParam("packed picture has no area"));
        }
        let original = &self.high_stream()?.sps;
        if original.body().is_empty() {
            return Err(PackingError::InvalidSps);
        }
        let bytes = self
            .scvp
            .generate_sps(original, width, height)
            .map_err(|err| self.operation_failed("sps", err))?;
        if bytes.is_empty() {
            return Err(PackingError::InvalidSps);
        }
        nalu_from_annex_b(bytes).map_err(|_| PackingError::InvalidSps)
    }

    pub fn generate_new_pps(&self) -> Result<Nalu> {
        let generator = self.rwpk_gen()?;
        let original = &self.high_stream()?.pps;
        if original.body().is_empty() {
            return Err(PackingError::InvalidPps);
        }
        let bytes = self
            .scvp
            .generate_pps(original, generator.merged_tiles_arrange())
            .map_err(|err| self.operation_failed("pps", err))?;
        if bytes.is_empty() {
            return Err(PackingError::InvalidPps);
        }
        nalu_from_annex_b(bytes).map_err(|_| PackingError::InvalidPps)
    }

    fn operation_failed(&self, what: &'static str, err: ScvpError) -> PackingError {
        error!(parameter_set = what, error = %err, "parameter set generation failed");
        PackingError::ScvpOperationFailed(err)
    }

    /// Builds one track per viewport. Nothing is returned unless every track
    /// and both parameter sets were generated.
    pub fn generate_extractor_tracks(&self) -> Result<BTreeMap<u16, ExtractorTrack>> {
        self.build_tracks().inspect_err(|err| {
            warn!(error = %err, code = err.code(), "discarding partially generated extractor tracks");
        })
    }

    fn build_tracks(&self) -> Result<BTreeMap<u16, ExtractorTrack>> {
        let viewport_num = self.calculate_viewport_num();
        if viewport_num == 0 {
            return Err(PackingError::ViewportNum);
        }
        let generator = self.rwpk_gen()?;
        let projection_sei =
            encode_projection_sei(self.projection).map_err(PackingError::InvalidProjection)?;
        let source_resolutions = vec![
            source_resolution(ResolutionTier::High, generator.high_block()),
            source_resolution(ResolutionTier::Low, generator.low_block()),
        ];

        let mut tracks = BTreeMap::new();
        for viewport_idx in 0..viewport_num {
            let rwpk = self.fill_dst_region_wise_packing(viewport_idx)?;
            let tiles_merge_direction = self.fill_tiles_merge_direction(viewport_idx)?;
            let coverage = self.fill_dst_content_coverage(viewport_idx)?;
            let rwpk_sei = encode_rwpk_sei(&rwpk).map_err(PackingError::TilesMergeRwpk)?;
            debug!(
                viewport_idx,
                num_regions = rwpk.num_regions(),
                "generated extractor track"
            );
            tracks.insert(
                viewport_idx,
                ExtractorTrack {
                    viewport_idx,
                    projection: self.projection,
                    rwpk,
                    tiles_merge_direction,
                    coverage,
                    vps: Nalu::default(),
                    sps: Nalu::default(),
                    pps: Nalu::default(),
                    projection_sei: projection_sei.clone(),
                    rwpk_sei,
                    dst_width: generator.packed_pic_width(),
                    dst_height: generator.packed_pic_height(),
                    pic_resolutions: vec![self.high_resolution, self.low_resolution],
                    source_resolutions: source_resolutions.clone(),
                },
            );
        }

        let sps = self.generate_new_sps()?;
        let pps = self.generate_new_pps()?;
        let vps = self.high_stream()?.vps.clone();
        for track in tracks.values_mut() {
            track.vps = vps.clone();
            track.sps = sps.clone();
            track.pps = pps.clone();
        }
        info!(tracks = tracks.len(), "generated extractor tracks");
        Ok(tracks)
    }
}
