use std::collections::BTreeMap;

use omaf_model::{PixelRect, QualityRankingInfo, SourceInfo};
use serde::Serialize;

use crate::RenderError;

/// Copy of one packed region onto the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlitCommand {
    pub video_id: u32,
    pub quality_ranking: i32,
    /// Packed-picture pixels.
    pub src: PixelRect,
    /// Display pixels, which share the main source's projected space.
    pub dst: PixelRect,
}

/// Projected geometry of the main source plus, optionally, of each lower
/// quality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGeometry {
    main: SourceInfo,
    tiers: BTreeMap<i32, SourceInfo>,
}

impl RenderGeometry {
    pub fn new(main: SourceInfo) -> Result<Self, RenderError> {
        check_grid(&main)?;
        Ok(Self {
            main,
            tiers: BTreeMap::new(),
        })
    }

    /// Registers the source behind a quality whose projected rects are not
    /// already expressed in the main source's space.
    pub fn with_tier(mut self, quality_ranking: i32, source: SourceInfo) -> Result<Self, RenderError> {
        check_grid(&source)?;
        self.tiers.insert(quality_ranking, source);
        Ok(self)
    }

    pub fn main(&self) -> &SourceInfo {
        &self.main
    }

    pub fn tier_columns(&self, quality_ranking: i32) -> u32 {
        self.tiers
            .get(&quality_ranking)
            .map_or(self.main.tile_columns, |tier| tier.tile_columns)
    }

    /// Destination of a projected rect. A registered tier is stretched by the
    /// ratio of the main picture to the tier's picture, everything else is
    /// copied at its projected position.
    pub fn destination(&self, quality_ranking: i32, proj: PixelRect) -> PixelRect {
        let Some(tier) = self.tiers.get(&quality_ranking) else {
            return proj;
        };
        let tier_width = proj.width as f64 * tier.tile_columns as f64;
        let tier_height = proj.height as f64 * tier.tile_rows as f64;
        if tier_width == 0.0 || tier_height == 0.0 {
            return proj;
        }
        let ratio_w = self.main.width as f64 / tier_width;
        let ratio_h = self.main.height as f64 / tier_height;
        PixelRect::new(
            scale(proj.left, ratio_w),
            scale(proj.top, ratio_h),
            scale(proj.width, ratio_w),
            scale(proj.height, ratio_h),
        )
    }
}

fn check_grid(source: &SourceInfo) -> Result<(), RenderError> {
    if source.tile_width().is_none() || source.tile_height().is_none() {
        return Err(RenderError::InvalidGeometry);
    }
    Ok(())
}

fn scale(value: u32, ratio: f64) -> u32 {
    (value as f64 * ratio).round().min(u32::MAX as f64) as u32
}

/// Blits for one frame: every non-main quality first as background, then the
/// main quality on top.
pub fn plan_blits(info: &QualityRankingInfo, geometry: &RenderGeometry) -> Vec<BlitCommand> {
    let main = info.main_quality_ranking;
    let background = info
        .selection
        .iter()
        .filter(|(quality, _)| **quality != main)
        .flat_map(|(quality, tiles)| tiles.iter().map(move |tile| (*quality, tile)));
    let foreground = info.main_tiles().iter().map(|tile| (main, tile));
    background
        .chain(foreground)
        .map(|(quality_ranking, tile)| BlitCommand {
            video_id: tile.video_id,
            quality_ranking,
            src: tile.packed,
            dst: if quality_ranking == main {
                tile.proj
            } else {
                geometry.destination(quality_ranking, tile.proj)
            },
        })
        .collect()
}
