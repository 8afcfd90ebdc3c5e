use std::collections::BTreeSet;

use omaf_model::{
    PixelRect, QualityRankingInfo, RegionData, RegionWisePacking, ResolutionTier,
    SourceResolution, TileInformation,
};
use tracing::info;

use crate::{RenderError, RenderGeometry};

const MAX_SOURCES_IN_REGION: usize = 2;

pub fn region_data_is_valid(data: &RegionData) -> bool {
    !data.region_wise_packing().regions.is_empty()
        && (1..=MAX_SOURCES_IN_REGION).contains(&data.source_in_region())
}

/// Collects the quality rankings advertised by every valid snapshot. The
/// smallest ranking becomes the main quality and each ranking starts with an
/// empty tile list.
pub fn calc_quality_ranking<'a, I>(frames: I) -> Result<QualityRankingInfo, RenderError>
where
    I: IntoIterator<Item = &'a RegionData>,
{
    let mut qualities = BTreeSet::new();
    for data in frames.into_iter().filter(|data| region_data_is_valid(data)) {
        qualities.extend(data.source_info().iter().map(|source| source.quality_ranking));
    }
    let main_quality_ranking = *qualities
        .first()
        .ok_or(RenderError::NoValidRegionInfo)?;
    Ok(QualityRankingInfo {
        main_quality_ranking,
        selection: qualities
            .into_iter()
            .map(|quality| (quality, Vec::new()))
            .collect(),
    })
}

/// Files every packed region of `data` under its quality ranking. Returns
/// false when the snapshot was skipped.
pub fn transfer_region_info(
    data: &RegionData,
    geometry: &RenderGeometry,
    info: &mut QualityRankingInfo,
) -> bool {
    if !region_data_is_valid(data) {
        info!(
            video_id = data.video_id(),
            pts = data.pts(),
            sources = data.source_in_region(),
            "skipping invalid region information"
        );
        return false;
    }

    let rwpk = data.region_wise_packing();
    let positional = positional_tiers(rwpk);
    for (region, positional_tier) in rwpk.regions.iter().zip(positional) {
        let quality = region
            .tier
            .map(ResolutionTier::quality_ranking)
            .or_else(|| find_quality(data.source_info(), region.packed))
            .unwrap_or(positional_tier.quality_ranking());
        let Some(tile_id) = tile_id_for(region.proj, geometry.tier_columns(quality)) else {
            continue;
        };
        let tier = region.tier.unwrap_or(if quality <= info.main_quality_ranking {
            ResolutionTier::High
        } else {
            ResolutionTier::Low
        });
        info.selection.entry(quality).or_default().push(TileInformation {
            video_id: data.video_id(),
            tile_id,
            tier,
            proj: region.proj,
            packed: region.packed,
            packed_pic_width: rwpk.packed_pic_width,
            packed_pic_height: rwpk.packed_pic_height,
        });
    }
    true
}

/// Quality of the source whose packed area holds the region's origin.
fn find_quality(sources: &[SourceResolution], packed: PixelRect) -> Option<i32> {
    sources
        .iter()
        .find(|source| source.packed_area().contains_point(packed.left, packed.top))
        .map(|source| source.quality_ranking)
}

/// Tiers for streams that carry neither tier tags nor source areas. Low
/// regions follow the high ones, so walking backwards everything is low up to
/// and including the first region anchored at the projected origin.
fn positional_tiers(rwpk: &RegionWisePacking) -> Vec<ResolutionTier> {
    let mut tiers = vec![ResolutionTier::High; rwpk.regions.len()];
    let mut current = ResolutionTier::Low;
    for (index, region) in rwpk.regions.iter().enumerate().rev() {
        tiers[index] = current;
        if region.proj.left == 0 && region.proj.top == 0 {
            current = ResolutionTier::High;
        }
    }
    tiers
}

/// 1-based raster id of the tile a projected rect stands for.
fn tile_id_for(proj: PixelRect, columns: u32) -> Option<u32> {
    let column = proj.left.checked_div(proj.width)?;
    let row = proj.top.checked_div(proj.height)?;
    Some(column + 1 + columns * row)
}
