use serde::{Deserialize, Serialize};

use crate::sphere::{self, SphereError};
use crate::{PicResolution, PixelRect, ProjectionFormat};

/// Angular region on the viewing sphere, 16.16 fixed-point degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SphereRegion {
    pub centre_azimuth: i32,
    pub centre_elevation: i32,
    pub centre_tilt: i32,
    pub azimuth_range: u32,
    pub elevation_range: u32,
    pub interpolate: bool,
}

impl SphereRegion {
    /// Sphere region covered by a pixel box of a projected picture. A box
    /// spanning the whole width or height is anchored at the picture origin on
    /// that axis.
    pub fn from_pixel_box(rect: PixelRect, picture: PicResolution) -> Result<Self, SphereError> {
        let left = if rect.width >= picture.width { 0 } else { rect.left };
        let top = if rect.height >= picture.height { 0 } else { rect.top };
        Ok(Self {
            centre_azimuth: sphere::centre_azimuth_for_span(left, rect.width, picture.width)?,
            centre_elevation: sphere::centre_elevation_for_span(top, rect.height, picture.height)?,
            centre_tilt: 0,
            azimuth_range: sphere::azimuth_range_for_width(rect.width, picture.width)?,
            elevation_range: sphere::elevation_range_for_height(rect.height, picture.height)?,
            interpolate: false,
        })
    }

    /// Squared distance between centres, in fixed-point units. The azimuth
    /// difference takes the short way round the seam.
    pub fn centre_distance_squared(&self, other: &SphereRegion) -> f64 {
        let azimuth =
            sphere::normalize_azimuth(self.centre_azimuth as i64 - other.centre_azimuth as i64) as f64;
        let elevation = self.centre_elevation as f64 - other.centre_elevation as f64;
        azimuth * azimuth + elevation * elevation
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCoverage {
    pub coverage_shape_type: u8,
    pub view_idc_presence: bool,
    pub default_view_idc: u8,
    pub sphere_regions: Vec<SphereRegion>,
}

impl ContentCoverage {
    pub fn single(projection: ProjectionFormat, region: SphereRegion) -> Self {
        Self {
            coverage_shape_type: coverage_shape_type(projection),
            view_idc_presence: false,
            default_view_idc: 0,
            sphere_regions: vec![region],
        }
    }

    pub fn num_regions(&self) -> usize {
        self.sphere_regions.len()
    }

    pub fn primary_region(&self) -> Option<&SphereRegion> {
        self.sphere_regions.first()
    }
}

pub fn coverage_shape_type(projection: ProjectionFormat) -> u8 {
    if projection.is_equirectangular() { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::FIXED_POINT_ONE;

    fn centred(azimuth_degrees: i64, elevation_degrees: i64) -> SphereRegion {
        SphereRegion {
            centre_azimuth: (azimuth_degrees * FIXED_POINT_ONE) as i32,
            centre_elevation: (elevation_degrees * FIXED_POINT_ONE) as i32,
            ..SphereRegion::default()
        }
    }

    #[test]
    fn centre_distance_wraps_around_the_seam() {
        let near_seam = centred(170, 0);
        let across_seam = centred(-170, 0);
        let front = centred(0, 0);

        assert!(near_seam.centre_distance_squared(&across_seam) < near_seam.centre_distance_squared(&front));
        assert_eq!(
            near_seam.centre_distance_squared(&across_seam),
            ((20 * FIXED_POINT_ONE) as f64).powi(2)
        );
    }

    #[test]
    fn full_width_box_is_anchored_at_the_origin() {
        let region = SphereRegion::from_pixel_box(
            PixelRect::new(960, 0, 3840, 960),
            PicResolution::new(3840, 1920),
        )
        .expect("region");
        assert_eq!(region.centre_azimuth, 0);
        assert_eq!(region.azimuth_range, (360 * FIXED_POINT_ONE) as u32);
        assert_eq!(region.centre_elevation, (45 * FIXED_POINT_ONE) as i32);
    }
}
