//! Conversions between projected-picture pixels and sphere angles.
//!
//! Angles are 16.16 fixed-point degrees. Azimuth grows to the left of the
//! picture centre and elevation grows upwards.

use thiserror::Error;

pub const FIXED_POINT_ONE: i64 = 1 << 16;
const AZIMUTH_HALF_TURN: i64 = 180 * FIXED_POINT_ONE;
const ELEVATION_HALF_RANGE: i64 = 90 * FIXED_POINT_ONE;
const AZIMUTH_FULL_DEGREES: f64 = 360.0;
const ELEVATION_FULL_DEGREES: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SphereError {
    #[error("picture dimension must be non-zero")]
    ZeroPictureDimension,
    #[error("angle is not finite")]
    NonFiniteAngle,
}

/// Wraps a fixed-point azimuth into `[-180, 180)`.
pub fn normalize_azimuth(value: i64) -> i32 {
    let full_turn = 2 * AZIMUTH_HALF_TURN;
    ((value.rem_euclid(full_turn) + AZIMUTH_HALF_TURN).rem_euclid(full_turn) - AZIMUTH_HALF_TURN)
        as i32
}

/// Clamps a fixed-point elevation into `[-90, 90)`.
pub fn clamp_elevation(value: i64) -> i32 {
    value.clamp(-ELEVATION_HALF_RANGE, ELEVATION_HALF_RANGE - 1) as i32
}

pub fn degrees_to_fixed(degrees: f32) -> Result<i64, SphereError> {
    if !degrees.is_finite() {
        return Err(SphereError::NonFiniteAngle);
    }
    Ok((degrees as f64 * FIXED_POINT_ONE as f64) as i64)
}

/// Fixed-point azimuth in `[-180, 180)` for any finite angle in degrees.
pub fn azimuth_degrees_to_fixed(degrees: f32) -> Result<i32, SphereError> {
    if !degrees.is_finite() {
        return Err(SphereError::NonFiniteAngle);
    }
    let turned = (degrees as f64).rem_euclid(AZIMUTH_FULL_DEGREES);
    Ok(normalize_azimuth((turned * FIXED_POINT_ONE as f64) as i64))
}

pub fn fixed_to_degrees(value: i64) -> f64 {
    value as f64 / FIXED_POINT_ONE as f64
}

fn non_zero(dimension: u32) -> Result<f64, SphereError> {
    if dimension == 0 {
        Err(SphereError::ZeroPictureDimension)
    } else {
        Ok(dimension as f64)
    }
}

pub fn centre_azimuth_for_span(left: u32, width: u32, pic_width: u32) -> Result<i32, SphereError> {
    let pic_width = non_zero(pic_width)?;
    let centre_x = left as f64 + width as f64 / 2.0;
    let raw = (pic_width / 2.0 - centre_x) * AZIMUTH_FULL_DEGREES * FIXED_POINT_ONE as f64 / pic_width;
    Ok(normalize_azimuth(raw as i64))
}

pub fn centre_elevation_for_span(
    top: u32,
    height: u32,
    pic_height: u32,
) -> Result<i32, SphereError> {
    let pic_height = non_zero(pic_height)?;
    let centre_y = top as f64 + height as f64 / 2.0;
    let raw =
        (pic_height / 2.0 - centre_y) * ELEVATION_FULL_DEGREES * FIXED_POINT_ONE as f64 / pic_height;
    Ok(clamp_elevation(raw as i64))
}

pub fn azimuth_range_for_width(width: u32, pic_width: u32) -> Result<u32, SphereError> {
    non_zero(pic_width)?;
    let range = width as u64 * 360 * FIXED_POINT_ONE as u64 / pic_width as u64;
    Ok(range.min(u32::MAX as u64) as u32)
}

pub fn elevation_range_for_height(height: u32, pic_height: u32) -> Result<u32, SphereError> {
    non_zero(pic_height)?;
    let range = height as u64 * 180 * FIXED_POINT_ONE as u64 / pic_height as u64;
    Ok(range.min(u32::MAX as u64) as u32)
}

/// Horizontal pixel position of an azimuth, wrapped into `[0, pic_width)`.
pub fn pixel_x_for_azimuth(azimuth: i32, pic_width: u32) -> Result<f64, SphereError> {
    let pic_width = non_zero(pic_width)?;
    let degrees = fixed_to_degrees(azimuth as i64);
    let x = pic_width / 2.0 - degrees * pic_width / AZIMUTH_FULL_DEGREES;
    Ok(x.rem_euclid(pic_width))
}

/// Vertical pixel position of an elevation, clamped into `[0, pic_height]`.
pub fn pixel_y_for_elevation(elevation: i32, pic_height: u32) -> Result<f64, SphereError> {
    let pic_height = non_zero(pic_height)?;
    let degrees = fixed_to_degrees(elevation as i64);
    let y = pic_height / 2.0 - degrees * pic_height / ELEVATION_FULL_DEGREES;
    Ok(y.clamp(0.0, pic_height))
}

pub fn width_for_azimuth_range(range: u32, pic_width: u32) -> Result<f64, SphereError> {
    let pic_width = non_zero(pic_width)?;
    Ok(fixed_to_degrees(range as i64) * pic_width / AZIMUTH_FULL_DEGREES)
}

pub fn height_for_elevation_range(range: u32, pic_height: u32) -> Result<f64, SphereError> {
    let pic_height = non_zero(pic_height)?;
    Ok(fixed_to_degrees(range as i64) * pic_height / ELEVATION_FULL_DEGREES)
}
