//! Flat integer status space shared with the wire-level tooling.
//!
//! Error enums across the workspace map onto these through `code()`.

pub const ERROR_NONE: i32 = 0;

pub const OMAF_ERROR_NULL_PTR: i32 = -16;
pub const OMAF_ERROR_BAD_PARAM: i32 = -17;
pub const OMAF_ERROR_VIDEO_NUM: i32 = -20;
pub const OMAF_ERROR_VIDEO_RESOLUTION: i32 = -27;
pub const OMAF_ERROR_VIEWPORT_NUM: i32 = -28;
pub const OMAF_ERROR_INVALID_SPS: i32 = -32;
pub const OMAF_ERROR_INVALID_PPS: i32 = -33;
pub const OMAF_ERROR_SCVP_INIT_FAILED: i32 = -36;
pub const OMAF_ERROR_SCVP_SET_FAILED: i32 = -39;
pub const OMAF_ERROR_SCVP_PROCESS_FAILED: i32 = -40;
pub const OMAF_ERROR_SCVP_INCORRECT_RESULT: i32 = -41;
pub const OMAF_ERROR_SCVP_OPERATION_FAILED: i32 = -42;
pub const OMAF_ERROR_INVALID_DATA: i32 = -43;
pub const OMAF_ERROR_INVALID_PROJECTIONTYPE: i32 = -44;
pub const OMAF_ERROR_STREAM_NOT_FOUND: i32 = -82;
pub const OMAF_ERROR_TILES_MERGE_ARRANGEMENT: i32 = -101;
pub const OMAF_ERROR_TILES_MERGE_RWPK: i32 = -102;
pub const OMAF_ERROR_GENERATE_RWPK: i32 = -103;

pub const RENDER_STATUS_OK: i32 = 0;
pub const RENDER_ERROR: i32 = 1;
pub const RENDER_NO_FRAME: i32 = 8;
pub const RENDER_NULL_HANDLE: i32 = 12;
