//! C Foreign Function Interface for drmark-rs.
//!
//! Handles are opaque: C only ever sees `CapiWatermarkTask*` and
//! `CapiArrResult*` and drives them through the functions below. Functions
//! returning `u32` report `0` on success and a [`DrmError`] code otherwise.

use std::ptr;

use tracing::debug;

use crate::codec::ImageKind;
use crate::embed;
use crate::encryption::EncryptionKey;
use crate::error::{DrmError, Result};
use crate::section::{self, Section};
use crate::watermark_task::{OriginX, OriginY, WatermarkTask};

/// Opaque watermark task handle.
#[repr(C)]
pub struct CapiWatermarkTask {
    _private: [u8; 0],
}

/// Opaque byte buffer handle.
#[repr(C)]
pub struct CapiArrResult {
    _private: [u8; 0],
}

/// Byte buffer handed across the boundary.
#[derive(Debug, Default)]
pub struct ArrResult {
    bytes: Vec<u8>,
}

impl ArrResult {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn into_handle(self) -> *mut CapiArrResult {
        Box::into_raw(Box::new(self)) as *mut CapiArrResult
    }
}

const RET_ARR: [u32; 10] = [111, 222, 333, 444, 555, 666, 777, 888, 999, 0];

fn status(result: Result<()>) -> u32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            debug!(error = %e, code = e.code(), "ffi call failed");
            e.code()
        }
    }
}

/// # Safety
/// `data` must be null or point to `len` readable bytes that outlive `'a`.
unsafe fn input<'a>(data: *const u8, len: usize) -> Result<&'a [u8]> {
    if data.is_null() || len == 0 {
        return Err(DrmError::InvalidArgument);
    }
    Ok(unsafe { std::slice::from_raw_parts(data, len) })
}

/// # Safety
/// `task` must be null or a live handle from [`create_watermarktask`].
unsafe fn task_mut<'a>(task: *mut CapiWatermarkTask) -> Result<&'a mut WatermarkTask> {
    if task.is_null() {
        return Err(DrmError::InvalidArgument);
    }
    Ok(unsafe { &mut *(task as *mut WatermarkTask) })
}

/// # Safety
/// `arr` must be null or a live handle from this module.
unsafe fn arr_mut<'a>(arr: *mut CapiArrResult) -> Result<&'a mut ArrResult> {
    if arr.is_null() {
        return Err(DrmError::InvalidArgument);
    }
    Ok(unsafe { &mut *(arr as *mut ArrResult) })
}

const ADD_OFFSET: u32 = 1222;

/// Smoke test for the binding: returns `value + 1222`, wrapping.
#[unsafe(no_mangle)]
pub extern "C" fn add(value: u32) -> u32 {
    value.wrapping_add(ADD_OFFSET)
}

/// Wrapping sum of `len` values. Returns 0 for a null pointer.
///
/// # Safety
/// `values` must be null or point to `len` readable `u32`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn add_array(values: *const u32, len: usize) -> u32 {
    if values.is_null() {
        return 0;
    }
    let values = unsafe { std::slice::from_raw_parts(values, len) };
    values.iter().fold(0u32, |acc, v| acc.wrapping_add(*v))
}

/// Returns a heap array of ten `u32`s. Release it with [`free_ret_arr`].
#[unsafe(no_mangle)]
pub extern "C" fn ret_arr() -> *mut u32 {
    Box::into_raw(Box::new(RET_ARR)) as *mut u32
}

/// # Safety
/// `values` must be null or a pointer returned by [`ret_arr`], released once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_ret_arr(values: *mut u32) {
    if !values.is_null() {
        let _ = unsafe { Box::from_raw(values as *mut [u32; 10]) };
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn create_watermarktask() -> *mut CapiWatermarkTask {
    Box::into_raw(Box::new(WatermarkTask::new())) as *mut CapiWatermarkTask
}

/// # Safety
/// `task` must be null or a handle from [`create_watermarktask`] not yet destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn destroy_watermarktask(task: *mut CapiWatermarkTask) {
    if !task.is_null() {
        let _ = unsafe { Box::from_raw(task as *mut WatermarkTask) };
    }
}

/// Empty buffer, for the `get_*`/`restore_*` functions to fill.
#[unsafe(no_mangle)]
pub extern "C" fn create_arr_result() -> *mut CapiArrResult {
    ArrResult::default().into_handle()
}

/// # Safety
/// `arr` must be null or a handle returned by this module not yet destroyed.
/// Pointers obtained from [`read_arr_result`] are invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn destroy_arr_result(arr: *mut CapiArrResult) {
    if !arr.is_null() {
        let _ = unsafe { Box::from_raw(arr as *mut ArrResult) };
    }
}

/// # Safety
/// `arr` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn len_arr_result(arr: *mut CapiArrResult) -> usize {
    match unsafe { arr_mut(arr) } {
        Ok(arr) => arr.bytes.len(),
        Err(_) => 0,
    }
}

/// Pointer to the buffer contents, or null when `len` exceeds its length.
///
/// # Safety
/// `arr` must be null or a live handle. The pointer stays valid until the
/// handle is destroyed or refilled.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn read_arr_result(arr: *mut CapiArrResult, len: usize) -> *const u8 {
    match unsafe { arr_mut(arr) } {
        Ok(arr) if len <= arr.bytes.len() => arr.bytes.as_ptr(),
        _ => ptr::null(),
    }
}

unsafe fn section_result(
    data: *const u8,
    len: usize,
    kind: ImageKind,
    area: Section,
) -> *mut CapiArrResult {
    let bytes = match unsafe { input(data, len) } {
        Ok(bytes) => bytes,
        Err(_) => return ptr::null_mut(),
    };
    match section::get_section(bytes, kind, area) {
        Ok(out) => ArrResult::new(out).into_handle(),
        Err(_) => ptr::null_mut(),
    }
}

/// Crops a JPEG to the given rectangle. Returns null on failure.
///
/// # Safety
/// `data` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_section_jpeg(
    data: *const u8,
    len: usize,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> *mut CapiArrResult {
    unsafe { section_result(data, len, ImageKind::Jpeg, Section::new(x, y, width, height)) }
}

/// Crops a WebP to the given rectangle. Returns null on failure.
///
/// # Safety
/// `data` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_section_webp(
    data: *const u8,
    len: usize,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> *mut CapiArrResult {
    unsafe { section_result(data, len, ImageKind::WebP, Section::new(x, y, width, height)) }
}

/// # Safety
/// `task` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_position_watermark(
    task: *mut CapiWatermarkTask,
    x: u32,
    y: u32,
    origin_x: u8,
    origin_y: u8,
) {
    if let Ok(task) = unsafe { task_mut(task) } {
        task.set_position(x, y, OriginX::from(origin_x), OriginY::from(origin_y));
    }
}

unsafe fn load(
    task: *mut CapiWatermarkTask,
    data: *const u8,
    len: usize,
    kind: ImageKind,
    as_target: bool,
) -> u32 {
    status((|| {
        let task = unsafe { task_mut(task) }?;
        task.invalidate();
        let bytes = unsafe { input(data, len) }?;
        if as_target {
            task.load_target(bytes, kind)
        } else {
            task.load_watermark(bytes, kind)
        }
    })())
}

/// # Safety
/// `task` must be a live handle and `data` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_target_jpeg(
    task: *mut CapiWatermarkTask,
    data: *const u8,
    len: usize,
) -> u32 {
    unsafe { load(task, data, len, ImageKind::Jpeg, true) }
}

/// # Safety
/// `task` must be a live handle and `data` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_target_webp(
    task: *mut CapiWatermarkTask,
    data: *const u8,
    len: usize,
) -> u32 {
    unsafe { load(task, data, len, ImageKind::WebP, true) }
}

/// # Safety
/// `task` must be a live handle and `data` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_watermark_jpeg(
    task: *mut CapiWatermarkTask,
    data: *const u8,
    len: usize,
) -> u32 {
    unsafe { load(task, data, len, ImageKind::Jpeg, false) }
}

/// # Safety
/// `task` must be a live handle and `data` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_watermark_webp(
    task: *mut CapiWatermarkTask,
    data: *const u8,
    len: usize,
) -> u32 {
    unsafe { load(task, data, len, ImageKind::WebP, false) }
}

/// Sets the 32-byte AES key.
///
/// # Safety
/// `task` must be a live handle and `key` must point to `key_len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn set_key_watermark(
    task: *mut CapiWatermarkTask,
    key: *const u8,
    key_len: usize,
) -> u32 {
    status((|| {
        let task = unsafe { task_mut(task) }?;
        task.invalidate();
        let key = EncryptionKey::try_from(unsafe { input(key, key_len) }?)?;
        task.set_key(key);
        Ok(())
    })())
}

/// # Safety
/// `task` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn process_watermark(task: *mut CapiWatermarkTask) -> u32 {
    status(unsafe { task_mut(task) }.and_then(|task| task.process()))
}

unsafe fn render_into(
    task: *mut CapiWatermarkTask,
    arr: *mut CapiArrResult,
    render: impl FnOnce(&WatermarkTask) -> Result<Vec<u8>>,
) -> u32 {
    status((|| {
        let task = unsafe { task_mut(task) }?;
        let arr = unsafe { arr_mut(arr) }?;
        arr.bytes = render(task)?;
        Ok(())
    })())
}

/// Renders the watermarked JPEG, with the covered pixels embedded, into `arr`.
///
/// # Safety
/// `task` and `arr` must be live handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_output_jpeg(
    task: *mut CapiWatermarkTask,
    arr: *mut CapiArrResult,
) -> u32 {
    unsafe { render_into(task, arr, |t| t.render(ImageKind::Jpeg)) }
}

/// # Safety
/// `task` and `arr` must be live handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_output_webp(
    task: *mut CapiWatermarkTask,
    arr: *mut CapiArrResult,
) -> u32 {
    unsafe { render_into(task, arr, |t| t.render(ImageKind::WebP)) }
}

/// # Safety
/// `task` and `arr` must be live handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_old_section_jpeg(
    task: *mut CapiWatermarkTask,
    arr: *mut CapiArrResult,
) -> u32 {
    unsafe { render_into(task, arr, |t| t.render_old_section(ImageKind::Jpeg)) }
}

/// # Safety
/// `task` and `arr` must be live handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_old_section_webp(
    task: *mut CapiWatermarkTask,
    arr: *mut CapiArrResult,
) -> u32 {
    unsafe { render_into(task, arr, |t| t.render_old_section(ImageKind::WebP)) }
}

unsafe fn restore_into(
    data: *const u8,
    len: usize,
    key: *const u8,
    key_len: usize,
    arr: *mut CapiArrResult,
    kind: ImageKind,
) -> u32 {
    status((|| {
        let arr = unsafe { arr_mut(arr) }?;
        let carrier = unsafe { input(data, len) }?;
        let key = EncryptionKey::try_from(unsafe { input(key, key_len) }?)?;
        arr.bytes = embed::restore(carrier, kind, &key)?;
        Ok(())
    })())
}

/// Restores the original pixels of a watermarked JPEG into `arr`.
///
/// # Safety
/// `data` and `key` must point to `len` and `key_len` readable bytes, `arr`
/// must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn restore_jpeg(
    data: *const u8,
    len: usize,
    key: *const u8,
    key_len: usize,
    arr: *mut CapiArrResult,
) -> u32 {
    unsafe { restore_into(data, len, key, key_len, arr, ImageKind::Jpeg) }
}

/// # Safety
/// See [`restore_jpeg`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn restore_webp(
    data: *const u8,
    len: usize,
    key: *const u8,
    key_len: usize,
    arr: *mut CapiArrResult,
) -> u32 {
    unsafe { restore_into(data, len, key, key_len, arr, ImageKind::WebP) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use image::{DynamicImage, Rgb, RgbImage};

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 64]));
        codec::encode(&DynamicImage::ImageRgb8(img), ImageKind::Jpeg).unwrap()
    }

    unsafe fn contents(arr: *mut CapiArrResult) -> Vec<u8> {
        unsafe {
            let len = len_arr_result(arr);
            std::slice::from_raw_parts(read_arr_result(arr, len), len).to_vec()
        }
    }

    #[test]
    fn scaffolding_functions() {
        assert_eq!(add(1), 1223);
        assert_eq!(add(u32::MAX), 1221);
        let values = [1u32, 2, u32::MAX];
        assert_eq!(unsafe { add_array(values.as_ptr(), values.len()) }, 2);
        assert_eq!(unsafe { add_array(ptr::null(), 3) }, 0);

        let arr = ret_arr();
        let values = unsafe { std::slice::from_raw_parts(arr, 10) };
        assert_eq!(values[0], 111);
        assert_eq!(values[9], 0);
        unsafe { free_ret_arr(arr) };
    }

    #[test]
    fn create_destroy_and_null_handles() {
        unsafe {
            destroy_watermarktask(create_watermarktask());
            destroy_arr_result(create_arr_result());
            destroy_watermarktask(ptr::null_mut());
            destroy_arr_result(ptr::null_mut());
            assert_eq!(len_arr_result(ptr::null_mut()), 0);
            assert!(read_arr_result(ptr::null_mut(), 0).is_null());
            set_position_watermark(ptr::null_mut(), 1, 1, 0, 0);
            assert_eq!(process_watermark(ptr::null_mut()), 1);
        }
    }

    #[test]
    fn section_buffer_bounds() {
        let source = jpeg(16, 8);
        unsafe {
            let arr = get_section_jpeg(source.as_ptr(), source.len(), 4, 2, 8, 4);
            assert!(!arr.is_null());
            let len = len_arr_result(arr);
            assert!(!read_arr_result(arr, len).is_null());
            assert!(read_arr_result(arr, len + 1).is_null());

            let decoded = codec::decode(&contents(arr), ImageKind::Jpeg).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (8, 4));
            destroy_arr_result(arr);

            assert!(get_section_jpeg(source.as_ptr(), source.len(), 16, 0, 2, 2).is_null());
            assert!(get_section_webp(source.as_ptr(), source.len(), 0, 0, 2, 2).is_null());
            assert!(get_section_jpeg(ptr::null(), 0, 0, 0, 2, 2).is_null());
        }
    }

    #[test]
    fn task_status_codes() {
        let target = jpeg(20, 10);
        let mark = jpeg(4, 4);
        unsafe {
            let task = create_watermarktask();
            let arr = create_arr_result();

            assert_eq!(process_watermark(task), DrmError::TargetNotSet.code());
            assert_eq!(set_target_jpeg(task, target.as_ptr(), target.len()), 0);
            assert_eq!(
                set_watermark_webp(task, mark.as_ptr(), mark.len()),
                DrmError::DecodeFailed.code()
            );
            assert_eq!(set_watermark_jpeg(task, mark.as_ptr(), mark.len()), 0);
            assert_eq!(set_target_jpeg(task, ptr::null(), 0), DrmError::InvalidArgument.code());

            let short = [0u8; 16];
            assert_eq!(set_key_watermark(task, short.as_ptr(), short.len()), 14);

            set_position_watermark(task, 2, 3, 1, 1);
            assert_eq!(get_output_jpeg(task, arr), DrmError::NotProcessed.code());
            assert_eq!(process_watermark(task), 0);
            assert_eq!(get_output_jpeg(task, arr), DrmError::KeyNotSet.code());
            assert_eq!(get_old_section_jpeg(task, arr), 0);
            assert!(len_arr_result(arr) > 0);

            assert_eq!(process_watermark(task), 0);
            assert_eq!(set_key_watermark(task, short.as_ptr(), 3), 14);
            assert_eq!(get_old_section_jpeg(task, arr), DrmError::NotProcessed.code());

            assert_eq!(process_watermark(task), 0);
            assert_eq!(set_target_jpeg(task, ptr::null(), 0), DrmError::InvalidArgument.code());
            assert_eq!(get_old_section_jpeg(task, arr), DrmError::NotProcessed.code());

            set_position_watermark(task, 30, 0, 0, 0);
            assert_eq!(process_watermark(task), DrmError::WatermarkOutOfBounds.code());

            destroy_arr_result(arr);
            destroy_watermarktask(task);
        }
    }

    #[test]
    fn output_then_restore() {
        let target = jpeg(20, 10);
        let mark = jpeg(4, 4);
        let key = [9u8; 32];
        unsafe {
            let task = create_watermarktask();
            let output = create_arr_result();
            let restored = create_arr_result();

            set_target_jpeg(task, target.as_ptr(), target.len());
            set_watermark_jpeg(task, mark.as_ptr(), mark.len());
            assert_eq!(set_key_watermark(task, key.as_ptr(), key.len()), 0);
            assert_eq!(process_watermark(task), 0);
            assert_eq!(get_output_jpeg(task, output), 0);

            let watermarked = contents(output);
            assert_eq!(
                restore_jpeg(
                    watermarked.as_ptr(),
                    watermarked.len(),
                    key.as_ptr(),
                    key.len(),
                    restored
                ),
                0
            );
            let decoded = codec::decode(&contents(restored), ImageKind::Jpeg).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (20, 10));

            let other = [1u8; 32];
            assert_eq!(
                restore_jpeg(
                    watermarked.as_ptr(),
                    watermarked.len(),
                    other.as_ptr(),
                    other.len(),
                    restored
                ),
                DrmError::CorruptedEmbeddedBlock.code()
            );

            destroy_arr_result(restored);
            destroy_arr_result(output);
            destroy_watermarktask(task);
        }
    }
}
