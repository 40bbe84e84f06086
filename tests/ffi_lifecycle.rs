// Drives the C ABI the way a C caller would: create, fill, read, destroy.

#[cfg(test)]
mod ffi_lifecycle {
    use std::ptr;

    use drmark_rs::ffi::*;
    use drmark_rs::{ImageKind, codec};
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    unsafe fn take(arr: *mut CapiArrResult) -> Vec<u8> {
        unsafe {
            let len = len_arr_result(arr);
            let data = read_arr_result(arr, len);
            assert!(!data.is_null());
            std::slice::from_raw_parts(data, len).to_vec()
        }
    }

    #[test]
    fn test_webp_watermark_and_restore() {
        let target = DynamicImage::ImageRgb8(RgbImage::from_fn(24, 16, |x, y| {
            Rgb([x as u8 * 10, y as u8 * 15, 200])
        }));
        let mark = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([0, 0, 0, 200])));
        let target_bytes = codec::encode(&target, ImageKind::WebP).unwrap();
        let mark_bytes = codec::encode(&mark, ImageKind::WebP).unwrap();
        let key = [0x42u8; 32];

        unsafe {
            let task = create_watermarktask();
            assert_eq!(set_target_webp(task, target_bytes.as_ptr(), target_bytes.len()), 0);
            assert_eq!(set_watermark_webp(task, mark_bytes.as_ptr(), mark_bytes.len()), 0);
            assert_eq!(set_key_watermark(task, key.as_ptr(), key.len()), 0);
            set_position_watermark(task, 1, 1, 1, 1);
            assert_eq!(process_watermark(task), 0);

            let output = create_arr_result();
            assert_eq!(get_output_webp(task, output), 0);
            let marked = take(output);

            let old = create_arr_result();
            assert_eq!(get_old_section_webp(task, old), 0);
            let old_section = codec::decode(&take(old), ImageKind::WebP).unwrap().to_rgb8();
            assert_eq!(old_section.dimensions(), (5, 5));
            assert_eq!(old_section.get_pixel(0, 0), target.to_rgb8().get_pixel(18, 10));

            let restored = create_arr_result();
            assert_eq!(
                restore_webp(marked.as_ptr(), marked.len(), key.as_ptr(), key.len(), restored),
                0
            );
            let pixels = codec::decode(&take(restored), ImageKind::WebP).unwrap();
            assert_eq!(pixels.to_rgb8(), target.to_rgb8());

            assert_eq!(
                restore_webp(marked.as_ptr(), marked.len(), ptr::null(), 0, restored),
                1
            );

            destroy_arr_result(restored);
            destroy_arr_result(old);
            destroy_arr_result(output);
            destroy_watermarktask(task);
        }
    }

    #[test]
    fn test_section_handle_lifecycle() {
        let source = codec::encode(
            &DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([9, 9, 9]))),
            ImageKind::WebP,
        )
        .unwrap();

        unsafe {
            let arr = get_section_webp(source.as_ptr(), source.len(), 8, 8, 5, 5);
            let crop = codec::decode(&take(arr), ImageKind::WebP).unwrap();
            assert_eq!((crop.width(), crop.height()), (2, 2));
            destroy_arr_result(arr);
        }
    }
}
