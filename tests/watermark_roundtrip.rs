// End-to-end watermark and restore tests on generated JPEG and WebP images.

#[cfg(test)]
mod watermark_roundtrip {
    use drmark_rs::jfif::{JfifContainer, JfifSegment};
    use drmark_rs::jpeg_marker_code::JpegMarkerCode;
    use drmark_rs::{
        DrmError, EncryptionKey, ImageKind, OriginX, OriginY, Section, WatermarkTask, codec,
        embed, section,
    };
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    fn key() -> EncryptionKey {
        EncryptionKey::from_hex(&"3c".repeat(32)).unwrap()
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 5 % 256) as u8, (y * 7 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn noise(width: u32, height: u32) -> DynamicImage {
        let mut state = 0x1234_5678u32;
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            };
            Rgb([next(), next(), next()])
        }))
    }

    fn logo() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(8, 6, |x, _| {
            Rgba([250, 250, 250, if x % 2 == 0 { 255 } else { 128 }])
        }))
    }

    #[test]
    fn test_webp_restore_is_pixel_exact() {
        let target = gradient(40, 30);
        let target_bytes = codec::encode(&target, ImageKind::WebP).unwrap();
        let logo_bytes = codec::encode(&logo(), ImageKind::WebP).unwrap();

        let mut task = WatermarkTask::new();
        task.load_target(&target_bytes, ImageKind::WebP).unwrap();
        task.load_watermark(&logo_bytes, ImageKind::WebP).unwrap();
        task.set_position(3, 2, OriginX::Right, OriginY::Bottom);
        task.set_key(key());
        task.process().unwrap();
        let marked = task.render(ImageKind::WebP).unwrap();

        let position = task.absolute_watermark_position().unwrap();
        assert_eq!((position.x, position.y), (29, 22));

        let marked_pixels = codec::decode(&marked, ImageKind::WebP).unwrap().to_rgb8();
        assert_eq!(marked_pixels.get_pixel(29, 22), &Rgb([250, 250, 250]));
        assert_ne!(marked_pixels, target.to_rgb8());

        let restored = embed::restore_webp(&marked, &key()).unwrap();
        let restored = codec::decode(&restored, ImageKind::WebP).unwrap();
        assert_eq!(restored.to_rgb8(), target.to_rgb8());
    }

    #[test]
    fn test_wrong_key_cannot_restore() {
        let mut task = WatermarkTask::new();
        task.set_target(gradient(20, 20));
        task.set_watermark(logo());
        task.set_key(key());
        task.process().unwrap();
        let marked = task.render(ImageKind::WebP).unwrap();

        let other = EncryptionKey::new([0x99; 32]);
        assert_eq!(
            embed::restore_webp(&marked, &other),
            Err(DrmError::CorruptedEmbeddedBlock)
        );
    }

    #[test]
    fn test_large_jpeg_section_spans_segments() {
        let mut task = WatermarkTask::new();
        task.set_target(noise(320, 320));
        task.set_watermark(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            300,
            300,
            Rgb([0, 0, 0]),
        )));
        task.set_position(10, 10, OriginX::Left, OriginY::Top);
        task.set_key(key());
        task.process().unwrap();

        let old_section = task.render_old_section(ImageKind::Jpeg).unwrap();
        assert!(old_section.len() > 65_526);

        let marked = task.render(ImageKind::Jpeg).unwrap();
        let container = JfifContainer::parse(&marked).unwrap();
        let app10 = container
            .segments()
            .iter()
            .filter(|s| {
                matches!(s, JfifSegment::Marker { marker, .. }
                    if *marker == u8::from(JpegMarkerCode::ApplicationData10))
            })
            .count();
        assert!(app10 >= 2);

        let extracted = embed::extract_jpeg(&marked, &key()).unwrap();
        assert_eq!(extracted.image, old_section);
        assert_eq!(extracted.section(), Section::new(10, 10, 300, 300));

        let restored = embed::restore_jpeg(&marked, &key()).unwrap();
        let restored = codec::decode(&restored, ImageKind::Jpeg).unwrap();
        assert_eq!(restored.dimensions(), (320, 320));
    }

    #[test]
    fn test_watermarked_jpeg_still_decodes() {
        let target_bytes = codec::encode(&gradient(64, 48), ImageKind::Jpeg).unwrap();
        let mut task = WatermarkTask::new();
        task.load_target(&target_bytes, ImageKind::Jpeg).unwrap();
        task.set_watermark(logo());
        task.set_key(key());
        task.process().unwrap();

        let marked = task.render(ImageKind::Jpeg).unwrap();
        assert!(embed::has_embedded_section(&marked, ImageKind::Jpeg).unwrap());
        let decoded = codec::decode(&marked, ImageKind::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));

        let restored = embed::restore_jpeg(&marked, &key()).unwrap();
        assert!(!embed::has_embedded_section(&restored, ImageKind::Jpeg).unwrap());
    }

    #[test]
    fn test_encoder_output_reserializes_identically() {
        let bytes = codec::encode(&gradient(33, 17), ImageKind::Jpeg).unwrap();
        let container = JfifContainer::parse(&bytes).unwrap();
        assert_eq!(container.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_section_of_watermarked_image() {
        let mut task = WatermarkTask::new();
        task.set_target(gradient(30, 30));
        task.set_watermark(logo());
        task.set_key(key());
        task.process().unwrap();
        let marked = task.render(ImageKind::WebP).unwrap();

        let crop = section::get_section_webp(&marked, Section::new(0, 0, 8, 6)).unwrap();
        let crop = codec::decode(&crop, ImageKind::WebP).unwrap().to_rgb8();
        assert_eq!(crop.get_pixel(0, 0), &Rgb([250, 250, 250]));
    }
}
