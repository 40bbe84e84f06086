//! WebAssembly bindings for drmark-rs.
//!
//! JavaScript-compatible wrappers via wasm-bindgen, for browsers and Node.js.
//! Errors surface as strings built from [`DrmError`](crate::DrmError).

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use crate::{
    EncryptionKey, ImageKind, OriginX, OriginY, Section, WatermarkTask, embed, error::DrmError,
    section,
};

#[cfg(target_arch = "wasm32")]
fn js_error(e: DrmError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Crop a JPEG to the given rectangle.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_section_jpeg(
    data: &[u8],
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, JsValue> {
    section::get_section_jpeg(data, Section::new(x, y, width, height)).map_err(js_error)
}

/// Crop a WebP to the given rectangle.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_section_webp(
    data: &[u8],
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, JsValue> {
    section::get_section_webp(data, Section::new(x, y, width, height)).map_err(js_error)
}

/// Hidden pixels of a watermarked image and where they belong.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct ReplacementImage {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    image: Vec<u8>,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl ReplacementImage {
    /// Encoded section, in the carrier's format.
    #[wasm_bindgen(getter)]
    pub fn image(&self) -> Vec<u8> {
        self.image.clone()
    }
}

#[cfg(target_arch = "wasm32")]
fn replacement(data: &[u8], key: &[u8], kind: ImageKind) -> Result<ReplacementImage, JsValue> {
    let key = EncryptionKey::try_from(key).map_err(js_error)?;
    let section = embed::extract(data, kind, &key).map_err(js_error)?;
    Ok(ReplacementImage {
        x: section.position.x,
        y: section.position.y,
        width: section.dimension.width,
        height: section.dimension.height,
        image: section.image,
    })
}

/// Decrypt the section hidden in a watermarked JPEG.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_replacement_jpeg(data: &[u8], key: &[u8]) -> Result<ReplacementImage, JsValue> {
    replacement(data, key, ImageKind::Jpeg)
}

/// Decrypt the section hidden in a watermarked WebP.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_replacement_webp(data: &[u8], key: &[u8]) -> Result<ReplacementImage, JsValue> {
    replacement(data, key, ImageKind::WebP)
}

/// Watermark task for JavaScript callers.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct WasmWatermarkTask {
    inner: WatermarkTask,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl WasmWatermarkTask {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: WatermarkTask::new(),
        }
    }

    /// Origins: 0 for Left/Top, anything else for Right/Bottom.
    pub fn set_position(&mut self, x: u32, y: u32, origin_x: u8, origin_y: u8) {
        self.inner
            .set_position(x, y, OriginX::from(origin_x), OriginY::from(origin_y));
    }

    pub fn set_target_jpeg(&mut self, data: &[u8]) -> Result<(), JsValue> {
        self.inner.load_target(data, ImageKind::Jpeg).map_err(js_error)
    }

    pub fn set_target_webp(&mut self, data: &[u8]) -> Result<(), JsValue> {
        self.inner.load_target(data, ImageKind::WebP).map_err(js_error)
    }

    pub fn set_watermark_jpeg(&mut self, data: &[u8]) -> Result<(), JsValue> {
        self.inner.load_watermark(data, ImageKind::Jpeg).map_err(js_error)
    }

    pub fn set_watermark_webp(&mut self, data: &[u8]) -> Result<(), JsValue> {
        self.inner.load_watermark(data, ImageKind::WebP).map_err(js_error)
    }

    pub fn set_key(&mut self, key: &[u8]) -> Result<(), JsValue> {
        self.inner.invalidate();
        let key = EncryptionKey::try_from(key).map_err(js_error)?;
        self.inner.set_key(key);
        Ok(())
    }

    pub fn process(&mut self) -> Result<(), JsValue> {
        self.inner.process().map_err(js_error)
    }

    pub fn output_jpeg(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.render(ImageKind::Jpeg).map_err(js_error)
    }

    pub fn output_webp(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.render(ImageKind::WebP).map_err(js_error)
    }

    pub fn old_section_jpeg(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.render_old_section(ImageKind::Jpeg).map_err(js_error)
    }

    pub fn old_section_webp(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.render_old_section(ImageKind::WebP).map_err(js_error)
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for WasmWatermarkTask {
    fn default() -> Self {
        Self::new()
    }
}

/// Restore the original pixels of a watermarked JPEG.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn restore_jpeg(data: &[u8], key: &[u8]) -> Result<Vec<u8>, JsValue> {
    let key = EncryptionKey::try_from(key).map_err(js_error)?;
    embed::restore_jpeg(data, &key).map_err(js_error)
}

/// Restore the original pixels of a watermarked WebP.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn restore_webp(data: &[u8], key: &[u8]) -> Result<Vec<u8>, JsValue> {
    let key = EncryptionKey::try_from(key).map_err(js_error)?;
    embed::restore_webp(data, &key).map_err(js_error)
}
