use image::{ImageFormat, RgbImage};
use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;

use crate::error::{Result, SegmentError};
use crate::loader::decode;
use crate::quantize::{QuantizeOptions, quantize_with};

/// Split an encoded image into `k` color clusters for a browser front end.
///
/// Returns an object with:
/// - `original`: the decoded source re-encoded as PNG,
/// - `clusters`: one PNG per cluster, masked to that cluster's pixels,
/// - `palette`: `RRGGBB` hex strings in cluster order,
/// - `iterations` and `converged` from the k-means run.
#[wasm_bindgen]
pub fn segment(input: Vec<u8>, k: usize, seed: Option<u64>) -> std::result::Result<Object, JsValue> {
    let to_js = |e: SegmentError| JsValue::from_str(&e.to_string());

    // ----------------------
    // 1. Decode and cluster
    // ----------------------
    let img = decode(&input).map_err(to_js)?;
    let mut options = QuantizeOptions::new();
    if let Some(seed) = seed {
        options = options.seed(seed);
    }
    let result = quantize_with(img, k, &options).map_err(to_js)?;

    // ----------------------
    // 2. PNG encode
    // ----------------------
    let original_js = Uint8Array::from(encode_png(result.original()).map_err(to_js)?.as_slice());
    let clusters_js = Array::new();
    for cluster in result.clusters() {
        let png = encode_png(cluster).map_err(to_js)?;
        clusters_js.push(&Uint8Array::from(png.as_slice()));
    }

    let palette_js = Array::new();
    for hex in result.palette_hex() {
        palette_js.push(&JsValue::from_str(&hex));
    }

    let out = Object::new();
    Reflect::set(&out, &JsValue::from_str("original"), &original_js)?;
    Reflect::set(&out, &JsValue::from_str("clusters"), &clusters_js)?;
    Reflect::set(&out, &JsValue::from_str("palette"), &palette_js)?;
    Reflect::set(&out, &JsValue::from_str("iterations"), &JsValue::from_f64(result.iterations() as f64))?;
    Reflect::set(&out, &JsValue::from_str("converged"), &JsValue::from_bool(result.converged()))?;

    Ok(out)
}

/// Encode an RGB image as PNG bytes.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(SegmentError::Encode)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    #[test]
    fn png_encoding_survives_decode() {
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 60, y as u8 * 80, 5]));
        let png = encode_png(&img).unwrap();
        assert_eq!(decode(&png).unwrap(), img);
    }
}
