//! `<image>` elements.
//!
//! The element carries its reference and raw bytes; pixel decoding belongs
//! to the raster crate so this one stays free of codec dependencies. Inline
//! `data:` URLs are decoded from base64 at load time.

use base64::Engine;

use kerf_geom::{point, Box2D, Matrix};

use crate::shapes::ShapeAttributes;
use crate::viewbox::Viewbox;

/// `<image>` with its reference, optional raw bytes and layout box.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SvgImage {
    /// The `href` as written in the document.
    pub url: String,
    /// Raw encoded bytes, when the reference was inline or already fetched.
    pub data: Option<Vec<u8>>,
    pub x: f64,
    pub y: f64,
    /// Layout width in user units; zero when unspecified.
    pub width: f64,
    /// Layout height in user units; zero when unspecified.
    pub height: f64,
    /// Intrinsic pixel size, filled in once the image has been decoded.
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub viewbox: Option<Viewbox>,
    pub attributes: ShapeAttributes,
}

impl SvgImage {
    pub fn new(url: impl Into<String>) -> SvgImage {
        SvgImage {
            url: url.into(),
            ..SvgImage::default()
        }
    }

    /// Decodes an inline `data:*;base64,` URL into `data`. Anything else is
    /// left for the caller's loader.
    pub fn load_inline_data(&mut self) {
        if self.data.is_some() {
            return;
        }
        let url = self.url.as_str();
        if !url.starts_with("data:") {
            return;
        }
        if let Some(index) = url.find(";base64,") {
            let encoded = &url[index + ";base64,".len()..];
            match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
                Ok(bytes) => self.data = Some(bytes),
                Err(err) => log::warn!("undecodable data url in image: {}", err),
            }
        }
    }

    /// Records the intrinsic pixel size and defaults the layout box from it.
    pub fn set_intrinsic_size(&mut self, width: u32, height: u32) {
        self.image_width = Some(width);
        self.image_height = Some(height);
        if self.width == 0.0 {
            self.width = width as f64;
        }
        if self.height == 0.0 {
            self.height = height as f64;
        }
    }

    /// The viewbox-style transform mapping intrinsic pixels onto the layout
    /// box, composed into the element transform.
    pub fn render(&mut self) {
        let (iw, ih) = match (self.image_width, self.image_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w as f64, h as f64),
            _ => return,
        };
        if self.width == 0.0 || self.height == 0.0 {
            return;
        }
        let fit = Matrix::translate(self.x, self.y)
            * Matrix::scale(self.width / iw, self.height / ih);
        self.attributes.transform.pre_cat(&fit);
        self.x = 0.0;
        self.y = 0.0;
    }

    pub fn bounding_box(&self) -> Box2D {
        let m = self.attributes.transform;
        let (w, h) = match (self.image_width, self.image_height) {
            (Some(iw), Some(ih)) => (iw as f64, ih as f64),
            _ => (self.width, self.height),
        };
        let corners = [
            m.transform_point(point(self.x, self.y)),
            m.transform_point(point(self.x + w, self.y)),
            m.transform_point(point(self.x, self.y + h)),
            m.transform_point(point(self.x + w, self.y + h)),
        ];
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        Box2D { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_data_decodes() {
        let mut img = SvgImage::new("data:image/png;base64,AAEC");
        img.load_inline_data();
        assert_eq!(img.data.as_deref(), Some(&[0u8, 1, 2][..]));
    }

    #[test]
    fn remote_url_is_left_alone() {
        let mut img = SvgImage::new("textures/wood.png");
        img.load_inline_data();
        assert!(img.data.is_none());
    }

    #[test]
    fn render_maps_pixels_to_layout_box() {
        let mut img = SvgImage::new("x");
        img.x = 10.0;
        img.y = 20.0;
        img.width = 50.0;
        img.height = 25.0;
        img.set_intrinsic_size(100, 100);
        img.render();
        let m = img.attributes.transform;
        assert_eq!(m.transform_point(point(0.0, 0.0)), point(10.0, 20.0));
        assert_eq!(m.transform_point(point(100.0, 100.0)), point(60.0, 45.0));
    }

    #[test]
    fn intrinsic_size_defaults_layout() {
        let mut img = SvgImage::new("x");
        img.set_intrinsic_size(32, 64);
        assert_eq!(img.width, 32.0);
        assert_eq!(img.height, 64.0);
    }
}
