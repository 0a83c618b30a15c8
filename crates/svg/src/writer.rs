//! SVG document writing.
//!
//! Emits a physically sized document: width and height in millimeters with a
//! mil-unit viewBox, so one user unit is a thousandth of an inch — the
//! device-native grid. Each core element becomes one `<path>`, `<text>` or
//! `<image>` carrying `d`, `stroke` and `fill`; richer text and image
//! attributes are not round-tripped.

use kerf_geom::{format_number, Color};

use crate::reader::Element;
use crate::shapes::Shape;

// Matches the length algebra's mm/inch constant so a written document read
// back at 1000 ppi maps exactly 1:1.
const MILS_PER_MM: f64 = 39.3701;

/// Serializes elements into an SVG document of the given physical size.
pub fn write_svg(width_mm: f64, height_mm: f64, elements: &[Element]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" \
         width=\"{}mm\" height=\"{}mm\" viewBox=\"0 0 {} {}\">\n",
        format_number(width_mm),
        format_number(height_mm),
        format_number(width_mm * MILS_PER_MM),
        format_number(height_mm * MILS_PER_MM),
    ));

    for element in elements {
        match element {
            Element::Path(path) => {
                push_path(&mut out, &path.to_svg_d(false), path.stroke, path.fill, path.id.as_deref());
            }
            Element::Rect(s) => push_shape(&mut out, s),
            Element::Circle(s) => push_shape(&mut out, s),
            Element::Ellipse(s) => push_shape(&mut out, s),
            Element::SimpleLine(s) => push_shape(&mut out, s),
            Element::Polyline(s) => push_shape(&mut out, s),
            Element::Polygon(s) => push_shape(&mut out, s),
            Element::Text(text) => {
                out.push_str(&format!(
                    "  <text x=\"{}\" y=\"{}\" stroke=\"{}\" fill=\"{}\">{}</text>\n",
                    format_number(text.x),
                    format_number(text.y),
                    paint(text.attributes.stroke),
                    paint(text.attributes.fill),
                    escape(&text.text),
                ));
            }
            Element::Image(image) => {
                out.push_str(&format!(
                    "  <image href=\"{}\" stroke=\"{}\" fill=\"{}\"/>\n",
                    escape(&image.url),
                    paint(image.attributes.stroke),
                    paint(image.attributes.fill),
                ));
            }
            Element::Viewport(_) | Element::Desc(_) => {}
        }
    }

    out.push_str("</svg>\n");
    out
}

fn push_shape<S: Shape>(out: &mut String, shape: &S) {
    let path = shape.path();
    push_path(
        out,
        &path.to_svg_d(false),
        path.stroke,
        path.fill,
        path.id.as_deref(),
    );
}

fn push_path(out: &mut String, d: &str, stroke: Option<Color>, fill: Option<Color>, id: Option<&str>) {
    out.push_str("  <path ");
    if let Some(id) = id {
        out.push_str(&format!("id=\"{}\" ", escape(id)));
    }
    out.push_str(&format!(
        "d=\"{}\" stroke=\"{}\" fill=\"{}\"/>\n",
        d,
        paint(stroke),
        paint(fill),
    ));
}

fn paint(color: Option<Color>) -> String {
    match color {
        Some(c) => format!("{}", c),
        None => "none".to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{Document, ParseOptions};

    #[test]
    fn header_carries_physical_size() {
        let out = write_svg(310.0, 210.0, &[]);
        assert!(out.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\""));
        assert!(out.contains("width=\"310mm\""));
        assert!(out.contains("height=\"210mm\""));
        let expected = format!(
            "viewBox=\"0 0 {} {}\"",
            format_number(310.0 * MILS_PER_MM),
            format_number(210.0 * MILS_PER_MM)
        );
        assert!(out.contains(&expected), "{}", out);
    }

    #[test]
    fn round_trips_through_reader() {
        let mut path = kerf_path::Path::parse("M 0,0 L 10,0 L 10,10 Z").unwrap();
        path.stroke = Color::parse("red").unwrap();
        path.id = Some("cut-1".to_string());
        let out = write_svg(100.0, 100.0, &[Element::Path(path.clone())]);

        // Reading at 1000 ppi makes one user unit one mil, so the mil-sized
        // viewBox maps 1:1 and the geometry round-trips unchanged.
        let options = ParseOptions {
            ppi: 1000.0,
            ..ParseOptions::default()
        };
        let doc = Document::parse(&out, &options).unwrap();
        let read_back = doc
            .elements()
            .find_map(|e| match e {
                Element::Path(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        assert!(read_back.approx_eq(&path));
        assert_eq!(read_back.stroke, Color::parse("red").unwrap());
        assert_eq!(read_back.id.as_deref(), Some("cut-1"));
    }

    #[test]
    fn text_content_is_escaped() {
        let mut text = crate::text::SvgText::new("a < b & c");
        text.x = 5.0;
        let out = write_svg(10.0, 10.0, &[Element::Text(text)]);
        assert!(out.contains("a &lt; b &amp; c"));
    }
}
