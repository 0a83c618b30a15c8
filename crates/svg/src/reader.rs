//! Streaming SVG document reading.
//!
//! The walker descends the element tree carrying a stack of inherited
//! state — attribute strings, the composed transform, the viewport
//! dimensions — and yields resolved elements as their subtrees complete, so
//! a consumer can stream them into a scene without ever seeing raw XML.
//!
//! Recovery follows SVG's permissive intent: an unparsable attribute falls
//! back to its inherited or zero value with a warning, an element whose
//! mandatory geometry will not parse is skipped with a warning, and unknown
//! tags scope their children silently.

use std::collections::HashMap;
use std::path::Path as FsPath;

use log::{debug, warn};
use thiserror::Error;

use kerf_geom::{Color, Length, Matrix, RenderContext};
use kerf_path::Path;

use crate::image::SvgImage;
use crate::shapes::{
    parse_points, Circle, Ellipse, Polygon, Polyline, Rect, Shape, ShapeAttributes,
    SimpleLine,
};
use crate::text::{SvgDesc, SvgText};
use crate::viewbox::Viewport;

#[derive(Error, Debug)]
pub enum SvgError {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Options controlling attribute resolution during the walk.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Pixels per inch for physical units.
    pub ppi: f64,
    /// Physical width the outermost percentage lengths resolve against.
    pub width: f64,
    /// Physical height the outermost percentage lengths resolve against.
    pub height: f64,
    /// Default paint, also the initial `currentColor`.
    pub color: String,
    /// Extra transform applied outside the root viewport.
    pub transform: Option<Matrix>,
    /// Fold each element's accumulated transform into its coordinates.
    pub reify: bool,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            ppi: kerf_geom::length::DEFAULT_PPI,
            width: 1.0,
            height: 1.0,
            color: "black".to_string(),
            transform: None,
            reify: true,
        }
    }
}

/// One resolved element of the document, in document order.
#[derive(Clone, Debug)]
pub enum Element {
    Viewport(Viewport),
    Path(Path),
    Rect(Rect),
    Circle(Circle),
    Ellipse(Ellipse),
    SimpleLine(SimpleLine),
    Polyline(Polyline),
    Polygon(Polygon),
    Image(SvgImage),
    Text(SvgText),
    Desc(SvgDesc),
}

/// A parsed SVG document, its elements resolved and in document order.
#[derive(Clone, Debug, Default)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Document, SvgError> {
        let xml = roxmltree::Document::parse(text)?;
        let mut elements = Vec::new();

        let mut attrs: HashMap<String, String> = HashMap::new();
        attrs.insert("color".into(), options.color.clone());
        attrs.insert("fill".into(), options.color.clone());
        attrs.insert("stroke".into(), options.color.clone());

        let state = Inherited {
            attrs,
            transform: options.transform.unwrap_or_else(Matrix::identity),
            viewport: (options.width, options.height),
        };

        walk(xml.root_element(), &state, options, &mut elements);
        Ok(Document { elements })
    }

    pub fn from_file(path: impl AsRef<FsPath>, options: &ParseOptions) -> Result<Document, SvgError> {
        let text = std::fs::read_to_string(path)?;
        Document::parse(&text, options)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Clone)]
struct Inherited {
    /// Textually inherited attributes; style-relevant keys mostly.
    attrs: HashMap<String, String>,
    /// Composition of all ancestor transforms, synthesized viewbox
    /// transforms included.
    transform: Matrix,
    /// Current viewport dimensions, for percentage resolution.
    viewport: (f64, f64),
}

fn walk(
    node: roxmltree::Node,
    inherited: &Inherited,
    options: &ParseOptions,
    sink: &mut Vec<Element>,
) {
    if !node.is_element() {
        return;
    }
    let tag = node.tag_name().name();

    match tag {
        "use" | "defs" | "switch" | "title" | "metadata" | "foreignObject" => {
            return;
        }
        _ => {}
    }

    let state = push_state(node, inherited, options);

    match tag {
        "svg" => {
            let viewport = Viewport::from_attributes(
                node.attribute("x"),
                node.attribute("y"),
                node.attribute("width"),
                node.attribute("height"),
                node.attribute("viewBox"),
                node.attribute("preserveAspectRatio"),
                state.viewport,
                &context(&state, options),
            );
            sink.push(Element::Viewport(viewport));

            let mut inner = state.clone();
            inner.transform.pre_cat(&viewport.transform());
            if let Some(vb) = viewport.viewbox {
                inner.viewport = (vb.width, vb.height);
            } else {
                inner.viewport = (viewport.element_width, viewport.element_height);
            }
            for child in node.children() {
                walk(child, &inner, options, sink);
            }
            return;
        }
        "g" => {
            // Groups only scope their attributes.
        }
        "path" => {
            if let Some(element) = read_path(node, &state, options) {
                sink.push(Element::Path(element));
            }
        }
        "rect" => {
            let mut rect = read_rect(node, &state, options);
            if options.reify {
                rect.reify();
            }
            sink.push(Element::Rect(rect));
        }
        "circle" => {
            let mut circle = read_circle(node, &state, options);
            if options.reify {
                circle.reify();
            }
            sink.push(Element::Circle(circle));
        }
        "ellipse" => {
            let mut ellipse = read_ellipse(node, &state, options);
            if options.reify {
                ellipse.reify();
            }
            sink.push(Element::Ellipse(ellipse));
        }
        "line" => {
            let mut line = read_line(node, &state, options);
            if options.reify {
                line.reify();
            }
            sink.push(Element::SimpleLine(line));
        }
        "polyline" | "polygon" => {
            let points = parse_points(node.attribute("points").unwrap_or(""));
            if points.is_empty() {
                warn!("{} without points skipped", tag);
            } else if tag == "polyline" {
                let mut shape = Polyline::new(points);
                shape.attributes = shape_attributes(node, &state);
                if options.reify {
                    shape.reify();
                }
                sink.push(Element::Polyline(shape));
            } else {
                let mut shape = Polygon::new(points);
                shape.attributes = shape_attributes(node, &state);
                if options.reify {
                    shape.reify();
                }
                sink.push(Element::Polygon(shape));
            }
        }
        "image" => {
            if let Some(image) = read_image(node, &state, options) {
                sink.push(Element::Image(image));
            }
        }
        "text" => {
            // Text is resolved on element end, once the content is known.
            sink.push(Element::Text(read_text(node, &state, options)));
            return;
        }
        "desc" => {
            sink.push(Element::Desc(SvgDesc {
                desc: node.text().unwrap_or("").to_string(),
            }));
            return;
        }
        other => {
            debug!("unknown element <{}> scoped, not rendered", other);
        }
    }

    for child in node.children() {
        walk(child, &state, options, sink);
    }
}

/// Pushes one element's attributes onto the inherited state: style
/// splitting, currentColor substitution, transform composition, and the
/// removal of non-inheriting attributes.
fn push_state(node: roxmltree::Node, inherited: &Inherited, options: &ParseOptions) -> Inherited {
    let mut state = inherited.clone();
    state.attrs.remove("viewBox");
    state.attrs.remove("preserveAspectRatio");
    state.attrs.remove("id");

    // Local attributes override inherited ones.
    let mut local: HashMap<String, String> = HashMap::new();
    for attribute in node.attributes() {
        local.insert(attribute.name().to_string(), attribute.value().to_string());
    }
    // Inline style entries override presentation attributes of the same name.
    if let Some(style) = node.attribute("style") {
        for entry in style.split(';') {
            let mut kv = entry.splitn(2, ':');
            if let (Some(k), Some(v)) = (kv.next(), kv.next()) {
                local.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }

    for key in ["fill", "stroke"] {
        if local.get(key).map(|v| v.as_str()) == Some("currentColor") {
            let replacement = local
                .get("color")
                .or_else(|| state.attrs.get("color"))
                .cloned()
                .unwrap_or_else(|| options.color.clone());
            local.insert(key.to_string(), replacement);
        }
    }

    if let Some(transform) = local.remove("transform") {
        match Matrix::parse(&transform, &context(&state, options)) {
            Ok(m) => state.transform.pre_cat(&m),
            Err(err) => warn!("unparsable transform ignored: {}", err),
        }
    }

    state.attrs.extend(local);
    state
}

fn context(state: &Inherited, options: &ParseOptions) -> RenderContext {
    RenderContext {
        ppi: Some(options.ppi),
        relative_length: None,
        font_size: state
            .attrs
            .get("font-size")
            .and_then(|s| Length::parse(s).ok())
            .and_then(|l| l.resolve(&RenderContext::with_default_ppi()).ok())
            .or(Some(16.0)),
        font_height: None,
        viewbox: Some(state.viewport),
    }
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
    /// SVG's normalized diagonal, for radii and other non-directional
    /// percentages.
    Diagonal,
}

fn resolve_length(
    node: roxmltree::Node,
    state: &Inherited,
    options: &ParseOptions,
    name: &str,
    axis: Axis,
    default: f64,
) -> f64 {
    let raw = match node.attribute(name) {
        Some(raw) => raw,
        None => return default,
    };
    let base = match axis {
        Axis::X => state.viewport.0,
        Axis::Y => state.viewport.1,
        Axis::Diagonal => {
            let (w, h) = state.viewport;
            ((w * w + h * h) / 2.0).sqrt()
        }
    };
    let ctx = context(state, options).with_relative(base);
    match Length::parse(raw).map(|l| l.resolve(&ctx)) {
        Ok(Ok(value)) => value,
        _ => {
            warn!("attribute {}={:?} defaulted to {}", name, raw, default);
            default
        }
    }
}

fn shape_attributes(node: roxmltree::Node, state: &Inherited) -> ShapeAttributes {
    let paint = |key: &str| -> Option<Color> {
        let raw = state.attrs.get(key)?;
        match Color::parse(raw) {
            Ok(color) => color,
            Err(err) => {
                warn!("unparsable {}: {}", key, err);
                None
            }
        }
    };
    ShapeAttributes {
        transform: state.transform,
        stroke: paint("stroke"),
        fill: paint("fill"),
        id: node.attribute("id").map(|s| s.to_string()),
    }
}

fn read_path(node: roxmltree::Node, state: &Inherited, options: &ParseOptions) -> Option<Path> {
    let d = node.attribute("d")?;
    let mut path = match Path::parse(d) {
        Ok(path) => path,
        Err(err) => {
            warn!("path skipped: {}", err);
            return None;
        }
    };
    let attrs = shape_attributes(node, state);
    path.transform = attrs.transform;
    path.stroke = attrs.stroke;
    path.fill = attrs.fill;
    path.id = attrs.id;
    if options.reify {
        path.reify();
    }
    Some(path)
}

fn read_rect(node: roxmltree::Node, state: &Inherited, options: &ParseOptions) -> Rect {
    let mut rect = Rect::new(
        resolve_length(node, state, options, "x", Axis::X, 0.0),
        resolve_length(node, state, options, "y", Axis::Y, 0.0),
        resolve_length(node, state, options, "width", Axis::X, 0.0),
        resolve_length(node, state, options, "height", Axis::Y, 0.0),
    );
    let radius = |name: &str, axis: Axis| -> Option<f64> {
        node.attribute(name)
            .map(|_| resolve_length(node, state, options, name, axis, 0.0))
    };
    rect = rect.with_radii(radius("rx", Axis::X), radius("ry", Axis::Y));
    rect.attributes = shape_attributes(node, state);
    rect
}

fn read_circle(node: roxmltree::Node, state: &Inherited, options: &ParseOptions) -> Circle {
    let mut circle = Circle::new(
        resolve_length(node, state, options, "cx", Axis::X, 0.0),
        resolve_length(node, state, options, "cy", Axis::Y, 0.0),
        resolve_length(node, state, options, "r", Axis::Diagonal, 0.0),
    );
    circle.attributes = shape_attributes(node, state);
    circle
}

fn read_ellipse(node: roxmltree::Node, state: &Inherited, options: &ParseOptions) -> Ellipse {
    let mut ellipse = Ellipse::new(
        resolve_length(node, state, options, "cx", Axis::X, 0.0),
        resolve_length(node, state, options, "cy", Axis::Y, 0.0),
        resolve_length(node, state, options, "rx", Axis::X, 0.0),
        resolve_length(node, state, options, "ry", Axis::Y, 0.0),
    );
    ellipse.attributes = shape_attributes(node, state);
    ellipse
}

fn read_line(node: roxmltree::Node, state: &Inherited, options: &ParseOptions) -> SimpleLine {
    let mut line = SimpleLine::new(
        resolve_length(node, state, options, "x1", Axis::X, 0.0),
        resolve_length(node, state, options, "y1", Axis::Y, 0.0),
        resolve_length(node, state, options, "x2", Axis::X, 0.0),
        resolve_length(node, state, options, "y2", Axis::Y, 0.0),
    );
    line.attributes = shape_attributes(node, state);
    line
}

fn read_image(
    node: roxmltree::Node,
    state: &Inherited,
    options: &ParseOptions,
) -> Option<SvgImage> {
    let href = node
        .attribute("href")
        .or_else(|| node.attribute(("http://www.w3.org/1999/xlink", "href")))?;
    let mut image = SvgImage::new(href);
    image.x = resolve_length(node, state, options, "x", Axis::X, 0.0);
    image.y = resolve_length(node, state, options, "y", Axis::Y, 0.0);
    image.width = resolve_length(node, state, options, "width", Axis::X, 0.0);
    image.height = resolve_length(node, state, options, "height", Axis::Y, 0.0);
    image.attributes = shape_attributes(node, state);
    image.load_inline_data();
    Some(image)
}

fn read_text(node: roxmltree::Node, state: &Inherited, options: &ParseOptions) -> SvgText {
    let content: String = node
        .descendants()
        .filter_map(|n| n.text())
        .collect::<Vec<_>>()
        .join("");
    let mut text = SvgText::new(content.trim());
    text.x = resolve_length(node, state, options, "x", Axis::X, 0.0);
    text.y = resolve_length(node, state, options, "y", Axis::Y, 0.0);
    text.dx = resolve_length(node, state, options, "dx", Axis::X, 0.0);
    text.dy = resolve_length(node, state, options, "dy", Axis::Y, 0.0);
    text.font_size = context(state, options).font_size.unwrap_or(16.0);
    text.attributes = shape_attributes(node, state);
    if options.reify {
        text.reify();
    }
    text
}
