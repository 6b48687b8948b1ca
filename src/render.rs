use crate::config::RenderConfig;
use crate::ir::{ElementKind, EventKind, GatewayKind};
use crate::layout::{Bounds, Layout, NodeLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

const LINE_HEIGHT: f32 = 1.25;
/// Rough glyph width as a fraction of the font size.
const CHAR_WIDTH_RATIO: f32 = 0.6;
const ACTIVITY_RADIUS: f32 = 8.0;
const END_EVENT_STROKE: f32 = 3.0;

/// Draws a computed layout as a standalone SVG document.
pub fn render_svg(layout: &Layout, theme: &Theme, config: &RenderConfig) -> String {
    let extent = layout.extent();
    let margin = config.margin.max(0.0);
    let width = (extent.width + margin * 2.0).max(1.0);
    let height = (extent.height + margin * 2.0).max(1.0);
    let dx = margin - extent.x;
    let dy = margin - extent.y;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");
    svg.push_str(&format!("<g transform=\"translate({dx:.2} {dy:.2})\">"));

    render_swimlanes(&mut svg, layout, theme);

    for edge in &layout.edges {
        let dash = if edge.backward { " stroke-dasharray=\"6 4\"" } else { "" };
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"{dash} marker-end=\"url(#arrow)\"/>",
            points_to_path(&edge.points),
            theme.line_color,
        ));
    }

    for node in &layout.nodes {
        render_node(&mut svg, node, theme);
    }

    svg.push_str("</g></svg>");
    svg
}

fn render_swimlanes(svg: &mut String, layout: &Layout, theme: &Theme) {
    for pool in &layout.pools {
        let b = &pool.bounds;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.6\"/>",
            b.x, b.y, b.width, b.height, theme.pool_border
        ));
        // Header strip between the pool edge and its first lane.
        let strip = layout
            .lanes
            .iter()
            .filter(|lane| lane.pool == pool.id)
            .map(|lane| lane.bounds.x - b.x)
            .fold(f32::INFINITY, f32::min);
        if strip.is_finite() && strip > 0.0 {
            let cx = b.x + strip / 2.0;
            let cy = b.y + b.height / 2.0;
            svg.push_str(&format!(
                "<text x=\"{cx:.2}\" y=\"{cy:.2}\" transform=\"rotate(-90 {cx:.2} {cy:.2})\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                theme.font_family,
                (theme.font_size * 0.8).min(strip),
                theme.text_color,
                escape_xml(&pool.label)
            ));
        }
    }
    for lane in &layout.lanes {
        let b = &lane.bounds;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"0.5\" stroke=\"{}\" stroke-width=\"1\"/>",
            b.x, b.y, b.width, b.height, theme.lane_fill, theme.pool_border
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            b.x + 4.0,
            b.y + theme.font_size,
            theme.font_family,
            theme.font_size * 0.8,
            theme.text_color,
            escape_xml(&lane.label)
        ));
    }
}

fn render_node(svg: &mut String, node: &NodeLayout, theme: &Theme) {
    let b = &node.bounds;
    let (cx, cy) = b.center();
    let fill = theme.fill_for(node.kind);
    match node.kind {
        ElementKind::Event(kind) => {
            let r = b.width.min(b.height) / 2.0;
            let stroke_width = if kind == EventKind::End { END_EVENT_STROKE } else { 1.5 };
            svg.push_str(&format!(
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"{stroke_width}\"/>",
                theme.stroke_color
            ));
            if kind == EventKind::Intermediate {
                svg.push_str(&format!(
                    "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
                    (r - 3.0).max(1.0),
                    theme.stroke_color
                ));
            }
            caption_below(svg, b, &node.label, theme);
        }
        ElementKind::Activity => {
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{ACTIVITY_RADIUS}\" ry=\"{ACTIVITY_RADIUS}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                b.x, b.y, b.width, b.height, theme.stroke_color
            ));
            let max_chars = (b.width / (theme.font_size * CHAR_WIDTH_RATIO)).floor().max(1.0) as usize;
            let lines = wrap_label(&node.label, max_chars);
            svg.push_str(&text_lines(cx, cy, &lines, theme));
        }
        ElementKind::Gateway(kind) => {
            svg.push_str(&format!(
                "<polygon points=\"{cx:.2},{:.2} {:.2},{cy:.2} {cx:.2},{:.2} {:.2},{cy:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                b.y,
                b.right(),
                b.bottom(),
                b.x,
                theme.stroke_color
            ));
            gateway_marker(svg, kind, b, theme);
            caption_below(svg, b, &node.label, theme);
        }
    }
}

fn gateway_marker(svg: &mut String, kind: GatewayKind, b: &Bounds, theme: &Theme) {
    let (cx, cy) = b.center();
    let s = b.width.min(b.height) / 5.0;
    let stroke = &theme.stroke_color;
    match kind {
        GatewayKind::Exclusive => {
            let _ = write!(
                svg,
                "<path d=\"M {:.2} {:.2} L {:.2} {:.2} M {:.2} {:.2} L {:.2} {:.2}\" stroke=\"{stroke}\" stroke-width=\"3\"/>",
                cx - s, cy - s, cx + s, cy + s, cx + s, cy - s, cx - s, cy + s
            );
        }
        GatewayKind::Inclusive => {
            let _ = write!(
                svg,
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"2.5\"/>",
                s * 1.2
            );
        }
        GatewayKind::Parallel => {
            let _ = write!(
                svg,
                "<path d=\"M {:.2} {cy:.2} L {:.2} {cy:.2} M {cx:.2} {:.2} L {cx:.2} {:.2}\" stroke=\"{stroke}\" stroke-width=\"3\"/>",
                cx - s * 1.4,
                cx + s * 1.4,
                cy - s * 1.4,
                cy + s * 1.4
            );
        }
    }
}

fn caption_below(svg: &mut String, b: &Bounds, label: &str, theme: &Theme) {
    let (cx, _) = b.center();
    svg.push_str(&format!(
        "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        b.bottom() + theme.font_size,
        theme.font_family,
        theme.font_size * 0.9,
        theme.text_color,
        escape_xml(label)
    ));
}

fn text_lines(x: f32, y: f32, lines: &[String], theme: &Theme) -> String {
    let step = theme.font_size * LINE_HEIGHT;
    let total = lines.len() as f32 * step;
    let start_y = y - total / 2.0 + theme.font_size;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        theme.font_family, theme.font_size, theme.text_color
    );
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { step };
        let _ = write!(text, "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>", escape_xml(line));
    }
    text.push_str("</text>");
    text
}

/// Greedy word wrap; words longer than a line stay whole.
fn wrap_label(label: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in label.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in &points[1..] {
        let _ = write!(d, " L {:.2} {:.2}", point.0, point.1);
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid canvas size"))?;
    opt.font_family = "Helvetica".to_string();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
