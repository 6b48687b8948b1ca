#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig};
pub use ir::Diagram;
pub use layout::{Layout, LayoutError, compute_layout};
pub use parser::parse_diagram;
pub use render::render_svg;
pub use theme::Theme;

/// Parses a JSON5 process description and lays it out.
pub fn layout_source(input: &str, config: &LayoutConfig) -> anyhow::Result<Layout> {
    let diagram = parse_diagram(input)?;
    Ok(compute_layout(&diagram, config)?)
}

/// Parses, lays out and draws a JSON5 process description.
pub fn render_with_options(input: &str, options: &Config) -> anyhow::Result<String> {
    let layout = layout_source(input, &options.layout)?;
    Ok(render_svg(&layout, &options.theme, &options.render))
}
