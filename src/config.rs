use crate::theme::Theme;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Node sizes, spacing and routing options.
///
/// Edges are routed on the whole-cell mesh first. The quarter-cell mesh only
/// replaces a whole-cell route with fewer corners when
/// [`refine_routes`](Self::refine_routes) is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Space on each side of a node inside its grid slot.
    pub cell_padding: f32,
    /// Width of the header strip on the left of a pool.
    pub lane_offset: f32,
    pub event_size: f32,
    pub gateway_size: f32,
    pub activity_width: f32,
    pub activity_height: f32,
    /// Also search the quarter-cell mesh after the whole-cell mesh found a
    /// path, and keep the quarter-cell route when it has strictly fewer
    /// corners. Off by default. The quarter-cell mesh is searched regardless
    /// whenever the whole-cell mesh finds no path.
    pub refine_routes: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_padding: 10.0,
            lane_offset: 10.0,
            event_size: 36.0,
            gateway_size: 50.0,
            activity_width: 100.0,
            activity_height: 60.0,
            refine_routes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            margin: 20.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::bpmn();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    line_color: Option<String>,
    stroke_color: Option<String>,
    start_event_fill: Option<String>,
    event_fill: Option<String>,
    end_event_fill: Option<String>,
    activity_fill: Option<String>,
    gateway_fill: Option<String>,
    lane_fill: Option<String>,
    pool_border: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    cell_padding: Option<f32>,
    lane_offset: Option<f32>,
    event_size: Option<f32>,
    gateway_size: Option<f32>,
    activity_width: Option<f32>,
    activity_height: Option<f32>,
    refine_routes: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    margin: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "classic" {
            config.theme = Theme::classic();
        } else if theme_name == "bpmn" || theme_name == "default" {
            config.theme = Theme::bpmn();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            theme.line_color = v;
        }
        if let Some(v) = vars.stroke_color {
            theme.stroke_color = v;
        }
        if let Some(v) = vars.start_event_fill {
            theme.start_event_fill = v;
        }
        if let Some(v) = vars.event_fill {
            theme.event_fill = v;
        }
        if let Some(v) = vars.end_event_fill {
            theme.end_event_fill = v;
        }
        if let Some(v) = vars.activity_fill {
            theme.activity_fill = v;
        }
        if let Some(v) = vars.gateway_fill {
            theme.gateway_fill = v;
        }
        if let Some(v) = vars.lane_fill {
            theme.lane_fill = v;
        }
        if let Some(v) = vars.pool_border {
            theme.pool_border = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.cell_padding {
            target.cell_padding = v.max(0.0);
        }
        if let Some(v) = layout.lane_offset {
            target.lane_offset = v.max(0.0);
        }
        if let Some(v) = layout.event_size {
            target.event_size = v;
        }
        if let Some(v) = layout.gateway_size {
            target.gateway_size = v;
        }
        if let Some(v) = layout.activity_width {
            target.activity_width = v;
        }
        if let Some(v) = layout.activity_height {
            target.activity_height = v;
        }
        if let Some(v) = layout.refine_routes {
            target.refine_routes = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.margin {
            config.render.margin = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}
