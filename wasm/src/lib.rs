use bpmn_layout::layout_dump::layout_json;
use bpmn_layout::{Config, Theme, layout_source, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOptions {
    theme: Option<String>,
    refine_routes: Option<bool>,
    cell_padding: Option<f32>,
}

fn build_config(options: LayoutOptions) -> Config {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("classic") {
        config.theme = Theme::classic();
        config.render.background = config.theme.background.clone();
    }
    if let Some(refine) = options.refine_routes {
        config.layout.refine_routes = refine;
    }
    if let Some(padding) = options.cell_padding {
        config.layout.cell_padding = padding.max(0.0);
    }
    config
}

fn parse_options(options_json: Option<String>) -> Result<LayoutOptions, JsValue> {
    match options_json {
        Some(raw) => serde_json::from_str::<LayoutOptions>(&raw)
            .map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(LayoutOptions::default()),
    }
}

#[wasm_bindgen]
pub fn layout_bpmn_svg(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = build_config(parse_options(options_json)?);
    render_with_options(input, &config).map_err(|error| JsValue::from_str(&format!("{error:#}")))
}

#[wasm_bindgen]
pub fn layout_bpmn_json(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = build_config(parse_options(options_json)?);
    layout_source(input, &config.layout)
        .and_then(|layout| layout_json(&layout))
        .map_err(|error| JsValue::from_str(&format!("{error:#}")))
}
