use diagram_layout::config::LayoutConfig;
use diagram_layout::ir::{Diagram, Orientation};
use diagram_layout::layout::{LayoutOptions, compute_layout};
use diagram_layout::layout_dump::LayoutDump;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsLayoutOptions {
    orientation: Option<String>,
    viewport_width: Option<f32>,
}

fn build_layout_options(options: JsLayoutOptions) -> Result<LayoutOptions, String> {
    let orientation = match options.orientation.as_deref() {
        None => Orientation::default(),
        Some(token) => Orientation::from_token(token)
            .ok_or_else(|| format!("unknown orientation `{token}`"))?,
    };
    Ok(LayoutOptions {
        orientation,
        viewport_width: options.viewport_width,
    })
}

fn layout_to_json(diagram_json: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<JsLayoutOptions>(raw).map_err(|error| error.to_string())?,
        None => JsLayoutOptions::default(),
    };
    let options = build_layout_options(options)?;
    let diagram = Diagram::from_json_str(diagram_json).map_err(|error| error.to_string())?;
    let layout = compute_layout(&diagram, &options, &LayoutConfig::default());
    serde_json::to_string(&LayoutDump::from_layout(&layout)).map_err(|error| error.to_string())
}

/// Lay out a diagram given as JSON and return the layout dump as JSON.
#[wasm_bindgen]
pub fn layout_diagram_json(diagram_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_to_json(diagram_json, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}
