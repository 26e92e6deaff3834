use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    pub icon_size: f32,
    /// Height reserved under an icon for its label.
    pub icon_label_height: f32,
    pub group_padding: f32,
    pub child_spacing: f32,
    pub empty_group_width: f32,
    pub empty_group_height: f32,
    pub composite_icon_size: f32,
    pub composite_spacing: f32,
    pub composite_padding: f32,
    pub composite_label_height: f32,
    pub text_char_width: f32,
    pub text_min_width: f32,
    pub text_padding_x: f32,
    pub text_height: f32,
    pub text_height_with_sublabel: f32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            icon_size: 48.0,
            icon_label_height: 80.0,
            group_padding: 40.0,
            child_spacing: 40.0,
            empty_group_width: 200.0,
            empty_group_height: 120.0,
            composite_icon_size: 32.0,
            composite_spacing: 8.0,
            composite_padding: 16.0,
            composite_label_height: 24.0,
            text_char_width: 8.0,
            text_min_width: 80.0,
            text_padding_x: 16.0,
            text_height: 40.0,
            text_height_with_sublabel: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoLayoutConfig {
    /// Offset of the first layer and of unanchored rows/columns.
    pub start_offset: f32,
    /// Gap between consecutive layers.
    pub layer_gap: f32,
    /// Gap between nodes that share a layer.
    pub node_gap: f32,
}

impl Default for AutoLayoutConfig {
    fn default() -> Self {
        Self {
            start_offset: 50.0,
            layer_gap: 120.0,
            node_gap: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub opposing_penalty: f32,
    pub straight_bonus_dominant: f32,
    pub straight_bonus_minor: f32,
    pub l_shape_bonus: f32,
    /// L-shapes only earn their bonus when both axis distances are within this.
    pub l_shape_max_distance: f32,
    pub corridor_penalty: f32,
    /// Window growth per additional connection, as a fraction of the side.
    pub spread_step: f32,
    /// Cap on the half-width of the distribution window.
    pub spread_max: f32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            opposing_penalty: 100.0,
            straight_bonus_dominant: 15.0,
            straight_bonus_minor: 5.0,
            l_shape_bonus: 10.0,
            l_shape_max_distance: 150.0,
            corridor_penalty: 500.0,
            spread_step: 0.15,
            spread_max: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Perpendicular offset under which opposite sides connect straight.
    pub straight_tolerance: f32,
    pub u_detour: f32,
    pub stub_length: f32,
    pub obstacle_margin: f32,
    pub lane_step: f32,
    pub max_lane_shifts: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            straight_tolerance: 10.0,
            u_detour: 40.0,
            stub_length: 20.0,
            obstacle_margin: 15.0,
            lane_step: 15.0,
            max_lane_shifts: 64,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub sizing: SizingConfig,
    pub auto_layout: AutoLayoutConfig,
    pub anchors: AnchorConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SizingConfigFile {
    icon_size: Option<f32>,
    icon_label_height: Option<f32>,
    group_padding: Option<f32>,
    child_spacing: Option<f32>,
    empty_group_width: Option<f32>,
    empty_group_height: Option<f32>,
    composite_icon_size: Option<f32>,
    composite_spacing: Option<f32>,
    composite_padding: Option<f32>,
    composite_label_height: Option<f32>,
    text_char_width: Option<f32>,
    text_min_width: Option<f32>,
    text_padding_x: Option<f32>,
    text_height: Option<f32>,
    text_height_with_sublabel: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AutoLayoutConfigFile {
    start_offset: Option<f32>,
    layer_gap: Option<f32>,
    node_gap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnchorConfigFile {
    opposing_penalty: Option<f32>,
    straight_bonus_dominant: Option<f32>,
    straight_bonus_minor: Option<f32>,
    l_shape_bonus: Option<f32>,
    l_shape_max_distance: Option<f32>,
    corridor_penalty: Option<f32>,
    spread_step: Option<f32>,
    spread_max: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    straight_tolerance: Option<f32>,
    u_detour: Option<f32>,
    stub_length: Option<f32>,
    obstacle_margin: Option<f32>,
    lane_step: Option<f32>,
    max_lane_shifts: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    sizing: Option<SizingConfigFile>,
    #[serde(alias = "autoLayout")]
    layout: Option<AutoLayoutConfigFile>,
    anchors: Option<AnchorConfigFile>,
    routing: Option<RoutingConfigFile>,
}

macro_rules! merge_fields {
    ($target:expr, $source:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $source.$field {
                $target.$field = value;
            }
        )*
    };
}

/// Load a layout config, merging a JSON5 file over the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<LayoutConfig> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = LayoutConfig::default();

    if let Some(sizing) = parsed.sizing {
        merge_fields!(
            config.sizing,
            sizing,
            [
                icon_size,
                icon_label_height,
                group_padding,
                child_spacing,
                empty_group_width,
                empty_group_height,
                composite_icon_size,
                composite_spacing,
                composite_padding,
                composite_label_height,
                text_char_width,
                text_min_width,
                text_padding_x,
                text_height,
                text_height_with_sublabel,
            ]
        );
    }
    if let Some(layout) = parsed.layout {
        merge_fields!(config.auto_layout, layout, [start_offset, layer_gap, node_gap]);
    }
    if let Some(anchors) = parsed.anchors {
        merge_fields!(
            config.anchors,
            anchors,
            [
                opposing_penalty,
                straight_bonus_dominant,
                straight_bonus_minor,
                l_shape_bonus,
                l_shape_max_distance,
                corridor_penalty,
                spread_step,
                spread_max,
            ]
        );
    }
    if let Some(routing) = parsed.routing {
        merge_fields!(
            config.routing,
            routing,
            [
                straight_tolerance,
                u_detour,
                stub_length,
                obstacle_margin,
                lane_step,
                max_lane_shifts,
            ]
        );
    }

    if config.routing.lane_step <= 0.0 {
        anyhow::bail!("routing.laneStep must be positive");
    }
    config.anchors.spread_max = config.anchors.spread_max.clamp(0.0, 0.5);
    Ok(config)
}
