use serde::{Deserialize, Serialize};

use crate::ir::{ElementKind, EventKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub stroke_color: String,
    pub start_event_fill: String,
    pub event_fill: String,
    pub end_event_fill: String,
    pub activity_fill: String,
    pub gateway_fill: String,
    pub lane_fill: String,
    pub pool_border: String,
    pub background: String,
}

impl Theme {
    /// Saturated palette with one colour per element family.
    pub fn bpmn() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#222222".to_string(),
            line_color: "#333333".to_string(),
            stroke_color: "#333333".to_string(),
            start_event_fill: "#55AA55".to_string(),
            event_fill: "#FF8928".to_string(),
            end_event_fill: "#AA3939".to_string(),
            activity_fill: "#FCCDA6".to_string(),
            gateway_fill: "#A1AECB".to_string(),
            lane_fill: "#E4E4FE".to_string(),
            pool_border: "#7878FD".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    /// Black on white, closer to a printed modelling tool.
    pub fn classic() -> Self {
        Self {
            font_family: "trebuchet ms, verdana, arial, sans-serif".to_string(),
            font_size: 12.0,
            text_color: "#000000".to_string(),
            line_color: "#000000".to_string(),
            stroke_color: "#000000".to_string(),
            start_event_fill: "#FFFFFF".to_string(),
            event_fill: "#FFFFFF".to_string(),
            end_event_fill: "#FFFFFF".to_string(),
            activity_fill: "#FFFFFF".to_string(),
            gateway_fill: "#FFFFFF".to_string(),
            lane_fill: "#FFFFFF".to_string(),
            pool_border: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn fill_for(&self, kind: ElementKind) -> &str {
        match kind {
            ElementKind::Event(EventKind::Start) => &self.start_event_fill,
            ElementKind::Event(EventKind::Intermediate) => &self.event_fill,
            ElementKind::Event(EventKind::End) => &self.end_event_fill,
            ElementKind::Activity => &self.activity_fill,
            ElementKind::Gateway(_) => &self.gateway_fill,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::bpmn()
    }
}
