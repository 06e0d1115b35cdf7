//! Serializable figure model.
//!
//! The structs mirror the subset of the plotly.js schema the chart uses, so
//! `Figure::to_json` can be handed to `Plotly.newPlot` unchanged. Optional
//! attributes are skipped when unset and plotly applies its own defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::RenderError;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.data.iter().find(|trace| trace.name == name)
    }

    /// Mutable trace lookup by name.
    pub fn trace_mut(&mut self, name: &str) -> Result<&mut Trace, RenderError> {
        self.data
            .iter_mut()
            .find(|trace| trace.name == name)
            .ok_or_else(|| RenderError::MissingTrace {
                name: name.to_owned(),
            })
    }

    pub fn to_json(&self) -> Result<String, RenderError> {
        serde_json::to_string(self).map_err(|error| RenderError::Serialization(error.to_string()))
    }

    /// Standalone HTML page loading plotly.js from its CDN.
    pub fn render_html(&self) -> Result<String, RenderError> {
        let data = serde_json::to_string(&self.data)
            .map_err(|error| RenderError::Serialization(error.to_string()))?;
        let layout = serde_json::to_string(&self.layout)
            .map_err(|error| RenderError::Serialization(error.to_string()))?;
        let title = self
            .layout
            .title
            .as_ref()
            .map(|title| title.text.replace("<br>", " "))
            .unwrap_or_default();

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <script src=\"{PLOTLY_CDN}\"></script>\n</head>\n<body style=\"margin:0\">\n\
             <div id=\"chart\"></div>\n<script>\nPlotly.newPlot(\"chart\", {data}, {layout});\n\
             </script>\n</body>\n</html>\n"
        ))
    }

    pub fn write_html(&self, path: &Path) -> Result<(), RenderError> {
        let html = self.render_html()?;
        std::fs::write(path, html).map_err(|error| RenderError::Io(format!("{}: {error}", path.display())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Candlestick,
    Scatter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub name: String,
    pub x: Vec<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increasing: Option<CandleStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decreasing: Option<CandleStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    pub xaxis: String,
    pub yaxis: String,
}

impl Trace {
    /// Empty trace bound to the given axis pair.
    pub fn empty(kind: TraceKind, name: &str, xaxis: &str, yaxis: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            x: Vec::new(),
            y: match kind {
                TraceKind::Scatter => Some(Vec::new()),
                TraceKind::Candlestick => None,
            },
            open: None,
            high: None,
            low: None,
            close: None,
            mode: None,
            line: None,
            marker: None,
            increasing: None,
            decreasing: None,
            hoverinfo: None,
            hovertemplate: None,
            showlegend: None,
            xaxis: xaxis.to_owned(),
            yaxis: yaxis.to_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
}

impl Line {
    pub fn color(color: &str) -> Self {
        Self {
            color: Some(color.to_owned()),
            ..Self::default()
        }
    }

    pub fn dashed(color: &str, width: f64) -> Self {
        Self {
            color: Some(color.to_owned()),
            width: Some(width),
            dash: Some(String::from("dash")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angleref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleStyle {
    pub line: Line,
    pub fillcolor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Font {
    pub fn color(color: &str) -> Self {
        Self {
            color: Some(color.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standoff: Option<u32>,
}

impl Title {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Axis range: calendar dates for x axes, numbers for y axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisRange {
    Dates([Date; 2]),
    Numbers([f64; 2]),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSlider {
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<AxisRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtick: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickformat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickangle: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickmode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickfont: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticklen: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showticklabels: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showgrid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zeroline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gridcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linecolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoryorder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rangeslider: Option<RangeSlider>,
}

impl Axis {
    /// Font colour of the axis title, creating an empty title if needed.
    pub fn set_title_color(&mut self, color: &str) {
        self.title.get_or_insert_with(Title::default).font = Some(Font::color(color));
    }
}

/// Layout-level shape; only straight lines are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: String,
    pub x0: Date,
    pub x1: Date,
    pub y0: f64,
    pub y1: f64,
    pub xref: String,
    pub yref: String,
    pub line: Line,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    pub xaxis: Axis,
    pub xaxis2: Axis,
    pub yaxis: Axis,
    pub yaxis2: Axis,
    pub yaxis3: Axis,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl Layout {
    pub fn y_axes_mut(&mut self) -> [&mut Axis; 3] {
        [&mut self.yaxis, &mut self.yaxis2, &mut self.yaxis3]
    }
}
