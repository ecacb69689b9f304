//! Chart descriptors handed to the presentation shell.
//!
//! The JSON shape follows the plotly figure layout (`data` + `layout`) so a
//! web front end can render it without translation.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDash {
    Solid,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Line {
    pub dash: LineDash,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter {
        name: String,
        x: Vec<NaiveDate>,
        y: Vec<f64>,
        line: Line,
    },
    Pie {
        labels: Vec<String>,
        values: Vec<f64>,
        textinfo: String,
        hoverinfo: String,
        rotation: f64,
    },
    Bar {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        x: Vec<String>,
        y: Vec<f64>,
    },
    Histogram {
        name: String,
        x: Vec<f64>,
        nbinsx: usize,
    },
    Box {
        x: Vec<String>,
        y: Vec<f64>,
    },
}

impl Trace {
    pub fn line(name: impl Into<String>, points: &[(NaiveDate, f64)], dash: LineDash) -> Self {
        Trace::Scatter {
            name: name.into(),
            x: points.iter().map(|(d, _)| *d).collect(),
            y: points.iter().map(|(_, v)| *v).collect(),
            line: Line { dash },
        }
    }

    /// Pie showing percentages, with label + value on hover
    pub fn pie(slices: Vec<(String, f64)>) -> Self {
        let (labels, values) = slices.into_iter().unzip();
        Trace::Pie {
            labels,
            values,
            textinfo: "percent".to_string(),
            hoverinfo: "label+value".to_string(),
            rotation: 90.0,
        }
    }

    pub fn bar(name: Option<&str>, bars: Vec<(String, f64)>) -> Self {
        let (x, y) = bars.into_iter().unzip();
        Trace::Bar {
            name: name.map(str::to_string),
            x,
            y,
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Date,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeSlider {
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AxisType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangeslider: Option<RangeSlider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoryorder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoryarray: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    Stack,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HoverMode {
    #[serde(rename = "x unified")]
    XUnified,
    #[serde(rename = "closest")]
    Closest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<BarMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bargap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<HoverMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
}

/// A complete chart: traces plus layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            layout: Layout {
                title: title.into(),
                ..Layout::default()
            },
        }
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.data.push(trace);
        self
    }

    pub fn with_axis_titles(mut self, x: &str, y: &str) -> Self {
        self.layout.xaxis.get_or_insert_with(Axis::default).title = Some(x.to_string());
        self.layout.yaxis.get_or_insert_with(Axis::default).title = Some(y.to_string());
        self
    }

    /// Pin category order on the x axis
    pub fn with_x_categories(mut self, categories: Vec<String>) -> Self {
        let axis = self.layout.xaxis.get_or_insert_with(Axis::default);
        axis.categoryorder = Some("array".to_string());
        axis.categoryarray = Some(categories);
        self
    }

    /// Date x axis with a range slider, unified hover and a legend
    pub fn as_time_series(mut self) -> Self {
        let axis = self.layout.xaxis.get_or_insert_with(Axis::default);
        axis.kind = Some(AxisType::Date);
        axis.rangeslider = Some(RangeSlider { visible: true });
        self.layout.hovermode = Some(HoverMode::XUnified);
        self.layout.showlegend = Some(true);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
