//! Chart composition: price/volume panels, earnings markers, sentiment
//! overlay and the dark theme.
//!
//! Every function mutates a caller-supplied [`Figure`] in place. Row 1 holds
//! the candlestick (`x`/`y`) and the sentiment overlay on the secondary axis
//! (`y2`); row 2 holds volume (`x2`/`y3`).

use time::Date;

use super::figure::{
    Axis, AxisRange, CandleStyle, Figure, Font, Legend, Line, Margin, Marker, RangeSlider, Shape,
    Title, Trace, TraceKind,
};
use super::palette::Palette;
use crate::domain::calendar::{format_iso_date, format_title_date};
use crate::earnings::EarningsWindow;
use crate::sentiment::{DisplayBounds, SentimentSeries};
use crate::{ChartSize, InstrumentHandle, Interval, Period, PriceHistory, RenderError};

pub const PRICES: &str = "Prices";
pub const SENTIMENT: &str = "Sentiment";
pub const VOLUME: &str = "Volume";

const ROW_HEIGHTS: [f64; 2] = [0.6, 0.4];
const VERTICAL_SPACING: f64 = 0.035;
const MILLIS_PER_DAY: u64 = 86_400_000;

/// Everything the price panels need besides the figure itself.
#[derive(Debug, Clone, Copy)]
pub struct PriceChart<'a> {
    pub handle: &'a InstrumentHandle,
    pub history: &'a PriceHistory,
    /// `None` when the horizon stage degraded; the axis then ends at the
    /// last price date.
    pub horizon: Option<Date>,
    pub earnings: &'a EarningsWindow,
    pub period: Period,
    pub interval: Interval,
    pub size: ChartSize,
}

/// Two-row figure with empty `Prices`, `Sentiment` and `Volume` traces.
pub fn new_figure(palette: &Palette) -> Figure {
    let usable = 1.0 - VERTICAL_SPACING;
    let lower_top = usable * ROW_HEIGHTS[1];

    let mut figure = Figure::default();
    figure.layout.xaxis = Axis {
        domain: Some([0.0, 1.0]),
        anchor: Some(String::from("y")),
        ..Axis::default()
    };
    figure.layout.xaxis2 = Axis {
        domain: Some([0.0, 1.0]),
        anchor: Some(String::from("y3")),
        ..Axis::default()
    };
    figure.layout.yaxis = Axis {
        domain: Some([lower_top + VERTICAL_SPACING, 1.0]),
        anchor: Some(String::from("x")),
        ..Axis::default()
    };
    figure.layout.yaxis2 = Axis {
        anchor: Some(String::from("x")),
        overlaying: Some(String::from("y")),
        side: Some(String::from("right")),
        ..Axis::default()
    };
    figure.layout.yaxis3 = Axis {
        domain: Some([0.0, lower_top]),
        anchor: Some(String::from("x2")),
        ..Axis::default()
    };

    let mut sentiment = Trace::empty(TraceKind::Scatter, SENTIMENT, "x", "y2");
    sentiment.line = Some(Line::color(&palette.dark));
    sentiment.showlegend = Some(false);

    figure.data = vec![
        Trace::empty(TraceKind::Candlestick, PRICES, "x", "y"),
        sentiment,
        Trace::empty(TraceKind::Scatter, VOLUME, "x2", "y3"),
    ];
    figure
}

/// Fill the price and volume panels, mean lines, axes, title and earnings
/// markers.
pub fn plot_candlestick(figure: &mut Figure, chart: &PriceChart<'_>, palette: &Palette) -> Result<(), RenderError> {
    let history = chart.history;
    let bars = history.bars();
    let dates = history.dates();
    let start = history.start_date();
    let last = history.end_date();
    let end = chart.horizon.unwrap_or(last);
    if end < start {
        return Err(RenderError::InvertedRange {
            start: format_iso_date(start),
            end: format_iso_date(end),
        });
    }

    let prices = figure.trace_mut(PRICES)?;
    prices.x = dates.clone();
    prices.open = Some(bars.iter().map(|bar| bar.open).collect());
    prices.high = Some(bars.iter().map(|bar| bar.high).collect());
    prices.low = Some(bars.iter().map(|bar| bar.low).collect());
    prices.close = Some(bars.iter().map(|bar| bar.close).collect());
    prices.hoverinfo = Some(String::from("x+y"));
    prices.increasing = Some(candle_style(&palette.green));
    prices.decreasing = Some(candle_style(&palette.red));

    let volume = figure.trace_mut(VOLUME)?;
    volume.x = dates;
    volume.y = Some(bars.iter().map(|bar| Some(bar.volume as f64)).collect());
    volume.mode = Some(String::from("lines"));
    volume.line = Some(Line::color(&palette.sky));
    volume.hovertemplate = Some(String::from("%{x|%b %d, %Y}<br>%{y:,.0f}<extra></extra>"));

    // Only the price mean appears in the legend.
    figure.layout.shapes.push(Shape {
        kind: String::from("line"),
        x0: start,
        x1: end,
        y0: history.mean_close(),
        y1: history.mean_close(),
        xref: String::from("x"),
        yref: String::from("y"),
        line: Line::dashed(&palette.stone, 2.0),
        name: Some(String::from("Mean")),
        showlegend: Some(true),
    });
    figure.layout.shapes.push(Shape {
        kind: String::from("line"),
        x0: start,
        x1: end,
        y0: history.mean_volume(),
        y1: history.mean_volume(),
        xref: String::from("x2"),
        yref: String::from("y3"),
        line: Line::dashed(&palette.stone, 2.0),
        name: Some(String::from("Mean")),
        showlegend: None,
    });

    let dtick = MILLIS_PER_DAY * u64::from(chart.period.tick_days());
    let layout = &mut figure.layout;

    layout.xaxis.range = Some(AxisRange::Dates([start, end]));
    layout.xaxis.dtick = Some(dtick);
    layout.xaxis.showticklabels = Some(false);
    layout.xaxis.rangeslider = Some(RangeSlider { visible: false });
    layout.yaxis.title = Some(Title::text(format!("Price ({})", chart.handle.currency())));

    layout.xaxis2.range = Some(AxisRange::Dates([start, end]));
    layout.xaxis2.tickfont = Some(Font::color(&palette.stone));
    layout.xaxis2.gridcolor = Some(palette.grey.clone());
    layout.xaxis2.linecolor = Some(palette.stone.clone());
    layout.xaxis2.tickangle = Some(45);
    layout.xaxis2.dtick = Some(dtick);
    layout.xaxis2.tickformat = Some(String::from("%Y-%m-%d"));

    layout.yaxis3.title = Some(Title {
        font: Some(Font::color(&palette.light)),
        ..Title::text(VOLUME)
    });
    layout.yaxis3.tickfont = Some(Font::color(&palette.stone));
    layout.yaxis3.gridcolor = Some(palette.grey.clone());
    layout.yaxis3.linecolor = Some(palette.stone.clone());

    let name = chart.handle.display_name().unwrap_or_default();
    layout.title = Some(Title::text(format!(
        "{name} ({}) {} Market Data <br>{} - {}",
        chart.handle.symbol,
        chart.interval.label(),
        format_title_date(start),
        format_title_date(last),
    )));
    layout.width = Some(chart.size.width);
    layout.height = Some(chart.size.height);

    // Newest first so the legend reads chronologically.
    for date in chart.earnings.dates().iter().rev() {
        let iso = format_iso_date(*date);
        layout.shapes.push(Shape {
            kind: String::from("line"),
            x0: *date,
            x1: *date,
            y0: 0.0,
            y1: 1.0,
            xref: String::from("x"),
            yref: String::from("paper"),
            line: Line::dashed(&palette.pink, 1.0),
            name: Some(format!("ED '{}", iso.get(2..).unwrap_or(&iso))),
            showlegend: Some(true),
        });
    }

    Ok(())
}

/// Overlay the rolling sentiment on the secondary axis of row 1.
pub fn plot_sentiment(
    figure: &mut Figure,
    series: &SentimentSeries,
    bounds: DisplayBounds,
    palette: &Palette,
) -> Result<(), RenderError> {
    if bounds.lower > bounds.upper {
        return Err(RenderError::InvertedRange {
            start: bounds.lower.to_string(),
            end: bounds.upper.to_string(),
        });
    }

    let trace = figure.trace_mut(SENTIMENT)?;
    trace.x = series.dates();
    trace.y = Some(series.rolling());
    trace.mode = Some(String::from("lines+markers"));
    trace.line = Some(Line::color(&palette.yellow));
    trace.marker = Some(Marker {
        symbol: Some(String::from("arrow")),
        size: Some(10.0),
        angleref: Some(String::from("previous")),
        color: None,
    });
    trace.hovertemplate =
        Some(String::from("%{x|%b %d, %Y}<br>sentiment (1wk avg): %{y:,.2f}<extra></extra>"));
    trace.showlegend = Some(true);

    let axis = &mut figure.layout.yaxis2;
    axis.title = Some(Title::text(""));
    axis.tickfont = Some(Font::color(&palette.stone));
    axis.tickmode = Some(String::from("array"));
    axis.range = Some(AxisRange::Numbers([bounds.lower, bounds.upper]));
    axis.zeroline = Some(false);
    axis.showgrid = Some(false);
    Ok(())
}

/// Dark theme: backgrounds, fonts, grid and margins.
pub fn format_plot(figure: &mut Figure, palette: &Palette) {
    let layout = &mut figure.layout;
    layout.plot_bgcolor = Some(palette.dark.clone());
    layout.paper_bgcolor = Some(palette.dark.clone());

    let title = layout.title.get_or_insert_with(Title::default);
    title.font = Some(Font::color(&palette.light));
    title.x = Some(0.5);

    let xaxis = &mut layout.xaxis;
    xaxis.set_title_color(&palette.light);
    xaxis.tickfont = Some(Font::color(&palette.stone));
    xaxis.gridcolor = Some(palette.grey.clone());
    xaxis.linecolor = Some(palette.stone.clone());
    xaxis.categoryorder = Some(String::from("category ascending"));

    let yaxis = &mut layout.yaxis;
    yaxis.set_title_color(&palette.light);
    yaxis.tickfont = Some(Font::color(&palette.stone));
    yaxis.gridcolor = Some(palette.grey.clone());
    yaxis.linecolor = Some(palette.stone.clone());
    yaxis.categoryorder = Some(String::from("category ascending"));
    // Invisible ticks push the labels away from the axis.
    yaxis.ticks = Some(String::from("outside"));
    yaxis.tickcolor = Some(palette.dark.clone());
    yaxis.ticklen = Some(5);

    layout.legend = Some(Legend {
        x: Some(0.99),
        font: Some(Font::color(&palette.stone)),
    });
    layout.margin = Some(Margin {
        l: 80,
        r: 20,
        t: 60,
        b: 20,
    });

    for axis in layout.y_axes_mut() {
        axis.title.get_or_insert_with(Title::default).standoff = Some(5);
    }
}

fn candle_style(color: &str) -> CandleStyle {
    CandleStyle {
        line: Line::color(color),
        fillcolor: color.to_owned(),
    }
}

/// Turns the computed chart inputs into a finished figure.
pub trait ChartRenderer: Send + Sync {
    fn render(
        &self,
        chart: &PriceChart<'_>,
        sentiment: Option<&SentimentSeries>,
        palette: &Palette,
    ) -> Result<Figure, RenderError>;
}

/// The plotly layout: both price panels, the optional sentiment overlay and
/// the dark theme.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlotlyRenderer;

impl ChartRenderer for PlotlyRenderer {
    fn render(
        &self,
        chart: &PriceChart<'_>,
        sentiment: Option<&SentimentSeries>,
        palette: &Palette,
    ) -> Result<Figure, RenderError> {
        let mut figure = new_figure(palette);
        plot_candlestick(&mut figure, chart, palette)?;
        if let Some(series) = sentiment {
            plot_sentiment(&mut figure, series, crate::sentiment::bounds(series), palette)?;
        }
        format_plot(&mut figure, palette);
        Ok(figure)
    }
}
