//! Figure model and chart assembly.

mod assembler;
mod figure;
mod palette;

pub use assembler::{
    format_plot, new_figure, plot_candlestick, plot_sentiment, ChartRenderer, PlotlyRenderer, PriceChart,
    PRICES, SENTIMENT, VOLUME,
};
pub use figure::{
    Axis, AxisRange, CandleStyle, Figure, Font, Layout, Legend, Line, Margin, Marker, RangeSlider,
    Shape, Title, Trace, TraceKind,
};
pub use palette::Palette;
