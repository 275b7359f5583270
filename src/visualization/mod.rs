//! Visualization of winsorization results.
//!
//! Renders one row of subplots, one per selected column, each holding a
//! "Before" and an "After" box-and-whisker plot. Every call owns its drawing
//! area, so concurrent renders never share plotting state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use plotters::coord::Shift;
use plotters::element::{Drawable, PointCollection};
use plotters::prelude::*;
use plotters::style::register_font;
use plotters_backend::{BackendCoord, DrawingBackend, DrawingErrorKind};
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::PlotConfig;
use crate::core::loaders::Table;
use crate::core::transforms::{numeric_values, TransformError};
use crate::core::writers::{ensure_parent_dirs, WriteError};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("No columns to plot")]
    NoColumns,

    #[error("Column '{0}' not found in both tables")]
    MissingColumn(String),

    #[error("Column '{0}' has no values to plot")]
    EmptyColumn(String),

    #[error(transparent)]
    Data(#[from] TransformError),
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Axis categories, in drawing order.
const PHASE_LABELS: [&str; 2] = ["Before", "After"];

const BOX_COLOR: RGBColor = RGBColor(55, 126, 184);
const OUTLIER_COLOR: RGBColor = RGBColor(228, 26, 28);

/// Half of the box width, in pixels.
const BOX_HALF_WIDTH: i32 = 20;

/// Family name text styles refer to.
const FONT_FAMILY: &str = "sans-serif";

/// Fonts tried when no font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Whether a label font was registered. Resolved once per process; the
/// registry is read-only afterwards.
static FONT_READY: OnceLock<bool> = OnceLock::new();

fn ensure_font(configured: Option<&PathBuf>) -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates = configured
            .map(PathBuf::as_path)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(Path::new));

        for path in candidates {
            let Ok(bytes) = fs::read(path) else {
                continue;
            };
            // The font registry keeps 'static data for the life of the process.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                debug!("Registered plot font {}", path.display());
                return true;
            }
        }

        warn!("No usable font found, plots are rendered without labels");
        false
    })
}

/// Plot before/after box-and-whisker pairs for `columns` and save as PNG.
///
/// The image is `config.column_width * columns.len()` pixels wide and
/// `config.height` pixels high. An existing file is overwritten.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `original` - Table before winsorization
/// * `transformed` - Table after winsorization
/// * `columns` - Columns to plot, in subplot order
/// * `config` - Image dimensions and label settings
pub fn plot_comparison(
    output_path: &Path,
    original: &Table,
    transformed: &Table,
    columns: &[String],
    config: &PlotConfig,
) -> Result<()> {
    if columns.is_empty() {
        return Err(VisualizationError::NoColumns);
    }

    let mut series = Vec::with_capacity(columns.len());
    for name in columns {
        let before = present_values(original, name)?;
        let after = present_values(transformed, name)?;
        series.push((name.as_str(), before, after));
    }

    ensure_parent_dirs(output_path)?;

    let width = config.column_width.max(1) * columns.len() as u32;
    let root = BitMapBackend::new(output_path, (width, config.height.max(1))).into_drawing_area();

    root.fill(&WHITE).map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let annotate = config.annotate && ensure_font(config.font.as_ref());

    let panels = root.split_evenly((1, columns.len()));
    for (panel, (name, before, after)) in panels.iter().zip(&series) {
        draw_panel(panel, name, before, after, annotate)?;
    }

    root.present().map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Numeric values of a column with missing cells dropped.
fn present_values(table: &Table, name: &str) -> Result<Vec<f64>> {
    let column = table
        .column(name)
        .ok_or_else(|| VisualizationError::MissingColumn(name.to_string()))?;

    let values: Vec<f64> = numeric_values(column)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Err(VisualizationError::EmptyColumn(name.to_string()));
    }
    Ok(values)
}

/// Five-number summary with Tukey whiskers.
///
/// Quartiles interpolate linearly between order statistics. Whiskers end at
/// the most extreme observations within 1.5 IQR of the box, never beyond the
/// data; observations past them are outliers.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoxStats {
    lower_whisker: f32,
    q1: f32,
    median: f32,
    q3: f32,
    upper_whisker: f32,
}

impl BoxStats {
    fn new(values: &[f64]) -> Self {
        let [lower_fence, q1, median, q3, upper_fence] = Quartiles::new(values).values();
        let data = values.iter().map(|&v| v as f32);

        let lower_whisker = data
            .clone()
            .filter(|&v| v >= lower_fence)
            .fold(f32::INFINITY, f32::min)
            .min(q1);
        let upper_whisker = data
            .filter(|&v| v <= upper_fence)
            .fold(f32::NEG_INFINITY, f32::max)
            .max(q3);

        Self {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
        }
    }

    fn values(&self) -> [f32; 5] {
        [self.lower_whisker, self.q1, self.median, self.q3, self.upper_whisker]
    }

    fn is_outlier(&self, v: f32) -> bool {
        v < self.lower_whisker || v > self.upper_whisker
    }
}

/// Vertical box-and-whisker element drawn from a [`BoxStats`].
struct WhiskerBox<X> {
    x: X,
    stats: BoxStats,
    style: ShapeStyle,
}

impl<X> WhiskerBox<X> {
    fn new(x: X, stats: BoxStats, style: ShapeStyle) -> Self {
        Self { x, stats, style }
    }
}

impl<'a, X: Clone> PointCollection<'a, (X, f32)> for &'a WhiskerBox<X> {
    type Point = (X, f32);
    type IntoIter = Vec<Self::Point>;

    fn point_iter(self) -> Self::IntoIter {
        self.stats.values().iter().map(|&v| (self.x.clone(), v)).collect()
    }
}

impl<X, DB: DrawingBackend> Drawable<DB> for WhiskerBox<X> {
    fn draw<I: Iterator<Item = BackendCoord>>(
        &self,
        points: I,
        backend: &mut DB,
        _: (u32, u32),
    ) -> std::result::Result<(), DrawingErrorKind<DB::ErrorType>> {
        let points: Vec<BackendCoord> = points.take(5).collect();
        let &[low, q1, median, q3, high] = points.as_slice() else {
            return Ok(());
        };

        let x = median.0;
        let half = BOX_HALF_WIDTH;
        let cap = BOX_HALF_WIDTH / 2;

        backend.draw_rect((x - half, q3.1), (x + half, q1.1), &self.style, false)?;
        backend.draw_line((x - half, median.1), (x + half, median.1), &self.style)?;
        backend.draw_line((x, q3.1), (x, high.1), &self.style)?;
        backend.draw_line((x, q1.1), (x, low.1), &self.style)?;
        backend.draw_line((x - cap, high.1), (x + cap, high.1), &self.style)?;
        backend.draw_line((x - cap, low.1), (x + cap, low.1), &self.style)?;
        Ok(())
    }
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    name: &str,
    before: &[f64],
    after: &[f64],
    annotate: bool,
) -> Result<()> {
    let axis = PHASE_LABELS;
    let stats = [BoxStats::new(before), BoxStats::new(after)];
    let (y_min, y_max) = compute_bounds(&stats, before, after);
    let y_padding = (y_max - y_min) * 0.05;

    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if annotate {
        builder
            .caption(format!("Box-Whisker Plot Comparison for {}", name), (FONT_FAMILY, 18))
            .x_label_area_size(30)
            .y_label_area_size(60);
    }

    let mut chart = builder
        .build_cartesian_2d(axis[..].into_segmented(), (y_min - y_padding)..(y_max + y_padding))
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    if annotate {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc(name)
            .draw()
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
    }

    chart
        .draw_series(
            axis.iter()
                .zip(&stats)
                .map(|(label, s)| WhiskerBox::new(SegmentValue::CenterOf(label), *s, BOX_COLOR.stroke_width(1))),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    // Points beyond the whiskers
    let mut outliers = Vec::new();
    for ((label, values), s) in axis.iter().zip([before, after]).zip(&stats) {
        outliers.extend(
            values
                .iter()
                .map(|&v| v as f32)
                .filter(|&v| s.is_outlier(v))
                .map(|v| (label, v)),
        );
    }

    chart
        .draw_series(
            outliers
                .into_iter()
                .map(|(label, v)| Circle::new((SegmentValue::CenterOf(label), v), 3, OUTLIER_COLOR.filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Compute the value range covering whiskers and data of both phases.
fn compute_bounds(stats: &[BoxStats; 2], before: &[f64], after: &[f64]) -> (f32, f32) {
    let mut y_min = f32::MAX;
    let mut y_max = f32::MIN;

    let whiskers = stats.iter().flat_map(|s| [s.lower_whisker, s.upper_whisker]);
    let data = before.iter().chain(after).map(|&v| v as f32);

    for v in whiskers.chain(data) {
        y_min = y_min.min(v);
        y_max = y_max.max(v);
    }

    if (y_max - y_min).abs() < f32::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (y_min, y_max)
}
