use std::f32::consts::TAU;

use eframe::egui::{self, Color32, Pos2, RichText, Sense, Shape, Stroke, Ui, Vec2};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, Points,
    Polygon,
};
use town_scout::color::{ColorMap, ValueScale};
use town_scout::dashboard::charts::{
    CategorySeries, HistogramSeries, LongSeries, MapSeries, ScatterSeries,
};
use town_scout::dashboard::{Panel, PanelBody, ViewModel};
use town_scout::data::model::format_number;

use super::table;

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render the whole view model in the central panel.
pub fn dashboard(ui: &mut Ui, vm: Option<&ViewModel>) {
    let Some(vm) = vm else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view towns  (File → Open…)");
        });
        return;
    };

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading(&vm.title);
            ui.label(format!("Showing {} of {} towns", vm.matched_rows, vm.total_rows));
            for (column, count) in &vm.column_counts {
                ui.label(format!("{column}: {count} values within the price range"));
            }
            ui.separator();

            if let Some(notice) = &vm.notice {
                ui.label(RichText::new(notice).color(Color32::YELLOW).size(16.0));
                return;
            }

            let (metrics, charts): (Vec<&Panel>, Vec<&Panel>) = vm
                .panels
                .iter()
                .partition(|p| matches!(p.body, PanelBody::Metric { .. }));

            ui.horizontal_wrapped(|ui: &mut Ui| {
                for panel in metrics {
                    ui.group(|ui: &mut Ui| panel_view(ui, panel));
                }
            });

            for (i, panel) in charts.into_iter().enumerate() {
                ui.push_id(i, |ui: &mut Ui| {
                    ui.add_space(8.0);
                    ui.strong(&panel.title);
                    panel_view(ui, panel);
                });
            }

            ui.add_space(8.0);
            ui.strong("Filtered listings");
            table::listings_table(ui, &vm.table);

            ui.add_space(8.0);
            egui::CollapsingHeader::new(format!("Towns ({})", vm.towns.len()))
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    for town in &vm.towns {
                        ui.label(town);
                    }
                });
        });
}

fn panel_view(ui: &mut Ui, panel: &Panel) {
    let id = panel.title.as_str();
    match &panel.body {
        PanelBody::Metric { value, unit } => {
            ui.vertical(|ui: &mut Ui| {
                ui.label(&panel.title);
                let text = value.map_or_else(|| "no data".to_string(), format_number);
                ui.label(RichText::new(text).size(26.0).strong());
                ui.label(RichText::new(unit).weak());
            });
        }
        PanelBody::Bar(series) => bar_chart(ui, id, series),
        PanelBody::Pie(series) => pie_chart(ui, series),
        PanelBody::Scatter(series) => scatter_plot(ui, id, series),
        PanelBody::Histogram(series) => histogram(ui, id, series),
        PanelBody::BoxPlot(series) => box_plot(ui, id, series),
        PanelBody::Violin(series) => violin_plot(ui, id, series),
        PanelBody::Map(series) => map_plot(ui, id, series),
        PanelBody::Unavailable(message) => {
            ui.label(RichText::new(message).italics().weak());
        }
    }
}

/// Axis formatter that shows category names at integer positions.
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Bar / pie
// ---------------------------------------------------------------------------

fn bar_chart(ui: &mut Ui, id: &str, series: &CategorySeries) {
    let colors = ColorMap::new(series.labels.iter().cloned());
    let bars: Vec<Bar> = series
        .labels
        .iter()
        .zip(&series.values)
        .enumerate()
        .map(|(i, (label, value))| {
            Bar::new(i as f64, *value)
                .name(label)
                .fill(colors.color_for(label))
                .width(0.7)
        })
        .collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .x_axis_label(&series.category_label)
        .y_axis_label(&series.value_label)
        .x_axis_formatter(category_axis(series.labels.clone()))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(&series.value_label));
        });

    if !series.no_data.is_empty() {
        ui.label(
            RichText::new(format!("No data: {}", series.no_data.join(", ")))
                .weak()
                .italics(),
        );
    }
}

/// Points along the arc from `start` to `end` (radians).
fn arc(center: Pos2, radius: f32, start: f32, end: f32) -> Vec<Pos2> {
    let steps = (((end - start) / TAU) * 64.0).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|s| {
            let a = start + (end - start) * s as f32 / steps as f32;
            center + Vec2::angled(a) * radius
        })
        .collect()
}

fn pie_chart(ui: &mut Ui, series: &CategorySeries) {
    let colors = ColorMap::new(series.labels.iter().cloned());
    let shares = series.shares();

    ui.horizontal(|ui: &mut Ui| {
        let size = Vec2::splat(CHART_HEIGHT * 0.8);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let center = response.rect.center();
        let radius = size.x * 0.45;

        let mut start = -TAU / 4.0;
        for (label, share) in series.labels.iter().zip(&shares) {
            let sweep = *share as f32 * TAU;
            let color = colors.color_for(label);
            // A convex wedge cannot exceed half a turn; draw quarter turns.
            let mut a = start;
            while a < start + sweep {
                let b = (a + TAU / 4.0).min(start + sweep);
                let mut points = vec![center];
                points.extend(arc(center, radius, a, b));
                painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
                a = b;
            }
            start += sweep;
        }

        ui.vertical(|ui: &mut Ui| {
            for ((label, value), share) in series.labels.iter().zip(&series.values).zip(&shares) {
                let text = format!(
                    "■ {label}: {} ({:.1}%)",
                    format_number(*value),
                    share * 100.0
                );
                ui.label(RichText::new(text).color(colors.color_for(label)));
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Scatter / histogram
// ---------------------------------------------------------------------------

fn scatter_plot(ui: &mut Ui, id: &str, series: &ScatterSeries) {
    let groups = series.by_group();
    let colors = ColorMap::new(groups.keys().cloned());

    Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(&series.x_label)
        .y_axis_label(&series.y_label)
        .show(ui, |plot_ui| {
            for (group, points) in groups {
                let name = if group.is_empty() { "Towns".to_string() } else { group.clone() };
                plot_ui.points(
                    Points::new(PlotPoints::new(points))
                        .radius(3.5)
                        .color(colors.color_for(&group))
                        .name(name),
                );
            }
        });
}

fn histogram(ui: &mut Ui, id: &str, series: &HistogramSeries) {
    let bars: Vec<Bar> = series
        .bin_counts()
        .into_iter()
        .map(|bin| {
            let width = (bin.end - bin.start).max(f64::EPSILON);
            Bar::new((bin.start + bin.end) / 2.0, bin.count as f64)
                .width(width)
                .name(format!("{} - {}", format_number(bin.start), format_number(bin.end)))
        })
        .collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .x_axis_label(&series.label)
        .y_axis_label("Count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
        });
}

// ---------------------------------------------------------------------------
// Box / violin
// ---------------------------------------------------------------------------

fn box_plot(ui: &mut Ui, id: &str, series: &LongSeries) {
    let colors = ColorMap::new(series.categories.iter().cloned());
    let summaries = series.summaries();
    let boxes: Vec<BoxElem> = series
        .categories
        .iter()
        .enumerate()
        .filter_map(|(i, category)| {
            let (_, summary) = summaries.iter().find(|(c, _)| c == category)?;
            let spread = BoxSpread::new(
                summary.min,
                summary.q1,
                summary.median,
                summary.q3,
                summary.max,
            );
            let color = colors.color_for(category);
            Some(
                BoxElem::new(i as f64, spread)
                    .name(category)
                    .fill(color.gamma_multiply(0.4))
                    .stroke(Stroke::new(1.5, color)),
            )
        })
        .collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(series.categories.clone()))
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(boxes));
        });
}

fn violin_plot(ui: &mut Ui, id: &str, series: &LongSeries) {
    let colors = ColorMap::new(series.categories.iter().cloned());
    let grouped = series.grouped();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(series.categories.clone()))
        .show(ui, |plot_ui| {
            for (i, (category, values)) in grouped.iter().enumerate() {
                let density = kde(values, 64);
                let Some(peak) = density.iter().map(|&(_, d)| d).reduce(f64::max) else {
                    continue;
                };
                let scale = if peak > 0.0 { 0.4 / peak } else { 0.0 };
                let x = i as f64;
                let mut outline: Vec<[f64; 2]> =
                    density.iter().map(|&(y, d)| [x + d * scale, y]).collect();
                outline.extend(density.iter().rev().map(|&(y, d)| [x - d * scale, y]));

                let color = colors.color_for(category);
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(outline))
                        .fill_color(color.gamma_multiply(0.4))
                        .stroke(Stroke::new(1.5, color))
                        .name(category),
                );
                if let Some(median) = town_scout::data::aggregate::median(values) {
                    plot_ui.line(
                        Line::new(PlotPoints::new(vec![[x - 0.15, median], [x + 0.15, median]]))
                            .color(color)
                            .width(2.0),
                    );
                }
            }
        });
}

/// Gaussian kernel density estimate over `values`, sampled at `samples`
/// evenly spaced points. Returns `(value, density)` pairs.
pub fn kde(values: &[f64], samples: usize) -> Vec<(f64, f64)> {
    if values.is_empty() || samples < 2 {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    // Silverman's rule of thumb; fall back to a unit bandwidth for constant data.
    let bandwidth = if sd > 0.0 { 1.06 * sd * n.powf(-0.2) } else { 1.0 };

    let min = values.iter().copied().fold(f64::INFINITY, f64::min) - 3.0 * bandwidth;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 3.0 * bandwidth;
    let step = (max - min) / (samples - 1) as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..samples)
        .map(|i| {
            let y = min + step * i as f64;
            let d = values
                .iter()
                .map(|v| (-0.5 * ((y - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (y, d)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

fn map_plot(ui: &mut Ui, id: &str, series: &MapSeries) {
    let scale = series
        .value_range()
        .map(|(min, max)| ValueScale::new(min, max))
        .unwrap_or_else(|| ValueScale::new(0.0, 0.0));

    Plot::new(id)
        .height(CHART_HEIGHT * 1.5)
        .data_aspect(1.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            for p in &series.points {
                let name = match p.value {
                    Some(v) => format!("{}: {}", p.label, format_number(v)),
                    None => format!("{}: no data", p.label),
                };
                plot_ui.points(
                    Points::new(PlotPoints::new(vec![[p.lon, p.lat]]))
                        .radius(5.0)
                        .color(scale.color_for(p.value))
                        .name(name),
                );
            }
        });

    if let Some((min, max)) = series.value_range() {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(RichText::new("■").color(scale.color_for(Some(min))));
            ui.label(format_number(min));
            ui.label(RichText::new("■").color(scale.color_for(Some(max))));
            ui.label(format_number(max));
            ui.label(RichText::new(&series.value_label).weak());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kde_integrates_to_about_one() {
        let values = [1.0, 2.0, 2.5, 3.0, 7.0];
        let density = kde(&values, 200);
        assert_eq!(density.len(), 200);
        let step = density[1].0 - density[0].0;
        let area: f64 = density.iter().map(|(_, d)| d * step).sum();
        assert!((area - 1.0).abs() < 0.05, "area = {area}");
    }

    #[test]
    fn kde_handles_constant_and_empty_input() {
        assert!(kde(&[], 10).is_empty());
        let density = kde(&[4.0, 4.0], 11);
        let (peak_at, _) = density
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |acc, p| if p.1 > acc.1 { p } else { acc });
        assert!((peak_at - 4.0).abs() < 1e-9);
    }
}
