//! Per-rank ANI density estimation and rendering

use crate::{
    taxonomy::Rank,
    utils::{create_writer, csv_reader},
    LcaAniError, LcaAniResult,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Configuration for density estimation
#[derive(Debug, Clone)]
pub struct DensityConfig {
    /// Number of evaluation points per curve
    pub grid_size: usize,
    /// Bandwidths to extend the grid past the data range
    pub cut: f64,
    /// Ranks to plot, finest first
    pub include_ranks: Vec<Rank>,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            grid_size: 200,
            cut: 3.0,
            include_ranks: Rank::ascending().collect(),
        }
    }
}

/// Validate density configuration parameters
pub fn validate_density_config(config: &DensityConfig) -> LcaAniResult<()> {
    if config.grid_size < 2 {
        return Err(LcaAniError::InvalidConfig(
            "grid size must be at least 2".to_string(),
        ));
    }
    if !(config.cut >= 0.0 && config.cut.is_finite()) {
        return Err(LcaAniError::InvalidConfig(
            "cut must be a non-negative number".to_string(),
        ));
    }
    if config.include_ranks.is_empty() {
        return Err(LcaAniError::InvalidConfig(
            "at least one rank must be included".to_string(),
        ));
    }
    Ok(())
}

/// A density curve for one LCA rank
#[derive(Debug, Clone, PartialEq)]
pub struct DensityCurve {
    pub rank: Rank,
    pub n: usize,
    pub xs: Vec<f64>,
    pub densities: Vec<f64>,
}

/// Read `value_column` grouped by `lca_rank`, keeping only included ranks.
/// Rows with an unknown rank or an empty value are skipped.
pub fn read_rank_values<P: AsRef<Path>>(
    path: P,
    value_column: &str,
    include_ranks: &[Rank],
) -> LcaAniResult<BTreeMap<Rank, Vec<f64>>> {
    let mut reader = csv_reader(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| LcaAniError::InvalidRecord(format!("{} column not found in CSV header", name)))
    };
    let rank_idx = column("lca_rank")?;
    let value_idx = column(value_column)?;

    let mut values: BTreeMap<Rank, Vec<f64>> = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        let Ok(rank) = record.get(rank_idx).unwrap_or("").parse::<Rank>() else {
            continue;
        };
        if !include_ranks.contains(&rank) {
            continue;
        }
        let text = record.get(value_idx).unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let value = text
            .parse::<f64>()
            .map_err(|_| LcaAniError::InvalidRecord(format!("Invalid {}: {}", value_column, text)))?;
        values.entry(rank).or_default().push(value);
    }
    Ok(values)
}

/// Scott's rule bandwidth: `sd * n^(-1/5)`. `None` for fewer than two values or zero spread.
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let sd = var.sqrt();
    if sd <= 0.0 || !sd.is_finite() {
        return None;
    }
    Some(sd * (n as f64).powf(-0.2))
}

/// Gaussian kernel density estimate evaluated on an evenly spaced grid
pub fn gaussian_kde(rank: Rank, values: &[f64], grid_size: usize, cut: f64) -> Option<DensityCurve> {
    if grid_size < 2 {
        return None;
    }
    let bw = scott_bandwidth(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lo = min - cut * bw;
    let hi = max + cut * bw;
    let step = (hi - lo) / (grid_size - 1) as f64;

    let norm = 1.0 / (values.len() as f64 * bw * (2.0 * std::f64::consts::PI).sqrt());
    let xs: Vec<f64> = (0..grid_size).map(|i| lo + step * i as f64).collect();
    let densities = xs
        .iter()
        .map(|x| {
            norm * values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum::<f64>()
        })
        .collect();

    Some(DensityCurve {
        rank,
        n: values.len(),
        xs,
        densities,
    })
}

/// Estimate one curve per included rank, in `include_ranks` order
pub fn estimate_densities(
    values: &BTreeMap<Rank, Vec<f64>>,
    config: &DensityConfig,
) -> Vec<DensityCurve> {
    let curves: Vec<Option<DensityCurve>> = config
        .include_ranks
        .par_iter()
        .map(|rank| {
            let rank_values = values.get(rank)?;
            let curve = gaussian_kde(*rank, rank_values, config.grid_size, config.cut);
            if curve.is_none() {
                log::warn!(
                    "Skipping {}: {} values are not enough for a density",
                    rank,
                    rank_values.len()
                );
            }
            curve
        })
        .collect();
    curves.into_iter().flatten().collect()
}

/// Output base path for a plot: `{basename}.{ANI|AAI}.k{ksize}`
pub fn output_stem(basename: &str, protein: bool, ksize: u32) -> String {
    format!("{}.{}.k{}", basename, ani_label(protein), ksize)
}

pub fn ani_label(protein: bool) -> &'static str {
    if protein {
        "AAI"
    } else {
        "ANI"
    }
}

/// `(csv, svg)` output paths for a stem
pub fn output_paths(stem: &str) -> (PathBuf, PathBuf) {
    (
        PathBuf::from(format!("{}.csv", stem)),
        PathBuf::from(format!("{}.svg", stem)),
    )
}

/// Write curves as a long table: `lca_rank,ani,density`
pub fn write_density_table<P: AsRef<Path>>(curves: &[DensityCurve], path: P) -> LcaAniResult<()> {
    let mut writer = csv::Writer::from_writer(create_writer(path)?);
    writer.write_record(["lca_rank", "ani", "density"])?;
    for curve in curves {
        for (x, d) in curve.xs.iter().zip(&curve.densities) {
            writer.write_record([
                curve.rank.as_str(),
                x.to_string().as_str(),
                d.to_string().as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

const VIRIDIS: [(u8, u8, u8); 5] = [
    (0x44, 0x01, 0x54),
    (0x3b, 0x52, 0x8b),
    (0x21, 0x91, 0x8c),
    (0x5e, 0xc9, 0x62),
    (0xfd, 0xe7, 0x25),
];

/// `n` evenly spaced viridis colors as hex strings
pub fn viridis_palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let t = (i as f64 + 0.5) / n as f64;
            let pos = t * (VIRIDIS.len() - 1) as f64;
            let lo = (pos.floor() as usize).min(VIRIDIS.len() - 2);
            let frac = pos - lo as f64;
            let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
            let (r0, g0, b0) = VIRIDIS[lo];
            let (r1, g1, b1) = VIRIDIS[lo + 1];
            format!("#{:02x}{:02x}{:02x}", lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
        })
        .collect()
}

const WIDTH: f64 = 1020.0;
const HEIGHT: f64 = 720.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 200.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 80.0;

/// Render filled density curves with a rank legend
pub fn render_density_svg<P: AsRef<Path>>(
    curves: &[DensityCurve],
    label: &str,
    path: P,
) -> LcaAniResult<()> {
    let mut out = create_writer(path)?;

    let x_min = curves
        .iter()
        .flat_map(|c| c.xs.first().copied())
        .fold(f64::INFINITY, f64::min);
    let x_max = curves
        .iter()
        .flat_map(|c| c.xs.last().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let y_max = curves
        .iter()
        .flat_map(|c| c.densities.iter().copied())
        .fold(0.0, f64::max);

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
    let y_span = if y_max > 0.0 { y_max } else { 1.0 };
    let px = |x: f64| MARGIN_LEFT + (x - x_min) / x_span * plot_w;
    let py = |y: f64| MARGIN_TOP + plot_h - y / y_span * plot_h;
    let baseline = py(0.0);

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

    let colors = viridis_palette(curves.len());
    for (curve, color) in curves.iter().zip(&colors) {
        let points: Vec<String> = curve
            .xs
            .iter()
            .zip(&curve.densities)
            .map(|(x, d)| format!("{:.2},{:.2}", px(*x), py(*d)))
            .collect();
        let (Some(first), Some(last)) = (curve.xs.first(), curve.xs.last()) else {
            continue;
        };
        writeln!(
            out,
            r#"<polygon points="{:.2},{:.2} {} {:.2},{:.2}" fill="{}" fill-opacity="0.4" stroke="{}" stroke-width="2"/>"#,
            px(*first),
            baseline,
            points.join(" "),
            px(*last),
            baseline,
            color,
            color
        )?;
    }

    // axes
    writeln!(
        out,
        r#"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
        l = MARGIN_LEFT,
        r = MARGIN_LEFT + plot_w,
        b = baseline
    )?;
    writeln!(
        out,
        r#"<line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="black"/>"#,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = baseline
    )?;
    for i in 0..=4 {
        let x = x_min + x_span * i as f64 / 4.0;
        writeln!(
            out,
            r#"<text x="{:.2}" y="{:.2}" font-size="15" text-anchor="middle">{:.3}</text>"#,
            px(x),
            baseline + 22.0,
            x
        )?;
    }
    writeln!(
        out,
        r#"<text x="{:.2}" y="{:.2}" font-size="22" text-anchor="middle">Avg Containment {}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 20.0,
        label
    )?;
    writeln!(
        out,
        r#"<text x="20" y="{:.2}" font-size="22" text-anchor="middle" transform="rotate(-90 20 {:.2})">Density</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    )?;

    // legend
    let legend_x = WIDTH - MARGIN_RIGHT + 30.0;
    writeln!(
        out,
        r#"<text x="{:.2}" y="{:.2}" font-size="15">lca_rank</text>"#,
        legend_x,
        MARGIN_TOP + 10.0
    )?;
    for (i, (curve, color)) in curves.iter().zip(&colors).enumerate() {
        let y = MARGIN_TOP + 35.0 + 25.0 * i as f64;
        writeln!(
            out,
            r#"<rect x="{:.2}" y="{:.2}" width="18" height="18" fill="{}" fill-opacity="0.4" stroke="{}"/>"#,
            legend_x,
            y - 14.0,
            color,
            color
        )?;
        writeln!(
            out,
            r#"<text x="{:.2}" y="{:.2}" font-size="15">{}</text>"#,
            legend_x + 26.0,
            y,
            curve.rank
        )?;
    }

    writeln!(out, "</svg>")?;
    out.flush()?;
    Ok(())
}
