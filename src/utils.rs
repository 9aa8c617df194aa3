use std::path::Path;

use plotters::prelude::*;
use tracing::Level;

use crate::error::{Result, RlError};

/// Index of the first maximum value; NaN entries never win.
#[inline(always)]
pub fn argmax<T: PartialOrd + Copy>(values: impl IntoIterator<Item = T>) -> usize {
    let mut iter = values.into_iter().enumerate();
    let (mut best, mut max) = match iter.next() {
        Some(first) => first,
        None => return 0,
    };
    for (i, v) in iter {
        if v > max || max != max {
            best = i;
            max = v;
        }
    }
    best
}

/// Picks the index whose cumulative probability first exceeds `random`.
#[inline(always)]
pub fn categorical_sample(probs: &[f64], random: f64) -> usize {
    let mut b: f64 = 0.0;
    for (i, p) in probs.iter().enumerate() {
        b += p;
        if b > random {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}

/// Numerically stable softmax of `beta * values`.
pub fn softmax(values: &[f64], beta: f64) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (beta * (v - max)).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// `ln(sum(exp(beta * values)))` without overflow.
pub fn log_sum_exp(values: &[f64], beta: f64) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = values.iter().map(|v| (beta * (v - max)).exp()).sum();
    beta * max + sum.ln()
}

pub fn moving_average(window: usize, vector: &[f64]) -> Vec<f64> {
    let window = window.max(1);
    vector
        .chunks(window)
        .map(|slice| slice.iter().sum::<f64>() / slice.len() as f64)
        .collect()
}

fn plot_err<E: std::fmt::Display>(e: E) -> RlError {
    RlError::Plot(e.to_string())
}

/// Draws one line per series into a PNG chart at `path`.
pub fn plot_moving_average(
    values: &[Vec<f64>],
    legends: &[&str],
    title: &str,
    path: &Path,
) -> Result<()> {
    let max_len = values.iter().map(|v| v.len()).max().unwrap_or(0).max(2);
    let finite = values.iter().flatten().filter(|v| v.is_finite());
    let (mut min_y, mut max_y) = finite.fold((f64::MAX, f64::MIN), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    });
    if min_y > max_y {
        min_y = 0.0;
        max_y = 1.0;
    }
    if (max_y - min_y).abs() < f64::EPSILON {
        min_y -= 1.0;
        max_y += 1.0;
    }

    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(max_len - 1) as f64, min_y..max_y)
        .map_err(plot_err)?;
    chart.configure_mesh().draw().map_err(plot_err)?;

    for (i, serie) in values.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        let label = legends.get(i).copied().unwrap_or("");
        chart
            .draw_series(LineSeries::new(
                serie.iter().enumerate().map(|(x, y)| (x as f64, *y)),
                style,
            ))
            .map_err(plot_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax([1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(Vec::<f64>::new()), 0);
    }

    #[test]
    fn categorical_sample_walks_cumulative_mass() {
        let probs = [0.2, 0.5, 0.3];
        assert_eq!(categorical_sample(&probs, 0.0), 0);
        assert_eq!(categorical_sample(&probs, 0.25), 1);
        assert_eq!(categorical_sample(&probs, 0.95), 2);
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let probs = softmax(&[1000.0, 1000.0, 1000.0, 1000.0], 10.0);
        assert!(probs.iter().all(|p| (p - 0.25).abs() < 1e-12));
        let lse = log_sum_exp(&[1000.0, 1000.0], 1.0);
        assert!((lse - (1000.0 + 2.0_f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn moving_average_keeps_partial_tail() {
        let avg = moving_average(2, &[1.0, 3.0, 5.0]);
        assert_eq!(avg, vec![2.0, 5.0]);
    }
}
