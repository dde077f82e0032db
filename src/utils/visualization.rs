//! Visualization utilities (text-based for terminal output)
//!
//! Every renderer returns a `String`; callers decide where it goes.

use ndarray::{Array1, Array2};
use std::fmt::Write;

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];
const GLYPHS: &[char] = &[
    'o', 'x', '+', '*', '#', '@', '%', '&', '=', 's', 'v', '^', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
    'h', 'k', 'm', 'n', 'p',
];

/// Glyph used for a cluster id in the scatter plot
pub fn glyph(group: usize) -> char {
    GLYPHS[group % GLYPHS.len()]
}

/// Horizontal bar chart scaled to the largest value
pub fn render_bar_chart(labels: &[String], values: &[f64], width: usize, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));

    let max_val = values.iter().cloned().fold(0.0f64, f64::max);
    let label_width = labels.iter().map(|s| s.chars().count()).max().unwrap_or(0);

    for (label, &value) in labels.iter().zip(values.iter()) {
        let bar_len = if max_val > 0.0 {
            ((value / max_val) * width as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "{:>lw$} | {:<bw$} {:.0}",
            label,
            "#".repeat(bar_len),
            value,
            lw = label_width,
            bw = width
        );
    }
    out
}

/// Shaded heatmap with the raw cell values alongside
pub fn render_heatmap(matrix: &Array2<f64>, row_labels: &[String], col_labels: &[String]) -> String {
    let mut out = String::new();
    let max_val = matrix.iter().cloned().fold(0.0f64, f64::max);
    let label_width = row_labels.iter().map(|s| s.chars().count()).max().unwrap_or(6);
    let cell = col_labels
        .iter()
        .map(|s| s.chars().count())
        .chain(matrix.iter().map(|v| format!("{:.0}", v).len()))
        .max()
        .unwrap_or(1)
        + 2;

    let _ = write!(out, "{:>w$} ", "", w = label_width);
    for label in col_labels {
        let _ = write!(out, "{:>w$}", label, w = cell);
    }
    out.push('\n');

    for (i, label) in row_labels.iter().enumerate().take(matrix.nrows()) {
        let _ = write!(out, "{:>w$} ", label, w = label_width);
        for j in 0..matrix.ncols() {
            let val = matrix[[i, j]];
            let shade = if max_val > 0.0 {
                let idx = ((val / max_val) * (SHADES.len() - 1) as f64).round() as usize;
                SHADES[idx.min(SHADES.len() - 1)]
            } else {
                SHADES[0]
            };
            let text = format!("{}{:.0}", shade, val);
            let _ = write!(out, "{:>w$}", text, w = cell);
        }
        out.push('\n');
    }
    out
}

/// ASCII scatter plot of 2-D points, one glyph per group
pub fn render_scatter(points: &Array2<f64>, groups: &[usize], width: usize, height: usize) -> String {
    let mut out = String::new();
    if points.nrows() == 0 || points.ncols() < 2 || width == 0 || height == 0 {
        return out;
    }

    let xs = points.column(0);
    let ys = points.column(1);
    let (x_min, x_max) = bounds(xs.iter().copied());
    let (y_min, y_max) = bounds(ys.iter().copied());
    let x_range = (x_max - x_min).max(1e-12);
    let y_range = (y_max - y_min).max(1e-12);

    let mut grid = vec![vec![' '; width]; height];
    for (i, &group) in groups.iter().enumerate().take(points.nrows()) {
        let col = (((xs[i] - x_min) / x_range) * (width - 1) as f64).round() as usize;
        let row = (((y_max - ys[i]) / y_range) * (height - 1) as f64).round() as usize;
        grid[row.min(height - 1)][col.min(width - 1)] = glyph(group);
    }

    let _ = writeln!(out, "+{}+", "-".repeat(width));
    for line in grid {
        let _ = writeln!(out, "|{}|", line.into_iter().collect::<String>());
    }
    let _ = writeln!(out, "+{}+", "-".repeat(width));
    out
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Explained variance of the leading components (text-based)
pub fn render_variance_plot(explained_variance_ratio: &Array1<f64>, n_show: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>5} {:>10} {:>12} Bar", "PC", "Variance%", "Cumulative%");
    let _ = writeln!(out, "{:-<50}", "");

    let mut cumulative = 0.0;
    for (i, &var) in explained_variance_ratio.iter().take(n_show).enumerate() {
        cumulative += var;
        let _ = writeln!(
            out,
            "{:>5} {:>9.2}% {:>11.2}% {}",
            i + 1,
            var * 100.0,
            cumulative * 100.0,
            "#".repeat((var * 50.0) as usize)
        );
    }

    if explained_variance_ratio.len() > n_show {
        let _ = writeln!(
            out,
            "... and {} more components",
            explained_variance_ratio.len() - n_show
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_bar_chart() {
        let chart = render_bar_chart(
            &["rocket".to_string(), "orbit".to_string()],
            &[4.0, 2.0],
            8,
            "Cluster 0",
        );
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "Cluster 0");
        assert!(lines[2].contains("########"));
        assert!(lines[3].contains("#### "));
        assert!(!lines[3].contains("#####"));
    }

    #[test]
    fn test_heatmap_shows_counts() {
        let matrix = array![[4.0, 0.0], [1.0, 3.0]];
        let out = render_heatmap(
            &matrix,
            &["space".to_string(), "hockey".to_string()],
            &["0".to_string(), "1".to_string()],
        );
        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("█4"));
        assert!(out.lines().nth(2).unwrap().starts_with("hockey"));
    }

    #[test]
    fn test_scatter_places_every_group() {
        let points = array![[0.0, 0.0], [1.0, 1.0], [0.5, 0.2]];
        let out = render_scatter(&points, &[0, 1, 2], 20, 10);
        assert_eq!(out.lines().count(), 12);
        for g in 0..3 {
            assert!(out.contains(glyph(g)));
        }
        assert!(render_scatter(&Array2::zeros((0, 2)), &[], 20, 10).is_empty());
    }

    #[test]
    fn test_variance_plot() {
        let out = render_variance_plot(&array![0.5, 0.3, 0.2], 2);
        assert!(out.contains("80.00%"));
        assert!(out.contains("1 more components"));
    }
}
