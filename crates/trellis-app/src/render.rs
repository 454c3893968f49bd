//! Text rendering of a trellis grid
//!
//! Charts are laid out row by row in a fixed number of columns. Only charts
//! that have come near the viewport are drawn; the rest show a placeholder
//! until they are scrolled into range.

use ahash::AHashSet;
use anyhow::Result;
use trellis_core::{Domain, Facet, TrellisLayout, ValueKey};

/// Width in characters of one chart card
pub const CARD_WIDTH: usize = 28;

/// Distance in pixels below the viewport at which charts start mounting
pub const LOOK_AHEAD_PX: u32 = 200;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// How many charts fit in a row of `width` pixels
pub fn grid_columns(width: u32, min_chart_width: u32) -> usize {
    (width / min_chart_width.max(1)).max(1) as usize
}

/// Grid rows covered by the look-ahead margin
pub fn look_ahead_rows(chart_height: u32) -> usize {
    LOOK_AHEAD_PX.div_ceil(chart_height.max(1)) as usize
}

/// Scroll position over grid rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub first_row: usize,
    pub visible_rows: usize,
}

impl Viewport {
    pub fn new(visible_rows: usize) -> Self {
        Self {
            first_row: 0,
            visible_rows: visible_rows.max(1),
        }
    }

    /// Move by `delta` rows, staying within `total_rows`
    pub fn scroll(&mut self, delta: isize, total_rows: usize) {
        let last = total_rows.saturating_sub(self.visible_rows);
        let target = self.first_row as isize + delta;
        self.first_row = target.clamp(0, last as isize) as usize;
    }

    pub fn reset(&mut self) {
        self.first_row = 0;
    }

    pub fn rows(&self) -> std::ops::Range<usize> {
        self.first_row..self.first_row + self.visible_rows
    }
}

/// Trigger-once mounting of charts by label.
///
/// A chart mounts when its grid row comes within the look-ahead margin of
/// the viewport and stays mounted afterwards, even when filtered out and
/// back in.
#[derive(Debug, Default)]
pub struct LazyMount {
    margin_rows: usize,
    mounted: AHashSet<String>,
}

impl LazyMount {
    pub fn new(margin_rows: usize) -> Self {
        Self {
            margin_rows,
            mounted: AHashSet::new(),
        }
    }

    /// Mount every facet in or near the viewport
    pub fn observe<T>(&mut self, facets: &[Facet<'_, T>], columns: usize, viewport: &Viewport) {
        let columns = columns.max(1);
        let start = viewport.first_row.saturating_sub(self.margin_rows) * columns;
        let end = (viewport.rows().end + self.margin_rows) * columns;

        for facet in facets.iter().take(end).skip(start) {
            if self.mounted.insert(facet.label.clone()) {
                tracing::trace!("Mounted chart '{}'", facet.label);
            }
        }
    }

    pub fn is_mounted(&self, label: &str) -> bool {
        self.mounted.contains(label)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }
}

/// Draw the header and the visible grid rows
pub fn render_grid<T>(
    layout: &TrellisLayout<'_, T>,
    value_key: Option<&dyn ValueKey<T>>,
    columns: usize,
    viewport: &Viewport,
    mount: &LazyMount,
) -> Result<String> {
    let columns = columns.max(1);
    let mut out = String::new();

    let scale = match layout.domain {
        Some(domain) => format!("shared scale {}", domain),
        None => "independent scales".to_string(),
    };
    out.push_str(&format!("Showing {} charts, {}\n", layout.counts, scale));

    if layout.is_empty() {
        out.push_str("No charts match the current filter\n");
        return Ok(out);
    }

    let total_rows = layout.facets.len().div_ceil(columns);
    for row in viewport.rows().take_while(|row| *row < total_rows) {
        let start = row * columns;
        let end = (start + columns).min(layout.facets.len());

        let mut cards = Vec::with_capacity(end - start);
        for facet in &layout.facets[start..end] {
            cards.push(render_card(facet, value_key, layout.domain, mount)?);
        }
        out.push_str(&join_cards(&cards));
    }

    out.push_str(&format!(
        "rows {}-{} of {}\n",
        viewport.first_row + 1,
        viewport.rows().end.min(total_rows),
        total_rows
    ));
    Ok(out)
}

/// One chart card as three lines of `CARD_WIDTH` characters
pub fn render_card<T>(
    facet: &Facet<'_, T>,
    value_key: Option<&dyn ValueKey<T>>,
    domain: Option<Domain>,
    mount: &LazyMount,
) -> Result<[String; 3]> {
    let title = fit(&facet.label);

    if !mount.is_mounted(&facet.label) {
        return Ok([title, fit("…"), fit("")]);
    }

    let chart = match value_key {
        Some(key) => {
            let values = facet
                .rows
                .iter()
                .map(|&row| key.value_of(row))
                .collect::<trellis_core::Result<Vec<f64>>>()?;
            sparkline(&values, domain)
        }
        None => String::new(),
    };

    let noun = if facet.len() == 1 { "row" } else { "rows" };
    Ok([title, fit(&chart), fit(&format!("{} {}", facet.len(), noun))])
}

/// Bars scaled to `domain`, or to the values' own range without one
pub fn sparkline(values: &[f64], domain: Option<Domain>) -> String {
    let domain = domain.or_else(|| {
        let finite = values.iter().copied().filter(|v| !v.is_nan());
        let min = finite.clone().fold(f64::INFINITY, f64::min);
        let max = finite.fold(f64::NEG_INFINITY, f64::max);
        (min <= max).then(|| Domain::new(min, max))
    });
    let Some(domain) = domain else {
        return String::new();
    };

    let top = (SPARK_LEVELS.len() - 1) as f64;
    values
        .iter()
        .map(|&value| {
            if value.is_nan() {
                ' '
            } else {
                let level = (domain.normalize(value).clamp(0.0, 1.0) * top).round();
                SPARK_LEVELS[level as usize]
            }
        })
        .collect()
}

/// Truncate or pad to the card width
fn fit(text: &str) -> String {
    let count = text.chars().count();
    if count > CARD_WIDTH {
        let mut cut: String = text.chars().take(CARD_WIDTH - 1).collect();
        cut.push('…');
        cut
    } else {
        format!("{}{}", text, " ".repeat(CARD_WIDTH - count))
    }
}

fn join_cards(cards: &[[String; 3]]) -> String {
    let mut out = String::new();
    for line in 0..3 {
        let joined = cards
            .iter()
            .map(|card| card[line].as_str())
            .collect::<Vec<_>>()
            .join(" │ ");
        out.push_str(joined.trim_end());
        out.push('\n');
    }
    out.push('\n');
    out
}
