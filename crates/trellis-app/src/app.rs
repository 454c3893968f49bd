//! Trellis session: state, grid geometry and the interactive loop

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use trellis_core::events::events::FacetClicked;
use trellis_core::{
    QueryDebouncer, Record, SortSpec, SortType, TrellisState, ValueAccessor, ValueKey,
};
use trellis_data::TrellisConfig;

use crate::commands::{Command, HELP};
use crate::render::{look_ahead_rows, render_grid, LazyMount, Viewport};

/// Grid geometry
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub columns: usize,
    pub visible_rows: usize,
    pub chart_height: u32,
}

/// Region part of a composite label, the drill-down target of a click
pub fn drill_down_target<'a>(label: &'a str, separator: &str) -> &'a str {
    label.split(separator).next().unwrap_or(label).trim()
}

pub struct TrellisApp<T> {
    state: TrellisState<T>,
    value_key: Option<ValueAccessor<T>>,
    debouncer: QueryDebouncer,
    grid: GridSpec,
    viewport: Viewport,
    mount: LazyMount,
    drill_down: Arc<Mutex<Option<String>>>,
}

impl<T: Record + Clone + Send + Sync + 'static> TrellisApp<T> {
    pub fn new(rows: Vec<T>, config: &TrellisConfig, grid: GridSpec) -> Result<Self> {
        let value_key = config.value_key::<T>();

        let mut state = TrellisState::new(rows, config.facet_key::<T>()?)
            .with_sort(config.sort_spec()?)
            .with_options(config.layout_options());
        if let Some(key) = value_key.clone() {
            state = state.with_value_key(key);
        }

        let drill_down = Arc::new(Mutex::new(None));
        let separator = config.facet_separator.clone();
        let target = Arc::clone(&drill_down);
        state.event_bus().on::<FacetClicked<T>, _>(move |event| {
            let region = drill_down_target(&event.label, &separator).to_string();
            info!(
                "Drill down into '{}' ({} rows in '{}')",
                region,
                event.rows.len(),
                event.label
            );
            *target.lock() = Some(region);
        });

        Ok(Self {
            state,
            value_key,
            debouncer: QueryDebouncer::with_initial(config.debounce(), config.query.clone()),
            grid,
            viewport: Viewport::new(grid.visible_rows),
            mount: LazyMount::new(look_ahead_rows(grid.chart_height)),
            drill_down,
        })
    }

    pub fn state(&self) -> &TrellisState<T> {
        &self.state
    }

    /// Last region selected by a click
    pub fn drill_down(&self) -> Option<String> {
        self.drill_down.lock().clone()
    }

    /// Lay out, mount what is in view and draw the grid
    pub fn render(&mut self) -> Result<String> {
        let layout = self.state.layout()?;
        self.mount.observe(&layout.facets, self.grid.columns, &self.viewport);
        tracing::debug!("{} charts mounted", self.mount.mounted_count());

        let value_key = self.value_key.as_ref().map(|key| key as &dyn ValueKey<T>);
        render_grid(&layout, value_key, self.grid.columns, &self.viewport, &self.mount)
    }

    /// Apply one command; returns `false` when the session should end
    pub fn apply(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Query(text) => {
                self.debouncer.push(text);
                return Ok(true);
            }
            Command::Sort { name, direction } => {
                let direction = direction.unwrap_or(self.state.sort().direction);
                self.state.set_sort(SortSpec::new(SortType::parse(&name)?, direction));
            }
            Command::Scale(on) => self.state.set_shared_scale(on),
            Command::Click(label) => {
                if !self.state.click(&label)? {
                    println!("No chart labelled '{}'", label);
                }
                return Ok(true);
            }
            Command::Scroll(delta) => {
                let total_rows = self.state.layout()?.facets.len().div_ceil(self.grid.columns.max(1));
                self.viewport.scroll(delta, total_rows);
            }
            Command::Help => {
                println!("{}", HELP);
                return Ok(true);
            }
            Command::Quit => return Ok(false),
        }

        print!("{}", self.render()?);
        Ok(true)
    }

    /// Commit a settled query; returns whether the layout changed
    pub fn apply_query(&mut self, query: String) -> bool {
        if !self.state.set_query(query) {
            return false;
        }
        self.viewport.reset();
        true
    }

    /// Read commands from stdin until `:quit` or end of input
    pub async fn run_interactive(&mut self) -> Result<()> {
        println!("{}", HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut settled = self.debouncer.subscribe();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let keep_going = line
                        .parse::<Command>()
                        .and_then(|command| self.apply(command));
                    match keep_going {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(err) => warn!("{:#}", err),
                    }
                }
                changed = settled.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let query = settled.borrow_and_update().clone();
                    if self.apply_query(query) {
                        print!("{}", self.render()?);
                    }
                }
            }
        }

        self.debouncer.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use trellis_core::FieldValue;

    type Row = BTreeMap<String, FieldValue>;

    fn row(region: &str, category: &str, revenue: f64) -> Row {
        let mut row = Row::new();
        row.insert("region".to_string(), region.into());
        row.insert("category".to_string(), category.into());
        row.insert("revenue".to_string(), revenue.into());
        row
    }

    fn config() -> TrellisConfig {
        TrellisConfig {
            facet_columns: vec!["region".to_string(), "category".to_string()],
            value_column: Some("revenue".to_string()),
            debounce_ms: 50,
            ..TrellisConfig::default()
        }
    }

    fn app() -> TrellisApp<Row> {
        let rows = vec![
            row("Region 1", "Category A", 10.0),
            row("Region 1", "Category B", 50.0),
            row("Region 2", "Category A", 30.0),
        ];
        let grid = GridSpec {
            columns: 2,
            visible_rows: 2,
            chart_height: 200,
        };
        TrellisApp::new(rows, &config(), grid).unwrap()
    }

    #[test]
    fn test_drill_down_target() {
        assert_eq!(drill_down_target("Region 1 • Category A", " • "), "Region 1");
        assert_eq!(drill_down_target("Region 1", " • "), "Region 1");
    }

    #[test]
    fn test_render_and_sort() {
        let mut app = app();
        let text = app.render().unwrap();
        assert!(text.starts_with("Showing 3 / 3 charts, shared scale [0, 50]"));

        app.apply(":sort sum desc".parse().unwrap()).unwrap();
        let labels: Vec<String> = app.state().layout().unwrap().labels().map(String::from).collect();
        assert_eq!(labels[0], "Region 1 • Category B");
        assert_eq!(labels[2], "Region 1 • Category A");
    }

    #[test]
    fn test_click_sets_drill_down() {
        let mut app = app();
        app.apply(Command::Click("Region 2 • Category A".to_string())).unwrap();
        assert_eq!(app.drill_down().as_deref(), Some("Region 2"));

        app.apply(Command::Click("Nowhere".to_string())).unwrap();
        assert_eq!(app.drill_down().as_deref(), Some("Region 2"));
    }

    #[test]
    fn test_bad_sort_is_an_error() {
        let mut app = app();
        assert!(app.apply(":sort median".parse().unwrap()).is_err());
        assert!(!app.apply(Command::Quit).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_settles_through_debouncer() {
        let mut app = app();
        let mut settled = app.debouncer.subscribe();

        app.apply(Command::Query("Reg".to_string())).unwrap();
        app.apply(Command::Query("Region 2".to_string())).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        settled.changed().await.unwrap();
        let query = settled.borrow_and_update().clone();
        assert!(app.apply_query(query));

        let layout = app.state().layout().unwrap();
        assert_eq!(layout.counts.visible, 1);
        assert_eq!(layout.domain, Some(trellis_core::Domain::new(0.0, 50.0)));
    }
}
