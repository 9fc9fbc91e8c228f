//! Weekly summary table.
//!
//! # Responsibility
//! - Collect realized task nodes with their ancestor chain as row labels.
//! - Fold work-log charges of the selected week into per-day columns.
//! - Track staleness from tree notices and day rollover.
//!
//! # Invariants
//! - One row per task node that has charges in the span, keyed by node id.
//! - Rows appear in tree pre-order.
//! - A day cell that would overflow fails the reload; totals saturate.

use crate::model::node::{NodeId, NodeKind};
use crate::repo::node_repo::NodeRepository;
use crate::repo::work_repo::WorkRepository;
use crate::summary::period::{target_date, Mode, WeekSpan, When, DAYS_PER_WEEK};
use crate::summary::{SummaryError, SummaryResult};
use crate::tree::arena::NodeHandle;
use crate::tree::notice::ChangeNotice;
use crate::tree::store::TreeStore;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

const LABEL_SEPARATOR: &str = " / ";

/// Whether `reload` may fetch unrealized parts of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Materialization {
    /// Use only nodes already realized by earlier traversal.
    #[default]
    RealizedOnly,
    /// Realize the whole tree before aggregating.
    Full,
}

/// One task's charges for the selected week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub node_id: NodeId,
    pub label: String,
    pub days: [i64; DAYS_PER_WEEK],
}

impl SummaryRow {
    /// Week total, saturating at the `i64` bounds.
    pub fn total(&self) -> i64 {
        self.days.iter().fold(0, |sum, value| sum.saturating_add(*value))
    }
}

/// Single cell of the tabular projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryCell<'a> {
    Label(&'a str),
    Value(i64),
}

/// Read-only weekly summary over a [`TreeStore`].
#[derive(Debug, Clone)]
pub struct SummaryModel {
    mode: Mode,
    when: When,
    today: NaiveDate,
    week_selection: NaiveDate,
    materialization: Materialization,
    span: WeekSpan,
    rows: Vec<SummaryRow>,
    stale: bool,
}

impl SummaryModel {
    /// Creates an empty summary showing the current week.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            mode: Mode::Week,
            when: When::Current,
            today,
            week_selection: today,
            materialization: Materialization::default(),
            span: WeekSpan::containing(today),
            rows: Vec::new(),
            stale: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn when(&self) -> When {
        self.when
    }

    pub fn span(&self) -> WeekSpan {
        self.span
    }

    pub fn week_selection(&self) -> NaiveDate {
        self.week_selection
    }

    pub fn materialization(&self) -> Materialization {
        self.materialization
    }

    /// Whether the table no longer reflects the tree, work log or period.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.stale = true;
        }
    }

    pub fn set_when(&mut self, when: When) {
        self.when = when;
        self.refresh_span();
    }

    /// Stores the date used by [`When::WeekNumber`].
    pub fn set_selected_week(&mut self, date: NaiveDate) {
        self.week_selection = date;
        self.refresh_span();
    }

    /// Switches to an explicit ISO week.
    pub fn select_week_number(&mut self, iso_year: i32, week: u32) -> SummaryResult<()> {
        let span = WeekSpan::iso(iso_year, week)
            .ok_or_else(|| SummaryError::InvalidWeek(format!("{iso_year}-W{week:02}")))?;
        self.week_selection = span.first();
        self.set_when(When::WeekNumber);
        Ok(())
    }

    pub fn set_materialization(&mut self, materialization: Materialization) {
        if self.materialization != materialization {
            self.materialization = materialization;
            self.stale = true;
        }
    }

    /// Advances the notion of "today", moving CURRENT/PREVIOUS across weeks.
    ///
    /// Returns whether the displayed span changed.
    pub fn day_changed(&mut self, today: NaiveDate) -> bool {
        self.today = today;
        self.refresh_span()
    }

    /// Marks the table stale after a tree change.
    pub fn handle_notice(&mut self, notice: &ChangeNotice) {
        debug!(
            "event=summary_notice module=summary status=ok structural={}",
            notice.is_structural()
        );
        self.stale = true;
    }

    /// Recomputes rows for the selected span.
    ///
    /// With [`Materialization::RealizedOnly`] the tree is only read.
    pub fn reload<R, W>(&mut self, tree: &mut TreeStore<R>, work: &W) -> SummaryResult<()>
    where
        R: NodeRepository,
        W: WorkRepository,
    {
        if self.materialization == Materialization::Full {
            tree.realize_all()?;
        }

        let tasks = realized_tasks(tree);
        let lookup: HashMap<NodeId, &str> = tasks
            .iter()
            .map(|(id, label)| (*id, label.as_str()))
            .collect();

        let mut days_by_node: HashMap<NodeId, [i64; DAYS_PER_WEEK]> = HashMap::new();
        for charge in work.daily_charges(self.span.first(), self.span.last())? {
            if !lookup.contains_key(&charge.node) {
                continue;
            }
            if let Some(index) = self.span.day_index(charge.day) {
                let days = days_by_node.entry(charge.node).or_insert([0; DAYS_PER_WEEK]);
                days[index] = days[index]
                    .checked_add(charge.total)
                    .ok_or(SummaryError::ChargeOverflow {
                        node: charge.node,
                        day: charge.day,
                    })?;
            }
        }

        self.rows = tasks
            .into_iter()
            .filter_map(|(node_id, label)| {
                days_by_node.get(&node_id).map(|days| SummaryRow {
                    node_id,
                    label,
                    days: *days,
                })
            })
            .collect();
        self.stale = false;

        info!(
            "event=summary_reload module=summary status=ok week_start={} rows={} total={}",
            self.span.first(),
            self.rows.len(),
            self.grand_total()
        );
        Ok(())
    }

    /// Column headers: name, one per day, total.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.column_count());
        headers.push("Name".to_string());
        headers.extend(self.span.days().map(|day| day.format("%a %d").to_string()));
        headers.push("Total".to_string());
        headers
    }

    pub fn column_count(&self) -> usize {
        DAYS_PER_WEEK + 2
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn row_for(&self, node_id: NodeId) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.node_id == node_id)
    }

    /// Cell at `(row, column)`; column 0 is the label, the last is the total.
    pub fn cell(&self, row: usize, column: usize) -> Option<SummaryCell<'_>> {
        let summary_row = self.rows.get(row)?;
        match column {
            0 => Some(SummaryCell::Label(summary_row.label.as_str())),
            c if c <= DAYS_PER_WEEK => {
                summary_row.days.get(c - 1).copied().map(SummaryCell::Value)
            }
            c if c == DAYS_PER_WEEK + 1 => Some(SummaryCell::Value(summary_row.total())),
            _ => None,
        }
    }

    /// Per-day totals over all rows, saturating at the `i64` bounds.
    pub fn column_totals(&self) -> [i64; DAYS_PER_WEEK] {
        let mut totals = [0i64; DAYS_PER_WEEK];
        for row in &self.rows {
            for (total, value) in totals.iter_mut().zip(row.days) {
                *total = total.saturating_add(value);
            }
        }
        totals
    }

    pub fn grand_total(&self) -> i64 {
        self.rows
            .iter()
            .map(SummaryRow::total)
            .fold(0, i64::saturating_add)
    }

    /// Human-readable description of the selected period.
    pub fn selection_text(&self) -> String {
        let (year, week) = self.span.iso_week();
        format!(
            "Week {week}, {year} ({} to {})",
            self.span.first(),
            self.span.last()
        )
    }

    fn refresh_span(&mut self) -> bool {
        let span = WeekSpan::containing(target_date(self.when, self.today, self.week_selection));
        if span == self.span {
            return false;
        }
        self.span = span;
        self.stale = true;
        true
    }
}

/// Realized task nodes in pre-order, labelled by their ancestor chain.
fn realized_tasks<R: NodeRepository>(tree: &TreeStore<R>) -> Vec<(NodeId, String)> {
    let mut tasks = Vec::new();
    let mut pending: Vec<(NodeHandle, String)> = tree
        .get(tree.root_handle())
        .map(|root| {
            root.children()
                .iter()
                .rev()
                .map(|child| (*child, String::new()))
                .collect()
        })
        .unwrap_or_default();

    while let Some((handle, prefix)) = pending.pop() {
        let Some(node) = tree.get(handle) else {
            continue;
        };
        let label = if prefix.is_empty() {
            node.name.clone()
        } else {
            format!("{prefix}{LABEL_SEPARATOR}{}", node.name)
        };

        if node.kind() == NodeKind::Task {
            if let Some(id) = node.id {
                tasks.push((id, label.clone()));
            }
        }
        pending.extend(
            node.children()
                .iter()
                .rev()
                .map(|child| (*child, label.clone())),
        );
    }
    tasks
}
