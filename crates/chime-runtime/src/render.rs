#![forbid(unsafe_code)]

//! Render plan for one simulation run.
//!
//! The plan is what the dashboard shows below the sidebar: each result table
//! sampled every `table_stride` days, a CSV download link per table, whether
//! the table containers are visible, and the chart y-axis cap.

use std::fmt::Write as _;

use chime_core::codec::percent_encode;
use chime_core::value::DATE_FORMAT;
use chime_core::{DisplayOptions, ParsedParameters};
use serde::Serialize;

use crate::simulation::{ResultTable, SimulationOutput};

const CSV_DATA_URI_PREFIX: &str = "data:text/csv;charset=utf-8,";

/// One result table as the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub title: &'static str,
    /// Rows with `day % stride == 0`.
    pub table: ResultTable,
    /// `data:` URI with the full, unsampled table as CSV.
    pub csv_href: String,
    pub hidden: bool,
}

/// Everything rendered for one root-store state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub admissions: TableView,
    pub census: TableView,
    pub sir: TableView,
    pub display: DisplayOptions,
    pub max_y_axis: Option<i64>,
}

impl RenderPlan {
    /// Build the plan for `output`.
    ///
    /// Tables are hidden unless `show_tables` is on. A zero stride is treated
    /// as 1.
    #[must_use]
    pub fn build(
        output: &SimulationOutput,
        params: &ParsedParameters,
        display: DisplayOptions,
        table_stride: u32,
    ) -> Self {
        let hidden = !display.show_tables;
        let view = |title: &'static str, table: &ResultTable| TableView {
            title,
            table: table.sampled(table_stride),
            csv_href: csv_data_uri(table),
            hidden,
        };
        Self {
            admissions: view("admissions", &output.admissions),
            census: view("census", &output.census),
            sir: view("sir", &output.sir),
            display,
            max_y_axis: params.max_y_axis,
        }
    }

    /// Table views in display order.
    #[must_use]
    pub fn tables(&self) -> [&TableView; 3] {
        [&self.admissions, &self.census, &self.sir]
    }

    /// Hidden flag per table container.
    #[must_use]
    pub fn table_visibility(&self) -> [bool; 3] {
        self.tables().map(|view| view.hidden)
    }
}

/// Serialize `table` as CSV: `day,date,<columns...>`.
#[must_use]
pub fn to_csv(table: &ResultTable) -> String {
    let mut out = String::from("day,date");
    for column in &table.columns {
        out.push(',');
        out.push_str(column);
    }
    out.push('\n');
    for row in &table.rows {
        let _ = write!(out, "{},{}", row.day, row.date.format(DATE_FORMAT));
        for value in &row.values {
            let _ = write!(out, ",{value}");
        }
        out.push('\n');
    }
    out
}

/// CSV download link for `table`.
#[must_use]
pub fn csv_data_uri(table: &ResultTable) -> String {
    format!("{CSV_DATA_URI_PREFIX}{}", percent_encode(&to_csv(table)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::TableRow;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn table(days: i64) -> ResultTable {
        let start = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        ResultTable {
            columns: vec!["hospitalized".into(), "icu".into()],
            rows: (0..days)
                .map(|day| TableRow {
                    day,
                    date: start + chrono::Days::new(day as u64),
                    values: vec![day as f64, 0.5],
                })
                .collect(),
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        assert_eq!(
            to_csv(&table(2)),
            "day,date,hospitalized,icu\n0,2020-03-07,0,0.5\n1,2020-03-08,1,0.5\n"
        );
    }

    #[test]
    fn data_uri_is_escaped() {
        let href = csv_data_uri(&table(1));
        assert_eq!(
            href,
            "data:text/csv;charset=utf-8,day%2Cdate%2Chospitalized%2Cicu%0A0%2C2020-03-07%2C0%2C0.5%0A"
        );
    }
}
