//! Per-row column derivations applied to the base sales table.
//!
//! Each [`Derivation`] is a stateless pass that takes a table and returns a
//! new one with a single column added (or, for the region rewrite, replaced).
//! [`derive_all`] runs them in their fixed order.

use log::debug;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use std::fmt;

use crate::{
    helpers::numeric::{checked_div, round_half_up},
    processor::{ProcessorError, column::Column, schema::*, table::Table},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derivation {
    /// Full month name of Order_Date
    OrderMonth,
    /// `"<days> Days"` between Order_Date and Ship_Date
    ShippingDuration,
    /// Sales / Quantity, 2 decimals
    SalesPerQuantity,
    /// Profit / Sales * 100, 2 decimals
    ProfitMargin,
    /// 4-digit year of Order_Date
    YearFromOrderDate,
    /// High for Air, Low for Ground, Medium otherwise
    OrderPriority,
    /// Sales * Quantity
    OrderValue,
    /// Midwest becomes West
    RegionRewrite,
}

impl Derivation {
    /// All passes, in the order they must run
    pub const ALL: [Derivation; 8] = [
        Derivation::OrderMonth,
        Derivation::ShippingDuration,
        Derivation::SalesPerQuantity,
        Derivation::ProfitMargin,
        Derivation::YearFromOrderDate,
        Derivation::OrderPriority,
        Derivation::OrderValue,
        Derivation::RegionRewrite,
    ];

    /// The column this pass writes
    pub fn column_name(&self) -> &'static str {
        match self {
            Derivation::OrderMonth => ORDER_MONTH,
            Derivation::ShippingDuration => SHIPPING_DURATION,
            Derivation::SalesPerQuantity => SALES_PER_QUANTITY,
            Derivation::ProfitMargin => PROFIT_MARGIN,
            Derivation::YearFromOrderDate => YEAR_FROM_ORDER_DATE,
            Derivation::OrderPriority => ORDER_PRIORITY,
            Derivation::OrderValue => ORDER_VALUE,
            Derivation::RegionRewrite => REGION,
        }
    }

    pub fn apply(&self, table: &Table) -> Result<Table, ProcessorError> {
        let column = match self {
            Derivation::OrderMonth => format_date(table, "%B")?,
            Derivation::YearFromOrderDate => format_date(table, "%Y")?,
            Derivation::ShippingDuration => {
                let ordered = table.column(ORDER_DATE)?.as_date_slice(ORDER_DATE)?;
                let shipped = table.column(SHIP_DATE)?.as_date_slice(SHIP_DATE)?;
                Column::Str(
                    ordered
                        .par_iter()
                        .zip(shipped.par_iter())
                        .map(|(o, s)| match (o, s) {
                            (Some(o), Some(s)) => {
                                Some(format!("{} Days", s.signed_duration_since(*o).num_days()))
                            }
                            _ => None,
                        })
                        .collect(),
                )
            }
            Derivation::SalesPerQuantity => {
                let sales = table.column(SALES)?.as_f64(SALES)?;
                let quantity = table.column(QUANTITY)?.as_f64(QUANTITY)?;
                Column::Float64(
                    sales
                        .par_iter()
                        .zip(quantity.par_iter())
                        .map(|(s, q)| checked_div(*s, *q).map(|v| round_half_up(v, 2)))
                        .collect(),
                )
            }
            Derivation::ProfitMargin => {
                let profit = table.column(PROFIT)?.as_f64(PROFIT)?;
                let sales = table.column(SALES)?.as_f64(SALES)?;
                Column::Float64(
                    profit
                        .par_iter()
                        .zip(sales.par_iter())
                        .map(|(p, s)| checked_div(*p, *s).map(|v| round_half_up(v * 100.0, 2)))
                        .collect(),
                )
            }
            Derivation::OrderPriority => {
                let modes = table.column(SHIP_MODE)?.as_str_slice(SHIP_MODE)?;
                Column::Str(
                    modes
                        .par_iter()
                        .map(|mode| Some(priority_for(mode.as_deref()).to_string()))
                        .collect(),
                )
            }
            Derivation::OrderValue => {
                let sales = table.column(SALES)?.as_f64(SALES)?;
                let quantity = table.column(QUANTITY)?.as_f64(QUANTITY)?;
                Column::Float64(
                    sales
                        .par_iter()
                        .zip(quantity.par_iter())
                        .map(|(s, q)| Some((*s)? * (*q)?))
                        .collect(),
                )
            }
            Derivation::RegionRewrite => {
                let regions = table.column(REGION)?.as_str_slice(REGION)?;
                Column::Str(
                    regions
                        .par_iter()
                        .map(|r| match r.as_deref() {
                            Some("Midwest") => Some("West".to_string()),
                            _ => r.clone(),
                        })
                        .collect(),
                )
            }
        };

        debug!("{self}: {} rows", column.len());
        table.with_column(self.column_name(), column)
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Priority for a ship mode. A missing mode falls through to Medium.
pub fn priority_for(ship_mode: Option<&str>) -> &'static str {
    match ship_mode {
        Some("Air") => "High",
        Some("Ground") => "Low",
        _ => "Medium",
    }
}

fn format_date(table: &Table, pattern: &str) -> Result<Column, ProcessorError> {
    let dates = table.column(ORDER_DATE)?.as_date_slice(ORDER_DATE)?;
    Ok(Column::Str(
        dates
            .par_iter()
            .map(|d| d.map(|d| d.format(pattern).to_string()))
            .collect(),
    ))
}

/// Applies every [`Derivation`] in order, returning the enriched table.
///
/// # Errors
/// Fails on the first pass whose input column is missing or mistyped, or
/// with [`ProcessorError::RowCountChanged`] if the row count moved.
pub fn derive_all(base: &Table) -> Result<Table, ProcessorError> {
    let enriched = Derivation::ALL
        .iter()
        .try_fold(base.clone(), |table, step| step.apply(&table))?;

    if enriched.row_count() != base.row_count() {
        return Err(ProcessorError::RowCountChanged {
            before: base.row_count(),
            after: enriched.row_count(),
        });
    }
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Value;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn base() -> Table {
        let headers = [
            ORDER_DATE, SHIP_DATE, SHIP_MODE, SALES, QUANTITY, PROFIT, REGION, SUB_CATEGORY,
            PRODUCT_REFERENCE, STATE,
        ];
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            vec![
                Column::Date(vec![date(2021, 2, 15), date(2021, 12, 30), None]),
                Column::Date(vec![date(2021, 2, 20), date(2022, 1, 2), date(2021, 1, 1)]),
                Column::Str(vec![Some("Air".into()), Some("Ground".into()), None]),
                Column::Float64(vec![Some(500.0), Some(0.0), Some(10.0)]),
                Column::Int64(vec![Some(2), Some(3), Some(0)]),
                Column::Float64(vec![Some(10.0), Some(5.0), Some(-1.0)]),
                Column::Str(vec![Some("Midwest".into()), Some("East".into()), None]),
                Column::Str(vec![Some("Chairs".into()); 3]),
                Column::Str(vec![Some("P1".into()); 3]),
                Column::Str(vec![Some("Ohio".into()); 3]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_worked_example_row() {
        let enriched = derive_all(&base()).unwrap();
        let v = |c: &str| enriched.value(c, 0).unwrap();
        assert_eq!(v(ORDER_MONTH), Value::Str("February".into()));
        assert_eq!(v(SHIPPING_DURATION), Value::Str("5 Days".into()));
        assert_eq!(v(SALES_PER_QUANTITY), Value::Float(250.0));
        assert_eq!(v(PROFIT_MARGIN), Value::Float(2.0));
        assert_eq!(v(YEAR_FROM_ORDER_DATE), Value::Str("2021".into()));
        assert_eq!(v(ORDER_PRIORITY), Value::Str("High".into()));
        assert_eq!(v(ORDER_VALUE), Value::Float(1000.0));
        assert_eq!(v(REGION), Value::Str("West".into()));
    }

    #[test]
    fn test_duration_crosses_year_boundary() {
        let enriched = derive_all(&base()).unwrap();
        assert_eq!(
            enriched.value(SHIPPING_DURATION, 1).unwrap(),
            Value::Str("3 Days".into())
        );
        assert_eq!(
            enriched.value(YEAR_FROM_ORDER_DATE, 1).unwrap(),
            Value::Str("2021".into())
        );
    }

    #[test]
    fn test_division_by_zero_is_null() {
        let enriched = derive_all(&base()).unwrap();
        // Sales = 0
        assert!(enriched.value(PROFIT_MARGIN, 1).unwrap().is_null());
        // Quantity = 0
        assert!(enriched.value(SALES_PER_QUANTITY, 2).unwrap().is_null());
        assert_eq!(enriched.value(ORDER_VALUE, 2).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_nulls_propagate() {
        let enriched = derive_all(&base()).unwrap();
        assert!(enriched.value(ORDER_MONTH, 2).unwrap().is_null());
        assert!(enriched.value(SHIPPING_DURATION, 2).unwrap().is_null());
        assert!(enriched.value(REGION, 2).unwrap().is_null());
        assert_eq!(
            enriched.value(ORDER_PRIORITY, 2).unwrap(),
            Value::Str("Medium".into())
        );
    }

    #[test]
    fn test_priority_mapping() {
        assert_eq!(priority_for(Some("Air")), "High");
        assert_eq!(priority_for(Some("Ground")), "Low");
        assert_eq!(priority_for(Some("Sea")), "Medium");
        assert_eq!(priority_for(Some("air")), "Medium");
        assert_eq!(priority_for(None), "Medium");
    }

    #[test]
    fn test_region_rewritten_in_place() {
        let table = base();
        let position = table.headers().iter().position(|h| h == REGION);
        let enriched = derive_all(&table).unwrap();
        assert_eq!(enriched.headers().iter().position(|h| h == REGION), position);
        assert_eq!(enriched.headers().len(), table.headers().len() + 7);
        assert_eq!(enriched.value(REGION, 1).unwrap(), Value::Str("East".into()));
    }

    #[test]
    fn test_missing_input_column_fails() {
        let table = base().drop_column(QUANTITY).unwrap();
        let err = derive_all(&table);
        assert!(matches!(err, Err(ProcessorError::MissingColumn(c)) if c == QUANTITY));
    }
}
