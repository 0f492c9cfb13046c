//! The fixed set of analytical queries run against the enriched sales table.
//!
//! Every query borrows the table, resolves all of the columns it touches up
//! front, and returns a new result table.

use std::fmt;
use std::str::FromStr;

use crate::{
    helpers::numeric::round_half_up,
    processor::{
        AggregateOp, FilterPredicate, ProcessorError, SortKey, Value, column::Column, schema::*,
        table::Table, window::WindowSpec,
    },
};

pub const RANK_OF_ORDERS: &str = "Rank_Of_Orders";
pub const OCCURRENCES: &str = "Occurrences";
pub const SAME_ORDERS: &str = "Same_Orders";
pub const LATEST_ORDER_DATE: &str = "Latest_orderDate";
pub const ROLLING_SUM_BY_MONTH: &str = "Rolling_Sum_By_Month";
pub const AVG_SALES_PER_MONTH: &str = "Avg_Sales_Per_Month";
pub const HIGHEST_ORDER_VALUE: &str = "Highest_Order_Value";
pub const PREFERRED_MODE: &str = "Preffered_mode";
pub const LAG: &str = "Lag";
pub const PROFIT_BY_REGION: &str = "Profit_By_Region";

const ORDER_KEY: [&str; 4] = [ORDER_DATE, SHIP_DATE, PRODUCT_REFERENCE, STATE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// Distinct (Sub_Category, Profit_Margin) with their dense rank by margin
    RankByProfitMargin,
    /// Every order line with its dense rank by margin
    RankAllOrdersByProfitMargin,
    /// Order keys appearing at least twice, by counting per group
    DuplicateOrders,
    /// Order keys appearing at least twice, by numbering rows per key
    DuplicateOrdersByRowNumber,
    /// Most recent Order_Date per Product_Reference
    LatestOrderPerProduct,
    /// Sales summed per (Order_Date, Order_Month) through a window
    CumulativeSalesByMonth,
    /// Mean Sales per (Order_Date, Order_Month)
    AverageSalesByMonth,
    /// Largest Order_Value per State
    MaxOrderValueByState,
    /// Non-null Order_Priority count per Ship_Mode
    PreferredShipMode,
    /// Sub_Category of rows whose margin beats the previous order's.
    ///
    /// The name is historical: `current > previous` picks rising margins.
    /// The condition is kept as is.
    DecreasingProfitMargin,
    /// Mean Profit_Margin per Region, 2 decimals
    AverageProfitMarginByRegion,
}

impl Query {
    pub const ALL: [Query; 11] = [
        Query::RankByProfitMargin,
        Query::RankAllOrdersByProfitMargin,
        Query::DuplicateOrders,
        Query::DuplicateOrdersByRowNumber,
        Query::LatestOrderPerProduct,
        Query::CumulativeSalesByMonth,
        Query::AverageSalesByMonth,
        Query::MaxOrderValueByState,
        Query::PreferredShipMode,
        Query::DecreasingProfitMargin,
        Query::AverageProfitMarginByRegion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Query::RankByProfitMargin => "rank_by_profit_margin",
            Query::RankAllOrdersByProfitMargin => "rank_all_orders_by_profit_margin",
            Query::DuplicateOrders => "duplicate_orders",
            Query::DuplicateOrdersByRowNumber => "duplicate_orders_by_row_number",
            Query::LatestOrderPerProduct => "latest_order_per_product",
            Query::CumulativeSalesByMonth => "cumulative_sales_by_month",
            Query::AverageSalesByMonth => "average_sales_by_month",
            Query::MaxOrderValueByState => "max_order_value_by_state",
            Query::PreferredShipMode => "preferred_ship_mode",
            Query::DecreasingProfitMargin => "decreasing_profit_margin",
            Query::AverageProfitMarginByRegion => "average_profit_margin_by_region",
        }
    }

    /// The question the query answers
    pub fn question(&self) -> &'static str {
        match self {
            Query::RankByProfitMargin | Query::RankAllOrdersByProfitMargin => {
                "Rank orders based on profit margin in descending order"
            }
            Query::DuplicateOrders | Query::DuplicateOrdersByRowNumber => {
                "Find orders with the same Order_Date, Ship_Date, Product_Reference, and State"
            }
            Query::LatestOrderPerProduct => {
                "Retrieve the latest order for each unique Product_Reference"
            }
            Query::CumulativeSalesByMonth => {
                "Calculate the cumulative sales for each month, ordered by Order_Date"
            }
            Query::AverageSalesByMonth => "Determine the average sales for each month",
            Query::MaxOrderValueByState => "Find the highest order value in each State",
            Query::PreferredShipMode => "Identify the most preferred ship mode",
            Query::DecreasingProfitMargin => {
                "Identify products where the profit margin has been decreasing over time"
            }
            Query::AverageProfitMarginByRegion => {
                "Calculate the average profit margin for each region"
            }
        }
    }

    pub fn run(&self, table: &Table) -> Result<Table, ProcessorError> {
        match self {
            Query::RankByProfitMargin => Ok(rank_by_profit_margin(table)?.distinct()),
            Query::RankAllOrdersByProfitMargin => rank_by_profit_margin(table),
            Query::DuplicateOrders => duplicate_orders(table),
            Query::DuplicateOrdersByRowNumber => duplicate_orders_by_row_number(table),
            Query::LatestOrderPerProduct => table
                .query()
                .group_by(PRODUCT_REFERENCE)
                .aggregate_as(ORDER_DATE, AggregateOp::Max, LATEST_ORDER_DATE)
                .execute(),
            Query::CumulativeSalesByMonth => cumulative_sales_by_month(table),
            Query::AverageSalesByMonth => table
                .query()
                .group_by_multi(vec![ORDER_DATE, ORDER_MONTH])
                .aggregate_as(SALES, AggregateOp::Avg, AVG_SALES_PER_MONTH)
                .execute(),
            Query::MaxOrderValueByState => {
                // Sub_Category is part of the selection but not the grouping,
                // so it has no single value per State and is dropped.
                table.require(&[SUB_CATEGORY])?;
                table
                    .query()
                    .group_by(STATE)
                    .aggregate_as(ORDER_VALUE, AggregateOp::Max, HIGHEST_ORDER_VALUE)
                    .execute()
            }
            Query::PreferredShipMode => table
                .query()
                .group_by(SHIP_MODE)
                .aggregate_as(ORDER_PRIORITY, AggregateOp::Count, PREFERRED_MODE)
                .execute(),
            Query::DecreasingProfitMargin => decreasing_profit_margin(table),
            Query::AverageProfitMarginByRegion => average_profit_margin_by_region(table),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Query {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Query::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| ProcessorError::Parse(format!("unknown query: {s}")))
    }
}

/// Sub_Category, Profit_Margin and the dense rank over all rows by margin,
/// highest first. Rows come out ordered by rank, then Sub_Category.
fn rank_by_profit_margin(table: &Table) -> Result<Table, ProcessorError> {
    let selected = table.select(&[SUB_CATEGORY, PROFIT_MARGIN])?;
    let ranks = WindowSpec::new()
        .order_by(vec![SortKey::desc(PROFIT_MARGIN)])
        .dense_rank(&selected)?;

    selected
        .with_column(RANK_OF_ORDERS, ranks)?
        .sort_by(&[SortKey::asc(RANK_OF_ORDERS), SortKey::asc(SUB_CATEGORY)])
}

fn duplicate_orders(table: &Table) -> Result<Table, ProcessorError> {
    table
        .query()
        .group_by_multi(ORDER_KEY.to_vec())
        .count_rows_as(OCCURRENCES)
        .execute()?
        .filter(OCCURRENCES, &FilterPredicate::GreaterThan(Value::Int(1)))?
        .select(&ORDER_KEY)
}

fn duplicate_orders_by_row_number(table: &Table) -> Result<Table, ProcessorError> {
    let selected = table.select(&ORDER_KEY)?;
    let numbers = WindowSpec::new()
        .partition_by(&ORDER_KEY)
        .order_by(ORDER_KEY.iter().map(|c| SortKey::asc(c)).collect())
        .row_number(&selected)?;

    Ok(selected
        .with_column(SAME_ORDERS, numbers)?
        .filter(SAME_ORDERS, &FilterPredicate::GreaterThan(Value::Int(1)))?
        .drop_column(SAME_ORDERS)?
        .distinct())
}

/// The window is partitioned and ordered on the same date, so every row is
/// a peer of every other in its partition and the running sum is the full
/// per-date total.
fn cumulative_sales_by_month(table: &Table) -> Result<Table, ProcessorError> {
    let selected = table.select(&[ORDER_DATE, ORDER_MONTH, SALES])?;
    let rolling = WindowSpec::new()
        .partition_by(&[ORDER_DATE, ORDER_MONTH])
        .order_by(vec![SortKey::asc(ORDER_DATE)])
        .running_sum(&selected, SALES)?;

    selected
        .with_column(ROLLING_SUM_BY_MONTH, rolling)?
        .drop_column(SALES)?
        .distinct()
        .sort_by(&[SortKey::asc(ORDER_DATE)])
}

fn decreasing_profit_margin(table: &Table) -> Result<Table, ProcessorError> {
    let selected = table.select(&[ORDER_DATE, SUB_CATEGORY, PROFIT_MARGIN])?;
    let lagged = WindowSpec::new()
        .partition_by(&[SUB_CATEGORY])
        .order_by(vec![SortKey::asc(ORDER_DATE)])
        .lag(&selected, PROFIT_MARGIN, 1)?;
    let with_lag = selected.with_column(LAG, lagged)?;

    let current = with_lag.column(PROFIT_MARGIN)?;
    let previous = with_lag.column(LAG)?;
    // null on either side never compares true
    let rows: Vec<usize> = (0..with_lag.row_count())
        .filter(|&i| match (current.get(i).as_f64(), previous.get(i).as_f64()) {
            (Some(c), Some(p)) => c > p,
            _ => false,
        })
        .collect();

    with_lag.take(&rows).select(&[SUB_CATEGORY])
}

fn average_profit_margin_by_region(table: &Table) -> Result<Table, ProcessorError> {
    let averaged = table
        .query()
        .group_by(REGION)
        .aggregate_as(PROFIT_MARGIN, AggregateOp::Avg, PROFIT_BY_REGION)
        .execute()?;

    let rounded = averaged
        .column(PROFIT_BY_REGION)?
        .as_f64(PROFIT_BY_REGION)?
        .into_iter()
        .map(|v| v.map(|v| round_half_up(v, 2)))
        .collect();
    averaged.with_column(PROFIT_BY_REGION, Column::Float64(rounded))
}
