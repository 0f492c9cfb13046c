use chrono::{Days, NaiveDate};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

const SHIP_MODES: [&str; 4] = ["Air", "Ground", "Sea", "Rail"];
const REGIONS: [&str; 5] = ["East", "West", "Midwest", "South", "Central"];
const SUB_CATEGORIES: [&str; 6] = ["Chairs", "Tables", "Phones", "Binders", "Paper", "Storage"];
const STATES: [&str; 6] = ["Texas", "Ohio", "Utah", "California", "New York", "Florida"];

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/sales_store.csv".to_string());
    let rows: usize = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(1_000_000);

    let file = File::create(&path).unwrap();
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "Order_Date,Ship_Date,Ship_Mode,Sales,Quantity,Profit,Region,Sub_Category,Product_Reference,State"
    )
    .unwrap();

    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let mut rng = rand::rng();
    for _ in 0..rows {
        let order_date = start + Days::new(rng.random_range(0..1460));
        let ship_date = order_date + Days::new(rng.random_range(0..8));
        let sales: f64 = rng.random_range(1.0..2000.0);
        let profit: f64 = sales * rng.random_range(-0.4..0.5);
        writeln!(
            writer,
            "{},{},{},{:.2},{},{:.2},{},{},P-{:05},{}",
            order_date,
            ship_date,
            SHIP_MODES[rng.random_range(0..SHIP_MODES.len())],
            sales,
            rng.random_range(1..15),
            profit,
            REGIONS[rng.random_range(0..REGIONS.len())],
            SUB_CATEGORIES[rng.random_range(0..SUB_CATEGORIES.len())],
            rng.random_range(0..5000),
            STATES[rng.random_range(0..STATES.len())],
        )
        .unwrap();
    }

    println!("Sample CSV generated: {} ({} rows)", path, rows);
}
