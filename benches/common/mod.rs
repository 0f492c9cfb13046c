use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

/// Writes a deterministic synthetic sales CSV with `rows` rows.
pub fn generate_sales_csv(rows: usize) -> NamedTempFile {
    let tmp = NamedTempFile::new().unwrap();
    let mut writer = BufWriter::new(tmp.reopen().unwrap());
    writeln!(
        writer,
        "Order_Date,Ship_Date,Ship_Mode,Sales,Quantity,Profit,Region,Sub_Category,Product_Reference,State"
    )
    .unwrap();

    let modes = ["Air", "Ground", "Sea"];
    let regions = ["East", "West", "Midwest", "South"];
    let categories = ["Chairs", "Tables", "Phones", "Binders"];
    for i in 0..rows {
        let month = i % 12 + 1;
        let day = i % 28 + 1;
        writeln!(
            writer,
            "2021-{:02}-{:02},2021-{:02}-{:02},{},{:.2},{},{:.2},{},{},P-{},S{}",
            month,
            day,
            month,
            (day + i % 3).min(28),
            modes[i % modes.len()],
            (i % 997) as f64 * 1.5 + 1.0,
            i % 7,
            (i % 113) as f64 - 40.0,
            regions[i % regions.len()],
            categories[i % categories.len()],
            i % 5000,
            i % 50
        )
        .unwrap();
    }
    writer.flush().unwrap();
    tmp
}
