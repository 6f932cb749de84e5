use financial_ratio_builder::*;
use std::error::Error;

const SAMPLE_SNAPSHOT: &str = r#"{
    "Revenue": "48,210.00",
    "Cost of Goods Sold": "29,870.55",
    "Operating Expenses": "41,300.10",
    "Depreciation": "1,820.00",
    "Amortization": "240.00",
    "Profit After Tax": "3,980.25",
    "Beginning Share Holders Equity": "31,400",
    "Ending Share Holders Equity": "34,150",
    "Long Term Debt": "9,500",
    "Short Term Debt": "2,750",
    "Beginning Assets": "52,000",
    "Ending Assets": "56,300",
    "Total Assets": "56,300",
    "Current Assets": "18,600",
    "Current Liabilities": "11,900",
    "Inventories": "6,450",
    "Cash & Cash Equivalents": "3,120",
    "Beginning Fixed Assets": "27,800",
    "Ending Fixed Assets": "29,100",
    "Beginning Current Assets": "17,200",
    "Beginning Current Liabilities": "11,300",
    "Ending Current Assets": "18,600",
    "Ending Current Liabilities": "11,900",
    "Interest Expense": "910",
    "Share Price": "NOT_FOUND",
    "Number of Outstanding Shares": "1,250"
}"#;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    // Optional: path to a JSON snapshot and a tax rate.
    let args: Vec<String> = std::env::args().collect();
    let json = match args.get(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_SNAPSHOT.to_string(),
    };
    let tax_rate = match args.get(2) {
        Some(rate) => rate.parse::<f64>()?,
        None => DEFAULT_TAX_RATE,
    };

    let values: EntitySnapshot = serde_json::from_str(&json)?;
    let engine = RatioEngine::with_tax_rate(tax_rate)?;

    let mut sheet = EntitySheet::new();
    sheet.apply_batch(values)?;
    sheet.lock();

    let report = RatioReport::from_sheet(&sheet, &engine);
    println!("{}", report.to_markdown());

    let mut writer = csv::Writer::from_path("ratios.csv")?;
    writer.write_record(["Metric", "Value"])?;
    for line in &report.ratios {
        writer.write_record([line.metric.label(), line.value.as_str()])?;
    }
    writer.flush()?;
    println!("📄 Wrote ratios.csv");

    std::fs::write("ratio_report.json", report.to_json()?)?;
    println!("📄 Wrote ratio_report.json");

    Ok(())
}
