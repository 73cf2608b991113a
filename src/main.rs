//! Batch converter: ../input.json.gzip -> demo.xlsx

use std::process;
use std::time::Instant;

use sheetstream::{config, loader, writer};

const INPUT_PATH: &str = "../input.json.gzip";
const OUTPUT_PATH: &str = "demo.xlsx";

#[tokio::main(flavor = "current_thread")]
async fn main() -> sheetstream::Result<()> {
    // Startup-configuration fault: report and exit before any processing.
    let n_sheets = match config::sheet_count() {
        Ok(n) => n,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let start = Instant::now();
    let records = loader::load(INPUT_PATH)?;
    println!("Load Time: {:?}", start.elapsed());

    println!("Retrieved {} records", records.len());

    let start = Instant::now();
    writer::write_workbook(OUTPUT_PATH, &records, n_sheets).await?;
    println!("Write Time: {:?}", start.elapsed());

    Ok(())
}
