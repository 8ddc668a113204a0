use chrono::NaiveDate;
use qualar::{Qualar, QualarError};
use std::path::PathBuf;
use std::time::Duration;

const PARAMETERS: [u32; 3] = [63, 12, 57];
const STATIONS: [u32; 4] = [99, 72, 83, 85];

#[tokio::main]
async fn main() -> Result<(), QualarError> {
    let client = Qualar::from_env()?;

    let manifest = client
        .retrieve_robust()
        .start_date(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
        .end_date(NaiveDate::from_ymd_opt(2022, 1, 31).unwrap())
        .parameters(PARAMETERS)
        .stations(STATIONS)
        .save_path(PathBuf::from("data/january_2022.csv"))
        .max_attempts(5)
        .retry_delay(Duration::from_secs(2))
        .resume(true)
        .call()
        .await?;

    println!(
        "{} pairs with data, {} without",
        manifest.successes.len(),
        manifest.failures.len()
    );
    for key in &manifest.failures {
        println!("  failed: {}", key);
    }

    Ok(())
}
