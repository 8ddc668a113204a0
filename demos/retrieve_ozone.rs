use chrono::NaiveDate;
use qualar::{Qualar, QualarError};
use std::env;

const OZONE: u32 = 63;
const PM10: u32 = 12;
const PINHEIROS: u32 = 99;

#[tokio::main]
async fn main() -> Result<(), QualarError> {
    configure_polars_display();
    let client = Qualar::from_env()?;

    let retrieval = client
        .retrieve()
        .start_date(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap())
        .end_date(NaiveDate::from_ymd_opt(2021, 1, 7).unwrap())
        .parameters(vec![OZONE, PM10])
        .stations(PINHEIROS)
        .call()
        .await?;

    for series in &retrieval.series {
        println!("{}: {} hourly slots", series.key, series.frame.height());
    }
    println!("{:#?}", retrieval.to_frame()?);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "30");
}
