use vaasansahko::api::auth::AuthSession;
use vaasansahko::api::consumption::ConsumptionReader;
use vaasansahko::{CookieSession, Credentials};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let credentials = Credentials::from_env_values();
    let session = CookieSession::new()?;

    AuthSession::new(&session, &credentials).login().await?;

    let series = ConsumptionReader::new(&session, &credentials)
        .hourly()
        .await?;
    println!("{} hourly points", series.len());
    println!("{}", series.as_polars_df()?);

    Ok(())
}
