use vaasansahko::api::auth::AuthSession;
use vaasansahko::{CookieSession, Credentials};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let credentials = Credentials::from_env_values();
    let session = CookieSession::new()?;

    AuthSession::new(&session, &credentials).login().await?;
    println!("login handshake completed");

    Ok(())
}
