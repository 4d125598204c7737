use tracing::Level;

#[rocket::main]
async fn main() {
    #[cfg(debug_assertions)]
    let level = Some(Level::DEBUG);
    #[cfg(not(debug_assertions))]
    let level = Some(Level::INFO);

    let r = lessonplan_backend::create(level).await;
    match r {
        Ok(rocket) => {
            if let Err(e) = rocket.launch().await {
                tracing::error!("Error launching server: {}", e);
            }
        }
        Err(e) => {
            tracing::error!("Unable to start server: {}", e);
        }
    };
}
