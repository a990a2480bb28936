use rocket::{launch, routes};
use std::sync::Arc;

use kala_liquidity::{bootstrap, config, engine::poller};
use kala_liquidity::web::routes::{
    deployment_config, describe_error, earn_add, earn_quote, earn_remove, earn_remove_preview,
    earn_status, earn_view, health, portfolio, withdraw_validate,
};

#[launch]
async fn rocket() -> _ {
    env_logger::init();

    // Load configuration
    let config = config::Config::from_env()
        .expect("Failed to load configuration");

    // Build application state
    let app_state = Arc::new(
        bootstrap::AppState::new(&config)
            .expect("Failed to initialize application state")
    );

    // Background refresh of pool and tracked-account snapshots
    tokio::spawn(poller::run(app_state.clone(), app_state.poll_interval));

    // Configure Rocket
    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("address", "0.0.0.0"));

    rocket::custom(figment)
        .manage(app_state)
        .mount(
            "/",
            routes![
                health,
                deployment_config,
                earn_view,
                earn_quote,
                earn_remove_preview,
                earn_add,
                earn_remove,
                earn_status,
                portfolio,
                withdraw_validate,
                describe_error
            ],
        )
}
