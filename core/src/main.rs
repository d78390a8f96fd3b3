mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;
use mailing::MailingClient;
use processors::{PaymentProcessor, card::CardProcessor, wallet::WalletProcessor};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    // pick the payment processor for this deployment
    let processor: Arc<dyn PaymentProcessor> = match config.payment_processor.as_str() {
        "wallet" => {
            Arc::new(WalletProcessor::new(&config).expect("Failed to set up wallet processor"))
        }
        _ => Arc::new(CardProcessor::new(&config)),
    };

    // donors are registered on the mailing list after checkout
    let mailing = Arc::new(
        MailingClient::new(&config.mailing, config.outbound_timeout_secs)
            .expect("Failed to set up mailing client"),
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::from(processor.clone()))
            .app_data(web::Data::from(mailing.clone()))
            .wrap(limiter::global_middleware(10)) // max 10 requests per second
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_donate::mount_donations())
                    .service(api_donate::mount_contact()),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
