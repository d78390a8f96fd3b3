use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes server host and port, CORS settings, logging preferences,
/// the donation policy, the selected payment processor and its credentials,
/// and the mailing-list collaborator configuration.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// The origin of the donation web app, used as the fallback for
    /// success/cancel redirect destinations when no Origin header is present.
    pub web_app_origin: String,
    /// Brand name stamped on catalog products and checkout descriptions.
    pub brand_name: String,
    /// Which payment processor handles donations: "card" or "wallet".
    pub payment_processor: String,
    /// Validation rules applied to incoming donations.
    pub donation: DonationPolicy,
    /// Secret API key for the card processor.
    pub stripe_secret_key: String,
    /// Configuration for the wallet processor's REST API.
    pub wallet: WalletConfig,
    /// Configuration for the mailing-list collaborator.
    pub mailing: MailingConfig,
    /// Timeout in seconds applied to every outbound processor/collaborator call.
    pub outbound_timeout_secs: u64,
}

#[derive(Clone, Debug)]
/// Donation validation policy.
///
/// `min_amount` is in major currency units. `allow_zero` permits the
/// zero-amount "request only" submission, which skips payment entirely.
pub struct DonationPolicy {
    pub min_amount: f64,
    pub allow_zero: bool,
}

#[derive(Clone, Debug)]
/// Credentials and endpoint for the wallet processor's OAuth-style API.
pub struct WalletConfig {
    /// Base URL of the wallet processor REST API.
    pub api_base: String,
    /// The client ID used for the client-credentials token exchange.
    pub client_id: String,
    /// The client secret used for the client-credentials token exchange.
    pub client_secret: String,
    /// Registered webhook id used for signature verification.
    /// When empty, inbound events are accepted with a warning (dev mode).
    pub webhook_id: String,
}

#[derive(Clone, Debug)]
/// Mailing-list service credentials. When the API key or audience id is
/// missing the collaborator degrades to a no-op.
pub struct MailingConfig {
    pub api_key: String,
    pub audience_id: String,
    /// Tag assigned to registered donors.
    pub tag: String,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: "development" or "production"
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `WEB_APP_ORIGIN`: Fallback redirect origin (default: "http://localhost:3000")
    /// - `BRAND_NAME`: Brand stamped on catalog objects (default: "The Moscow Times")
    /// - `PAYMENT_PROCESSOR`: "card" or "wallet" (default: "card")
    /// - `DONATION_MIN_AMOUNT`: Minimum donation in major units (default: 1)
    /// - `DONATION_ALLOW_ZERO`: Permit zero-amount submissions (default: false)
    /// - `PAYPAL_API_BASE`: Wallet API base (default: sandbox)
    /// - `OUTBOUND_TIMEOUT_SECS`: Outbound call timeout (default: 30)
    /// - Processor and mailing-list credentials default to empty strings;
    ///   empty mailing-list credentials disable that collaborator.
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing
    /// or if numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            web_app_origin: env::var("WEB_APP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            brand_name: env::var("BRAND_NAME")
                .unwrap_or_else(|_| "The Moscow Times".to_string()),
            payment_processor: env::var("PAYMENT_PROCESSOR")
                .unwrap_or_else(|_| "card".to_string())
                .to_lowercase(),
            donation: DonationPolicy {
                min_amount: env::var("DONATION_MIN_AMOUNT")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .expect("DONATION_MIN_AMOUNT must be a valid number"),
                allow_zero: env::var("DONATION_ALLOW_ZERO")
                    .unwrap_or_else(|_| "false".to_string())
                    .to_lowercase()
                    == "true",
            },
            stripe_secret_key,
            wallet: WalletConfig {
                api_base: env::var("PAYPAL_API_BASE")
                    .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string()),
                client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
                webhook_id: env::var("PAYPAL_WEBHOOK_ID").unwrap_or_default(),
            },
            mailing: MailingConfig {
                api_key: env::var("MAILCHIMP_API_KEY").unwrap_or_default(),
                audience_id: env::var("MAILCHIMP_AUDIENCE_ID").unwrap_or_default(),
                tag: env::var("MAILCHIMP_TAG").unwrap_or_else(|_| "Donor".to_string()),
            },
            outbound_timeout_secs: env::var("OUTBOUND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}
