use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub amount: Option<f64>,
    pub frequency: Option<String>,
    pub currency: Option<String>,
    /// Accepts either `firstName` or the single-field `name` the simpler
    /// form variant sends.
    #[serde(alias = "name")]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Free-text note for note-taking deployments.
    pub prayer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PortalRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}
