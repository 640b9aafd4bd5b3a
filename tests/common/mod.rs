use meta_graph_doctor::Client;
use wiremock::MockServer;

// --- CONSTANTS ---
#[allow(dead_code)]
pub const APP_ID: &str = "123456789012345";
#[allow(dead_code)]
pub const APP_SECRET: &str = "a1b2c3d4e5f6";
#[allow(dead_code)]
pub const APP_TOKEN: &str = "123456789012345|a1b2c3d4e5f6";
#[allow(dead_code)]
pub const BUSINESS_ID: &str = "555000111222333";
#[allow(dead_code)]
pub const WABA_ID: &str = "987654321098765";
#[allow(dead_code)]
pub const PAGE_ID: &str = "112233445566778";
#[allow(dead_code)]
pub const ACCESS_TOKEN: &str = "EAAD...";
#[allow(dead_code)]
pub const PAGE_TOKEN: &str = "EAAPAGE...";

// --- TEST SETUP ---

/// A client pointed at the mock server, on API version 21.0.
#[allow(dead_code)]
pub fn client_for(mock_server: &MockServer) -> Client {
    Client::builder()
        .api_version("21.0")
        .base_url(mock_server.uri())
        .build()
        .unwrap()
}
