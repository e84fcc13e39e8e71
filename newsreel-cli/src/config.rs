//! CLI configuration

#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the newsreel service
    pub service_url: String,
}
