use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base URL prepended to object keys when building public picture URLs.
    pub public_base_url: String,
    /// Top-level key prefix under which all folders live.
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeConfig {
    pub api_url: String,
    pub secret_key: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub admin_token: String,
    pub storage: StorageConfig,
    pub charge: ChargeConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let admin_token = std::env::var("ADMIN_TOKEN")?;
        let endpoint = std::env::var("S3_ENDPOINT")?;
        let storage = StorageConfig {
            bucket: std::env::var("S3_BUCKET")?,
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_base_url: std::env::var("S3_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| endpoint.clone()),
            namespace: std::env::var("STORAGE_NAMESPACE").unwrap_or_else(|_| "vinted".into()),
            endpoint,
        };
        let charge = ChargeConfig {
            api_url: std::env::var("CHARGE_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com/v1/charges".into()),
            secret_key: std::env::var("STRIPE_KEY_SECRET")?,
            currency: std::env::var("CHARGE_CURRENCY").unwrap_or_else(|_| "eur".into()),
        };
        Ok(Self {
            database_url,
            admin_token,
            storage,
            charge,
        })
    }
}
