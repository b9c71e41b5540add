use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://hospital.db")]
    pub database_url: String,

    #[envconfig(from = "BIND_ADDR", default = "0.0.0.0:8080")]
    pub bind_addr: String,

    #[envconfig(from = "DB_MAX_CONNECTIONS", default = "5")]
    pub db_max_connections: u32,

    #[envconfig(from = "SESSION_TTL_HOURS", default = "24")]
    pub session_ttl_hours: i64,

    #[envconfig(from = "PASSWORD_HASH_ITERATIONS", default = "100000")]
    pub password_hash_iterations: u32,

    #[envconfig(from = "BOOTSTRAP_ADMIN_USERNAME", default = "admin")]
    pub bootstrap_admin_username: String,

    /// When unset, no admin is created and an empty database stays locked.
    #[envconfig(from = "BOOTSTRAP_ADMIN_PASSWORD")]
    pub bootstrap_admin_password: Option<String>,
}

impl Config {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}
