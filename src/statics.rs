use std::sync::LazyLock;

pub static APP_ENV: LazyLock<String> = LazyLock::new(|| {
    crate::utils::get_env::get_optional_env_var("APP_ENV").unwrap_or("production".to_string())
});

pub fn is_development() -> bool {
    APP_ENV.eq_ignore_ascii_case("development")
}
