//! Configuración central de la aplicación.
//! Carga variables de entorno (.env opcional vía `dotenvy`) y expone una
//! estructura inmutable (`CONFIG`). Los valores inválidos caen al default
//! con un warning.
use std::env;

use log::warn;
use once_cell::sync::Lazy;

use fin_core::constants::DEFAULT_TIMEOUT_MS;

pub const ENV_TIMEOUT: &str = "FINFLOW_DEFAULT_TIMEOUT_MS";
pub const ENV_DEBUG: &str = "FINFLOW_DEBUG";
pub const ENV_LOG: &str = "FINFLOW_LOG";

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Timeout por ejecución cuando la petición no fija uno.
    pub default_timeout_ms: u64,
    /// Adjuntar traza de depuración a cada resultado.
    pub debug: bool,
    /// Nivel de log por defecto (si `RUST_LOG` no está definido).
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { default_timeout_ms: DEFAULT_TIMEOUT_MS,
               debug: false,
               log_level: "info".to_string() }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Lee `.env` (si existe) y luego el entorno del proceso.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración desde una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Self
        where F: Fn(&str) -> Option<String>
    {
        let defaults = Self::default();

        let default_timeout_ms = match lookup(ENV_TIMEOUT) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    warn!("{ENV_TIMEOUT}='{raw}' is not a positive integer; using {}", defaults.default_timeout_ms);
                    defaults.default_timeout_ms
                }
            },
            None => defaults.default_timeout_ms,
        };

        let debug = match lookup(ENV_DEBUG) {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                                            warn!("{ENV_DEBUG}='{raw}' is not a boolean; using false");
                                            defaults.debug
                                        }),
            None => defaults.debug,
        };

        let log_level = match lookup(ENV_LOG) {
            Some(raw) if LOG_LEVELS.contains(&raw.trim().to_ascii_lowercase().as_str()) => raw.trim().to_ascii_lowercase(),
            Some(raw) => {
                warn!("{ENV_LOG}='{raw}' is not a log level; using {}", defaults.log_level);
                defaults.log_level
            }
            None => defaults.log_level,
        };

        Self { default_timeout_ms,
               debug,
               log_level }
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);
