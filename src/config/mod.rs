/// Runtime configuration, read from `window.ENV` once at startup.
///
/// Every key is optional; the backend usually serves the app from the same
/// origin, so the default API prefix is empty.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    pub autosave_tick_ms: u32,
    pub autosave_idle_ms: u32,
    pub load_timeout_ms: u32,
    pub save_max_attempts: u32,
    pub save_backoff_base_ms: u32,
    pub save_backoff_max_ms: u32,
    pub log_level: log::Level,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            autosave_tick_ms: 2_000,
            autosave_idle_ms: 15_000,
            load_timeout_ms: 10_000,
            save_max_attempts: 5,
            save_backoff_base_ms: 2_000,
            save_backoff_max_ms: 60_000,
            log_level: log::Level::Info,
        }
    }
}

impl EnvConfig {
    pub fn new() -> Self {
        let Some(env) = web_sys::window().and_then(|w| w.get("ENV")) else {
            return Self::default();
        };
        if env.is_undefined() || !env.is_object() {
            return Self::default();
        }

        // Accept both `API_URL` (documented) and `api_url` spellings.
        let lookup = |key: &str| -> Option<String> {
            let upper = js_sys::Reflect::get(&env, &key.to_uppercase().into()).ok();
            let lower = js_sys::Reflect::get(&env, &key.to_lowercase().into()).ok();
            upper
                .into_iter()
                .chain(lower)
                .find_map(|v| v.as_string().or_else(|| v.as_f64().map(|n| n.to_string())))
        };

        Self::from_lookup(lookup)
    }

    /// Build a config from a key lookup. Unknown or malformed values keep their defaults.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let num = |key: &str, fallback: u32| -> u32 {
            lookup(key)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n as u32)
                .unwrap_or(fallback)
        };

        Self {
            api_url: lookup("api_url")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or(d.api_url),
            autosave_tick_ms: num("autosave_tick_ms", d.autosave_tick_ms).max(100),
            autosave_idle_ms: num("autosave_idle_ms", d.autosave_idle_ms),
            load_timeout_ms: num("load_timeout_ms", d.load_timeout_ms).max(1_000),
            save_max_attempts: num("save_max_attempts", d.save_max_attempts).max(1),
            save_backoff_base_ms: num("save_backoff_base_ms", d.save_backoff_base_ms),
            save_backoff_max_ms: num("save_backoff_max_ms", d.save_backoff_max_ms),
            log_level: lookup("log_level")
                .and_then(|s| s.trim().parse::<log::Level>().ok())
                .unwrap_or(d.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(pairs: &[(&str, &str)]) -> EnvConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_env_uses_defaults() {
        assert_eq!(cfg(&[]), EnvConfig::default());
    }

    #[test]
    fn api_url_trailing_slash_is_trimmed() {
        let c = cfg(&[("api_url", "https://notes.example.com/")]);
        assert_eq!(c.api_url, "https://notes.example.com");
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let c = cfg(&[("autosave_idle_ms", "soon"), ("load_timeout_ms", "-5")]);
        assert_eq!(c.autosave_idle_ms, 15_000);
        assert_eq!(c.load_timeout_ms, 10_000);
    }

    #[test]
    fn tick_and_attempts_are_clamped() {
        let c = cfg(&[("autosave_tick_ms", "0"), ("save_max_attempts", "0")]);
        assert_eq!(c.autosave_tick_ms, 100);
        assert_eq!(c.save_max_attempts, 1);
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!(cfg(&[("log_level", "DEBUG")]).log_level, log::Level::Debug);
        assert_eq!(cfg(&[("log_level", "loud")]).log_level, log::Level::Info);
    }
}
