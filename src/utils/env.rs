use crate::utils::error::{Result, StockError};
use regex::Regex;

/// 替換環境變數 (例如 `${API_KEY}` 或 `${PORT:-8000}`)
///
/// `${VAR:-x}` 在未設定或空字串時用預設值，`${VAR-x}` 只在未設定時用。
/// 未設定且沒有預設值的變數保留原樣。
pub fn substitute_env_vars(content: &str) -> Result<String> {
    substitute_with(content, |name| std::env::var(name).ok())
}

pub fn substitute_with<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?)-([^}]*))?\}").map_err(|e| {
        StockError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        }
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let empty_uses_default = caps.get(2).is_some_and(|colon| colon.as_str() == ":");
        match (lookup(var_name), caps.get(3)) {
            (Some(value), Some(default)) if value.is_empty() && empty_uses_default => {
                default.as_str().to_string()
            }
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => caps[0].to_string(),
        }
    });

    Ok(result.into_owned())
}
