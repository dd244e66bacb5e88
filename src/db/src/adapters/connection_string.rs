// 接続文字列ビルダー
//
// DatabaseConfig からPostgreSQLの接続文字列を生成する。

use crate::core::config::DatabaseConfig;
use urlencoding::encode;

/// 接続文字列を生成
///
/// ユーザー名とパスワードはパーセントエンコードされます。
/// これにより、`@`, `:`, `/`, `#`, `?` などの特殊文字を含むパスワードでも
/// 正しく接続文字列が構築されます。
/// `ssl_mode` と `options` はクエリパラメータとして付与します（キー順）。
pub fn build_connection_string(config: &DatabaseConfig) -> String {
    let user = config.user.as_deref().unwrap_or("postgres");
    let encoded_user = encode(user);
    let auth = match config.password.as_deref() {
        Some(password) if !password.is_empty() => {
            let encoded_password = encode(password);
            format!("{}:{}", encoded_user, encoded_password)
        }
        _ => encoded_user.to_string(),
    };

    let mut params: Vec<(String, String)> = Vec::new();
    if let Some(ssl_mode) = &config.ssl_mode {
        params.push(("sslmode".to_string(), ssl_mode.to_string()));
    }
    if let Some(options) = &config.options {
        let mut options: Vec<_> = options.iter().collect();
        options.sort();
        params.extend(options.into_iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let base = format!(
        "postgresql://{}@{}:{}/{}",
        auth,
        config.host,
        config.resolved_port(),
        config.database
    );
    if params.is_empty() {
        return base;
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", base, query)
}
