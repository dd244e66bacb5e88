// Adapters
// PostgreSQLとの接続・SQL生成・適用を担当

pub mod connection_string;
pub mod database;
pub mod extension_registry;
pub mod migration_applier;
pub mod sql_generator;
pub mod sql_quote;
