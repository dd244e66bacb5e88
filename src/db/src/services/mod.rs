// Services Layer
// ドメインロジックを実行するサービス層

pub mod baseline_checksum;
pub mod config_loader;
pub mod config_serializer;
pub mod database_config_resolver;
pub mod delta_detector;
pub mod meta_validator;
pub mod migration_pipeline;
pub mod rename_resolver;
pub mod snapshot_io;
pub mod statement_sequencer;
