// 命名ポリシー
//
// アプリケーション名、既定パス、生成されるオブジェクト名の単一ソースを提供します。

/// 現行アプリケーション名
pub const APP_NAME: &str = "pgshift";

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = "pgshift.yaml";

/// 論理削除時に付与するプレフィックス
pub const DELETED_PREFIX: &str = "_deleted:";

/// 外部キー制約名のプレフィックス
pub const FOREIGN_KEY_PREFIX: &str = "fk_";

/// 直接アクセス用ビューの既定プレフィックス
pub const DEFAULT_VIEW_PREFIX: &str = "A";

/// ベースライン保存先の既定スキーマ
pub const DEFAULT_BASELINE_SCHEMA: &str = "_meta";

/// ベースライン保存先の既定テーブル
pub const DEFAULT_BASELINE_TABLE: &str = "migrations";

/// 論理削除後の名前を返す
///
/// 既にプレフィックスが付いている場合はそのまま返します。
pub fn deleted_name(name: &str) -> String {
    if is_deleted_name(name) {
        name.to_string()
    } else {
        format!("{}{}", DELETED_PREFIX, name)
    }
}

/// 論理削除済みの名前かどうか
pub fn is_deleted_name(name: &str) -> bool {
    name.starts_with(DELETED_PREFIX)
}

/// リレーション名から外部キー制約名を生成
pub fn foreign_key_name(relation_name: &str) -> String {
    format!("{}{}", FOREIGN_KEY_PREFIX, relation_name)
}

/// `schema.table` 形式のキーを生成
pub fn table_key(schema_name: &str, table_name: &str) -> String {
    format!("{}.{}", schema_name, table_name)
}
