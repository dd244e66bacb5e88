// CLIテスト共通ヘルパー

#![allow(dead_code)]

use pgshift::core::config::{Config, DatabaseConfig};
use pgshift::core::db_meta::{
    ColumnNode, ConstraintNode, DbMeta, ReferentialAction, RelationNode, RelationReference,
    RelationSide, RelationType, SchemaNode, TableNode,
};
use pgshift::services::config_serializer::ConfigSerializer;
use pgshift::services::snapshot_io::SnapshotIo;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// テスト用プロジェクト
pub struct TestProject {
    pub temp_dir: TempDir,
    pub project_path: PathBuf,
}

impl TestProject {
    /// 空のプロジェクトディレクトリを作成
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let project_path = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            project_path,
        }
    }

    /// 設定ファイルを書き出す
    pub fn write_config(&self, database: DatabaseConfig) -> PathBuf {
        let config = ConfigSerializer::initial_config("development", database);
        self.write_config_file(&config)
    }

    pub fn write_config_file(&self, config: &Config) -> PathBuf {
        let path = self.project_path.join(Config::DEFAULT_CONFIG_PATH);
        fs::write(&path, ConfigSerializer::to_yaml(config).unwrap()).unwrap();
        path
    }

    /// スナップショットを書き出す
    pub fn write_snapshot(&self, file_name: &str, meta: &DbMeta) -> PathBuf {
        let path = self.project_path.join(file_name);
        SnapshotIo::save(meta, &path).unwrap();
        path
    }

    pub fn write_file(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.project_path.join(file_name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.project_path.join(file_name)
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }
}

/// User テーブルのみのツリー
pub fn users_snapshot() -> DbMeta {
    DbMeta::new().with_schema(
        SchemaNode::new("app").with_table(
            TableNode::new("app", "User")
                .with_column(ColumnNode::physical("id", "uuid"))
                .with_column(ColumnNode::physical("email", "varchar"))
                .with_constraint(ConstraintNode::primary_key("User_pkey", ["id"]))
                .with_constraint(ConstraintNode::not_null("User_email_not_null", "email")),
        ),
    )
}

/// User と Post、著者リレーションを持つツリー
pub fn blog_snapshot() -> DbMeta {
    let author = RelationNode::new("author")
        .with_side(
            RelationSide::new(
                "app",
                "Post",
                RelationType::One,
                RelationReference::new("app", "User", Some("id")),
            )
            .with_column("authorId")
            .with_on_delete(ReferentialAction::Cascade),
        )
        .with_side(RelationSide::new(
            "app",
            "User",
            RelationType::Many,
            RelationReference::new("app", "Post", None),
        ));

    let mut meta = users_snapshot();
    let schema = meta
        .schemas
        .remove("app")
        .unwrap()
        .with_table(
            TableNode::new("app", "Post")
                .with_column(ColumnNode::physical("id", "uuid"))
                .with_column(ColumnNode::physical("title", "text"))
                .with_constraint(ConstraintNode::primary_key("Post_pkey", ["id"])),
        );
    meta.with_schema(schema).with_relation(author)
}

/// 片側しか定義されていないリレーションを持つツリー
pub fn malformed_snapshot() -> DbMeta {
    users_snapshot().with_relation(RelationNode::new("broken").with_side(RelationSide::new(
        "app",
        "User",
        RelationType::One,
        RelationReference::new("app", "User", Some("id")),
    )))
}
