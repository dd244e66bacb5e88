// メタデータモデル
//
// データベース構造のスナップショット（スキーマ、テーブル、カラム、制約、リレーション、ENUM）を
// 表現する型。マイグレーション計算ごとに構築され、構築後は変更されない。

use crate::core::naming::table_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 拡張ブロック（拡張名 -> 不透明な設定値）
pub type ExtensionBlocks = BTreeMap<String, serde_json::Value>;

/// メタデータツリー
///
/// スキーマ、ENUM型、リレーションをそれぞれ名前順のマップで保持します。
/// すべてのマップは順序付きのため、走査順は常に決定的です。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DbMeta {
    /// スキーマ定義（スキーマ名 -> SchemaNode）
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaNode>,

    /// ENUM型定義（型名 -> EnumTypeNode）
    #[serde(default)]
    pub enums: BTreeMap<String, EnumTypeNode>,

    /// リレーション定義（リレーション名 -> RelationNode）
    #[serde(default)]
    pub relations: BTreeMap<String, RelationNode>,
}

impl DbMeta {
    /// 空のツリーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// スキーマを追加
    pub fn with_schema(mut self, schema: SchemaNode) -> Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// ENUM型を追加
    pub fn with_enum(mut self, enum_type: EnumTypeNode) -> Self {
        self.enums.insert(enum_type.name.clone(), enum_type);
        self
    }

    /// リレーションを追加
    pub fn with_relation(mut self, relation: RelationNode) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// スキーマもENUMもリレーションも持たないかどうか
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.enums.is_empty() && self.relations.is_empty()
    }

    /// テーブルを取得
    pub fn get_table(&self, schema_name: &str, table_name: &str) -> Option<&TableNode> {
        self.schemas
            .get(schema_name)
            .and_then(|schema| schema.tables.get(table_name))
    }

    /// `schema.table` 形式のキーでテーブルを取得
    pub fn get_table_by_key(&self, key: &str) -> Option<&TableNode> {
        let (schema_name, table_name) = key.split_once('.')?;
        self.get_table(schema_name, table_name)
    }

    /// 全テーブルを名前順に走査
    pub fn tables(&self) -> impl Iterator<Item = &TableNode> {
        self.schemas.values().flat_map(|schema| schema.tables.values())
    }

    /// 指定ENUM型を使用しているカラムの一覧
    ///
    /// ENUMに宣言された逆参照と、ツリー内のカラム型から検出した参照を合わせて返します。
    pub fn enum_usages(&self, enum_name: &str) -> Vec<EnumColumnRef> {
        let mut usages: Vec<EnumColumnRef> = self
            .enums
            .get(enum_name)
            .map(|e| e.columns.clone())
            .unwrap_or_default();

        for table in self.tables() {
            for column in table.columns.values() {
                if column.custom_type() == Some(enum_name) {
                    usages.push(EnumColumnRef::new(
                        &table.schema_name,
                        &table.name,
                        &column.name,
                    ));
                }
            }
        }

        usages.sort();
        usages.dedup();
        usages
    }

    /// 指定スキーマを除外したツリーを返す
    pub fn without_schemas(&self, ignored: &[String]) -> Self {
        let mut meta = self.clone();
        meta.schemas.retain(|name, _| !ignored.contains(name));
        meta.relations.retain(|_, relation| {
            relation
                .sides
                .values()
                .all(|side| !ignored.contains(&side.schema_name))
        });
        meta
    }

    /// マップのキーから各ノードの名前・所属スキーマを補完する
    ///
    /// 手書きのスナップショットではノード名をキーだけで表現できるようにします。
    pub fn normalize(mut self) -> Self {
        for (schema_name, schema) in self.schemas.iter_mut() {
            schema.name = schema_name.clone();
            for (table_name, table) in schema.tables.iter_mut() {
                table.name = table_name.clone();
                table.schema_name = schema_name.clone();
                for (column_name, column) in table.columns.iter_mut() {
                    column.name = column_name.clone();
                }
                for (constraint_name, constraint) in table.constraints.iter_mut() {
                    constraint.name = constraint_name.clone();
                }
            }
        }
        for (enum_name, enum_type) in self.enums.iter_mut() {
            enum_type.name = enum_name.clone();
        }
        for (relation_name, relation) in self.relations.iter_mut() {
            relation.name = relation_name.clone();
            for side in relation.sides.values_mut() {
                side.name = relation_name.clone();
            }
        }
        self
    }
}

/// スキーマノード
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// スキーマ名
    #[serde(default)]
    pub name: String,

    /// リネーム元のスキーマ名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,

    /// テーブル定義（テーブル名 -> TableNode）
    #[serde(default)]
    pub tables: BTreeMap<String, TableNode>,
}

impl SchemaNode {
    /// 新しいスキーマを作成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// リネーム元を指定
    pub fn with_old_name(mut self, old_name: impl Into<String>) -> Self {
        self.old_name = Some(old_name.into());
        self
    }

    /// テーブルを追加（所属スキーマはこのスキーマに揃える）
    pub fn with_table(mut self, mut table: TableNode) -> Self {
        table.schema_name = self.name.clone();
        self.tables.insert(table.name.clone(), table);
        self
    }
}

/// テーブルノード
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    /// テーブル名
    #[serde(default)]
    pub name: String,

    /// 所属スキーマ名
    #[serde(default)]
    pub schema_name: String,

    /// リネーム元のテーブル名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,

    /// 移動元のスキーマ名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_schema_name: Option<String>,

    /// カラム定義（カラム名 -> ColumnNode）
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnNode>,

    /// 制約定義（制約名 -> ConstraintNode）
    #[serde(default)]
    pub constraints: BTreeMap<String, ConstraintNode>,

    /// テーブル単位の拡張ブロック
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: ExtensionBlocks,
}

impl TableNode {
    /// 新しいテーブルを作成
    pub fn new(schema_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: schema_name.into(),
            ..Default::default()
        }
    }

    /// リネーム元を指定
    pub fn with_old_name(mut self, old_name: impl Into<String>) -> Self {
        self.old_name = Some(old_name.into());
        self
    }

    /// 移動元スキーマを指定
    pub fn with_old_schema_name(mut self, old_schema_name: impl Into<String>) -> Self {
        self.old_schema_name = Some(old_schema_name.into());
        self
    }

    /// カラムを追加
    pub fn with_column(mut self, column: ColumnNode) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// 制約を追加
    pub fn with_constraint(mut self, constraint: ConstraintNode) -> Self {
        self.constraints.insert(constraint.name.clone(), constraint);
        self
    }

    /// 拡張ブロックを追加
    pub fn with_extension(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    /// `schema.table` 形式のキー
    pub fn key(&self) -> String {
        table_key(&self.schema_name, &self.name)
    }

    /// リネームヒントを除いた比較用の値
    pub fn without_hints(&self) -> Self {
        Self {
            old_name: None,
            old_schema_name: None,
            columns: self
                .columns
                .iter()
                .map(|(k, c)| (k.clone(), c.without_hints()))
                .collect(),
            constraints: self
                .constraints
                .iter()
                .map(|(k, c)| (k.clone(), c.without_hints()))
                .collect(),
            ..self.clone()
        }
    }
}

/// カラムノード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnNode {
    /// カラム名
    #[serde(default)]
    pub name: String,

    /// リネーム元のカラム名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,

    /// カラムの種類
    #[serde(flatten)]
    pub kind: ColumnKind,

    /// デフォルト値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,

    /// カラム単位の拡張ブロック
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: ExtensionBlocks,
}

impl ColumnNode {
    /// 種類を指定してカラムを作成
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            old_name: None,
            kind,
            default_value: None,
            extensions: BTreeMap::new(),
        }
    }

    /// 組み込み型の物理カラムを作成
    pub fn physical(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::new(
            name,
            ColumnKind::Physical {
                data_type: DataType::Builtin(data_type.into()),
            },
        )
    }

    /// ENUM型の物理カラムを作成
    pub fn enumerated(name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        Self::new(
            name,
            ColumnKind::Physical {
                data_type: DataType::Custom {
                    custom_type: enum_name.into(),
                },
            },
        )
    }

    /// リネーム元を指定
    pub fn with_old_name(mut self, old_name: impl Into<String>) -> Self {
        self.old_name = Some(old_name.into());
        self
    }

    /// デフォルト値を指定
    pub fn with_default(mut self, default_value: DefaultValue) -> Self {
        self.default_value = Some(default_value);
        self
    }

    /// 拡張ブロックを追加
    pub fn with_extension(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    /// 物理カラムの型
    pub fn data_type(&self) -> Option<&DataType> {
        match &self.kind {
            ColumnKind::Physical { data_type } => Some(data_type),
            _ => None,
        }
    }

    /// ENUM型名（カスタム型の場合のみ）
    pub fn custom_type(&self) -> Option<&str> {
        match self.data_type() {
            Some(DataType::Custom { custom_type }) => Some(custom_type.as_str()),
            _ => None,
        }
    }

    /// 物理カラムかどうか
    pub fn is_physical(&self) -> bool {
        matches!(self.kind, ColumnKind::Physical { .. })
    }

    /// 算出カラム・カスタムリゾルバのようにDBに実体を持たないかどうか
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, ColumnKind::Computed | ColumnKind::CustomResolver)
    }

    /// リネームヒントを除いた比較用の値
    pub fn without_hints(&self) -> Self {
        Self {
            old_name: None,
            ..self.clone()
        }
    }
}

/// カラムの種類
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnKind {
    /// 物理カラム
    Physical {
        #[serde(rename = "type")]
        data_type: DataType,
    },
    /// 算出カラム（DBに実体なし）
    Computed,
    /// カスタムリゾルバ（DBに実体なし）
    CustomResolver,
    /// リレーションのための仮想カラム
    Relation,
}

/// 物理カラムの型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataType {
    /// 組み込み型（`uuid`, `varchar`, `text[]`, `numeric(10,2)` など）
    Builtin(String),
    /// ユーザー定義型（ENUM）
    #[serde(rename_all = "camelCase")]
    Custom { custom_type: String },
}

impl DataType {
    /// 配列型かどうか
    pub fn is_array(&self) -> bool {
        match self {
            DataType::Builtin(name) => name.trim_end().ends_with("[]"),
            DataType::Custom { custom_type } => custom_type.trim_end().ends_with("[]"),
        }
    }
}

/// デフォルト値
///
/// リテラル値とSQL式のどちらか一方を保持します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultValue {
    /// リテラル値（SQL文字列リテラルとして出力）
    Value(serde_json::Value),
    /// SQL式（そのまま出力）
    Expression(String),
}

/// 制約ノード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintNode {
    /// 制約名
    #[serde(default)]
    pub name: String,

    /// リネーム元の制約名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,

    /// 制約の種類
    #[serde(flatten)]
    pub kind: ConstraintKind,

    /// 対象カラム（順序あり）
    #[serde(default)]
    pub columns: Vec<String>,
}

impl ConstraintNode {
    /// 新しい制約を作成
    pub fn new<I, S>(name: impl Into<String>, kind: ConstraintKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            old_name: None,
            kind,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// NOT NULL制約
    pub fn not_null(name: impl Into<String>, column: impl Into<String>) -> Self {
        let column: String = column.into();
        Self::new(name, ConstraintKind::NotNull, [column])
    }

    /// PRIMARY KEY制約
    pub fn primary_key<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ConstraintKind::PrimaryKey, columns)
    }

    /// UNIQUE制約
    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, ConstraintKind::Unique { condition: None }, columns)
    }

    /// CHECK制約
    pub fn check(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(
            name,
            ConstraintKind::Check {
                expression: expression.into(),
            },
            Vec::<String>::new(),
        )
    }

    /// 部分UNIQUEの条件を指定
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        if let ConstraintKind::Unique { condition: c } = &mut self.kind {
            *c = Some(condition.into());
        }
        self
    }

    /// リネーム元を指定
    pub fn with_old_name(mut self, old_name: impl Into<String>) -> Self {
        self.old_name = Some(old_name.into());
        self
    }

    /// UNIQUE制約の部分条件
    pub fn condition(&self) -> Option<&str> {
        match &self.kind {
            ConstraintKind::Unique { condition } => condition.as_deref(),
            _ => None,
        }
    }

    /// 種類と対象カラムが一致するか（名前とヒントは比較しない）
    pub fn same_definition(&self, other: &ConstraintNode) -> bool {
        self.kind == other.kind && self.columns == other.columns
    }

    /// リネームヒントを除いた比較用の値
    pub fn without_hints(&self) -> Self {
        Self {
            old_name: None,
            ..self.clone()
        }
    }
}

/// 制約の種類
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConstraintKind {
    NotNull,
    PrimaryKey,
    Unique {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<String>,
    },
    Check {
        expression: String,
    },
}

/// リレーションの種類（片側）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "ONE")]
    One,
    #[serde(rename = "MANY")]
    Many,
}

/// 参照アクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferentialAction::NoAction => write!(f, "NO ACTION"),
            ReferentialAction::Restrict => write!(f, "RESTRICT"),
            ReferentialAction::Cascade => write!(f, "CASCADE"),
            ReferentialAction::SetNull => write!(f, "SET NULL"),
            ReferentialAction::SetDefault => write!(f, "SET DEFAULT"),
        }
    }
}

/// リレーションノード
///
/// 2つのサイドを `schema.table` をキーとして保持します。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationNode {
    /// リレーション名
    #[serde(default)]
    pub name: String,

    /// サイド（`schema.table` -> RelationSide）
    #[serde(default)]
    pub sides: BTreeMap<String, RelationSide>,
}

impl RelationNode {
    /// 新しいリレーションを作成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sides: BTreeMap::new(),
        }
    }

    /// サイドを追加
    pub fn with_side(mut self, mut side: RelationSide) -> Self {
        side.name = self.name.clone();
        self.sides.insert(side.key(), side);
        self
    }

    /// サイド種別の並び（キー順）
    pub fn side_types(&self) -> Vec<RelationType> {
        self.sides.values().map(|s| s.relation_type).collect()
    }

    /// MANY:MANY かどうか
    pub fn is_many_to_many(&self) -> bool {
        self.sides.len() == 2
            && self
                .sides
                .values()
                .all(|s| s.relation_type == RelationType::Many)
    }

    /// ONE:ONE かどうか
    pub fn is_one_to_one(&self) -> bool {
        self.sides.len() == 2
            && self
                .sides
                .values()
                .all(|s| s.relation_type == RelationType::One)
    }
}

/// リレーションのサイド
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSide {
    /// 所属するリレーション名
    #[serde(default)]
    pub name: String,

    /// サイドのスキーマ名
    pub schema_name: String,

    /// サイドのテーブル名
    pub table_name: String,

    /// サイドの種類
    #[serde(rename = "type")]
    pub relation_type: RelationType,

    /// 所有カラム（ONEサイド、またはMANY:MANYの両サイド）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,

    /// ON UPDATE アクション
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,

    /// ON DELETE アクション
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,

    /// 反対側への参照
    pub reference: RelationReference,
}

impl RelationSide {
    /// 新しいサイドを作成
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        relation_type: RelationType,
        reference: RelationReference,
    ) -> Self {
        Self {
            name: String::new(),
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            relation_type,
            column_name: None,
            on_update: None,
            on_delete: None,
            reference,
        }
    }

    /// 所有カラムを指定
    pub fn with_column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    /// ON DELETE を指定
    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// ON UPDATE を指定
    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// `schema.table` 形式のキー
    pub fn key(&self) -> String {
        table_key(&self.schema_name, &self.table_name)
    }
}

/// 反対側のテーブル・カラムへの参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationReference {
    pub schema_name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
}

impl RelationReference {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: Option<&str>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            column_name: column_name.map(str::to_string),
        }
    }

    /// `schema.table` 形式のキー
    pub fn key(&self) -> String {
        table_key(&self.schema_name, &self.table_name)
    }
}

/// ENUM型ノード
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumTypeNode {
    /// 型名
    #[serde(default)]
    pub name: String,

    /// リネーム元の型名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,

    /// 値（順序あり）
    pub values: Vec<String>,

    /// この型を使用するカラムへの逆参照
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<EnumColumnRef>,
}

impl EnumTypeNode {
    /// 新しいENUM型を作成
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            old_name: None,
            values: values.into_iter().map(Into::into).collect(),
            columns: Vec::new(),
        }
    }

    /// 使用カラムの逆参照を追加
    pub fn with_column_ref(mut self, column: EnumColumnRef) -> Self {
        self.columns.push(column);
        self
    }
}

/// ENUM型を使用するカラムへの参照
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumColumnRef {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
}

impl EnumColumnRef {
    pub fn new(schema_name: &str, table_name: &str, column_name: &str) -> Self {
        Self {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
        }
    }
}
