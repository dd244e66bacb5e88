// 拡張レジストリ
//
// テーブル・カラム単位の拡張ブロックに対する追加SQLの生成関数を名前で登録する。
// 呼び出し側が値として構築し、SQL生成器に渡す。プロセス全体の状態は持たない。

use crate::adapters::sql_generator::StatementBundle;
use crate::core::delta::{Action, ExtensionDelta};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 拡張が返す追加SQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalStatements {
    /// 対象テーブル・カラムのSQLに追加される文
    pub table: StatementBundle,
    /// シーケンスの最後（CRUD段階）に実行される文
    pub crud: StatementBundle,
}

impl AdditionalStatements {
    pub fn new() -> Self {
        Self::default()
    }

    /// テーブル段階の文を指定
    pub fn with_table(mut self, table: StatementBundle) -> Self {
        self.table = table;
        self
    }

    /// CRUD段階の文を指定
    pub fn with_crud(mut self, crud: StatementBundle) -> Self {
        self.crud = crud;
        self
    }
}

/// テーブル拡張に渡される位置情報
#[derive(Debug, Clone, Copy)]
pub struct TableExtensionContext<'a> {
    pub schema_name: &'a str,
    /// 変更前のテーブル名
    pub table_name_down: &'a str,
    /// 変更後のテーブル名
    pub table_name: &'a str,
    /// テーブル自体のアクション
    pub table_action: &'a Action,
}

/// カラム拡張に渡される位置情報
#[derive(Debug, Clone, Copy)]
pub struct ColumnExtensionContext<'a> {
    pub schema_name: &'a str,
    pub table_name: &'a str,
    pub column_name: &'a str,
    /// カラム自体のアクション
    pub column_action: &'a Action,
}

/// テーブル拡張の生成関数
pub type TableExtensionFn =
    dyn Fn(&ExtensionDelta, &TableExtensionContext<'_>) -> AdditionalStatements + Send + Sync;

/// カラム拡張の生成関数
pub type ColumnExtensionFn =
    dyn Fn(&ExtensionDelta, &ColumnExtensionContext<'_>) -> AdditionalStatements + Send + Sync;

/// 拡張レジストリ
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    table_extensions: BTreeMap<String, Arc<TableExtensionFn>>,
    column_extensions: BTreeMap<String, Arc<ColumnExtensionFn>>,
}

impl ExtensionRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// テーブル拡張を登録
    pub fn register_table<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&ExtensionDelta, &TableExtensionContext<'_>) -> AdditionalStatements
            + Send
            + Sync
            + 'static,
    {
        self.table_extensions.insert(name.into(), Arc::new(handler));
    }

    /// カラム拡張を登録
    pub fn register_column<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&ExtensionDelta, &ColumnExtensionContext<'_>) -> AdditionalStatements
            + Send
            + Sync
            + 'static,
    {
        self.column_extensions.insert(name.into(), Arc::new(handler));
    }

    /// テーブル拡張を登録（ビルダー）
    pub fn with_table_extension<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExtensionDelta, &TableExtensionContext<'_>) -> AdditionalStatements
            + Send
            + Sync
            + 'static,
    {
        self.register_table(name, handler);
        self
    }

    /// カラム拡張を登録（ビルダー）
    pub fn with_column_extension<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ExtensionDelta, &ColumnExtensionContext<'_>) -> AdditionalStatements
            + Send
            + Sync
            + 'static,
    {
        self.register_column(name, handler);
        self
    }

    pub fn has_table_extension(&self, name: &str) -> bool {
        self.table_extensions.contains_key(name)
    }

    pub fn has_column_extension(&self, name: &str) -> bool {
        self.column_extensions.contains_key(name)
    }

    /// テーブル拡張を実行（未登録ならNone）
    pub fn run_table(
        &self,
        delta: &ExtensionDelta,
        context: &TableExtensionContext<'_>,
    ) -> Option<AdditionalStatements> {
        self.table_extensions
            .get(&delta.name)
            .map(|handler| handler(delta, context))
    }

    /// カラム拡張を実行（未登録ならNone）
    pub fn run_column(
        &self,
        delta: &ExtensionDelta,
        context: &ColumnExtensionContext<'_>,
    ) -> Option<AdditionalStatements> {
        self.column_extensions
            .get(&delta.name)
            .map(|handler| handler(delta, context))
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("table_extensions", &self.table_extensions.keys())
            .field("column_extensions", &self.column_extensions.keys())
            .finish()
    }
}
