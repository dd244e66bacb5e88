// Core Domain
// メタデータツリー、差分ツリー、診断情報、設定の純粋なデータ型

pub mod config;
pub mod db_meta;
pub mod delta;
pub mod error;
pub mod migration;
pub mod naming;
