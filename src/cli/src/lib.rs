// pgshiftライブラリのエントリーポイント
//
// CLIとテストが同じパスで各crateを参照できるよう再公開する。

pub mod cli;

pub use pgshift_core::core;
pub use pgshift_db::{adapters, services};
