// pgshift コアライブラリ
//
// メタデータモデル、差分ツリー、診断、設定など I/O を持たない型を提供する。

pub mod core;
