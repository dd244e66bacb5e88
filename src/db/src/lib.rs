// pgshift DB層
//
// 差分計算からSQL生成、順序付け、適用までのサービスとアダプターを提供する。

pub mod adapters;
pub mod services;

pub use pgshift_core::core;
