// 呼び出し側のキャッシュ: エンジン自体は状態を持たないため、見積もりの再計算を
// (内容, ページ, 回転, レベル, 設定) をキーにここで省く。

pub mod hash;
pub mod store;
