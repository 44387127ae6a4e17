//! ライブラリ全体で共有される定数の定義
//!
//! このモジュールは、シンボル表・編集トランスデューサ・整形出力で使用される
//! 共通の定数を提供します。

/// イプシロン（空遷移）を表すシンボル文字列。
///
/// シンボル表のID 0は常にこのシンボルに予約されています。
pub const EPSILON_SYMBOL: &str = "<epsilon>";

/// GLM展開で導入される補助形（auxiliary form）の接尾辞。
///
/// 語彙中の各トークン `t` に対して `t#` という補助シンボルが登録され、
/// GLM・ハイフン展開で生まれた代替表層のみがこの形を通して参照にマッチします。
pub const AUX_SUFFIX: char = '#';

/// 挿入編集を表す内部テープ上のメタシンボル。
pub const INS_SYMBOL: &str = "<ins>";

/// 削除編集を表す内部テープ上のメタシンボル。
pub const DEL_SYMBOL: &str = "<del>";

/// 置換編集を表す内部テープ上のメタシンボル。
pub const SUB_SYMBOL: &str = "<sub>";

/// 整列結果の表示で、消費されなかった側に出力されるプレースホルダ。
pub const GAP_SYMBOL: &str = "*";

/// 表示幅2として数えるCJK統合漢字の範囲（開始）。
pub const CJK_FIRST: char = '\u{4E00}';

/// 表示幅2として数えるCJK統合漢字の範囲（終了、この値を含む）。
pub const CJK_LAST: char = '\u{9FA5}';

/// 挿入・削除・置換編集の既定コスト。
pub const DEFAULT_EDIT_COST: f32 = 1.0;

/// 文字列の表示幅を計算します。
///
/// [`CJK_FIRST`]..=[`CJK_LAST`] の範囲のコードポイントは幅2、
/// それ以外の文字は幅1として数えます。
///
/// # 引数
///
/// * `s` - 幅を計算する文字列
///
/// # 戻り値
///
/// 表示カラム数
pub fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| if (CJK_FIRST..=CJK_LAST).contains(&c) { 2 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_ascii() {
        assert_eq!(display_width("HELLO"), 5);
        assert_eq!(display_width(""), 0);
        assert_eq!(display_width(GAP_SYMBOL), 1);
    }

    #[test]
    fn test_display_width_cjk() {
        assert_eq!(display_width("你好"), 4);
        assert_eq!(display_width("中A文"), 5);
        // 漢字範囲外のひらがなは幅1扱い
        assert_eq!(display_width("\u{3042}"), 1);
    }
}
