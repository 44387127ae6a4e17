//! 入力テキストのトークン化モジュール
//!
//! このモジュールは、参照・仮説テキストをトークン列に分割する機能を提供します。
//! 空白区切りモード（単語単位の評価）と文字分割モード（CER計算向け）の
//! 2種類をサポートします。

use std::str::FromStr;

/// トークン化モード
///
/// 評価単位を決定します。空白区切りは単語誤り率（WER）、
/// 文字分割は文字誤り率（CER）に対応します。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenizerMode {
    /// 空白の連続で分割します。
    Whitespace,
    /// 空白を除去した後、Unicodeコードポイント単位で分割します。
    Char,
}

impl FromStr for TokenizerMode {
    type Err = &'static str;

    /// 文字列からトークン化モードをパースする
    ///
    /// # 引数
    ///
    /// * `mode` - パース対象の文字列（"whitespace"または"char"）
    ///
    /// # 戻り値
    ///
    /// パースに成功した場合は対応する `TokenizerMode`、失敗した場合はエラーメッセージ
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "whitespace" => Ok(Self::Whitespace),
            "char" => Ok(Self::Char),
            _ => Err("Could not parse a tokenizer mode"),
        }
    }
}

/// テキストをトークン列に分割します。
///
/// 空白区切りモードでは、前後の空白を除去した上で空白の連続を区切りとします。
/// 文字分割モードでは、すべての空白を除去した上で1コードポイントを
/// 1トークンとします。いずれのモードでも空トークンは生成されません。
///
/// # 引数
///
/// * `text` - 分割する入力テキスト
/// * `mode` - トークン化モード
///
/// # 戻り値
///
/// トークン文字列のベクトル
pub fn tokenize(text: &str, mode: TokenizerMode) -> Vec<String> {
    match mode {
        TokenizerMode::Whitespace => text.split_whitespace().map(str::to_string).collect(),
        TokenizerMode::Char => text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect(),
    }
}

/// ハイフンを含むトークンの表層バリアントを導出します。
///
/// `T-SHIRT`のようなトークンに対して、ハイフン分割形（`T`, `SHIRT`）と
/// ハイフン除去連結形（`TSHIRT`）を返します。これらは評価語彙に追加され、
/// 仮説展開時に補助形として参照にマッチできるようになります。
///
/// 先頭・末尾・連続ハイフンによる空の断片は無視されます。
///
/// # 引数
///
/// * `token` - 対象のトークン
///
/// # 戻り値
///
/// ハイフンを含み有効な断片が得られる場合は`Some((分割形, 連結形))`、
/// それ以外は`None`
pub fn hyphen_variants(token: &str) -> Option<(Vec<String>, String)> {
    if !token.contains('-') {
        return None;
    }
    let parts: Vec<String> = token
        .split('-')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if parts.is_empty() {
        return None;
    }
    let joined = parts.concat();
    Some((parts, joined))
}
