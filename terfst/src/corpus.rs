//! 発話コーパスの読み込みモジュール
//!
//! このモジュールは、Kaldiアーカイブ形式（1行 = `UID<空白>TEXT`）の
//! 参照・仮説ファイルを読み込み、発話ID順の決定的な反復を提供します。

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use hashbrown::HashMap;

use crate::errors::{Result, TerfstError};

/// 1つの発話の表現。
///
/// 発話IDとテキストのペアを保持します。テキストは空であっても構いません
/// （UIDのみの行は空テキストの発話になります）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// 発話ID
    pub uid: String,

    /// 発話テキスト
    pub text: String,
}

/// 発話IDから発話への対応を保持する発話集合。
///
/// 挿入順には意味がなく、[`sorted_uids`](Self::sorted_uids)による
/// ID昇順の反復で結果の決定性を保証します。
#[derive(Debug, Default)]
pub struct UtteranceSet {
    utts: HashMap<String, Utterance>,
}

impl UtteranceSet {
    /// 指定されたリーダーから発話集合を読み込みます。
    ///
    /// 各行は`UID<空白>TEXT`の形式で、TEXTは空でも構いません。
    /// 空行は無視されます。
    ///
    /// # 引数
    ///
    /// * `rdr` - アーカイブのリーダー
    /// * `name` - エラーメッセージ用のソース名
    ///
    /// # 戻り値
    ///
    /// 読み込まれた発話集合
    ///
    /// # エラー
    ///
    /// 同一UIDが重複して出現した場合、
    /// [`TerfstError::DuplicateUtteranceId`]が返されます。
    pub fn from_reader<R>(rdr: R, name: &'static str) -> Result<Self>
    where
        R: Read,
    {
        let buf = BufReader::new(rdr);

        let mut utts = HashMap::new();
        for line in buf.lines() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let (uid, text) = match line.split_once(char::is_whitespace) {
                Some((uid, text)) => (uid, text.trim()),
                None => (line, ""),
            };
            let utt = Utterance {
                uid: uid.to_string(),
                text: text.to_string(),
            };
            if utts.insert(uid.to_string(), utt).is_some() {
                return Err(TerfstError::DuplicateUtteranceId {
                    archive: name,
                    uid: uid.to_string(),
                });
            }
        }
        Ok(Self { utts })
    }

    /// 指定されたパスから発話集合を読み込みます。
    ///
    /// # 引数
    ///
    /// * `path` - アーカイブファイルのパス
    /// * `name` - エラーメッセージ用のソース名
    ///
    /// # 戻り値
    ///
    /// 読み込まれた発話集合
    pub fn from_path<P>(path: P, name: &'static str) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, name)
    }

    /// 指定されたUIDの発話を返します。
    ///
    /// # 引数
    ///
    /// * `uid` - 発話ID
    ///
    /// # 戻り値
    ///
    /// 登録されている場合は`Some(発話)`、未登録の場合は`None`
    #[inline]
    pub fn get(&self, uid: &str) -> Option<&Utterance> {
        self.utts.get(uid)
    }

    /// 発話数を返します。
    #[inline]
    pub fn len(&self) -> usize {
        self.utts.len()
    }

    /// 発話集合が空かどうかを返します。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.utts.is_empty()
    }

    /// 昇順にソートされたUIDのベクトルを返します。
    ///
    /// 評価ループはこの順序で反復することで、出力の決定性を保証します。
    ///
    /// # 戻り値
    ///
    /// ソート済みUIDのベクトル
    pub fn sorted_uids(&self) -> Vec<&str> {
        let mut uids: Vec<&str> = self.utts.keys().map(String::as_str).collect();
        uids.sort_unstable();
        uids
    }
}
