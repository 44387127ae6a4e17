//! GLM（Global Mapping）ルール表の読み込みモジュール
//!
//! GLMは交換可能な表層フレーズの表（例: `GONNA ↔ GOING TO`）であり、
//! CSVファイルとして与えられます。1行が1ルールに対応し、行内の各フィールドが
//! 相互に受理可能なフレーズとなります。ルールIDはファイル内の行番号から
//! `<RULE_######>`の形式で割り当てられます。

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use csv_core::ReadFieldResult;

use crate::errors::Result;

/// CSV行をパースしてフィールドのベクトルに変換する
///
/// # 引数
///
/// * `row` - パース対象のCSV行文字列
///
/// # 戻り値
///
/// パースされたフィールドの文字列ベクトル
fn parse_csv_row(row: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut rdr = csv_core::Reader::new();
    let mut bytes = row.as_bytes();
    let mut output = [0; 4096];
    loop {
        let (result, nin, nout) = rdr.read_field(bytes, &mut output);
        let end = match result {
            ReadFieldResult::InputEmpty => true,
            ReadFieldResult::Field { .. } => false,
            _ => unreachable!(),
        };
        fields.push(std::str::from_utf8(&output[..nout]).unwrap().to_string());
        if end {
            break;
        }
        bytes = &bytes[nin..];
    }
    fields
}

/// 1つのGLMルールの表現。
///
/// ルール中のいずれのフレーズも、他のフレーズの受理可能な表層であることを
/// 表明します。フレーズは空白区切りのトークン列です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlmRule {
    /// `<RULE_######>`形式のルールID
    pub rule_id: String,

    /// フレーズのリスト（ファイル内の出現順）
    pub phrases: Vec<String>,
}

/// ルールIDからルールへの対応を挿入順に保持するGLM表。
#[derive(Debug, Default)]
pub struct GlmTable {
    rules: Vec<GlmRule>,
}

impl GlmTable {
    /// ルールを持たない空のGLM表を生成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定されたリーダーからGLM表を読み込みます。
    ///
    /// 各行はカンマ区切りのフレーズリストで、各フレーズは前後の空白を
    /// 除去されます。空のフレーズおよび空行は無視されます。
    ///
    /// # 引数
    ///
    /// * `rdr` - GLM CSVのリーダー
    ///
    /// # 戻り値
    ///
    /// 読み込まれたGLM表
    ///
    /// # エラー
    ///
    /// 読み込みに失敗した場合、I/Oエラーが返されます。
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let buf = BufReader::new(rdr);

        let mut rules = vec![];
        for line in buf.lines() {
            let line = line?;
            let phrases: Vec<String> = parse_csv_row(&line)
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            if phrases.is_empty() {
                continue;
            }
            let rule_id = format!("<RULE_{:06}>", rules.len());
            rules.push(GlmRule { rule_id, phrases });
        }
        Ok(Self { rules })
    }

    /// 指定されたパスからGLM表を読み込みます。
    ///
    /// # 引数
    ///
    /// * `path` - GLM CSVファイルのパス
    ///
    /// # 戻り値
    ///
    /// 読み込まれたGLM表
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// ルールのスライスを返します。
    ///
    /// # 戻り値
    ///
    /// 挿入順（= ファイル内の行順）のルールのスライス
    #[inline]
    pub fn rules(&self) -> &[GlmRule] {
        &self.rules
    }

    /// ルール数を返します。
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// ルールが1つもないかどうかを返します。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
