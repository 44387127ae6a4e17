//! GLMタグ付け器の実装モジュール
//!
//! このモジュールは、GLM表をトークンID列上のフレーズトライにコンパイルし、
//! 仮説トークン列中のすべてのフレーズ出現をルールタグで挟み込む
//! 義務的な書き換えを提供します。
//!
//! 左から右への貪欲マッチで、同じ開始位置では最長のフレーズが勝ち、
//! 同じ長さのフレーズが複数ルールにあるときは最小のルール番号が勝ちます。
//! これは、無条件文脈の文脈依存書き換えに最短路とルール番号順の
//! タイブレークを適用した場合と同じタグ付きIRを生成します。
//! マッチしたスパンは入れ子にならず、走査はスパンの直後から再開します。

use hashbrown::HashMap;

use crate::fst::Label;

/// トライのノード。
#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<Label, u32>,
    /// このノードで終わるフレーズの(ルール番号, フレーズ長)。
    /// 同一フレーズが複数ルールに現れた場合は最小のルール番号を保持する。
    output: Option<(u32, u32)>,
}

/// GLMフレーズのタグ付け器。
#[derive(Debug)]
pub struct GlmTagger {
    nodes: Vec<TrieNode>,
    /// ルール番号からタグラベルへの対応
    tags: Vec<Label>,
}

impl Default for GlmTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl GlmTagger {
    /// フレーズを持たない空のタグ付け器を生成します。
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            tags: Vec::new(),
        }
    }

    /// ルールのタグラベルを登録し、ルール番号を返します。
    ///
    /// ルールはタグ付けより前に、GLM表の行順で登録する必要があります。
    ///
    /// # 引数
    ///
    /// * `tag` - ルールタグのシンボルラベル
    ///
    /// # 戻り値
    ///
    /// 割り当てられたルール番号
    pub fn add_rule(&mut self, tag: Label) -> u32 {
        let rule_idx = u32::try_from(self.tags.len()).unwrap();
        self.tags.push(tag);
        rule_idx
    }

    /// ルールにフレーズを追加します。
    ///
    /// # 引数
    ///
    /// * `rule_idx` - [`add_rule`](Self::add_rule)が返したルール番号
    /// * `phrase` - フレーズのトークンラベル列（空でないこと）
    pub fn add_phrase(&mut self, rule_idx: u32, phrase: &[Label]) {
        debug_assert!(!phrase.is_empty());
        debug_assert!((rule_idx as usize) < self.tags.len());
        let mut node = 0u32;
        for &label in phrase {
            let next = match self.nodes[node as usize].children.get(&label) {
                Some(&n) => n,
                None => {
                    let n = u32::try_from(self.nodes.len()).unwrap();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node as usize].children.insert(label, n);
                    n
                }
            };
            node = next;
        }
        let len = u32::try_from(phrase.len()).unwrap();
        let output = &mut self.nodes[node as usize].output;
        // 同一フレーズは最小のルール番号が優先
        if output.map_or(true, |(idx, _)| rule_idx < idx) {
            *output = Some((rule_idx, len));
        }
    }

    /// 指定位置から始まる最長のフレーズマッチを探します。
    fn longest_match_at(&self, input: &[Label], pos: usize) -> Option<(u32, u32)> {
        let mut node = 0u32;
        let mut best: Option<(u32, u32)> = None;
        for &label in &input[pos..] {
            match self.nodes[node as usize].children.get(&label) {
                Some(&next) => node = next,
                None => break,
            }
            if let Some(output) = self.nodes[node as usize].output {
                // より長いマッチで上書きする（最長一致）
                best = Some(output);
            }
        }
        best
    }

    /// トークン列にタグを挿入したIRを生成します。
    ///
    /// マッチした各フレーズの直前と直後に、そのルールのタグラベルを
    /// 挿入します。マッチしなかったトークンはそのまま保持されます。
    ///
    /// # 引数
    ///
    /// * `input` - 仮説のトークンラベル列
    ///
    /// # 戻り値
    ///
    /// タグ付きのラベル列
    pub fn tag(&self, input: &[Label]) -> Vec<Label> {
        let mut output = Vec::with_capacity(input.len());
        let mut pos = 0;
        while pos < input.len() {
            match self.longest_match_at(input, pos) {
                Some((rule_idx, len)) => {
                    let tag = self.tags[rule_idx as usize];
                    let len = len as usize;
                    output.push(tag);
                    output.extend_from_slice(&input[pos..pos + len]);
                    output.push(tag);
                    pos += len;
                }
                None => {
                    output.push(input[pos]);
                    pos += 1;
                }
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ラベル割り当て: HEY=1, I'M=2, I=3, AM=4, HERE=5, タグ=100,101

    #[test]
    fn test_tag_single_token_phrase() {
        let mut tagger = GlmTagger::new();
        let r = tagger.add_rule(100);
        tagger.add_phrase(r, &[2]);
        tagger.add_phrase(r, &[3, 4]);
        // HEY I'M HERE -> HEY <tag> I'M <tag> HERE
        assert_eq!(tagger.tag(&[1, 2, 5]), vec![1, 100, 2, 100, 5]);
    }

    #[test]
    fn test_tag_multi_token_phrase() {
        let mut tagger = GlmTagger::new();
        let r = tagger.add_rule(100);
        tagger.add_phrase(r, &[2]);
        tagger.add_phrase(r, &[3, 4]);
        // HEY I AM HERE -> HEY <tag> I AM <tag> HERE
        assert_eq!(tagger.tag(&[1, 3, 4, 5]), vec![1, 100, 3, 4, 100, 5]);
    }

    #[test]
    fn test_no_match_passthrough() {
        let mut tagger = GlmTagger::new();
        let r = tagger.add_rule(100);
        tagger.add_phrase(r, &[2]);
        assert_eq!(tagger.tag(&[1, 5]), vec![1, 5]);
        assert_eq!(tagger.tag(&[]), Vec::<Label>::new());
    }

    #[test]
    fn test_longest_match_wins() {
        let mut tagger = GlmTagger::new();
        let r0 = tagger.add_rule(100);
        tagger.add_phrase(r0, &[3]);
        let r1 = tagger.add_rule(101);
        tagger.add_phrase(r1, &[3, 4]);
        // 開始位置が同じなら長い [3,4] が勝つ
        assert_eq!(tagger.tag(&[3, 4]), vec![101, 3, 4, 101]);
    }

    #[test]
    fn test_equal_length_lowest_rule_wins() {
        let mut tagger = GlmTagger::new();
        let r0 = tagger.add_rule(100);
        tagger.add_phrase(r0, &[2]);
        let r1 = tagger.add_rule(101);
        tagger.add_phrase(r1, &[2]);
        assert_eq!(tagger.tag(&[2]), vec![100, 2, 100]);
    }

    #[test]
    fn test_matches_do_not_nest() {
        let mut tagger = GlmTagger::new();
        let r0 = tagger.add_rule(100);
        tagger.add_phrase(r0, &[3, 4]);
        let r1 = tagger.add_rule(101);
        tagger.add_phrase(r1, &[4]);
        // [3,4] がマッチしたら内側の [4] は改めてマッチしない
        assert_eq!(tagger.tag(&[3, 4, 4]), vec![100, 3, 4, 100, 101, 4, 101]);
    }
}
