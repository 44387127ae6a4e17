//! 発話単位の整列器
//!
//! このモジュールは、評価実行ごとに1度だけ構築される不変の共有資源
//! （シンボル表・GLMタグ付け器・編集トランスデューサ）を保持し、
//! 発話ごとの整列を実行する[`Aligner`]を提供します。
//!
//! 発話ごとの処理の流れ:
//! 1. 参照トークン列から線形アクセプタを構築する
//! 2. 仮説トークン列にGLMタグ付けを適用し、タグ付きIRを得る
//! 3. タグ付きIRを代替表層の「ソーセージ」FSTに展開する
//! 4. `(ref ∘ E_i) ∘ (E_o ∘ hyp)` のラティスを合成する
//! 5. 最短路を取り出し、アークを編集操作に分類する

use hashbrown::{HashMap, HashSet};

use crate::common::{AUX_SUFFIX, DEL_SYMBOL, GAP_SYMBOL, INS_SYMBOL, SUB_SYMBOL};
use crate::edit::{EditConfig, EditLabels, EditTransducer};
use crate::errors::{Result, TerfstError};
use crate::fst::compose::compose;
use crate::fst::optimize::optimize;
use crate::fst::shortest::{shortest_distance, shortest_path};
use crate::fst::{Arc, Fst, Label, EPSILON};
use crate::glm::GlmTable;
use crate::symbol::SymbolTable;
use crate::tagger::GlmTagger;
use crate::tokenize::{hyphen_variants, tokenize, TokenizerMode};

/// 編集操作の種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// 一致（参照と仮説を1トークンずつ消費、コスト0）
    Cor,
    /// 置換（参照と仮説を1トークンずつ消費）
    Sub,
    /// 挿入（仮説のみ1トークン消費）
    Ins,
    /// 削除（参照のみ1トークン消費）
    Del,
}

impl EditOp {
    /// 整形出力のEDITトラックに表示する記号を返します。
    /// 一致は空欄です。
    #[inline]
    pub const fn mark(self) -> &'static str {
        match self {
            Self::Cor => "",
            Self::Sub => "S",
            Self::Ins => "I",
            Self::Del => "D",
        }
    }
}

/// 整列の1ステップ。
///
/// 消費されなかった側の表層は`*`になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentStep {
    /// 編集操作
    pub edit: EditOp,
    /// 参照側の表層（挿入では`*`）
    pub ref_surface: String,
    /// 仮説側の表層（削除では`*`）。補助形の`#`は保持されます。
    pub hyp_surface: String,
}

/// 1発話の整列結果。
#[derive(Debug, Clone)]
pub struct AlignedUtt {
    /// 整列ステップの列
    pub steps: Vec<AlignmentStep>,
    /// 一致数
    pub cor: usize,
    /// 置換数
    pub sub: usize,
    /// 挿入数
    pub ins: usize,
    /// 削除数
    pub del: usize,
    /// 最短路の総コスト
    pub distance: f32,
}

impl AlignedUtt {
    /// 非一致編集が1つでもあるかどうかを返します。
    #[inline]
    pub fn has_error(&self) -> bool {
        self.sub + self.ins + self.del > 0
    }

    /// 整列が消費した参照トークン数（C + S + D）を返します。
    #[inline]
    pub fn ref_len(&self) -> usize {
        self.cor + self.sub + self.del
    }

    /// 整列が消費した仮説トークン数（C + S + I）を返します。
    #[inline]
    pub fn hyp_len(&self) -> usize {
        self.cor + self.sub + self.ins
    }
}

/// 1ルール分の代替フレーズ。
#[derive(Debug)]
struct RuleAlternatives {
    /// 素のラベル列（マッチした表層と比較するため）
    phrases: Vec<Vec<Label>>,
    /// 対応する補助形のラベル列
    aux_phrases: Vec<Vec<Label>>,
}

/// GLM対応の編集距離整列器。
///
/// シンボル表・タグ付け器・編集トランスデューサは構築後に不変であり、
/// 複数の発話の整列で共有されます。
#[derive(Debug)]
pub struct Aligner {
    table: SymbolTable,
    /// 基本トークンのラベルから補助形ラベルへの対応
    aux_of: HashMap<Label, Label>,
    tagger: GlmTagger,
    rules: Vec<RuleAlternatives>,
    tag_to_rule: HashMap<Label, u32>,
    edit: EditTransducer,
}

impl Aligner {
    /// 整列器を構築します。
    ///
    /// 評価語彙は、与えられたコーパストークンとGLMフレーズのトークンの
    /// 和集合に、ハイフンを含むトークンの分割形・連結形を加えたものです。
    /// シンボル表には各基本トークン`t`の補助形`t#`と各ルールのタグが
    /// 登録されます。
    ///
    /// # 引数
    ///
    /// * `corpus_tokens` - 評価対象の発話（参照・仮説とも）の全トークン。
    ///   決定的な順序で渡すこと
    /// * `glm` - GLMルール表
    /// * `mode` - GLMフレーズのトークン化に使用するモード
    /// * `config` - 編集コストの設定
    ///
    /// # 戻り値
    ///
    /// 構築された整列器
    ///
    /// # エラー
    ///
    /// 内部の語彙構築に不整合があった場合、エラーが返されます。
    pub fn new<I, S>(
        corpus_tokens: I,
        glm: &GlmTable,
        mode: TokenizerMode,
        config: &EditConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // 基本語彙を初出順で集める
        let mut base: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let push = |base: &mut Vec<String>, seen: &mut HashSet<String>, tok: &str| {
            if seen.insert(tok.to_string()) {
                base.push(tok.to_string());
            }
        };
        for tok in corpus_tokens {
            push(&mut base, &mut seen, tok.as_ref());
        }
        for rule in glm.rules() {
            for phrase in &rule.phrases {
                for tok in tokenize(phrase, mode) {
                    push(&mut base, &mut seen, &tok);
                }
            }
        }
        // ハイフンを含むトークンの表層バリアントを追加する
        let snapshot = base.clone();
        for tok in &snapshot {
            if let Some((parts, joined)) = hyphen_variants(tok) {
                for part in &parts {
                    push(&mut base, &mut seen, part);
                }
                push(&mut base, &mut seen, &joined);
            }
        }

        // シンボル表: イプシロン、基本語彙、補助形、ルールタグ、メタラベル
        let mut table = SymbolTable::new();
        let base_labels: Vec<Label> = base.iter().map(|t| table.add_symbol(t)).collect();
        let mut aux_of: HashMap<Label, Label> = HashMap::new();
        let mut pairs: Vec<(Label, Label)> = Vec::with_capacity(base.len());
        for (tok, &label) in base.iter().zip(&base_labels) {
            let aux = table.add_symbol(format!("{tok}{AUX_SUFFIX}"));
            aux_of.insert(label, aux);
            pairs.push((label, aux));
        }

        let mut tagger = GlmTagger::new();
        let mut rules = Vec::with_capacity(glm.len());
        let mut tag_to_rule = HashMap::new();
        for rule in glm.rules() {
            let tag = table.add_symbol(&rule.rule_id);
            let rule_idx = tagger.add_rule(tag);
            tag_to_rule.insert(tag, rule_idx);

            let mut phrases = Vec::with_capacity(rule.phrases.len());
            let mut aux_phrases = Vec::with_capacity(rule.phrases.len());
            for phrase in &rule.phrases {
                let labels = lookup_tokens(&table, &tokenize(phrase, mode))?;
                let aux: Vec<Label> = labels.iter().map(|l| aux_of[l]).collect();
                tagger.add_phrase(rule_idx, &labels);
                phrases.push(labels);
                aux_phrases.push(aux);
            }
            rules.push(RuleAlternatives {
                phrases,
                aux_phrases,
            });
        }

        let labels = EditLabels {
            ins: table.add_symbol(INS_SYMBOL),
            del: table.add_symbol(DEL_SYMBOL),
            sub: table.add_symbol(SUB_SYMBOL),
        };
        let edit = EditTransducer::new(&pairs, labels, config);

        Ok(Self {
            table,
            aux_of,
            tagger,
            rules,
            tag_to_rule,
            edit,
        })
    }

    /// 整列器のシンボル表への参照を返します。
    #[inline]
    pub fn symbols(&self) -> &SymbolTable {
        &self.table
    }

    /// 1発話を整列します。
    ///
    /// # 引数
    ///
    /// * `ref_tokens` - 参照のトークン列
    /// * `hyp_tokens` - 仮説の生トークン列
    ///
    /// # 戻り値
    ///
    /// 整列結果
    ///
    /// # エラー
    ///
    /// 未知のトークンが含まれる場合は[`TerfstError::UnknownSymbol`]、
    /// 合成ラティスが空になった場合は[`TerfstError::EmptyLattice`]が
    /// 返されます。後者は語彙またはタグ付けの不整合を示す致命的エラーです。
    pub fn align(&self, ref_tokens: &[String], hyp_tokens: &[String]) -> Result<AlignedUtt> {
        let ref_labels = lookup_tokens(&self.table, ref_tokens)?;
        let hyp_labels = lookup_tokens(&self.table, hyp_tokens)?;

        let ref_fst = Fst::linear_acceptor(&ref_labels);
        let tagged = self.tagger.tag(&hyp_labels);
        let hyp_fst = optimize(&self.expand(&tagged)?)?;

        let lattice = compose(
            &compose(&ref_fst, self.edit.left()),
            &compose(self.edit.right(), &hyp_fst),
        );

        let path = shortest_path(&lattice).ok_or_else(|| TerfstError::EmptyLattice {
            hyp: hyp_tokens.join(" "),
        })?;
        debug_assert_eq!(
            {
                let dist = shortest_distance(&lattice);
                (0..lattice.num_states() as Label)
                    .filter_map(|s| lattice.final_weight(s).map(|w| w + dist[s as usize]))
                    .fold(f32::INFINITY, f32::min)
            },
            path.cost
        );

        Ok(self.classify(&path.arcs, path.cost))
    }

    /// タグ付きIRをソーセージFSTに展開します。
    ///
    /// ルールセグメントは、マッチした表層そのものと、同じルールの
    /// 他のフレーズの補助形の和になります。素のトークンのセグメントは、
    /// トークンそのものと、ハイフンを含む場合の分割形・連結形
    /// （いずれも補助形）の和になります。
    fn expand(&self, tagged: &[Label]) -> Result<Fst> {
        let mut fst = Fst::linear_acceptor(&[]);
        let mut pos = 0;
        while pos < tagged.len() {
            let label = tagged[pos];
            let segment = if let Some(&rule_idx) = self.tag_to_rule.get(&label) {
                let close = tagged[pos + 1..]
                    .iter()
                    .position(|&l| l == label)
                    .ok_or_else(|| TerfstError::UnbalancedRuleTag {
                        tag: self.table.symbol(label).unwrap_or("").to_string(),
                    })?;
                let span = &tagged[pos + 1..pos + 1 + close];
                pos += close + 2;
                self.rule_segment(rule_idx, span)
            } else {
                pos += 1;
                self.plain_segment(label)?
            };
            fst = Fst::concat(&fst, &segment);
        }
        Ok(fst)
    }

    /// ルールセグメントのFSTを構築します。
    fn rule_segment(&self, rule_idx: u32, span: &[Label]) -> Fst {
        let rule = &self.rules[rule_idx as usize];
        let mut segment = Fst::linear_acceptor(span);
        for (phrase, aux) in rule.phrases.iter().zip(&rule.aux_phrases) {
            // マッチした表層そのものは素の形で既に入っている
            if phrase.as_slice() == span {
                continue;
            }
            segment = Fst::union(&segment, &Fst::linear_acceptor(aux));
        }
        segment
    }

    /// 素のトークンのセグメントFSTを構築します。
    fn plain_segment(&self, label: Label) -> Result<Fst> {
        let mut segment = Fst::linear_acceptor(&[label]);
        let surface = self.table.symbol(label).unwrap_or("");
        if let Some((parts, joined)) = hyphen_variants(surface) {
            let part_labels = lookup_tokens(&self.table, &parts)?;
            let part_aux: Vec<Label> = part_labels.iter().map(|l| self.aux_of[l]).collect();
            segment = Fst::union(&segment, &Fst::linear_acceptor(&part_aux));

            let joined_label = lookup_tokens(&self.table, std::slice::from_ref(&joined))?[0];
            segment = Fst::union(
                &segment,
                &Fst::linear_acceptor(&[self.aux_of[&joined_label]]),
            );
        }
        Ok(segment)
    }

    /// 最短路のアーク列を編集操作に分類し、カウンタを集計します。
    ///
    /// シンボルの等価判定では、両辺から高々1つの末尾`#`を取り除いて
    /// 比較します。
    fn classify(&self, arcs: &[Arc], distance: f32) -> AlignedUtt {
        let mut steps = Vec::new();
        let (mut cor, mut sub, mut ins, mut del) = (0usize, 0usize, 0usize, 0usize);
        for arc in arcs {
            let step = match (arc.ilabel, arc.olabel) {
                (EPSILON, EPSILON) => continue,
                (i, EPSILON) => {
                    del += 1;
                    AlignmentStep {
                        edit: EditOp::Del,
                        ref_surface: self.surface(i),
                        hyp_surface: GAP_SYMBOL.to_string(),
                    }
                }
                (EPSILON, o) => {
                    ins += 1;
                    AlignmentStep {
                        edit: EditOp::Ins,
                        ref_surface: GAP_SYMBOL.to_string(),
                        hyp_surface: self.surface(o),
                    }
                }
                (i, o) => {
                    let ref_surface = self.surface(i);
                    let hyp_surface = self.surface(o);
                    let edit = if strip_aux(&ref_surface) == strip_aux(&hyp_surface) {
                        cor += 1;
                        EditOp::Cor
                    } else {
                        sub += 1;
                        EditOp::Sub
                    };
                    AlignmentStep {
                        edit,
                        ref_surface,
                        hyp_surface,
                    }
                }
            };
            steps.push(step);
        }
        AlignedUtt {
            steps,
            cor,
            sub,
            ins,
            del,
            distance,
        }
    }

    /// ラベルの表層文字列を返します。
    ///
    /// # パニック
    ///
    /// ラティスのラベルは常にシンボル表に由来するため、未登録の
    /// ラベルが現れた場合はパニックします。
    fn surface(&self, label: Label) -> String {
        self.table.symbol(label).unwrap().to_string()
    }
}

/// 末尾の`#`を高々1つ取り除きます。
#[inline]
fn strip_aux(s: &str) -> &str {
    s.strip_suffix(AUX_SUFFIX).unwrap_or(s)
}

/// トークン列をシンボル表でラベル列に変換します。
///
/// # エラー
///
/// 未知のトークンが含まれる場合、[`TerfstError::UnknownSymbol`]が
/// 返されます。評価語彙はトークン化とGLM読み込みで完全に覆われるため、
/// このエラーは構築手順の不整合を意味します。
fn lookup_tokens<S>(table: &SymbolTable, tokens: &[S]) -> Result<Vec<Label>>
where
    S: AsRef<str>,
{
    tokens
        .iter()
        .map(|tok| {
            let tok = tok.as_ref();
            table.find(tok).ok_or_else(|| TerfstError::UnknownSymbol {
                token: tok.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s, TokenizerMode::Whitespace)
    }

    fn build_aligner(corpus: &[&str], glm_csv: &str) -> Aligner {
        let glm = GlmTable::from_reader(glm_csv.as_bytes()).unwrap();
        let tokens: Vec<String> = corpus.iter().flat_map(|s| toks(s)).collect();
        Aligner::new(
            tokens,
            &glm,
            TokenizerMode::Whitespace,
            &EditConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_identical_alignment() {
        let aligner = build_aligner(&["HEY I AM HERE"], "");
        let result = aligner
            .align(&toks("HEY I AM HERE"), &toks("HEY I AM HERE"))
            .unwrap();
        assert_eq!(result.cor, 4);
        assert_eq!(result.sub + result.ins + result.del, 0);
        assert_eq!(result.distance, 0.0);
        assert!(!result.has_error());
    }

    #[test]
    fn test_glm_alternative_matches_free() {
        let aligner = build_aligner(&["HEY I AM HERE", "HEY I'M HERE"], "I'M,I AM\n");
        let result = aligner
            .align(&toks("HEY I AM HERE"), &toks("HEY I'M HERE"))
            .unwrap();
        // I'M は I# AM# に展開されて無償でマッチする
        assert_eq!(result.cor, 4);
        assert_eq!(result.sub + result.ins + result.del, 0);
        assert_eq!(result.distance, 0.0);
        let hyp: Vec<&str> = result.steps.iter().map(|s| s.hyp_surface.as_str()).collect();
        assert_eq!(hyp, vec!["HEY", "I#", "AM#", "HERE"]);
    }

    #[test]
    fn test_without_glm_contraction_costs_two() {
        let aligner = build_aligner(&["HEY I AM HERE", "HEY I'M HERE"], "");
        let result = aligner
            .align(&toks("HEY I AM HERE"), &toks("HEY I'M HERE"))
            .unwrap();
        assert_eq!(result.distance, 2.0);
        assert_eq!(result.cor, 2);
        assert_eq!(result.sub, 1);
        assert_eq!(result.ins, 0);
        assert_eq!(result.del, 1);
    }

    #[test]
    fn test_hyphen_expansion() {
        let aligner = build_aligner(&["BUY A T SHIRT", "BUY A T-SHIRT"], "");
        let result = aligner
            .align(&toks("BUY A T SHIRT"), &toks("BUY A T-SHIRT"))
            .unwrap();
        // T-SHIRT は T# SHIRT# に展開されてマッチする
        assert_eq!(result.cor, 4);
        assert_eq!(result.distance, 0.0);
    }

    #[test]
    fn test_hyphen_joined_form() {
        let aligner = build_aligner(&["WEBSITE", "WEB-SITE"], "");
        let result = aligner.align(&toks("WEBSITE"), &toks("WEB-SITE")).unwrap();
        // 連結形 WEBSITE# がマッチする
        assert_eq!(result.cor, 1);
        assert_eq!(result.distance, 0.0);
    }

    #[test]
    fn test_substitution_and_insertion() {
        let aligner = build_aligner(&["FOO", "BAR BAZ"], "");
        let result = aligner.align(&toks("FOO"), &toks("BAR BAZ")).unwrap();
        assert_eq!(result.distance, 2.0);
        assert_eq!(result.cor, 0);
        assert_eq!(result.sub, 1);
        assert_eq!(result.ins, 1);
        assert_eq!(result.del, 0);
    }

    #[test]
    fn test_deletion() {
        let aligner = build_aligner(&["A B", "A"], "");
        let result = aligner.align(&toks("A B"), &toks("A")).unwrap();
        assert_eq!(result.cor, 1);
        assert_eq!(result.del, 1);
        assert_eq!(result.distance, 1.0);
        let refs: Vec<&str> = result.steps.iter().map(|s| s.ref_surface.as_str()).collect();
        let hyps: Vec<&str> = result.steps.iter().map(|s| s.hyp_surface.as_str()).collect();
        assert_eq!(refs, vec!["A", "B"]);
        assert_eq!(hyps, vec!["A", "*"]);
    }

    #[test]
    fn test_empty_hypothesis_is_all_deletions() {
        let aligner = build_aligner(&["A B C"], "");
        let result = aligner.align(&toks("A B C"), &[]).unwrap();
        assert_eq!(result.del, 3);
        assert_eq!(result.distance, 3.0);
    }

    #[test]
    fn test_consumed_lengths_match_inputs() {
        let aligner = build_aligner(&["A B C D", "A X C"], "");
        let result = aligner.align(&toks("A B C D"), &toks("A X C")).unwrap();
        assert_eq!(result.ref_len(), 4);
        assert_eq!(result.hyp_len(), 3);
    }

    #[test]
    fn test_unknown_token_is_fatal() {
        let aligner = build_aligner(&["A"], "");
        let result = aligner.align(&toks("A UNSEEN"), &toks("A"));
        assert!(matches!(result, Err(TerfstError::UnknownSymbol { .. })));
    }

    #[test]
    fn test_identity_rule_does_not_change_score() {
        // フレーズがすべて仮説表層と同一のルールはスコアを変えない
        let plain = build_aligner(&["A B", "A C"], "");
        let with_rule = build_aligner(&["A B", "A C"], "A C\n");
        let r1 = plain.align(&toks("A B"), &toks("A C")).unwrap();
        let r2 = with_rule.align(&toks("A B"), &toks("A C")).unwrap();
        assert_eq!(r1.distance, r2.distance);
        assert_eq!((r1.cor, r1.sub, r1.ins, r1.del), (r2.cor, r2.sub, r2.ins, r2.del));
    }
}
