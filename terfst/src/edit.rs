//! 2因子編集距離トランスデューサの構築モジュール
//!
//! 編集距離を、編集ラベルを出力する左因子`E_i`と、編集ラベルを消費して
//! 仮説側のトークンを出力する右因子`E_o`の直列合成として実装します。
//! 各編集のコストは左右の因子に半分ずつ載るため、合成後の1編集あたりの
//! コストはちょうど単位コストになります。
//!
//! 右因子には、すべての基本トークン`t`について`t : t#`をコスト0で
//! 受理する補助拡張が組み込まれます。これによりGLM・ハイフン展開で
//! 生まれた補助形の仮説トークンが、無償で参照側の素のトークンに
//! マッチできます。

use hashbrown::HashMap;

use crate::common::DEFAULT_EDIT_COST;
use crate::fst::compose::{invert, relabel};
use crate::fst::optimize::{connect, rm_epsilon};
use crate::fst::{Arc, Fst, Label, EPSILON};

/// 編集コストと編集回数上限の設定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditConfig {
    /// 挿入の単位コスト
    pub ins_cost: f32,
    /// 削除の単位コスト
    pub del_cost: f32,
    /// 置換の単位コスト
    pub sub_cost: f32,
    /// 1つの整列に許す非マッチ編集の最大数。0は無制限。
    pub bound: usize,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            ins_cost: DEFAULT_EDIT_COST,
            del_cost: DEFAULT_EDIT_COST,
            sub_cost: DEFAULT_EDIT_COST,
            bound: 0,
        }
    }
}

/// 編集メタラベルの組。
///
/// 左右の因子の間の内部テープにのみ現れるラベルです。
#[derive(Debug, Clone, Copy)]
pub struct EditLabels {
    /// 挿入ラベル
    pub ins: Label,
    /// 削除ラベル
    pub del: Label,
    /// 置換ラベル
    pub sub: Label,
}

/// 構築済みの編集距離トランスデューサ対。
///
/// `(ref ∘ left) ∘ (right ∘ hyp)` と合成することで、最短路コストが
/// 重み付き編集距離に一致するラティスが得られます。
#[derive(Debug, Clone)]
pub struct EditTransducer {
    left: Fst,
    right: Fst,
}

impl EditTransducer {
    /// 編集距離トランスデューサ対を構築します。
    ///
    /// `bound == 0`の場合、左因子はマッチ・削除・置換・挿入の原子機械の
    /// 和のクロージャとして構築されます。`bound > 0`の場合は、非マッチ
    /// 編集で状態が進む`bound + 1`状態の鎖を直接構築します。
    ///
    /// アークはマッチ・置換・削除・挿入の優先順で生成されるため、
    /// 同コストの整列は早い編集種別に解決されます。
    ///
    /// # 引数
    ///
    /// * `pairs` - 基本トークンのラベルと対応する補助形ラベルの組
    /// * `labels` - 編集メタラベル
    /// * `config` - コストと上限の設定
    ///
    /// # 戻り値
    ///
    /// 構築されたトランスデューサ対
    pub fn new(pairs: &[(Label, Label)], labels: EditLabels, config: &EditConfig) -> Self {
        let left = if config.bound == 0 {
            Self::build_left_closure(pairs, labels, config)
        } else {
            Self::build_left_bounded(pairs, labels, config)
        };
        let right = Self::build_right(&left, pairs, labels, config);
        Self { left, right }
    }

    /// 左因子`E_i`を返します。
    #[inline]
    pub fn left(&self) -> &Fst {
        &self.left
    }

    /// 右因子`E_o`（補助拡張込み）を返します。
    #[inline]
    pub fn right(&self) -> &Fst {
        &self.right
    }

    /// 開始と終了のみの2状態機械に、与えられたアーク群を並べた
    /// 原子機械を作ります。
    fn atom<I>(arcs: I) -> Fst
    where
        I: IntoIterator<Item = (Label, Label, f32)>,
    {
        let mut fst = Fst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, 0.0);
        for (ilabel, olabel, weight) in arcs {
            fst.add_arc(s0, Arc::new(ilabel, olabel, weight, s1));
        }
        fst
    }

    /// クロージャ構成による左因子（`bound == 0`）。
    fn build_left_closure(pairs: &[(Label, Label)], labels: EditLabels, config: &EditConfig) -> Fst {
        let accept = Self::atom(pairs.iter().map(|&(t, _)| (t, t, 0.0)));
        let substitute =
            Self::atom(pairs.iter().map(|&(t, _)| (t, labels.sub, config.sub_cost / 2.0)));
        let delete =
            Self::atom(pairs.iter().map(|&(t, _)| (t, labels.del, config.del_cost / 2.0)));
        let insert = Self::atom([(EPSILON, labels.ins, config.ins_cost / 2.0)]);

        // マッチ < 置換 < 削除 < 挿入 の優先順で和を取る
        let edits = Fst::union(&Fst::union(&accept, &substitute), &Fst::union(&delete, &insert));
        connect(&rm_epsilon(&Fst::closure(&edits)))
    }

    /// 編集回数上限付きの左因子（`bound > 0`）。
    fn build_left_bounded(pairs: &[(Label, Label)], labels: EditLabels, config: &EditConfig) -> Fst {
        let mut fst = Fst::new();
        for _ in 0..=config.bound {
            let s = fst.add_state();
            fst.set_final(s, 0.0);
        }
        fst.set_start(0);
        for k in 0..=config.bound {
            let k = k as u32;
            for &(t, _) in pairs {
                fst.add_arc(k, Arc::new(t, t, 0.0, k));
            }
            if (k as usize) < config.bound {
                for &(t, _) in pairs {
                    fst.add_arc(k, Arc::new(t, labels.sub, config.sub_cost / 2.0, k + 1));
                }
                for &(t, _) in pairs {
                    fst.add_arc(k, Arc::new(t, labels.del, config.del_cost / 2.0, k + 1));
                }
                fst.add_arc(k, Arc::new(EPSILON, labels.ins, config.ins_cost / 2.0, k + 1));
            }
        }
        fst
    }

    /// 右因子`E_o`の構築。
    ///
    /// 左因子を反転した後、挿入ラベルと削除ラベルを付け替えます。
    /// 反転によって、参照トークンを消して`<del>`を出していたアークは
    /// `<ins>`を消して仮説トークンを出すアークに、`<ins>`を出していた
    /// アークは`<del>`を消して何も出さないアークになるためです。
    /// 最後に補助対`t : t#`のクロージャを和として組み込みます。
    fn build_right(left: &Fst, pairs: &[(Label, Label)], labels: EditLabels, config: &EditConfig) -> Fst {
        let mut swap = HashMap::new();
        swap.insert(labels.ins, labels.del);
        swap.insert(labels.del, labels.ins);
        let empty = HashMap::new();
        let core = relabel(&invert(left), &swap, &empty);

        if config.bound == 0 {
            let aux = Self::atom(pairs.iter().map(|&(t, a)| (t, a, 0.0)));
            connect(&rm_epsilon(&Fst::closure(&Fst::union(&core, &aux))))
        } else {
            // 上限付きの鎖では各状態に補助対の自己ループを直接足す
            let mut fst = core;
            for state in 0..fst.num_states() {
                for &(t, a) in pairs {
                    fst.add_arc(state as u32, Arc::new(t, a, 0.0, state as u32));
                }
            }
            fst
        }
    }
}
