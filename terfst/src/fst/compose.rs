//! FSTの合成・反転・ラベル置換
//!
//! このモジュールは、2つのFSTの中間テープを突き合わせる合成演算と、
//! 入出力テープの反転、ラベルの付け替えを提供します。

use hashbrown::HashMap;

use crate::fst::{Arc, Fst, Label, StateId, EPSILON};

/// 1状態分のアークをラベルで引くための索引。
///
/// 編集トランスデューサのように1状態に語彙サイズ分のアークを持つ機械を
/// 合成するとき、全アークの線形走査を避けるために使用します。
#[derive(Debug, Default)]
struct ArcIndex {
    /// ラベルからアーク番号のリストへの対応（元のアーク順を保持）
    by_label: HashMap<Label, Vec<usize>>,
    /// イプシロンラベルを持つアーク番号のリスト
    eps: Vec<usize>,
}

impl ArcIndex {
    fn build<F>(arcs: &[Arc], label_of: F) -> Self
    where
        F: Fn(&Arc) -> Label,
    {
        let mut index = Self::default();
        for (i, arc) in arcs.iter().enumerate() {
            let label = label_of(arc);
            if label == EPSILON {
                index.eps.push(i);
            } else {
                index.by_label.entry(label).or_default().push(i);
            }
        }
        index
    }
}

/// 状態ごとに遅延構築される索引のキャッシュ。
#[derive(Debug, Default)]
struct IndexCache {
    map: HashMap<StateId, ArcIndex>,
}

impl IndexCache {
    fn get<F>(&mut self, fst: &Fst, state: StateId, label_of: F) -> &ArcIndex
    where
        F: Fn(&Arc) -> Label,
    {
        self.map
            .entry(state)
            .or_insert_with(|| ArcIndex::build(fst.arcs(state), label_of))
    }
}

/// 2つのFSTを合成します。
///
/// `a`の出力テープと`b`の入力テープを突き合わせ、状態対 `(s1, s2)` を
/// 到達順に探索して新しいFSTを構築します。`a`側のイプシロン出力アークは
/// `b`を動かさずに進み、`b`側のイプシロン入力アークは`a`を動かさずに
/// 進みます。合成フィルタは使用しません。トロピカル半環では余分な
/// イプシロン経路が最小コストに影響しないためです。
///
/// 状態対ごとのマッチ列挙は、アーク数の少ない側を走査してもう一方の
/// ラベル索引を引くため、語彙サイズ分の自己ループを持つ編集
/// トランスデューサとの合成でも全アークの直積走査になりません。
///
/// # 引数
///
/// * `a` - 左側のFST
/// * `b` - 右側のFST
///
/// # 戻り値
///
/// 合成されたFST。`a`の入力テープと`b`の出力テープを持ちます。
pub fn compose(a: &Fst, b: &Fst) -> Fst {
    let mut fst = Fst::new();
    let (a_start, b_start) = match (a.start(), b.start()) {
        (Some(sa), Some(sb)) => (sa, sb),
        _ => return fst,
    };

    let mut pair_ids: HashMap<(StateId, StateId), StateId> = HashMap::new();
    let mut queue: Vec<(StateId, StateId)> = Vec::new();
    let mut a_index = IndexCache::default();
    let mut b_index = IndexCache::default();

    let start = fst.add_state();
    fst.set_start(start);
    pair_ids.insert((a_start, b_start), start);
    queue.push((a_start, b_start));

    let mut head = 0;
    while head < queue.len() {
        let (s1, s2) = queue[head];
        head += 1;
        let state = pair_ids[&(s1, s2)];

        if let (Some(w1), Some(w2)) = (a.final_weight(s1), b.final_weight(s2)) {
            fst.set_final(state, w1 + w2);
        }

        let a_arcs = a.arcs(s1);
        let b_arcs = b.arcs(s2);
        let a_idx = a_index.get(a, s1, |arc| arc.olabel);
        let b_idx = b_index.get(b, s2, |arc| arc.ilabel);

        let mut emit = |fst: &mut Fst, pair: (StateId, StateId), arc: Arc| {
            let target = *pair_ids.entry(pair).or_insert_with(|| {
                queue.push(pair);
                fst.add_state()
            });
            fst.add_arc(state, Arc { target, ..arc });
        };

        // a側のみが進む（出力イプシロン）
        for &i in &a_idx.eps {
            let arc1 = &a_arcs[i];
            emit(
                &mut fst,
                (arc1.target, s2),
                Arc::new(arc1.ilabel, EPSILON, arc1.weight, 0),
            );
        }

        // 非イプシロンのマッチ対。アーク数の少ない側をアーク順に走査し、
        // もう一方はラベル索引で引く。アーク順の走査なので結果は決定的になる。
        let a_non_eps = a_arcs.len() - a_idx.eps.len();
        let b_non_eps = b_arcs.len() - b_idx.eps.len();
        if a_non_eps <= b_non_eps {
            for arc1 in a_arcs.iter().filter(|arc| arc.olabel != EPSILON) {
                if let Some(b_matches) = b_idx.by_label.get(&arc1.olabel) {
                    for &j in b_matches {
                        let arc2 = &b_arcs[j];
                        emit(
                            &mut fst,
                            (arc1.target, arc2.target),
                            Arc::new(arc1.ilabel, arc2.olabel, arc1.weight + arc2.weight, 0),
                        );
                    }
                }
            }
        } else {
            for arc2 in b_arcs.iter().filter(|arc| arc.ilabel != EPSILON) {
                if let Some(a_matches) = a_idx.by_label.get(&arc2.ilabel) {
                    for &i in a_matches {
                        let arc1 = &a_arcs[i];
                        emit(
                            &mut fst,
                            (arc1.target, arc2.target),
                            Arc::new(arc1.ilabel, arc2.olabel, arc1.weight + arc2.weight, 0),
                        );
                    }
                }
            }
        }

        // b側のみが進む（入力イプシロン）
        for &j in &b_idx.eps {
            let arc2 = &b_arcs[j];
            emit(
                &mut fst,
                (s1, arc2.target),
                Arc::new(EPSILON, arc2.olabel, arc2.weight, 0),
            );
        }
    }
    fst
}

/// FSTの入出力テープを反転します。
///
/// すべてのアークの入力ラベルと出力ラベルを交換した新しいFSTを返します。
///
/// # 引数
///
/// * `a` - 対象のFST
///
/// # 戻り値
///
/// 反転されたFST
pub fn invert(a: &Fst) -> Fst {
    let mut fst = Fst::new();
    for state in 0..a.num_states() {
        let state = state as StateId;
        let new_state = fst.add_state();
        if let Some(w) = a.final_weight(state) {
            fst.set_final(new_state, w);
        }
        for arc in a.arcs(state) {
            fst.add_arc(
                new_state,
                Arc::new(arc.olabel, arc.ilabel, arc.weight, arc.target),
            );
        }
    }
    if let Some(s) = a.start() {
        fst.set_start(s);
    }
    fst
}

/// FSTのラベルを付け替えます。
///
/// 対応表に含まれるラベルのみが置換され、それ以外はそのまま保持されます。
///
/// # 引数
///
/// * `a` - 対象のFST
/// * `imap` - 入力ラベルの対応表（旧ラベル→新ラベル）
/// * `omap` - 出力ラベルの対応表（旧ラベル→新ラベル）
///
/// # 戻り値
///
/// ラベルが付け替えられたFST
pub fn relabel(a: &Fst, imap: &HashMap<Label, Label>, omap: &HashMap<Label, Label>) -> Fst {
    let mut fst = Fst::new();
    for state in 0..a.num_states() {
        let state = state as StateId;
        let new_state = fst.add_state();
        if let Some(w) = a.final_weight(state) {
            fst.set_final(new_state, w);
        }
        for arc in a.arcs(state) {
            let ilabel = imap.get(&arc.ilabel).copied().unwrap_or(arc.ilabel);
            let olabel = omap.get(&arc.olabel).copied().unwrap_or(arc.olabel);
            fst.add_arc(new_state, Arc::new(ilabel, olabel, arc.weight, arc.target));
        }
    }
    if let Some(s) = a.start() {
        fst.set_start(s);
    }
    fst
}
