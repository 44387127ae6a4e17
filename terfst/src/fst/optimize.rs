//! FSTの最適化（イプシロン除去・トリミング・決定化・最小化）
//!
//! 仮説展開で生成されるソーセージFSTは、和・連接の糊付けで多数の
//! イプシロン遷移と等価な状態を持ちます。合成前にこれらを取り除くことで
//! ラティスの状態数を抑えます。

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::errors::{Result, TerfstError};
use crate::fst::{Arc, Fst, StateId, EPSILON};

/// 両テープともイプシロンであるアークかどうかを判定します。
#[inline]
fn is_eps_arc(arc: &Arc) -> bool {
    arc.ilabel == EPSILON && arc.olabel == EPSILON
}

/// 指定状態からのイプシロン閉包（状態と最小到達重みの組）を計算します。
///
/// 重みは非負のため、強い改善があったときのみ再探索する
/// ワークリスト法で収束します。
fn eps_closure(fst: &Fst, state: StateId) -> Vec<(StateId, f32)> {
    let mut dist: HashMap<StateId, f32> = HashMap::new();
    dist.insert(state, 0.0);
    let mut stack = vec![state];
    while let Some(s) = stack.pop() {
        let d = dist[&s];
        for arc in fst.arcs(s) {
            if !is_eps_arc(arc) {
                continue;
            }
            let nd = d + arc.weight;
            let better = dist.get(&arc.target).map_or(true, |&old| nd < old);
            if better {
                dist.insert(arc.target, nd);
                stack.push(arc.target);
            }
        }
    }
    let mut closure: Vec<(StateId, f32)> = dist.into_iter().collect();
    closure.sort_unstable_by_key(|&(s, _)| s);
    closure
}

/// イプシロン遷移（入出力ともイプシロンのアーク）を除去します。
///
/// 各状態のイプシロン閉包を展開し、閉包内の非イプシロンアークを
/// 重みを加算した上で直接引き直します。結果はトリミングされます。
///
/// # 引数
///
/// * `a` - 対象のFST
///
/// # 戻り値
///
/// イプシロン遷移を持たない等価なFST
pub fn rm_epsilon(a: &Fst) -> Fst {
    let mut fst = Fst::new();
    for _ in 0..a.num_states() {
        fst.add_state();
    }
    if let Some(s) = a.start() {
        fst.set_start(s);
    }
    for state in 0..a.num_states() {
        let state = state as StateId;
        let mut final_weight: Option<f32> = a.final_weight(state);
        for (q, d) in eps_closure(a, state) {
            if let Some(fw) = a.final_weight(q) {
                let total = d + fw;
                if final_weight.map_or(true, |old| total < old) {
                    final_weight = Some(total);
                }
            }
            for arc in a.arcs(q) {
                if is_eps_arc(arc) {
                    continue;
                }
                fst.add_arc(
                    state,
                    Arc::new(arc.ilabel, arc.olabel, d + arc.weight, arc.target),
                );
            }
        }
        if let Some(w) = final_weight {
            fst.set_final(state, w);
        }
    }
    connect(&fst)
}

/// 到達不能・非共到達の状態を取り除き、状態IDを詰め直します。
///
/// # 引数
///
/// * `a` - 対象のFST
///
/// # 戻り値
///
/// トリミングされたFST。開始状態から受理状態への経路がない場合は
/// 空のFSTになります。
pub fn connect(a: &Fst) -> Fst {
    let n = a.num_states();
    let mut forward = vec![false; n];
    if let Some(start) = a.start() {
        let mut stack = vec![start];
        forward[start as usize] = true;
        while let Some(s) = stack.pop() {
            for arc in a.arcs(s) {
                if !forward[arc.target as usize] {
                    forward[arc.target as usize] = true;
                    stack.push(arc.target);
                }
            }
        }
    }

    // 逆向き隣接リストで受理状態からの共到達性を計算する
    let mut reverse: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for state in 0..n {
        for arc in a.arcs(state as StateId) {
            reverse[arc.target as usize].push(state as StateId);
        }
    }
    let mut backward = vec![false; n];
    let mut stack: Vec<StateId> = (0..n as StateId)
        .filter(|&s| a.final_weight(s).is_some())
        .collect();
    for &s in &stack {
        backward[s as usize] = true;
    }
    while let Some(s) = stack.pop() {
        for &p in &reverse[s as usize] {
            if !backward[p as usize] {
                backward[p as usize] = true;
                stack.push(p);
            }
        }
    }

    let mut remap: Vec<Option<StateId>> = vec![None; n];
    let mut fst = Fst::new();
    for state in 0..n {
        if forward[state] && backward[state] {
            remap[state] = Some(fst.add_state());
        }
    }
    for state in 0..n {
        let Some(new_state) = remap[state] else {
            continue;
        };
        if let Some(w) = a.final_weight(state as StateId) {
            fst.set_final(new_state, w);
        }
        for arc in a.arcs(state as StateId) {
            if let Some(target) = remap[arc.target as usize] {
                fst.add_arc(new_state, Arc::new(arc.ilabel, arc.olabel, arc.weight, target));
            }
        }
    }
    if let Some(start) = a.start() {
        if let Some(new_start) = remap[start as usize] {
            fst.set_start(new_start);
        }
    }
    fst
}

/// 残余重み付きの部分集合（決定化の状態）。
type Subset = Vec<(StateId, u32)>;

/// 重み付きアクセプタを決定化します。
///
/// トロピカル半環上の部分集合構成です。各ラベルについて最小の重みを
/// アークに載せ、残余を部分集合側に繰り越します。
///
/// # 引数
///
/// * `a` - イプシロン遷移を持たないアクセプタ
///
/// # 戻り値
///
/// 決定化されたアクセプタ
///
/// # エラー
///
/// 入力がアクセプタでない場合、またはイプシロン遷移が残っている場合、
/// [`TerfstError::Undeterminizable`]が返されます。
pub fn determinize(a: &Fst) -> Result<Fst> {
    if !a.is_acceptor() {
        return Err(TerfstError::Undeterminizable {
            requirement: "an acceptor",
        });
    }
    for state in 0..a.num_states() {
        if a.arcs(state as StateId).iter().any(|arc| arc.ilabel == EPSILON) {
            return Err(TerfstError::Undeterminizable {
                requirement: "an epsilon-free machine; run rm_epsilon first",
            });
        }
    }

    let mut fst = Fst::new();
    let Some(start) = a.start() else {
        return Ok(fst);
    };

    let mut subset_ids: HashMap<Subset, StateId> = HashMap::new();
    let mut queue: Vec<Subset> = Vec::new();

    let start_subset: Subset = vec![(start, 0.0f32.to_bits())];
    let id = fst.add_state();
    fst.set_start(id);
    subset_ids.insert(start_subset.clone(), id);
    queue.push(start_subset);

    let mut head = 0;
    while head < queue.len() {
        let subset = queue[head].clone();
        head += 1;
        let state = subset_ids[&subset];

        let mut final_weight: Option<f32> = None;
        // ラベルごとに (残余 + アーク重み, 遷移先) を集める
        let mut by_label: BTreeMap<u32, Vec<(f32, StateId)>> = BTreeMap::new();
        for &(q, residual_bits) in &subset {
            let residual = f32::from_bits(residual_bits);
            if let Some(fw) = a.final_weight(q) {
                let total = residual + fw;
                if final_weight.map_or(true, |old| total < old) {
                    final_weight = Some(total);
                }
            }
            for arc in a.arcs(q) {
                by_label
                    .entry(arc.ilabel)
                    .or_default()
                    .push((residual + arc.weight, arc.target));
            }
        }
        if let Some(w) = final_weight {
            fst.set_final(state, w);
        }

        for (label, entries) in by_label {
            let w_min = entries.iter().map(|&(w, _)| w).fold(f32::INFINITY, f32::min);
            let mut residuals: HashMap<StateId, f32> = HashMap::new();
            for (w, target) in entries {
                let r = w - w_min;
                let e = residuals.entry(target).or_insert(f32::INFINITY);
                if r < *e {
                    *e = r;
                }
            }
            let mut next: Subset = residuals
                .into_iter()
                .map(|(s, r)| (s, r.to_bits()))
                .collect();
            next.sort_unstable_by_key(|&(s, _)| s);

            let target = *subset_ids.entry(next.clone()).or_insert_with(|| {
                queue.push(next);
                fst.add_state()
            });
            fst.add_arc(state, Arc::acceptor(label, w_min, target));
        }
    }
    Ok(fst)
}

/// 前向き双模倣による状態の併合でFSTを最小化します。
///
/// 終了重みと遷移の署名が一致する状態を、不動点に達するまで
/// 繰り返し同値類にまとめます。決定化済みアクセプタに対しては
/// 言語と経路重みを保存します。
///
/// # 引数
///
/// * `a` - 対象のFST
///
/// # 戻り値
///
/// 最小化されたFST
pub fn minimize(a: &Fst) -> Fst {
    let n = a.num_states();
    if n == 0 {
        return a.clone();
    }

    let final_key = |s: StateId| -> u64 {
        match a.final_weight(s) {
            Some(w) => u64::from(w.to_bits()),
            None => u64::MAX,
        }
    };

    let mut classes: Vec<u32> = vec![0; n];
    {
        let mut ids: HashMap<u64, u32> = HashMap::new();
        for state in 0..n {
            let key = final_key(state as StateId);
            let next_id = ids.len() as u32;
            let id = *ids.entry(key).or_insert(next_id);
            classes[state] = id;
        }
    }

    // Mooreの分割細分化。署名に現在のクラスを含めるため分割は単調に進み、
    // 不動点で停止する。クラス番号は状態ID順の初出で付けるので比較は安定。
    loop {
        let mut ids: HashMap<(u32, Vec<(u32, u32, u32, u32)>), u32> = HashMap::new();
        let mut next_classes = vec![0u32; n];
        for state in 0..n {
            let mut sig: Vec<(u32, u32, u32, u32)> = a
                .arcs(state as StateId)
                .iter()
                .map(|arc| {
                    (
                        arc.ilabel,
                        arc.olabel,
                        arc.weight.to_bits(),
                        classes[arc.target as usize],
                    )
                })
                .collect();
            sig.sort_unstable();
            sig.dedup();
            let key = (classes[state], sig);
            let next_id = ids.len() as u32;
            next_classes[state] = *ids.entry(key).or_insert(next_id);
        }
        if next_classes == classes {
            break;
        }
        classes = next_classes;
    }

    // 各同値類の代表（最小の状態ID）から新しいFSTを組み立てる
    let mut repr_of_class: HashMap<u32, StateId> = HashMap::new();
    let mut new_id_of_class: HashMap<u32, StateId> = HashMap::new();
    let mut fst = Fst::new();
    for state in 0..n {
        let class = classes[state];
        if !repr_of_class.contains_key(&class) {
            repr_of_class.insert(class, state as StateId);
            new_id_of_class.insert(class, fst.add_state());
        }
    }
    for (&class, &repr) in repr_of_class.iter() {
        let new_state = new_id_of_class[&class];
        if let Some(w) = a.final_weight(repr) {
            fst.set_final(new_state, w);
        }
    }
    // アークはクラス代表の順で引き直す（決定的な出力のため状態ID順に反復）
    let mut seen_classes = hashbrown::HashSet::new();
    for state in 0..n {
        let class = classes[state];
        if !seen_classes.insert(class) {
            continue;
        }
        let new_state = new_id_of_class[&class];
        let mut arcs: Vec<Arc> = a
            .arcs(state as StateId)
            .iter()
            .map(|arc| {
                Arc::new(
                    arc.ilabel,
                    arc.olabel,
                    arc.weight,
                    new_id_of_class[&classes[arc.target as usize]],
                )
            })
            .collect();
        arcs.sort_unstable_by_key(|arc| (arc.ilabel, arc.olabel, arc.weight.to_bits(), arc.target));
        arcs.dedup();
        for arc in arcs {
            fst.add_arc(new_state, arc);
        }
    }
    if let Some(start) = a.start() {
        fst.set_start(new_id_of_class[&classes[start as usize]]);
    }
    fst
}

/// アクセプタの標準的な最適化（イプシロン除去・決定化・最小化）を
/// 一括で適用します。
///
/// # 引数
///
/// * `a` - 対象のアクセプタ
///
/// # 戻り値
///
/// 最適化されたアクセプタ
///
/// # エラー
///
/// 入力がアクセプタでない場合、[`TerfstError::Undeterminizable`]が
/// 返されます。
pub fn optimize(a: &Fst) -> Result<Fst> {
    let fst = rm_epsilon(a);
    if fst.start().is_none() {
        return Ok(fst);
    }
    let fst = determinize(&fst)?;
    Ok(minimize(&fst))
}
