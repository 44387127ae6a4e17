//! 重み付き有限状態トランスデューサ（FST）カーネル
//!
//! このモジュールは、グローバルなシンボル表上の重み付き有限状態
//! アクセプタ／トランスデューサを提供します。重みはトロピカル半環
//! （min, +）に属し、最短路計算が編集距離に一致します。
//!
//! ラベル0はイプシロン（空遷移）に予約されています。
//!
//! サブモジュール:
//! - [`compose`] -- 合成・反転・ラベル置換
//! - [`optimize`] -- イプシロン除去・決定化・最小化・トリミング
//! - [`shortest`] -- 最短距離・最短路

pub mod compose;
pub mod optimize;
pub mod shortest;

/// シンボル表のIDに対応するラベル型。
pub type Label = u32;

/// FST状態のID型。
pub type StateId = u32;

/// イプシロン（空遷移）ラベル。
pub const EPSILON: Label = 0;

/// FSTの遷移（アーク）。
///
/// 入力ラベル、出力ラベル、トロピカル重み、遷移先状態を保持します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// 入力ラベル（0はイプシロン）
    pub ilabel: Label,
    /// 出力ラベル（0はイプシロン）
    pub olabel: Label,
    /// トロピカル重み
    pub weight: f32,
    /// 遷移先状態
    pub target: StateId,
}

impl Arc {
    /// 新しいアークを作成します。
    #[inline(always)]
    pub const fn new(ilabel: Label, olabel: Label, weight: f32, target: StateId) -> Self {
        Self {
            ilabel,
            olabel,
            weight,
            target,
        }
    }

    /// 入出力ラベルが等しいアークを作成します。
    #[inline(always)]
    pub const fn acceptor(label: Label, weight: f32, target: StateId) -> Self {
        Self::new(label, label, weight, target)
    }
}

/// トロピカル半環上の重み付きFST。
///
/// 状態ごとのアークリストと終了重みを保持します。開始状態は1つで、
/// 終了重みが`Some`の状態が受理状態です。
#[derive(Debug, Clone, Default)]
pub struct Fst {
    arcs: Vec<Vec<Arc>>,
    finals: Vec<Option<f32>>,
    start: Option<StateId>,
}

impl Fst {
    /// 状態を持たない空のFSTを生成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい状態を追加し、そのIDを返します。
    pub fn add_state(&mut self) -> StateId {
        let id = StateId::try_from(self.arcs.len()).unwrap();
        self.arcs.push(Vec::new());
        self.finals.push(None);
        id
    }

    /// 開始状態を設定します。
    #[inline]
    pub fn set_start(&mut self, state: StateId) {
        debug_assert!((state as usize) < self.arcs.len());
        self.start = Some(state);
    }

    /// 開始状態を返します。状態が1つもない場合は`None`です。
    #[inline]
    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    /// 指定された状態を受理状態にします。
    ///
    /// # 引数
    ///
    /// * `state` - 対象の状態
    /// * `weight` - 終了重み
    #[inline]
    pub fn set_final(&mut self, state: StateId, weight: f32) {
        self.finals[state as usize] = Some(weight);
    }

    /// 指定された状態の終了重みを返します。非受理状態では`None`です。
    #[inline]
    pub fn final_weight(&self, state: StateId) -> Option<f32> {
        self.finals[state as usize]
    }

    /// 指定された状態から出るアークのスライスを返します。
    #[inline]
    pub fn arcs(&self, state: StateId) -> &[Arc] {
        &self.arcs[state as usize]
    }

    /// 指定された状態にアークを追加します。
    #[inline]
    pub fn add_arc(&mut self, state: StateId, arc: Arc) {
        debug_assert!((arc.target as usize) < self.arcs.len());
        self.arcs[state as usize].push(arc);
    }

    /// 状態数を返します。
    #[inline]
    pub fn num_states(&self) -> usize {
        self.arcs.len()
    }

    /// アークの総数を返します。
    pub fn num_arcs(&self) -> usize {
        self.arcs.iter().map(Vec::len).sum()
    }

    /// すべてのアークが入出力同一ラベルを持つ（= アクセプタである）か
    /// どうかを判定します。
    pub fn is_acceptor(&self) -> bool {
        self.arcs
            .iter()
            .flatten()
            .all(|arc| arc.ilabel == arc.olabel)
    }

    /// ラベル列を受理する線形アクセプタを構築します。
    ///
    /// 空の列からは、開始状態のみが受理状態となる1状態のFSTが生成されます。
    ///
    /// # 引数
    ///
    /// * `labels` - 受理するラベル列
    ///
    /// # 戻り値
    ///
    /// 重み0の線形アクセプタ
    pub fn linear_acceptor(labels: &[Label]) -> Self {
        let mut fst = Self::new();
        let mut state = fst.add_state();
        fst.set_start(state);
        for &label in labels {
            let next = fst.add_state();
            fst.add_arc(state, Arc::acceptor(label, 0.0, next));
            state = next;
        }
        fst.set_final(state, 0.0);
        fst
    }

    /// `other`のすべての状態を`self`にコピーし、状態IDのオフセットを返します。
    fn copy_states_from(&mut self, other: &Fst) -> StateId {
        let offset = StateId::try_from(self.arcs.len()).unwrap();
        for (state, arcs) in other.arcs.iter().enumerate() {
            let new_state = self.add_state();
            if let Some(w) = other.finals[state] {
                self.set_final(new_state, w);
            }
            for arc in arcs {
                self.arcs[new_state as usize].push(Arc::new(
                    arc.ilabel,
                    arc.olabel,
                    arc.weight,
                    arc.target + offset,
                ));
            }
        }
        offset
    }

    /// 2つのFSTの和（言語の合併）を構築します。
    ///
    /// 新しい開始状態からイプシロン遷移で双方の開始状態に分岐します。
    ///
    /// # 引数
    ///
    /// * `a` - 1つめのFST
    /// * `b` - 2つめのFST
    ///
    /// # 戻り値
    ///
    /// 和のFST
    pub fn union(a: &Fst, b: &Fst) -> Fst {
        let mut fst = Fst::new();
        let start = fst.add_state();
        fst.set_start(start);
        let a_off = fst.copy_states_from(a);
        let b_off = fst.copy_states_from(b);
        if let Some(s) = a.start() {
            fst.add_arc(start, Arc::new(EPSILON, EPSILON, 0.0, s + a_off));
        }
        if let Some(s) = b.start() {
            fst.add_arc(start, Arc::new(EPSILON, EPSILON, 0.0, s + b_off));
        }
        fst
    }

    /// 2つのFSTの連接を構築します。
    ///
    /// `a`の各受理状態から、終了重みを持つイプシロン遷移で`b`の開始状態に
    /// 接続します。
    ///
    /// # 引数
    ///
    /// * `a` - 前半のFST
    /// * `b` - 後半のFST
    ///
    /// # 戻り値
    ///
    /// 連接のFST
    pub fn concat(a: &Fst, b: &Fst) -> Fst {
        let mut fst = Fst::new();
        let a_off = fst.copy_states_from(a);
        let b_off = fst.copy_states_from(b);
        if let Some(s) = a.start() {
            fst.set_start(s + a_off);
        }
        for state in 0..a.num_states() {
            let state = state as StateId;
            if let Some(w) = a.final_weight(state) {
                fst.finals[(state + a_off) as usize] = None;
                if let Some(b_start) = b.start() {
                    fst.add_arc(state + a_off, Arc::new(EPSILON, EPSILON, w, b_start + b_off));
                }
            }
        }
        fst
    }

    /// FSTのクロージャ（Kleeneスター）を構築します。
    ///
    /// 空列を受理する新しい開始状態を追加し、各受理状態から元の開始状態へ
    /// 終了重み付きのイプシロン遷移で戻ります。
    ///
    /// # 引数
    ///
    /// * `a` - 対象のFST
    ///
    /// # 戻り値
    ///
    /// クロージャのFST
    pub fn closure(a: &Fst) -> Fst {
        let mut fst = Fst::new();
        let start = fst.add_state();
        fst.set_start(start);
        fst.set_final(start, 0.0);
        let off = fst.copy_states_from(a);
        if let Some(s) = a.start() {
            fst.add_arc(start, Arc::new(EPSILON, EPSILON, 0.0, s + off));
            for state in 0..a.num_states() {
                let state = state as StateId;
                if let Some(w) = a.final_weight(state) {
                    fst.add_arc(state + off, Arc::new(EPSILON, EPSILON, w, s + off));
                }
            }
        }
        fst
    }
}

#[cfg(test)]
mod tests {
    use super::shortest::shortest_path;
    use super::*;

    /// 線形アクセプタの受理列をたどって回収します。
    fn accepted_labels(fst: &Fst) -> Vec<Label> {
        let path = shortest_path(fst).unwrap();
        path.arcs
            .iter()
            .filter(|a| a.ilabel != EPSILON)
            .map(|a| a.ilabel)
            .collect()
    }

    #[test]
    fn test_linear_acceptor() {
        let fst = Fst::linear_acceptor(&[1, 2, 3]);
        assert_eq!(fst.num_states(), 4);
        assert_eq!(fst.num_arcs(), 3);
        assert_eq!(accepted_labels(&fst), vec![1, 2, 3]);
    }

    #[test]
    fn test_linear_acceptor_empty() {
        let fst = Fst::linear_acceptor(&[]);
        assert_eq!(fst.num_states(), 1);
        assert_eq!(fst.final_weight(0), Some(0.0));
    }

    #[test]
    fn test_union_accepts_both() {
        let a = Fst::linear_acceptor(&[1]);
        let b = Fst::linear_acceptor(&[2, 3]);
        let u = Fst::union(&a, &b);
        // 和は少なくとも一方の列を受理する（最短路は長さ1の側）
        assert_eq!(accepted_labels(&u), vec![1]);
    }

    #[test]
    fn test_concat() {
        let a = Fst::linear_acceptor(&[1]);
        let b = Fst::linear_acceptor(&[2]);
        let c = Fst::concat(&a, &b);
        assert_eq!(accepted_labels(&c), vec![1, 2]);
    }

    #[test]
    fn test_closure_accepts_empty() {
        let a = Fst::linear_acceptor(&[1]);
        let c = Fst::closure(&a);
        let path = shortest_path(&c).unwrap();
        assert_eq!(path.cost, 0.0);
        assert!(path.arcs.iter().all(|a| a.ilabel == EPSILON));
    }
}
