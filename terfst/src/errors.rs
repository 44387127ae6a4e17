//! スコアリング処理のエラー型
//!
//! 評価は途中で黙って復旧せず、異常を検出した時点で即座に失敗します。
//! 静かな整列ミスはリーダーボードの指標を汚染するためです。各バリアントは
//! パイプラインのどの段階で何が壊れたかをそのまま表します。

/// このクレート共通のResult型。
pub type Result<T, E = TerfstError> = std::result::Result<T, E>;

/// terfstが返すエラー。
#[derive(Debug, thiserror::Error)]
pub enum TerfstError {
    /// 発話アーカイブに同じUIDが2回現れた。
    ///
    /// どちらのテキストを採用しても評価結果が変わるため、読み込みの
    /// 時点で致命的エラーとします。
    #[error("duplicate utterance id '{uid}' in the {archive} archive")]
    DuplicateUtteranceId {
        /// アーカイブ名（"ref" または "hyp"）
        archive: &'static str,
        /// 重複したUID
        uid: String,
    },

    /// シンボル表にないトークンでアクセプタを構築しようとした。
    ///
    /// 評価語彙はトークン化とGLM読み込みですべて登録されるはずなので、
    /// このエラーは語彙構築の手順に穴があることを意味します。
    #[error("token '{token}' is missing from the symbol table")]
    UnknownSymbol {
        /// 未登録のトークン
        token: String,
    },

    /// 決定化の前提を満たさない機械が渡された。
    #[error("determinization requires {requirement}")]
    Undeterminizable {
        /// 満たされなかった前提
        requirement: &'static str,
    },

    /// タグ付きIRで開きタグに対応する閉じタグが見つからなかった。
    #[error("rule tag {tag} is not closed in the tagged hypothesis")]
    UnbalancedRuleTag {
        /// 対応が取れなかったタグ
        tag: String,
    },

    /// 参照・編集トランスデューサ・仮説の合成が空の言語になった。
    ///
    /// 挿入・削除を許す編集トランスデューサの下では任意の対が整列
    /// できるはずなので、空のラティスは語彙かタグ付けの不整合を示します。
    #[error("empty composition lattice for hypothesis '{hyp}'")]
    EmptyLattice {
        /// 仮説のトークン列（空白区切り）
        hyp: String,
    },

    /// 分母が0で誤り率が定義できない。
    #[error("{rate} is undefined: {cause}")]
    UndefinedRate {
        /// 率の名前（"TER" など）
        rate: &'static str,
        /// 分母が0になった理由
        cause: &'static str,
    },

    /// 入出力エラー。
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
