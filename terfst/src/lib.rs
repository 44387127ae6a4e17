//! # terfst
//!
//! terfstは、音声認識（ASR）の仮説を参照書き起こしと照合し、トークン誤り率
//! （TER/WER/CER）・文誤り率（SER）・編集カウンタ（C/S/I/D）・整列差分を
//! 計算するGLM対応の編集距離整列器です。
//!
//! ## 概要
//!
//! 素朴なLevenshtein表の代わりに、重み付き有限状態トランスデューサの
//! 合成として整列を構成します。GLM（Global Mapping）ルール表により、
//! `I'M ↔ I AM`のような交換可能な表層や`T-SHIRT ↔ T SHIRT`のような
//! ハイフン変種を、編集を二重に数えることなく無償でマッチさせられます。
//!
//! ## 主な機能
//!
//! - **GLM対応の整列**: ルールフレーズの出現をタグ付けし、代替表層の
//!   「ソーセージ」FSTに展開して合成
//! - **2因子編集距離**: 編集ラベルを仲介する左右のトランスデューサ対
//! - **補助形によるマッチ**: `t#`シンボルを介した代替表層の無償マッチ
//! - **決定的な結果**: 同コストの整列は常に同じ分解に解決される
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), terfst::errors::TerfstError> {
//! use terfst::tokenize::tokenize;
//! use terfst::{Aligner, EditConfig, GlmTable, TokenizerMode};
//!
//! let glm = GlmTable::from_reader("I'M,I AM".as_bytes())?;
//! let ref_tokens = tokenize("HEY I AM HERE", TokenizerMode::Whitespace);
//! let hyp_tokens = tokenize("HEY I'M HERE", TokenizerMode::Whitespace);
//!
//! let corpus_tokens = ref_tokens.iter().chain(hyp_tokens.iter());
//! let aligner = Aligner::new(
//!     corpus_tokens,
//!     &glm,
//!     TokenizerMode::Whitespace,
//!     &EditConfig::default(),
//! )?;
//!
//! let result = aligner.align(&ref_tokens, &hyp_tokens)?;
//! assert_eq!(result.cor, 4);
//! assert_eq!(result.distance, 0.0);
//! # Ok(())
//! # }
//! ```

/// 発話単位の整列器
pub mod aligner;

/// 共通の定数とユーティリティ
pub mod common;

/// 発話コーパスの読み込み
pub mod corpus;

/// 2因子編集距離トランスデューサ
pub mod edit;

/// エラー型の定義
pub mod errors;

/// 重み付きFSTカーネル
pub mod fst;

/// GLMルール表の読み込み
pub mod glm;

/// 整列結果と統計の整形出力
pub mod report;

/// 誤り統計の集計
pub mod stats;

/// シンボル表
pub mod symbol;

/// GLMタグ付け器
pub mod tagger;

/// 入力テキストのトークン化
pub mod tokenize;


// Re-exports
pub use aligner::{AlignedUtt, Aligner, AlignmentStep, EditOp};
pub use corpus::{Utterance, UtteranceSet};
pub use edit::{EditConfig, EditLabels, EditTransducer};
pub use glm::{GlmRule, GlmTable};
pub use stats::ErrorStats;
pub use symbol::SymbolTable;
pub use tokenize::TokenizerMode;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
