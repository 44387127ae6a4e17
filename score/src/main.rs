//! ASR仮説スコアリングのメインエントリーポイント
//!
//! このバイナリは、参照書き起こしと仮説のKaldiアーカイブおよびGLM CSVを
//! 読み込み、発話ごとのスコアと整列差分を結果ファイルに書き出します。
//! 標準出力にはコーパス全体の統計のJSONとKaldi形式の要約を出力します。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use terfst::errors::TerfstError;
use terfst::report::{render_alignment, render_kaldi_summary, render_overall, render_score_line};
use terfst::tokenize::tokenize;
use terfst::{Aligner, EditConfig, ErrorStats, GlmTable, TokenizerMode, UtteranceSet};

/// コマンドライン引数
///
/// `clap`を使用してコマンドライン引数をパースします。
#[derive(Parser, Debug)]
#[clap(
    name = "asr-score",
    version,
    about = "Scores ASR hypotheses against reference transcripts"
)]
struct Args {
    /// Reference transcripts in Kaldi archive format (one `UID TEXT` per line).
    #[clap(long = "ref")]
    ref_in: PathBuf,

    /// Hypothesis transcripts in Kaldi archive format.
    #[clap(long = "hyp")]
    hyp_in: PathBuf,

    /// GLM rule table in CSV format (one rule per line, comma-separated phrases).
    #[clap(long = "glm")]
    glm_in: PathBuf,

    /// Tokenizer mode. Choices are whitespace and char.
    #[clap(long, default_value = "whitespace")]
    tokenizer: TokenizerMode,

    /// Interval of progress reports, in utterances.
    #[clap(long, default_value = "500")]
    logk: usize,

    /// File to which per-utterance results are written.
    result_file: PathBuf,
}

/// スコアリング実行中に発生する可能性のあるエラー
#[derive(Debug, Error)]
enum ScoreError {
    /// ライブラリのエラー
    #[error(transparent)]
    Terfst(#[from] TerfstError),

    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON直列化エラー
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// 発話の整列エラー
    ///
    /// どの発話で失敗したかを含めてライブラリのエラーをラップします。
    #[error("Alignment failed for utterance '{uid}': {source}")]
    Alignment {
        /// 発話ID
        uid: String,
        /// 元のエラー
        source: TerfstError,
    },
}

/// 評価対象の1発話。
struct EvalUtt {
    uid: String,
    ref_tokens: Vec<String>,
    hyp_tokens: Vec<String>,
    raw_hyp: String,
}

/// スコアリングを実行し、集計済みの統計を返します。
///
/// 発話ごとの結果（スコアのJSON行と4行の整列差分）を結果ファイルに
/// 書き出し、末尾に全体統計のブロックを追加します。仮説の発話IDを
/// 昇順に処理するため、出力は決定的です。
///
/// # 引数
///
/// * `args` - コマンドライン引数
///
/// # 戻り値
///
/// 集計済みの[`ErrorStats`]
///
/// # エラー
///
/// 入力の読み込み失敗、UIDの重複、空の合成ラティス、参照長0などの
/// 致命的条件で[`ScoreError`]が返されます。
fn run(args: &Args) -> Result<ErrorStats, ScoreError> {
    eprintln!("Loading the inputs...");
    let refs = UtteranceSet::from_path(&args.ref_in, "ref")?;
    let hyps = UtteranceSet::from_path(&args.hyp_in, "hyp")?;
    let glm = GlmTable::from_path(&args.glm_in)?;
    eprintln!(
        "{} references, {} hypotheses, {} GLM rules",
        refs.len(),
        hyps.len(),
        glm.len()
    );

    let mut stats = ErrorStats::new();
    stats.num_ref_utts = refs.len();
    stats.num_hyp_utts = hyps.len();

    // 評価対象の発話を集める。参照のない仮説と空の参照はここで除外する。
    let mut eval_utts = Vec::new();
    for uid in hyps.sorted_uids() {
        let hyp_text = hyps.get(uid).map(|utt| utt.text.as_str()).unwrap_or("");
        let Some(reference) = refs.get(uid) else {
            eprintln!("Warning: hypothesis '{uid}' has no reference; skipped");
            stats.num_hyp_without_ref += 1;
            continue;
        };
        let ref_tokens = tokenize(&reference.text, args.tokenizer);
        if ref_tokens.is_empty() {
            eprintln!("Warning: reference text of '{uid}' is empty; skipped");
            continue;
        }
        eval_utts.push(EvalUtt {
            uid: uid.to_string(),
            ref_tokens,
            hyp_tokens: tokenize(hyp_text, args.tokenizer),
            raw_hyp: hyp_text.to_string(),
        });
    }

    eprintln!("Building the aligner...");
    let corpus_tokens = eval_utts
        .iter()
        .flat_map(|utt| utt.ref_tokens.iter().chain(utt.hyp_tokens.iter()));
    let aligner = Aligner::new(corpus_tokens, &glm, args.tokenizer, &EditConfig::default())?;

    eprintln!("Scoring...");
    let mut wtr = BufWriter::new(File::create(&args.result_file)?);
    let logk = args.logk.max(1);
    for (i, utt) in eval_utts.iter().enumerate() {
        let aligned = aligner
            .align(&utt.ref_tokens, &utt.hyp_tokens)
            .map_err(|source| ScoreError::Alignment {
                uid: utt.uid.clone(),
                source,
            })?;
        writeln!(wtr, "{}", render_score_line(&utt.uid, &aligned))?;
        writeln!(wtr, "{}", render_alignment(&utt.raw_hyp, &aligned.steps))?;
        stats.accumulate(&aligned);
        if (i + 1) % logk == 0 {
            eprintln!("{} utterances scored", i + 1);
        }
    }

    writeln!(wtr, "{}", render_overall(&stats)?)?;
    wtr.flush()?;
    Ok(stats)
}

/// メイン関数
///
/// コマンドライン引数をパースしてスコアリングを実行し、全体統計を
/// 標準出力に出力します。
///
/// # 戻り値
///
/// 実行が成功した場合は`Ok(())`、失敗した場合は対応する`ScoreError`を
/// 返します（プロセスは非ゼロで終了します）。
fn main() -> Result<(), ScoreError> {
    let args = Args::parse();
    let stats = run(&args)?;
    println!("{}", serde_json::to_string(&stats)?);
    println!("{}", render_kaldi_summary(&stats)?);
    Ok(())
}
