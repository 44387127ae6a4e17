//! 整列結果と統計の整形出力モジュール
//!
//! このモジュールは、1発話につき4行（生の仮説文、HYP#・REF・EDITの
//! 3トラック）のカラム揃えの差分表示と、コーパス全体の統計ブロック、
//! Kaldi形式の要約行を生成します。
//!
//! カラム幅は各位置のトークンの表示幅の最大値に1スペースを加えたもので、
//! CJK統合漢字（U+4E00..U+9FA5）は幅2として数えます。

use crate::aligner::{AlignedUtt, AlignmentStep};
use crate::common::display_width;
use crate::errors::Result;
use crate::stats::ErrorStats;

/// トラック名のプレフィックス幅（"HYP#" / "REF" / "EDIT" を揃える）。
const TRACK_PREFIX_WIDTH: usize = 4;

/// セルをカラム幅まで空白で埋めて行に追加します。
fn push_cell(line: &mut String, cell: &str, width: usize) {
    line.push(' ');
    line.push_str(cell);
    for _ in display_width(cell)..width {
        line.push(' ');
    }
}

/// 1発話の整列を4行の文字列に整形します。
///
/// 1行目は生の仮説文、続く3行はカラム揃えのHYP#・REF・EDITトラックです。
/// 挿入ではREF側に、削除ではHYP側に`*`が表示されます。EDITセルは
/// 一致では空欄、それ以外は`S`/`I`/`D`です。
///
/// # 引数
///
/// * `raw_hyp` - 生の仮説文（トークン化前のテキスト）
/// * `steps` - 整列ステップの列
///
/// # 戻り値
///
/// 末尾に改行を含まない4行の文字列
pub fn render_alignment(raw_hyp: &str, steps: &[AlignmentStep]) -> String {
    let mut hyp_line = format!("{:w$}", "HYP#", w = TRACK_PREFIX_WIDTH);
    let mut ref_line = format!("{:w$}", "REF", w = TRACK_PREFIX_WIDTH);
    let mut edit_line = format!("{:w$}", "EDIT", w = TRACK_PREFIX_WIDTH);

    for step in steps {
        let width = display_width(&step.hyp_surface).max(display_width(&step.ref_surface));
        push_cell(&mut hyp_line, &step.hyp_surface, width);
        push_cell(&mut ref_line, &step.ref_surface, width);
        push_cell(&mut edit_line, step.edit.mark(), width);
    }

    format!(
        "{}\n{}\n{}\n{}",
        raw_hyp,
        hyp_line.trim_end(),
        ref_line.trim_end(),
        edit_line.trim_end()
    )
}

/// 1発話のスコアをJSON行に整形します。
///
/// # 引数
///
/// * `uid` - 発話ID
/// * `utt` - 整列結果
///
/// # 戻り値
///
/// `{"uid":...,"score":...,"TER":...,"mTER":...,"cor":...,...}` 形式の1行
pub fn render_score_line(uid: &str, utt: &AlignedUtt) -> String {
    let ter = if utt.ref_len() == 0 {
        0.0
    } else {
        100.0 * (utt.sub + utt.del + utt.ins) as f64 / utt.ref_len() as f64
    };
    let denom = utt.ref_len().max(utt.hyp_len());
    let mter = if denom == 0 {
        0.0
    } else {
        100.0 * (utt.sub + utt.del + utt.ins) as f64 / denom as f64
    };
    format!(
        "{{\"uid\":\"{}\",\"score\":{},\"TER\":{:.2},\"mTER\":{:.2},\"cor\":{},\"sub\":{},\"ins\":{},\"del\":{}}}",
        uid, 0.0 - f64::from(utt.distance), ter, mter, utt.cor, utt.sub, utt.ins, utt.del
    )
}

/// コーパス全体の統計を人間可読のブロックに整形します。
///
/// # 引数
///
/// * `stats` - 集計済みの統計
///
/// # 戻り値
///
/// 複数行の統計ブロック
///
/// # エラー
///
/// 率が定義されない場合（参照長0、評価発話0）、エラーが返されます。
pub fn render_overall(stats: &ErrorStats) -> Result<String> {
    let ter = stats.token_error_rate()?;
    let mter = stats.modified_token_error_rate()?;
    let ser = stats.sentence_error_rate()?;
    let mut out = String::new();
    out.push_str("==================== Overall Statistics ====================\n");
    out.push_str(&format!("reference utterances         : {}\n", stats.num_ref_utts));
    out.push_str(&format!("hypothesis utterances        : {}\n", stats.num_hyp_utts));
    out.push_str(&format!("evaluated utterances         : {}\n", stats.num_eval_utts));
    out.push_str(&format!(
        "hypotheses without reference : {}\n",
        stats.num_hyp_without_ref
    ));
    out.push_str(&format!(
        "utterances with error        : {}\n",
        stats.num_utts_with_error
    ));
    out.push_str(&format!(
        "Cor / Sub / Ins / Del        : {} / {} / {} / {}\n",
        stats.cor, stats.sub, stats.ins, stats.del
    ));
    out.push_str(&format!("TER                          : {ter:.2}%\n"));
    out.push_str(&format!("mTER                         : {mter:.2}%\n"));
    out.push_str(&format!("SER                          : {ser:.2}%\n"));
    Ok(out)
}

/// Kaldi形式の`%WER`/`%SER`の2行要約を整形します。
///
/// # 引数
///
/// * `stats` - 集計済みの統計
///
/// # 戻り値
///
/// 2行の要約文字列
///
/// # エラー
///
/// 率が定義されない場合、エラーが返されます。
pub fn render_kaldi_summary(stats: &ErrorStats) -> Result<String> {
    let ter = stats.token_error_rate()?;
    let ser = stats.sentence_error_rate()?;
    Ok(format!(
        "%WER {:.2} [ {} / {}, {} ins, {} del, {} sub ]\n%SER {:.2} [ {} / {} ]",
        ter,
        stats.num_errors(),
        stats.ref_len(),
        stats.ins,
        stats.del,
        stats.sub,
        ser,
        stats.num_utts_with_error,
        stats.num_eval_utts
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::EditOp;

    fn step(edit: EditOp, ref_surface: &str, hyp_surface: &str) -> AlignmentStep {
        AlignmentStep {
            edit,
            ref_surface: ref_surface.to_string(),
            hyp_surface: hyp_surface.to_string(),
        }
    }

    #[test]
    fn test_render_alignment_columns() {
        let steps = vec![
            step(EditOp::Cor, "HEY", "HEY"),
            step(EditOp::Sub, "AM", "I'M"),
            step(EditOp::Del, "HERE", "*"),
            step(EditOp::Ins, "*", "NOW"),
        ];
        let rendered = render_alignment("HEY I'M NOW", &steps);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "HEY I'M NOW");
        assert_eq!(lines[1], "HYP# HEY I'M *    NOW");
        assert_eq!(lines[2], "REF  HEY AM  HERE *");
        assert_eq!(lines[3], "EDIT     S   D    I");
    }

    #[test]
    fn test_render_alignment_cjk_width() {
        let steps = vec![step(EditOp::Sub, "中", "A")];
        let rendered = render_alignment("A", &steps);
        let lines: Vec<&str> = rendered.lines().collect();
        // 「中」は表示幅2なのでAのセルは幅2に揃う
        assert_eq!(lines[1], "HYP# A");
        assert_eq!(lines[2], "REF  中");
        assert_eq!(lines[3], "EDIT S");
    }

    #[test]
    fn test_render_score_line() {
        let utt = AlignedUtt {
            steps: vec![],
            cor: 2,
            sub: 1,
            ins: 0,
            del: 1,
            distance: 2.0,
        };
        let line = render_score_line("utt1", &utt);
        assert_eq!(
            line,
            "{\"uid\":\"utt1\",\"score\":-2,\"TER\":50.00,\"mTER\":50.00,\"cor\":2,\"sub\":1,\"ins\":0,\"del\":1}"
        );
    }

    #[test]
    fn test_render_kaldi_summary() {
        let mut stats = ErrorStats::new();
        stats.accumulate(&AlignedUtt {
            steps: vec![],
            cor: 2,
            sub: 1,
            ins: 0,
            del: 1,
            distance: 2.0,
        });
        let summary = render_kaldi_summary(&stats).unwrap();
        assert_eq!(
            summary,
            "%WER 50.00 [ 2 / 4, 0 ins, 1 del, 1 sub ]\n%SER 100.00 [ 1 / 1 ]"
        );
    }
}
