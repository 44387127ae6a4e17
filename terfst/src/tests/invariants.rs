//! 整列の数量的不変条件のテスト

use crate::aligner::{AlignedUtt, Aligner};
use crate::edit::EditConfig;
use crate::glm::GlmTable;
use crate::tokenize::{tokenize, TokenizerMode};

fn toks(s: &str) -> Vec<String> {
    tokenize(s, TokenizerMode::Whitespace)
}

fn align(ref_text: &str, hyp_text: &str, glm_csv: &str) -> AlignedUtt {
    let glm = GlmTable::from_reader(glm_csv.as_bytes()).unwrap();
    let ref_tokens = toks(ref_text);
    let hyp_tokens = toks(hyp_text);
    let corpus: Vec<String> = ref_tokens.iter().chain(hyp_tokens.iter()).cloned().collect();
    let aligner = Aligner::new(
        corpus,
        &glm,
        TokenizerMode::Whitespace,
        &EditConfig::default(),
    )
    .unwrap();
    aligner.align(&ref_tokens, &hyp_tokens).unwrap()
}

/// 教科書どおりのLevenshtein距離（参照実装）
fn levenshtein(a: &[String], b: &[String]) -> usize {
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            let val = (prev + cost).min(row[j] + 1).min(row[j - 1] + 1);
            prev = row[j];
            row[j] = val;
        }
    }
    row[b.len()]
}

/// C + S + D が参照長に、C + S + I が仮説長に一致する
#[test]
fn consumed_tokens_match_input_lengths() {
    let cases = [
        ("HEY I AM HERE", "HEY I'M HERE"),
        ("A B C D E", "X Y"),
        ("FOO", "FOO BAR BAZ QUX"),
        ("A", ""),
    ];
    for (ref_text, hyp_text) in cases {
        let utt = align(ref_text, hyp_text, "");
        assert_eq!(utt.ref_len(), toks(ref_text).len(), "{ref_text} / {hyp_text}");
        assert_eq!(utt.hyp_len(), toks(hyp_text).len(), "{ref_text} / {hyp_text}");
    }
}

/// 単位コストでは最短路コストが S + I + D に一致する
#[test]
fn path_cost_equals_edit_count() {
    let cases = [
        ("HEY I AM HERE", "HEY I'M HERE"),
        ("A B C", "A B C"),
        ("A B C", "C B A"),
        ("X", "A B C D"),
    ];
    for (ref_text, hyp_text) in cases {
        let utt = align(ref_text, hyp_text, "");
        assert_eq!(
            utt.distance,
            (utt.sub + utt.ins + utt.del) as f32,
            "{ref_text} / {hyp_text}"
        );
    }
}

/// GLM行の順序を入れ替えても距離は変わらない
#[test]
fn glm_row_order_does_not_change_distance() {
    let a = align("HEY I AM HERE", "HEY I'M HERE", "GONNA,GOING TO\nI'M,I AM\n");
    let b = align("HEY I AM HERE", "HEY I'M HERE", "I'M,I AM\nGONNA,GOING TO\n");
    assert_eq!(a.distance, b.distance);
    assert_eq!(
        (a.cor, a.sub, a.ins, a.del),
        (b.cor, b.sub, b.ins, b.del)
    );
}

/// GLMが空でハイフンもない場合、距離は古典的なLevenshtein距離に一致する
#[test]
fn agrees_with_levenshtein_without_glm() {
    let cases = [
        ("THE QUICK BROWN FOX", "THE QUICK BROWN FOX"),
        ("THE QUICK BROWN FOX", "THE QUACK BROWN"),
        ("A B A B A", "B A B A B"),
        ("ONE TWO THREE", "THREE TWO ONE"),
        ("SOME LONG UTTERANCE WITH WORDS", "SOME UTTERANCE LONG WITH TOKENS"),
    ];
    for (ref_text, hyp_text) in cases {
        let utt = align(ref_text, hyp_text, "");
        let expected = levenshtein(&toks(ref_text), &toks(hyp_text));
        assert_eq!(utt.distance, expected as f32, "{ref_text} / {hyp_text}");
    }
}

/// 同一入力に対する整列は常に同一の結果になる
#[test]
fn alignment_is_deterministic() {
    let first = align("A B C D", "B C D E", "");
    for _ in 0..3 {
        let again = align("A B C D", "B C D E", "");
        assert_eq!(first.steps, again.steps);
        assert_eq!(first.distance, again.distance);
    }
}

/// ref == hyp のとき、任意のGLMの下でTERは0になる
#[test]
fn identity_has_zero_distance_under_any_glm() {
    for glm_csv in ["", "I'M,I AM\n", "A,B\nB,C\nC,A\n"] {
        let utt = align("A B C", "A B C", glm_csv);
        assert_eq!(utt.distance, 0.0, "glm: {glm_csv:?}");
        assert!(!utt.has_error());
    }
}

/// 整形出力の不変条件: 各セルの表示幅はカラム幅を超えない
#[test]
fn rendered_cells_fit_columns() {
    use crate::common::display_width;
    use crate::report::render_alignment;

    let utt = align("HEY I AM HERE", "HEY I'M HERE", "");
    let rendered = render_alignment("HEY I'M HERE", &utt.steps);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 4);
    for step in &utt.steps {
        let width = display_width(&step.hyp_surface).max(display_width(&step.ref_surface));
        assert!(display_width(&step.hyp_surface) <= width);
        assert!(display_width(&step.ref_surface) <= width);
        assert!(display_width(step.edit.mark()) <= width);
    }
}
