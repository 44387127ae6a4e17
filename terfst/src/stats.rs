//! 誤り統計の集計モジュール
//!
//! このモジュールは、コーパス全体の編集カウンタ（C/S/I/D）と発話カウンタを
//! 集計し、トークン誤り率（TER）・正規化トークン誤り率（mTER）・
//! 文誤り率（SER）を導出します。

use serde::Serialize;

use crate::aligner::AlignedUtt;
use crate::errors::{Result, TerfstError};

/// コーパス全体の誤り統計。
///
/// カウンタはそのままJSONとして直列化できます。率は導出メソッドで
/// 計算され、分母が定義されない場合はエラーになります。
#[derive(Debug, Default, Clone, Serialize)]
pub struct ErrorStats {
    /// 参照ファイルの発話数
    pub num_ref_utts: usize,

    /// 仮説ファイルの発話数
    pub num_hyp_utts: usize,

    /// 実際に評価された発話数
    pub num_eval_utts: usize,

    /// 参照が存在しなかった仮説の数
    pub num_hyp_without_ref: usize,

    /// 一致数
    pub cor: usize,

    /// 置換数
    pub sub: usize,

    /// 挿入数
    pub ins: usize,

    /// 削除数
    pub del: usize,

    /// 非一致編集を1つ以上含む発話数
    pub num_utts_with_error: usize,
}

impl ErrorStats {
    /// すべてのカウンタが0の統計を生成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 1発話の整列結果をカウンタに加算します。
    ///
    /// # 引数
    ///
    /// * `utt` - 整列結果
    pub fn accumulate(&mut self, utt: &AlignedUtt) {
        self.num_eval_utts += 1;
        self.cor += utt.cor;
        self.sub += utt.sub;
        self.ins += utt.ins;
        self.del += utt.del;
        if utt.has_error() {
            self.num_utts_with_error += 1;
        }
    }

    /// 編集誤りの総数（S + D + I）を返します。
    #[inline]
    pub fn num_errors(&self) -> usize {
        self.sub + self.del + self.ins
    }

    /// 整列が消費した参照トークンの総数（C + S + D）を返します。
    #[inline]
    pub fn ref_len(&self) -> usize {
        self.cor + self.sub + self.del
    }

    /// 整列が消費した仮説トークンの総数（C + S + I）を返します。
    #[inline]
    pub fn hyp_len(&self) -> usize {
        self.cor + self.sub + self.ins
    }

    /// トークン誤り率 `100 · (S + D + I) / (C + S + D)` を返します。
    ///
    /// # エラー
    ///
    /// 参照長が0の場合、率は定義されないため
    /// [`TerfstError::UndefinedRate`]が返されます。
    pub fn token_error_rate(&self) -> Result<f64> {
        let denom = self.ref_len();
        if denom == 0 {
            return Err(TerfstError::UndefinedRate {
                rate: "TER",
                cause: "total reference length is zero",
            });
        }
        Ok(100.0 * self.num_errors() as f64 / denom as f64)
    }

    /// 正規化トークン誤り率
    /// `100 · (S + D + I) / max(C + S + D, C + S + I)` を返します。
    ///
    /// # エラー
    ///
    /// 参照長・仮説長がともに0の場合、[`TerfstError::UndefinedRate`]が
    /// 返されます。
    pub fn modified_token_error_rate(&self) -> Result<f64> {
        let denom = self.ref_len().max(self.hyp_len());
        if denom == 0 {
            return Err(TerfstError::UndefinedRate {
                rate: "mTER",
                cause: "both reference and hypothesis lengths are zero",
            });
        }
        Ok(100.0 * self.num_errors() as f64 / denom as f64)
    }

    /// 文誤り率 `100 · num_utts_with_error / num_eval_utts` を返します。
    ///
    /// # エラー
    ///
    /// 評価された発話が存在しない場合、[`TerfstError::UndefinedRate`]が
    /// 返されます。
    pub fn sentence_error_rate(&self) -> Result<f64> {
        if self.num_eval_utts == 0 {
            return Err(TerfstError::UndefinedRate {
                rate: "SER",
                cause: "no utterances were evaluated",
            });
        }
        Ok(100.0 * self.num_utts_with_error as f64 / self.num_eval_utts as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::AlignedUtt;

    fn utt(cor: usize, sub: usize, ins: usize, del: usize) -> AlignedUtt {
        AlignedUtt {
            steps: vec![],
            cor,
            sub,
            ins,
            del,
            distance: (sub + ins + del) as f32,
        }
    }

    #[test]
    fn test_accumulate() {
        let mut stats = ErrorStats::new();
        stats.accumulate(&utt(4, 0, 0, 0));
        stats.accumulate(&utt(2, 1, 0, 1));
        assert_eq!(stats.num_eval_utts, 2);
        assert_eq!(stats.cor, 6);
        assert_eq!(stats.sub, 1);
        assert_eq!(stats.del, 1);
        assert_eq!(stats.num_utts_with_error, 1);
    }

    #[test]
    fn test_rates() {
        let mut stats = ErrorStats::new();
        stats.accumulate(&utt(2, 1, 0, 1));
        // TER = 2 / 4, mTER = 2 / max(4, 3), SER = 1 / 1
        assert_eq!(stats.token_error_rate().unwrap(), 50.0);
        assert_eq!(stats.modified_token_error_rate().unwrap(), 50.0);
        assert_eq!(stats.sentence_error_rate().unwrap(), 100.0);
    }

    #[test]
    fn test_mter_uses_longer_side() {
        let mut stats = ErrorStats::new();
        // ref=FOO, hyp=BAR BAZ: S=1 I=1
        stats.accumulate(&utt(0, 1, 1, 0));
        assert_eq!(stats.token_error_rate().unwrap(), 200.0);
        assert_eq!(stats.modified_token_error_rate().unwrap(), 100.0);
    }

    #[test]
    fn test_zero_ref_length_is_fatal() {
        let stats = ErrorStats::new();
        assert!(stats.token_error_rate().is_err());
        assert!(stats.sentence_error_rate().is_err());
    }

    #[test]
    fn test_serialize_counters() {
        let mut stats = ErrorStats::new();
        stats.num_ref_utts = 3;
        stats.accumulate(&utt(4, 0, 0, 0));
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"num_ref_utts\":3"));
        assert!(json.contains("\"cor\":4"));
    }
}
