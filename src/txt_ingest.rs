use encoding_rs::{Encoding, GB18030, GBK, UTF_8};
use tracing::debug;

use crate::error::{CleanseError, Result};
use crate::matrix::RawMatrix;

/// 解码尝试顺序：主编码在前，区域回退在后。GB2312 由 GBK 覆盖。
const ENCODING_CHAIN: &[&Encoding] = &[UTF_8, GBK, GB18030];

const SEPARATOR_CANDIDATES: &[char] = &['\t', '|', ',', ';', ' '];

/// 分隔符打分权重。
#[derive(Debug, Clone, Copy)]
pub struct SeparatorWeights {
    /// 所有行列数一致（±1）时平均列数的放大倍数。
    pub consistent_multiplier: f64,
    /// 不一致时的倍数。
    pub inconsistent_multiplier: f64,
    /// 每个切出来的空字段扣多少分。
    pub empty_field_penalty: f64,
}

impl Default for SeparatorWeights {
    fn default() -> Self {
        SeparatorWeights {
            consistent_multiplier: 2.0,
            inconsistent_multiplier: 1.0,
            empty_field_penalty: 0.5,
        }
    }
}

/// 按优先级尝试各编码解码文本，以不出现替换符（U+FFFD）为准。
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    for encoding in ENCODING_CHAIN {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors && !decoded.contains('\u{FFFD}') {
            debug!(encoding = encoding.name(), "文本编码识别成功");
            return Ok(decoded.into_owned());
        }
    }
    Err(CleanseError::Format(format!(
        "无法正确识别文件编码（已尝试: {}）",
        ENCODING_CHAIN
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

/// 在候选分隔符中挑得分最高的。得分 = 平均列数 ×（一致性倍数）
/// − 空字段数 × 罚分；同分时按候选优先级取先出现者。
pub fn sniff_separator(content: &str, weights: &SeparatorWeights) -> char {
    let lines = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>();

    let mut best = SEPARATOR_CANDIDATES[0];
    let mut best_score = f64::NEG_INFINITY;

    for &separator in SEPARATOR_CANDIDATES {
        let column_counts = lines
            .iter()
            .map(|line| line.split(separator).count())
            .collect::<Vec<_>>();
        if column_counts.is_empty() {
            continue;
        }

        let avg_columns =
            column_counts.iter().sum::<usize>() as f64 / column_counts.len() as f64;
        let consistent = column_counts
            .iter()
            .all(|&count| (count as f64 - avg_columns).abs() <= 1.0);
        let empty_fields = lines
            .iter()
            .map(|line| line.split(separator).filter(|f| f.trim().is_empty()).count())
            .sum::<usize>();

        let multiplier = if consistent {
            weights.consistent_multiplier
        } else {
            weights.inconsistent_multiplier
        };
        let score = avg_columns * multiplier - empty_fields as f64 * weights.empty_field_penalty;
        debug!(separator = ?separator, score, avg_columns, consistent, "分隔符打分");

        if score > best_score {
            best_score = score;
            best = separator;
        }
    }
    best
}

/// 解析自由文本行文件：识别编码、推断分隔符、按行切分。
/// 产出的矩阵尚未做标题行解析。
pub fn parse_txt(bytes: &[u8]) -> Result<RawMatrix> {
    parse_txt_with_weights(bytes, &SeparatorWeights::default())
}

pub fn parse_txt_with_weights(bytes: &[u8], weights: &SeparatorWeights) -> Result<RawMatrix> {
    let content = decode_text(bytes)?;
    let separator = sniff_separator(&content, weights);

    let rows = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(separator)
                .map(|field| field.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return Err(CleanseError::Format("文本文件没有内容行".to_string()));
    }
    Ok(RawMatrix::new(rows))
}
