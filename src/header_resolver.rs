use tracing::debug;

use crate::error::{CleanseError, Result};
use crate::matrix::RawMatrix;

/// 标题行常见关键字，命中一个加一次分。
const HEADER_KEYWORDS: &[&str] = &["日期", "金额", "摘要", "余额", "对方", "账号", "交易"];

/// 标题行打分权重。
#[derive(Debug, Clone, Copy)]
pub struct HeaderScoreWeights {
    /// 每列基础分。
    pub column_weight: i64,
    /// 每个空单元格扣分。
    pub empty_penalty: i64,
    /// 每个含关键字的单元格加分。
    pub keyword_bonus: i64,
    /// 最多向下扫描几行。
    pub scan_rows: usize,
}

impl Default for HeaderScoreWeights {
    fn default() -> Self {
        HeaderScoreWeights {
            column_weight: 2,
            empty_penalty: 3,
            keyword_bonus: 5,
            scan_rows: 5,
        }
    }
}

pub fn score_header_row(row: &[String], weights: &HeaderScoreWeights) -> i64 {
    let mut score = row.len() as i64 * weights.column_weight;

    let empty_count = row.iter().filter(|cell| cell.trim().is_empty()).count();
    score -= empty_count as i64 * weights.empty_penalty;

    let keyword_count = row
        .iter()
        .filter(|cell| HEADER_KEYWORDS.iter().any(|kw| cell.contains(kw)))
        .count();
    score += keyword_count as i64 * weights.keyword_bonus;

    score
}

/// 在矩阵前几行中找标题行并重排矩阵使其成为第 0 行。
/// 最高得分不为正时判定失败，矩阵保持原样。
pub fn resolve_header(matrix: &mut RawMatrix, weights: &HeaderScoreWeights) -> Result<usize> {
    if matrix.is_empty() {
        return Err(CleanseError::HeaderNotFound {
            scanned: 0,
            best_score: 0,
        });
    }

    let scan = matrix.len().min(weights.scan_rows);
    let mut best_index = 0usize;
    let mut best_score = i64::MIN;
    for (index, row) in matrix.rows()[..scan].iter().enumerate() {
        let score = score_header_row(row, weights);
        debug!(index, score, "标题行候选打分");
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }

    if best_score <= 0 {
        return Err(CleanseError::HeaderNotFound {
            scanned: scan,
            best_score,
        });
    }

    matrix.promote_header(best_index);
    Ok(best_index)
}
