use serde::Serialize;
use tracing::debug;

use crate::mapping_store::MappingStore;
use crate::schema::RecordKind;

/// 识别打分配置。
#[derive(Debug, Clone, Copy)]
pub struct IdentifyConfig {
    pub score_threshold: f64,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        IdentifyConfig {
            score_threshold: 0.3,
        }
    }
}

/// 识别结果。没有达到阈值不是错误：调用方应转入手工映射流程。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Identification {
    Match {
        bank_name: String,
        record_kind: RecordKind,
        score: f64,
    },
    Unidentified,
}

/// 标题单元格与可接受原始列名的模糊匹配：任一方向的
/// 大小写不敏感子串即算命中。
fn alias_matches_header(alias: &str, header: &[String]) -> bool {
    let alias_lower = alias.trim().to_lowercase();
    if alias_lower.is_empty() {
        return false;
    }
    header.iter().any(|cell| {
        let cell_lower = cell.trim().to_lowercase();
        !cell_lower.is_empty()
            && (cell_lower.contains(&alias_lower) || alias_lower.contains(&cell_lower))
    })
}

/// 拿未知表头去撞仓库里所有映射，返回最优的（银行, 记录类型）。
///
/// 单个映射的得分 = 命中的原始列名数 / 原始列名总数。同分时偏向
/// 原始列名更多的映射（档案更丰富）。
pub fn identify_bank(
    header: &[String],
    store: &dyn MappingStore,
    config: &IdentifyConfig,
) -> Identification {
    if header.is_empty() {
        return Identification::Unidentified;
    }

    let mut best: Option<(String, RecordKind, f64, usize)> = None;

    for (bank_name, record_kind, mapping) in store.entries() {
        let total = mapping.total_aliases();
        if total == 0 {
            continue;
        }
        let matched = mapping
            .entries
            .values()
            .flatten()
            .filter(|alias| alias_matches_header(alias, header))
            .count();
        let score = matched as f64 / total as f64;
        debug!(%bank_name, ?record_kind, score, matched, total, "银行识别打分");

        let replace = match &best {
            None => true,
            Some((_, _, best_score, best_total)) => {
                score > *best_score || (score == *best_score && total > *best_total)
            }
        };
        if replace {
            best = Some((bank_name, record_kind, score, total));
        }
    }

    match best {
        Some((bank_name, record_kind, score, _)) if score >= config.score_threshold => {
            Identification::Match {
                bank_name,
                record_kind,
                score,
            }
        }
        _ => Identification::Unidentified,
    }
}
