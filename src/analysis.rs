use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{DetailField, DetailRecord};

/// 大额转账默认阈值：五万元，以分计。
pub const DEFAULT_LARGE_TRANSFER_CENTS: i64 = 5_000_000;

const DEFAULT_TOP_COUNTERPARTIES: usize = 10;

const DEFAULT_CASH_KEYWORDS: &[&str] = &["现金", "取款", "存款"];

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub large_transfer_cents: i64,
    pub top_counterparties: usize,
    pub cash_keywords: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            large_transfer_cents: DEFAULT_LARGE_TRANSFER_CENTS,
            top_counterparties: DEFAULT_TOP_COUNTERPARTIES,
            cash_keywords: DEFAULT_CASH_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyStat {
    pub account: String,
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub total_transfers: u64,
    pub total_amount_cents: i64,
    /// 按往来次数降序的前 N 个对手方；同次数保持首次出现顺序。
    pub frequent_counterparties: Vec<CounterpartyStat>,
    /// 绝对金额达到阈值的记录，按输入顺序原样保留。
    pub large_transfers: Vec<DetailRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashSummary {
    pub total_cash_cents: i64,
    pub cash_in_cents: i64,
    pub cash_out_cents: i64,
    pub cash_transactions: Vec<DetailRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisResult {
    Transfer(TransferSummary),
    Cash(CashSummary),
}

/// 金额文本 → 分。清洗阶段金额保持文本形态，分析时才转数值。
/// 空串或无法解析的文本（比如多列合并出的多行金额）返回 None，
/// 由调用方决定跳过还是按零处理。
pub fn parse_amount_to_cents(raw: &str) -> Option<i64> {
    let mut s = raw.trim().to_string();
    if s.is_empty() {
        return None;
    }
    s = s
        .replace(',', "")
        .replace('，', "")
        .replace('￥', "")
        .replace('¥', "")
        .replace('元', "")
        .replace(' ', "");
    if s.is_empty() {
        return None;
    }

    let negative = s.starts_with('-');
    if s.starts_with('-') || s.starts_with('+') {
        s = s[1..].to_string();
    }
    if s.is_empty() {
        return None;
    }

    let parts = s.split('.').collect::<Vec<_>>();
    if parts.len() > 2 {
        return None;
    }
    let int_part = if parts[0].is_empty() { "0" } else { parts[0] };
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let frac_part = if parts.len() == 2 { parts[1] } else { "" };
    if !frac_part.chars().all(|c| c.is_ascii_digit()) || frac_part.len() > 2 {
        return None;
    }

    let int_val = int_part.parse::<i64>().ok()?;
    let frac_val = match frac_part.len() {
        0 => 0_i64,
        1 => frac_part.parse::<i64>().ok()? * 10,
        _ => frac_part.parse::<i64>().ok()?,
    };
    let mut cents = int_val.checked_mul(100)?.checked_add(frac_val)?;
    if negative {
        cents = -cents;
    }
    Some(cents)
}

pub fn analyze_transfers(records: &[DetailRecord]) -> TransferSummary {
    analyze_transfers_with(records, &AnalysisConfig::default())
}

/// 转账分析：没有金额或没有对方账户的记录不参与统计。
pub fn analyze_transfers_with(
    records: &[DetailRecord],
    config: &AnalysisConfig,
) -> TransferSummary {
    let mut summary = TransferSummary {
        total_transfers: 0,
        total_amount_cents: 0,
        frequent_counterparties: Vec::new(),
        large_transfers: Vec::new(),
    };
    // 首次出现顺序要保住，HashMap 只存下标
    let mut stats: Vec<CounterpartyStat> = Vec::new();
    let mut index_by_key: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        let account = record.get(DetailField::OppositeAccount).trim();
        if account.is_empty() {
            continue;
        }
        let Some(cents) = parse_amount_to_cents(record.get(DetailField::Amount)) else {
            debug!(
                amount = record.get(DetailField::Amount),
                "金额无法解析，转账分析跳过该记录"
            );
            continue;
        };
        if cents == 0 {
            continue;
        }

        summary.total_transfers += 1;
        summary.total_amount_cents += cents.abs();

        let name = record.get(DetailField::OppositeName).trim();
        let name = if name.is_empty() { "未知" } else { name };
        let key = (account.to_string(), name.to_string());
        match index_by_key.get(&key) {
            Some(&i) => stats[i].count += 1,
            None => {
                index_by_key.insert(key, stats.len());
                stats.push(CounterpartyStat {
                    account: account.to_string(),
                    name: name.to_string(),
                    count: 1,
                });
            }
        }

        if cents.abs() >= config.large_transfer_cents {
            summary.large_transfers.push(record.clone());
        }
    }

    // 稳定排序：同次数保持首次出现顺序
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats.truncate(config.top_counterparties);
    summary.frequent_counterparties = stats;
    summary
}

pub fn analyze_cash(records: &[DetailRecord]) -> CashSummary {
    analyze_cash_with(records, &AnalysisConfig::default())
}

/// 现金分析：摘要命中关键词才算现金交易，借方计支出，其余计存入。
pub fn analyze_cash_with(records: &[DetailRecord], config: &AnalysisConfig) -> CashSummary {
    let mut summary = CashSummary {
        total_cash_cents: 0,
        cash_in_cents: 0,
        cash_out_cents: 0,
        cash_transactions: Vec::new(),
    };

    for record in records {
        let text = record.get(DetailField::Summary);
        if text.is_empty() {
            continue;
        }
        if !config.cash_keywords.iter().any(|kw| text.contains(kw.as_str())) {
            continue;
        }

        let cents = parse_amount_to_cents(record.get(DetailField::Amount))
            .unwrap_or(0)
            .abs();
        summary.total_cash_cents += cents;
        if record.get(DetailField::DebitCredit) == "借" {
            summary.cash_out_cents += cents;
        } else {
            summary.cash_in_cents += cents;
        }
        summary.cash_transactions.push(record.clone());
    }

    summary
}
