use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{CleanseError, Result};
use crate::mapping_store::MappingStore;
use crate::matrix::RawMatrix;
use crate::schema::{FieldCategory, FieldMapping, FieldSchema, Record};

fn iso_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}[-/]\d{2}[-/]\d{2}").expect("iso date regex"))
}

fn ymd8_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("ymd8 regex"))
}

fn ymd_dash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("ymd dash regex"))
}

fn ymd_slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("ymd slash regex"))
}

fn dmy_slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("dmy slash regex"))
}

fn cn_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日$").expect("cn date regex")
    })
}

fn debit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"借|支|出|付|支出|借方|-").expect("debit regex"))
}

fn credit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"贷|收|入|存|收入|贷方|\+").expect("credit regex"))
}

/// 初步清洗：把解析好标题行的矩阵按字段映射投影到标准字段上。
///
/// 每条记录的标准字段全部在场；同一标准字段映射到多列时取全部
/// 非空值，数字类用换行连接、其余用 `"; "` 连接。每行的所属银行
/// 一律强制写入 `bank_name`。
pub fn preliminary_clean<F: FieldSchema>(
    matrix: &RawMatrix,
    mapping: &FieldMapping,
    bank_name: &str,
) -> Result<Vec<Record<F>>> {
    if matrix.is_empty() {
        return Err(CleanseError::Format("数据为空，无法清洗".to_string()));
    }
    if mapping.is_empty() {
        return Err(CleanseError::Mapping(format!(
            "未找到 {bank_name} 的字段映射配置"
        )));
    }
    mapping.validate(F::record_kind())?;

    let header = matrix.header().unwrap_or(&[]);
    let field_indices = F::ALL
        .iter()
        .map(|field| {
            let aliases = mapping.aliases(field.label());
            // 同名表头可能出现多列，全部收进来，按列序排
            let indices = header
                .iter()
                .enumerate()
                .filter(|(_, cell)| aliases.iter().any(|alias| alias == *cell))
                .map(|(index, _)| index)
                .collect::<Vec<_>>();
            (*field, indices)
        })
        .collect::<Vec<_>>();

    let mut cleaned = Vec::with_capacity(matrix.data_rows().len());
    for row in matrix.data_rows() {
        let mut record = Record::new(bank_name);
        for (field, indices) in &field_indices {
            let values = indices
                .iter()
                .filter_map(|&index| row.get(index))
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .map(|cell| format_value(cell, field.category()))
                .collect::<Vec<_>>();
            if !values.is_empty() {
                record.set(*field, values.join(field.category().join_separator()));
            }
        }
        cleaned.push(record);
    }
    Ok(cleaned)
}

/// 从仓库取映射再清洗；没有存储映射时报 `Mapping` 错误。
pub fn preliminary_clean_with_store<F: FieldSchema>(
    matrix: &RawMatrix,
    store: &dyn MappingStore,
    bank_name: &str,
) -> Result<Vec<Record<F>>> {
    let mapping = store.get(bank_name, F::record_kind()).ok_or_else(|| {
        CleanseError::Mapping(format!(
            "未找到 {bank_name}（{}）的字段映射配置",
            F::record_kind().as_str()
        ))
    })?;
    preliminary_clean(matrix, &mapping, bank_name)
}

/// 多批清洗结果合并为一个序列，保持批次顺序与批内行序。
/// 空输入报错，调用方不应在没有任何批次时请求合并。
pub fn merge_cleaned<F: FieldSchema>(batches: Vec<Vec<Record<F>>>) -> Result<Vec<Record<F>>> {
    if batches.is_empty() {
        return Err(CleanseError::Format("没有数据需要合并".to_string()));
    }
    Ok(batches.into_iter().flatten().collect())
}

fn format_value(value: &str, category: FieldCategory) -> String {
    match category {
        FieldCategory::Number => value.chars().filter(|c| !c.is_whitespace()).collect(),
        FieldCategory::Amount => value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != '，')
            .collect(),
        FieldCategory::DateTime => format_date(value),
        FieldCategory::DebitFlag => normalize_debit_flag(value),
        FieldCategory::Text => value.to_string(),
    }
}

/// 日期规整：依次尝试已是标准格式、YYYYMMDD、YYYY-MM-DD、
/// YYYY/MM/DD、DD/MM/YYYY、YYYY年MM月DD日，最后提取纯数字
/// 重组年月日（及可选时分秒）。全部失败时原样返回。
fn format_date(value: &str) -> String {
    if iso_like_re().is_match(value) {
        return value.to_string();
    }
    if let Some(caps) = ymd8_re().captures(value) {
        return format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]);
    }
    for re in [ymd_dash_re(), ymd_slash_re()] {
        if let Some(caps) = re.captures(value) {
            return format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]);
        }
    }
    if let Some(caps) = dmy_slash_re().captures(value) {
        return format!("{}-{:0>2}-{:0>2}", &caps[3], &caps[2], &caps[1]);
    }
    if let Some(caps) = cn_date_re().captures(value) {
        return format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]);
    }

    let digits = value
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>();
    if digits.len() >= 8 {
        // 提取出来的数字串未必是日期，年月日先过一遍日历校验
        let calendar_ok = digits[0..4]
            .parse::<i32>()
            .ok()
            .zip(digits[4..6].parse::<u32>().ok())
            .zip(digits[6..8].parse::<u32>().ok())
            .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
            .is_some();
        if !calendar_ok {
            return value.to_string();
        }
        let date = format!("{}-{}-{}", &digits[0..4], &digits[4..6], &digits[6..8]);
        if digits.len() >= 12 {
            let second = if digits.len() >= 14 {
                &digits[12..14]
            } else {
                "00"
            };
            return format!("{date} {}:{}:{second}", &digits[8..10], &digits[10..12]);
        }
        return date;
    }
    value.to_string()
}

/// 借贷标志归一：命中借方关键字记「借」，贷方关键字记「贷」，
/// 两边都不沾原样返回。借方优先。
fn normalize_debit_flag(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    if debit_re().is_match(&lowered) {
        "借".to_string()
    } else if credit_re().is_match(&lowered) {
        "贷".to_string()
    } else {
        value.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping_store::InMemoryMappingStore;
    use crate::schema::{DetailField, DetailRecord, RecordKind};

    fn matrix(rows: &[&[&str]]) -> RawMatrix {
        RawMatrix::new(
            rows.iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn sample_mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new();
        mapping.insert("本方账号", vec!["账号".to_string()]);
        mapping.insert("交易金额", vec!["发生额".to_string()]);
        mapping.insert("交易时间", vec!["交易日期".to_string()]);
        mapping.insert("借贷标志", vec!["借贷".to_string()]);
        mapping.insert("交易摘要", vec!["摘要".to_string()]);
        mapping
    }

    #[test]
    fn projects_rows_onto_standard_fields() {
        let m = matrix(&[
            &["账号", "发生额", "交易日期", "借贷", "摘要"],
            &["6222 0212 3456", "1,234.56", "20240105", "支出", "ATM取款"],
        ]);
        let records: Vec<DetailRecord> =
            preliminary_clean(&m, &sample_mapping(), "招商银行").unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.bank, "招商银行");
        assert_eq!(rec.get(DetailField::SelfAccount), "622202123456");
        assert_eq!(rec.get(DetailField::Amount), "1234.56");
        assert_eq!(rec.get(DetailField::TransTime), "2024-01-05");
        assert_eq!(rec.get(DetailField::DebitCredit), "借");
        assert_eq!(rec.get(DetailField::Summary), "ATM取款");
        // 未映射的标准字段仍然在场，值为空
        assert_eq!(rec.get(DetailField::OppositeName), "");
    }

    #[test]
    fn multi_column_values_join_by_category() {
        let mut mapping = FieldMapping::new();
        mapping.insert(
            "本方账号",
            vec!["账号".to_string(), "子账号".to_string()],
        );
        mapping.insert(
            "交易摘要",
            vec!["摘要".to_string(), "附言".to_string()],
        );
        let m = matrix(&[
            &["账号", "子账号", "摘要", "附言"],
            &["111", "222", "转账", "房租"],
        ]);
        let records: Vec<DetailRecord> = preliminary_clean(&m, &mapping, "测试银行").unwrap();
        assert_eq!(records[0].get(DetailField::SelfAccount), "111\n222");
        assert_eq!(records[0].get(DetailField::Summary), "转账; 房租");
    }

    #[test]
    fn missing_mapping_in_store_is_a_mapping_error() {
        let store = InMemoryMappingStore::new();
        let m = matrix(&[&["账号"], &["111"]]);
        let err = preliminary_clean_with_store::<DetailField>(&m, &store, "未知银行").unwrap_err();
        assert!(matches!(err, CleanseError::Mapping(_)));
    }

    #[test]
    fn store_backed_clean_uses_saved_mapping() {
        let mut store = InMemoryMappingStore::new();
        store
            .save("招商银行", RecordKind::TransactionDetail, sample_mapping())
            .unwrap();
        let m = matrix(&[&["账号", "发生额"], &["111", "50"]]);
        let records: Vec<DetailRecord> =
            preliminary_clean_with_store(&m, &store, "招商银行").unwrap();
        assert_eq!(records[0].get(DetailField::Amount), "50");
    }

    #[test]
    fn date_formats_normalize_in_declared_order() {
        assert_eq!(format_date("2024-01-05"), "2024-01-05");
        assert_eq!(format_date("2024/01/05"), "2024/01/05"); // 已是标准样式，原样保留
        assert_eq!(format_date("20240105"), "2024-01-05");
        assert_eq!(format_date("2024-1-5"), "2024-01-05");
        assert_eq!(format_date("2024/1/5"), "2024-01-05");
        assert_eq!(format_date("5/1/2024"), "2024-01-05");
        assert_eq!(format_date("2024年1月5日"), "2024-01-05");
        assert_eq!(format_date("交易于20240105123045"), "2024-01-05 12:30:45");
        assert_eq!(format_date("202401051230"), "2024-01-05 12:30:00");
        assert_eq!(format_date("无日期"), "无日期");
        // 数字串不构成合法日期时不硬拼
        assert_eq!(format_date("编号99887766"), "编号99887766");
    }

    #[test]
    fn debit_credit_flags_collapse_to_two_tokens() {
        assert_eq!(normalize_debit_flag("借方"), "借");
        assert_eq!(normalize_debit_flag("支出"), "借");
        assert_eq!(normalize_debit_flag("-"), "借");
        assert_eq!(normalize_debit_flag("贷方"), "贷");
        assert_eq!(normalize_debit_flag("存入"), "贷");
        assert_eq!(normalize_debit_flag("+"), "贷");
        assert_eq!(normalize_debit_flag("其他"), "其他");
    }

    #[test]
    fn batches_merge_in_order() {
        let mut a = DetailRecord::new("招商银行");
        a.set(DetailField::Summary, "第一批");
        let mut b = DetailRecord::new("招商银行");
        b.set(DetailField::Summary, "第二批");
        let merged = merge_cleaned(vec![vec![a], vec![b]]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get(DetailField::Summary), "第一批");
        assert_eq!(merged[1].get(DetailField::Summary), "第二批");
    }

    #[test]
    fn merging_nothing_is_an_error() {
        assert!(merge_cleaned::<DetailField>(vec![]).is_err());
    }

    #[test]
    fn empty_mapping_is_rejected() {
        let m = matrix(&[&["账号"], &["111"]]);
        let err = preliminary_clean::<DetailField>(&m, &FieldMapping::new(), "银行").unwrap_err();
        assert!(matches!(err, CleanseError::Mapping(_)));
    }
}
