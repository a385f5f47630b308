use crate::error::{CleanseError, Result};
use crate::matrix::RawMatrix;

/// 定长记录的字段表：有序的（字段名, 字符宽度）列表。
#[derive(Debug, Clone, PartialEq)]
pub struct FixedWidthTable {
    pub name: String,
    pub fields: Vec<(String, usize)>,
}

impl FixedWidthTable {
    pub fn new(name: impl Into<String>, fields: &[(&str, usize)]) -> Self {
        FixedWidthTable {
            name: name.into(),
            fields: fields
                .iter()
                .map(|(n, len)| (n.to_string(), *len))
                .collect(),
        }
    }

    pub fn total_width(&self) -> usize {
        self.fields.iter().map(|(_, len)| len).sum()
    }

    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// 招商银行老式流水导出：每行一条定长记录。
pub fn cmb_legacy_table() -> FixedWidthTable {
    FixedWidthTable::new(
        "招商银行定长流水",
        &[
            ("交易日期", 8),
            ("交易时间", 6),
            ("交易金额", 15),
            ("账户余额", 15),
            ("借贷标志", 1),
            ("交易类型", 4),
            ("本方账号", 20),
            ("对方账号", 32),
            ("对方户名", 60),
            ("交易摘要", 100),
            ("交易流水号", 20),
        ],
    )
}

/// 司法查询类定长流水导出。
pub fn judicial_table() -> FixedWidthTable {
    FixedWidthTable::new(
        "司法查询定长流水",
        &[
            ("司法编号", 20),
            ("原因号", 20),
            ("交易日期", 8),
            ("交易时间", 6),
            ("客户号", 20),
            ("客户名称", 60),
            ("交易卡号", 20),
            ("交易流水", 20),
            ("交易类号", 4),
            ("交易机构", 20),
            ("交易代码", 6),
            ("交易方向", 1),
            ("币种名称", 3),
            ("交易金额", 15),
            ("账户余额", 15),
            ("摘要名称", 60),
            ("交易渠道", 2),
            // 上游导出即是这个写法，表头要与存量映射逐字对上
            ("补补账标记", 1),
            ("经办柜员", 7),
            ("对方账号", 32),
            ("对方名称", 60),
            ("对方开户行", 60),
        ],
    )
}

/// 按字段表切分定长文本，首行为字段名表头。
///
/// 行比声明的总宽度短时，尾部字段得到截断或空值，不报错；
/// 宽度按字符计，中文字段名与内容都按 1 个字符算。
pub fn parse_fixed_width(text: &str, table: &FixedWidthTable) -> Result<RawMatrix> {
    if table.fields.is_empty() {
        return Err(CleanseError::Format(format!(
            "定长字段表为空: {}",
            table.name
        )));
    }

    let mut rows = vec![table.header()];
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        rows.push(slice_row(line, table));
    }
    if rows.len() == 1 {
        return Err(CleanseError::Format(format!(
            "定长文本没有数据行: {}",
            table.name
        )));
    }
    Ok(RawMatrix::new(rows))
}

fn slice_row(line: &str, table: &FixedWidthTable) -> Vec<String> {
    let chars = line.chars().collect::<Vec<_>>();
    let mut position = 0usize;
    let mut cells = Vec::with_capacity(table.fields.len());
    for (_, len) in &table.fields {
        let end = (position + len).min(chars.len());
        let slice = if position < chars.len() {
            chars[position..end].iter().collect::<String>()
        } else {
            String::new()
        };
        cells.push(slice.trim().to_string());
        position += len;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_by_cumulative_offsets() {
        let table = FixedWidthTable::new("测试", &[("A", 4), ("B", 3)]);
        let m = parse_fixed_width("AAAABBB", &table).unwrap();
        assert_eq!(m.rows()[0], vec!["A", "B"]);
        assert_eq!(m.rows()[1], vec!["AAAA", "BBB"]);
    }

    #[test]
    fn short_row_yields_empty_trailing_fields() {
        let table = FixedWidthTable::new("测试", &[("A", 4), ("B", 3), ("C", 2)]);
        let m = parse_fixed_width("AAAAB", &table).unwrap();
        assert_eq!(m.rows()[1], vec!["AAAA", "B", ""]);
    }

    #[test]
    fn slices_count_chars_not_bytes() {
        let table = FixedWidthTable::new("测试", &[("姓名", 3), ("城市", 2)]);
        let m = parse_fixed_width("张三 北京", &table).unwrap();
        assert_eq!(m.rows()[1], vec!["张三", "北京"]);
    }

    #[test]
    fn cell_values_are_trimmed() {
        let table = FixedWidthTable::new("测试", &[("A", 6), ("B", 4)]);
        let m = parse_fixed_width("ab    cd  ", &table).unwrap();
        assert_eq!(m.rows()[1], vec!["ab", "cd"]);
    }

    #[test]
    fn builtin_tables_declare_expected_width() {
        assert_eq!(cmb_legacy_table().total_width(), 281);
        let judicial = judicial_table();
        assert_eq!(judicial.fields.len(), 22);
        // 字段名照抄上游导出格式，包括这个双字写法
        assert!(judicial.header().contains(&"补补账标记".to_string()));
    }
}
