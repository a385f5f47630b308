/// 各格式读取器的统一产物：按行排列的字符串单元格矩阵。
/// 标题行解析之前行宽可以不一致，`normalize_width` 负责补齐。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMatrix {
    rows: Vec<Vec<String>>,
}

impl RawMatrix {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        RawMatrix { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 第 0 行。只有经过标题行解析的矩阵才保证它是表头。
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn data_rows(&self) -> &[Vec<String>] {
        if self.rows.len() > 1 {
            &self.rows[1..]
        } else {
            &[]
        }
    }

    /// 按最宽一行补齐空单元格，使矩阵成为规则矩形。
    pub fn normalize_width(&mut self) {
        let max_cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut self.rows {
            while row.len() < max_cols {
                row.push(String::new());
            }
        }
    }

    /// 把第 `index` 行提到最前作为表头；它之前的行挪到所有数据行
    /// 之后（各组内部保持原文档顺序）。
    pub fn promote_header(&mut self, index: usize) {
        if index == 0 || index >= self.rows.len() {
            return;
        }
        let mut reordered = Vec::with_capacity(self.rows.len());
        reordered.push(self.rows[index].clone());
        reordered.extend_from_slice(&self.rows[index + 1..]);
        reordered.extend_from_slice(&self.rows[..index]);
        self.rows = reordered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_width_pads_to_widest_row() {
        let mut m = RawMatrix::new(vec![row(&["a", "b", "c"]), row(&["d"])]);
        m.normalize_width();
        assert_eq!(m.rows()[1], row(&["d", "", ""]));
    }

    #[test]
    fn promote_header_moves_leading_rows_behind_data() {
        let mut m = RawMatrix::new(vec![
            row(&["噪声1"]),
            row(&["噪声2"]),
            row(&["日期", "金额"]),
            row(&["2024-01-01", "100"]),
        ]);
        m.promote_header(2);
        assert_eq!(m.rows()[0], row(&["日期", "金额"]));
        assert_eq!(m.rows()[1], row(&["2024-01-01", "100"]));
        assert_eq!(m.rows()[2], row(&["噪声1"]));
        assert_eq!(m.rows()[3], row(&["噪声2"]));
    }

    #[test]
    fn promote_header_with_index_zero_is_a_no_op() {
        let mut m = RawMatrix::new(vec![row(&["日期"]), row(&["2024-01-01"])]);
        let before = m.clone();
        m.promote_header(0);
        assert_eq!(m, before);
    }
}
