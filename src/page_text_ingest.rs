use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{CleanseError, Result};
use crate::matrix::RawMatrix;

/// 页面文本项：一段文字及其水平位置、宽度与纵向基线。
/// 由页级文本提取器（外部协作方）逐页提供。
#[derive(Debug, Clone, PartialEq)]
pub struct PageTextItem {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PageLayoutConfig {
    /// 纵坐标量化成行带的容差。
    pub line_height: f64,
    /// 水平间隙换算空格的单位：间隙每满一个单位补一个空格。
    pub gap_unit: f64,
}

impl Default for PageLayoutConfig {
    fn default() -> Self {
        PageLayoutConfig {
            line_height: 15.0,
            gap_unit: 5.0,
        }
    }
}

fn cell_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s,，;；]+").expect("cell split regex"))
}

/// 重建一页的文本行：按行带分组、带内从左到右排序、按水平
/// 间隙补空格后拼接。
fn reconstruct_page_lines(items: &[PageTextItem], cfg: &PageLayoutConfig) -> Vec<String> {
    let mut bands: BTreeMap<i64, Vec<&PageTextItem>> = BTreeMap::new();
    for item in items {
        let band = (item.y / cfg.line_height).floor() as i64;
        bands.entry(band).or_default().push(item);
    }

    bands
        .into_values()
        .map(|mut line_items| {
            line_items.sort_by(|a, b| a.x.total_cmp(&b.x));
            combine_line_items(&line_items, cfg)
        })
        .filter(|line| !line.trim().is_empty())
        .collect()
}

fn combine_line_items(items: &[&PageTextItem], cfg: &PageLayoutConfig) -> String {
    let mut line = String::new();
    let mut last: Option<&PageTextItem> = None;
    for item in items {
        if let Some(prev) = last {
            let gap = item.x - (prev.x + prev.width);
            if gap > cfg.gap_unit {
                let spaces = (gap / cfg.gap_unit).floor() as usize;
                line.push_str(&" ".repeat(spaces));
            }
        }
        line.push_str(&item.text);
        last = Some(item);
    }
    line
}

/// 把所有页的文本项重建为行序列。页与页相互独立，但输出必须
/// 保持原始页序，与提取完成顺序无关。
pub fn reconstruct_lines(pages: &[Vec<PageTextItem>], cfg: &PageLayoutConfig) -> Vec<String> {
    pages
        .iter()
        .flat_map(|items| reconstruct_page_lines(items, cfg))
        .collect()
}

/// 用宽松分隔符集（空白串、逗号、分号及其全角形式）切分一行。
pub fn split_cells(line: &str) -> Vec<String> {
    cell_split_re()
        .split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// 页面文档的完整读取：行重建、去首尾噪声行、切分单元格、补齐列宽。
pub fn parse_page_text(pages: &[Vec<PageTextItem>], cfg: &PageLayoutConfig) -> Result<RawMatrix> {
    let lines = reconstruct_lines(pages, cfg);
    if lines.is_empty() {
        return Err(CleanseError::Format("未能提取到文本内容".to_string()));
    }

    // 多于两行时掐头去尾，首尾行多为页眉页脚
    let content = if lines.len() > 2 {
        &lines[1..lines.len() - 1]
    } else {
        &lines[..]
    };

    let rows = content
        .iter()
        .map(|line| split_cells(line))
        .filter(|row| !row.is_empty())
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return Err(CleanseError::Format("页面文本没有可用数据行".to_string()));
    }

    let mut matrix = RawMatrix::new(rows);
    matrix.normalize_width();
    Ok(matrix)
}
