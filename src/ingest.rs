use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use tracing::debug;

use crate::delimited_ingest::parse_delimited;
use crate::error::{CleanseError, Result};
use crate::fixed_width_ingest::{parse_fixed_width, FixedWidthTable};
use crate::matrix::RawMatrix;
use crate::page_text_ingest::{parse_page_text, PageLayoutConfig, PageTextItem};
use crate::txt_ingest::parse_txt;

/// 来源格式由调用方显式标注，不做内容嗅探（TXT 内部的编码与
/// 分隔符嗅探除外）。
#[derive(Debug)]
pub enum SourceKind<'a> {
    /// 已解码的分隔文本（CSV 等），分隔符由调用方给出。
    Delimited { text: &'a str, delimiter: char },
    /// 原始字节的自由文本，走编码链与分隔符打分。
    FreeText { bytes: &'a [u8] },
    /// 表格软件读出的行数组。
    SheetRows { rows: &'a [Vec<String>] },
    /// 定长记录文本，字段表按名字选择。
    FixedWidth {
        text: &'a str,
        table: &'a FixedWidthTable,
    },
    /// 版面定位文本（按页给出文本块坐标）。
    PageText {
        pages: &'a [Vec<PageTextItem>],
        layout: &'a PageLayoutConfig,
    },
}

/// 统一入口：任何来源格式 → RawMatrix。
pub fn ingest(source: SourceKind<'_>) -> Result<RawMatrix> {
    match source {
        SourceKind::Delimited { text, delimiter } => parse_delimited(text, delimiter),
        SourceKind::FreeText { bytes } => parse_txt(bytes),
        SourceKind::SheetRows { rows } => from_sheet_rows(rows),
        SourceKind::FixedWidth { text, table } => parse_fixed_width(text, table),
        SourceKind::PageText { pages, layout } => parse_page_text(pages, layout),
    }
}

/// 表格行预处理：本来就是多列的行逐格修剪后直接用；单列行往往
/// 是整行被塞进了一个单元格，先试制表符再试逗号重新切开。
pub fn from_sheet_rows(rows: &[Vec<String>]) -> Result<RawMatrix> {
    let mut out: Vec<Vec<String>> = Vec::new();
    for row in rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if row.len() == 1 {
            let cell = row[0].trim();
            let parts: Vec<String> = if cell.contains('\t') {
                cell.split('\t').map(|s| s.trim().to_string()).collect()
            } else if cell.contains(',') {
                cell.split(',').map(|s| s.trim().to_string()).collect()
            } else {
                vec![cell.to_string()]
            };
            out.push(parts);
        } else {
            out.push(row.iter().map(|cell| cell.trim().to_string()).collect());
        }
    }
    if out.is_empty() {
        return Err(CleanseError::Format("表格数据为空".to_string()));
    }
    debug!(rows = out.len(), "表格行预处理完成");
    let mut matrix = RawMatrix::new(out);
    matrix.normalize_width();
    Ok(matrix)
}

/// 读 CSV 为行数组。不把第一行当表头，列数允许不齐，表头识别
/// 交给后面的表头解析。
pub fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CleanseError::Format(format!("读取 CSV 失败: {e}")))?;

    let mut rows = Vec::new();
    for rec in reader.records() {
        let rec = rec.map_err(|e| CleanseError::Format(format!("读取 CSV 行失败: {e}")))?;
        rows.push(rec.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(rows)
}

/// 读工作簿第一个工作表为行数组。
pub fn read_workbook_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| CleanseError::Format(format!("打开工作簿失败: {e}")))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let first_sheet = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| CleanseError::Format("工作簿中未找到工作表".to_string()))?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| CleanseError::Format(format!("读取工作表失败: {e}")))?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    Ok(rows)
}

/// 提取 PDF 文本并按换页符切成每页一段。拿不到版面坐标时走这条
/// 纯文本路径，切好的页文本再按自由文本入口解析。
pub fn read_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| CleanseError::Format(format!("提取 PDF 文本失败: {e}")))?;
    let pages = text
        .split('\u{000C}')
        .map(|page| page.to_string())
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>();
    if pages.is_empty() {
        return Err(CleanseError::Format("PDF 中没有可提取的文本".to_string()));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn rectangular_sheet_rows_pass_through_trimmed() {
        let input = rows(&[&[" 日期 ", "金额"], &["2024-01-01", " 100 "]]);
        let matrix = from_sheet_rows(&input).unwrap();
        assert_eq!(matrix.rows()[0], vec!["日期", "金额"]);
        assert_eq!(matrix.rows()[1], vec!["2024-01-01", "100"]);
    }

    #[test]
    fn single_cell_rows_are_resplit_on_tab_then_comma() {
        let input = rows(&[&["日期\t金额"], &["2024-01-01,100"]]);
        let matrix = from_sheet_rows(&input).unwrap();
        assert_eq!(matrix.rows()[0], vec!["日期", "金额"]);
        // 无制表符时退回逗号
        assert_eq!(matrix.rows()[1], vec!["2024-01-01", "100"]);
    }

    #[test]
    fn blank_sheet_rows_are_dropped() {
        let input = rows(&[&["", " "], &["日期", "金额"]]);
        let matrix = from_sheet_rows(&input).unwrap();
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn empty_sheet_is_a_format_error() {
        let input = rows(&[&["", ""]]);
        assert!(matches!(
            from_sheet_rows(&input),
            Err(CleanseError::Format(_))
        ));
    }

    #[test]
    fn sheet_rows_are_padded_to_uniform_width() {
        let input = rows(&[&["日期", "金额", "摘要"], &["2024-01-01", "100"]]);
        let matrix = from_sheet_rows(&input).unwrap();
        assert_eq!(matrix.rows()[1].len(), 3);
        assert_eq!(matrix.rows()[1][2], "");
    }

    #[test]
    fn source_kind_dispatch_reaches_each_parser() {
        let delimited = ingest(SourceKind::Delimited {
            text: "a,b\n1,2",
            delimiter: ',',
        })
        .unwrap();
        assert_eq!(delimited.len(), 2);

        let free_text = ingest(SourceKind::FreeText {
            bytes: "a\tb\n1\t2".as_bytes(),
        })
        .unwrap();
        assert_eq!(free_text.rows()[0], vec!["a", "b"]);

        let sheet =
            ingest(SourceKind::SheetRows { rows: &rows(&[&["a", "b"]]) }).unwrap();
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn missing_csv_file_reports_format_error() {
        let err = read_csv_rows(Path::new("/nonexistent/流水.csv")).unwrap_err();
        assert!(matches!(err, CleanseError::Format(_)));
    }
}
