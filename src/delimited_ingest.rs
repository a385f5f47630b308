use crate::error::{CleanseError, Result};
use crate::matrix::RawMatrix;

/// 把已解码的分隔文本解析为矩阵。
///
/// 引号规则：`"` 切换引号状态；引号内的 `""` 还原为一个字面引号；
/// 引号内的分隔符当普通字符。字段在切分后做 trim。空行不产生记录。
pub fn parse_delimited(text: &str, delimiter: char) -> Result<RawMatrix> {
    if text.trim().is_empty() {
        return Err(CleanseError::Format("分隔文本内容为空".to_string()));
    }

    let mut rows = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        rows.push(split_quoted_line(line, delimiter));
    }
    if rows.is_empty() {
        return Err(CleanseError::Format("分隔文本没有可用数据行".to_string()));
    }
    Ok(RawMatrix::new(rows))
}

fn split_quoted_line(line: &str, delimiter: char) -> Vec<String> {
    let chars = line.chars().collect::<Vec<_>>();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            if in_quotes && chars.get(i + 1) == Some(&'"') {
                field.push('"');
                i += 1;
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(field.trim().to_string());
            field.clear();
        } else {
            field.push(c);
        }
        i += 1;
    }
    fields.push(field.trim().to_string());
    fields
}
