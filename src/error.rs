use thiserror::Error;

/// 清洗管线的统一错误类型。
///
/// 「无法识别银行」不属于错误（见 `bank_identifier::Identification`），
/// 深度清洗后仍缺姓名也不属于错误，只体现在匹配率日志里。
#[derive(Debug, Error)]
pub enum CleanseError {
    /// 源数据不可读：编码识别失败、内容为空或结构不合法。
    #[error("源数据格式错误: {0}")]
    Format(String),

    /// 前几行中没有一行像标题行。
    #[error("无法识别标题行（扫描前 {scanned} 行, 最高得分 {best_score}）")]
    HeaderNotFound { scanned: usize, best_score: i64 },

    /// 缺少字段映射配置，或映射引用了标准字段之外的键。
    #[error("字段映射错误: {0}")]
    Mapping(String),

    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CleanseError>;
