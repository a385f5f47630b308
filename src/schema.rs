use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CleanseError, Result};

/// 记录类型：银行明细 vs 开户信息，各自有独立的标准字段表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    TransactionDetail,
    AccountDirectory,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::TransactionDetail => "明细",
            RecordKind::AccountDirectory => "开户信息",
        }
    }

    /// 该记录类型允许出现在字段映射里的标准字段名。
    pub fn standard_labels(self) -> Vec<&'static str> {
        match self {
            RecordKind::TransactionDetail => {
                DetailField::ALL.iter().map(|f| f.label()).collect()
            }
            RecordKind::AccountDirectory => {
                AccountField::ALL.iter().map(|f| f.label()).collect()
            }
        }
    }
}

/// 字段值的清洗类别，决定多值连接符与规整方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    /// 账号 / 卡号：去除所有空白，其余保留。
    Number,
    /// 金额 / 余额：去除千分位与空白，保持文本，不转数值。
    Amount,
    /// 日期时间：规整为 `YYYY-MM-DD[ HH:MM:SS]`。
    DateTime,
    /// 借贷标志：归一为「借」/「贷」。
    DebitFlag,
    Text,
}

impl FieldCategory {
    /// 同一标准字段命中多列时的连接符。
    pub fn join_separator(self) -> &'static str {
        match self {
            FieldCategory::Number | FieldCategory::Amount => "\n",
            _ => "; ",
        }
    }
}

/// 某一记录类型的标准字段枚举共同实现的接口。
pub trait FieldSchema:
    Copy + Ord + std::fmt::Debug + Serialize + serde::de::DeserializeOwned + 'static
{
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn category(self) -> FieldCategory;

    fn record_kind() -> RecordKind;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.label() == label)
    }
}

/// 银行明细标准字段。「所属银行」不在其中：它由清洗时强制写入，
/// 不参与映射（见 `Record::bank`）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DetailField {
    SelfName,
    SelfAccount,
    SelfCard,
    Amount,
    TransTime,
    Currency,
    DebitCredit,
    Balance,
    TransType,
    Summary,
    Branch,
    OppositeName,
    OppositeAccount,
    OppositeCard,
    OppositeBank,
}

impl FieldSchema for DetailField {
    const ALL: &'static [Self] = &[
        DetailField::SelfName,
        DetailField::SelfAccount,
        DetailField::SelfCard,
        DetailField::Amount,
        DetailField::TransTime,
        DetailField::Currency,
        DetailField::DebitCredit,
        DetailField::Balance,
        DetailField::TransType,
        DetailField::Summary,
        DetailField::Branch,
        DetailField::OppositeName,
        DetailField::OppositeAccount,
        DetailField::OppositeCard,
        DetailField::OppositeBank,
    ];

    fn label(self) -> &'static str {
        match self {
            DetailField::SelfName => "本方姓名",
            DetailField::SelfAccount => "本方账号",
            DetailField::SelfCard => "本方卡号",
            DetailField::Amount => "交易金额",
            DetailField::TransTime => "交易时间",
            DetailField::Currency => "币种",
            DetailField::DebitCredit => "借贷标志",
            DetailField::Balance => "余额",
            DetailField::TransType => "交易方式",
            DetailField::Summary => "交易摘要",
            DetailField::Branch => "交易网点",
            DetailField::OppositeName => "对方户名",
            DetailField::OppositeAccount => "对方账户",
            DetailField::OppositeCard => "对方卡号",
            DetailField::OppositeBank => "对方开户行",
        }
    }

    fn category(self) -> FieldCategory {
        match self {
            DetailField::SelfAccount
            | DetailField::SelfCard
            | DetailField::OppositeAccount
            | DetailField::OppositeCard => FieldCategory::Number,
            DetailField::Amount | DetailField::Balance => FieldCategory::Amount,
            DetailField::TransTime => FieldCategory::DateTime,
            DetailField::DebitCredit => FieldCategory::DebitFlag,
            _ => FieldCategory::Text,
        }
    }

    fn record_kind() -> RecordKind {
        RecordKind::TransactionDetail
    }
}

/// 开户信息标准字段。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccountField {
    Name,
    Account,
    Card,
    IdNumber,
    Phone,
    Address,
}

impl FieldSchema for AccountField {
    const ALL: &'static [Self] = &[
        AccountField::Name,
        AccountField::Account,
        AccountField::Card,
        AccountField::IdNumber,
        AccountField::Phone,
        AccountField::Address,
    ];

    fn label(self) -> &'static str {
        match self {
            AccountField::Name => "姓名",
            AccountField::Account => "账号",
            AccountField::Card => "卡号",
            AccountField::IdNumber => "身份证号",
            AccountField::Phone => "联系方式",
            AccountField::Address => "家庭住址",
        }
    }

    fn category(self) -> FieldCategory {
        match self {
            AccountField::Account | AccountField::Card => FieldCategory::Number,
            _ => FieldCategory::Text,
        }
    }

    fn record_kind() -> RecordKind {
        RecordKind::AccountDirectory
    }
}

/// 清洗后的一条记录：标准字段全部在场（值可以为空串），外加强制
/// 写入的所属银行。深度清洗只会填充空字段，不会删除字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = ""))] // FieldSchema 已要求 DeserializeOwned
pub struct Record<F: FieldSchema> {
    pub bank: String,
    values: BTreeMap<F, String>,
}

pub type DetailRecord = Record<DetailField>;
pub type AccountRecord = Record<AccountField>;

impl<F: FieldSchema> Record<F> {
    pub fn new(bank: impl Into<String>) -> Self {
        let values = F::ALL
            .iter()
            .map(|f| (*f, String::new()))
            .collect::<BTreeMap<_, _>>();
        Record {
            bank: bank.into(),
            values,
        }
    }

    pub fn get(&self, field: F) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: F, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn is_empty_field(&self, field: F) -> bool {
        self.get(field).trim().is_empty()
    }
}

/// 标准字段名 → 可接受的原始列名列表，按 (银行, 记录类型) 存储。
///
/// 键保持字符串形式：映射来自外部配置，保存时按记录类型的标准
/// 字段表校验，非法键整体拒绝，不做静默丢弃。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub entries: BTreeMap<String, Vec<String>>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, standard: impl Into<String>, aliases: Vec<String>) {
        self.entries.insert(standard.into(), aliases);
    }

    pub fn aliases(&self, standard: &str) -> &[String] {
        self.entries.get(standard).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 映射中可接受原始列名的总数，银行识别用它做同分裁决。
    pub fn total_aliases(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self, kind: RecordKind) -> Result<()> {
        let allowed = kind.standard_labels().into_iter().collect::<BTreeSet<_>>();
        for key in self.entries.keys() {
            if !allowed.contains(key.as_str()) {
                return Err(CleanseError::Mapping(format!(
                    "非法的标准字段: {key}（记录类型: {}）",
                    kind.as_str()
                )));
            }
        }
        Ok(())
    }
}
