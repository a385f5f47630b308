use std::collections::HashMap;
use tracing::{info, warn};

use crate::schema::{AccountField, AccountRecord, DetailField, DetailRecord};

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 同一个键后写入的覆盖先写入的（建表顺序即优先级）。
fn insert_key(lookup: &mut HashMap<String, String>, key: &str, name: &str) {
    if !key.is_empty() {
        lookup.insert(key.to_string(), name.to_string());
    }
}

/// 原始键 + 纯数字键；数字超过 8 位时再挂一个后 8 位的
/// 低置信部分键。
fn insert_directory_keys(lookup: &mut HashMap<String, String>, raw: &str, name: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    insert_key(lookup, raw, name);
    let digits = digits_only(raw);
    if digits != raw {
        insert_key(lookup, &digits, name);
    }
    if digits.len() > 8 {
        insert_key(lookup, &digits[digits.len() - 8..], name);
    }
}

/// 原始键 + 纯数字键，无部分匹配（已知姓名表只做精确关联）。
fn insert_known_keys(lookup: &mut HashMap<String, String>, raw: &str, name: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    insert_key(lookup, raw, name);
    insert_key(lookup, &digits_only(raw), name);
}

fn lookup_exact<'a>(
    lookup: &'a HashMap<String, String>,
    keys: &[&str],
) -> Option<&'a String> {
    keys.iter()
        .filter(|key| !key.is_empty())
        .find_map(|key| lookup.get(*key))
}

/// 深度清洗（实体归一）：用开户信息和批内已知姓名回填缺失的
/// 本方姓名。
///
/// 三轮执行，结果对行序敏感：先用批内已有姓名的记录建精确键表；
/// 再逐行补缺，先查已知姓名表，查不到再查含后 8 位部分键的开户
/// 信息表，命中即回写已知姓名表供同批靠后的行复用；最后一轮对账
/// 只用累积的已知姓名表。只填空字段，不改已有姓名，不丢记录。
pub fn deep_clean(records: &mut [DetailRecord], directories: &[Vec<AccountRecord>]) {
    let Some(first) = records.first() else {
        return;
    };
    let bank_name = first.bank.clone();
    if bank_name.trim().is_empty() {
        warn!("记录缺少所属银行信息，跳过深度清洗");
        return;
    }

    // 开户信息查找表（含部分键）。其他银行的开户信息不参与。
    let mut directory_lookup: HashMap<String, String> = HashMap::new();
    for directory in directories {
        for entry in directory {
            if !entry.bank.trim().is_empty() && entry.bank != bank_name {
                continue;
            }
            let name = entry.get(AccountField::Name).trim();
            if name.is_empty() {
                continue;
            }
            insert_directory_keys(&mut directory_lookup, entry.get(AccountField::Account), name);
            insert_directory_keys(&mut directory_lookup, entry.get(AccountField::Card), name);
        }
    }

    // 第一轮：已有本方姓名的记录贡献精确键。
    let mut known_names: HashMap<String, String> = HashMap::new();
    for record in records.iter() {
        let name = record.get(DetailField::SelfName).trim();
        if name.is_empty() {
            continue;
        }
        insert_known_keys(&mut known_names, record.get(DetailField::SelfAccount), name);
        insert_known_keys(&mut known_names, record.get(DetailField::SelfCard), name);
    }

    // 第二轮：补缺。命中的姓名立即回写已知姓名表。
    for record in records.iter_mut() {
        if !record.is_empty_field(DetailField::SelfName) {
            continue;
        }
        let raw_account = record.get(DetailField::SelfAccount).trim().to_string();
        let raw_card = record.get(DetailField::SelfCard).trim().to_string();
        let digits_account = digits_only(&raw_account);
        let digits_card = digits_only(&raw_card);

        let mut found = lookup_exact(
            &known_names,
            &[&raw_account, &digits_account, &raw_card, &digits_card],
        )
        .cloned();

        if found.is_none() {
            let mut attempts = vec![
                raw_account.clone(),
                digits_account.clone(),
                raw_card.clone(),
                digits_card.clone(),
            ];
            if digits_account.len() > 8 {
                attempts.push(digits_account[digits_account.len() - 8..].to_string());
            }
            if digits_card.len() > 8 {
                attempts.push(digits_card[digits_card.len() - 8..].to_string());
            }
            found = attempts
                .iter()
                .filter(|key| !key.is_empty())
                .find_map(|key| directory_lookup.get(key))
                .cloned();
        }

        if let Some(name) = found {
            record.set(DetailField::SelfName, name.clone());
            insert_known_keys(&mut known_names, &raw_account, &name);
            insert_known_keys(&mut known_names, &raw_card, &name);
        }
    }

    // 第三轮：对账，只用累积的已知姓名表再兜一遍。
    for record in records.iter_mut() {
        if !record.is_empty_field(DetailField::SelfName) {
            continue;
        }
        let raw_account = record.get(DetailField::SelfAccount).trim().to_string();
        let raw_card = record.get(DetailField::SelfCard).trim().to_string();

        let found = lookup_exact(&known_names, &[&raw_account, &digits_only(&raw_account)])
            .or_else(|| lookup_exact(&known_names, &[&raw_card, &digits_only(&raw_card)]))
            .cloned();
        if let Some(name) = found {
            record.set(DetailField::SelfName, name);
        }
    }

    let total = records.len();
    let resolved = records
        .iter()
        .filter(|r| !r.is_empty_field(DetailField::SelfName))
        .count();
    info!(
        total,
        resolved,
        rate = resolved as f64 / total.max(1) as f64,
        "深度清洗完成"
    );
}
