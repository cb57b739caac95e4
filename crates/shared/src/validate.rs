//! 订单校验
//!
//! `OrderValidator` 是无副作用的纯校验能力；失败时统一返回
//! [`OrderError::InvalidOrder`]，调用方依据变体而非文本分支。
//!
//! 本模块同时提供严格解码与离线校验（JSON / JSONL）辅助函数，
//! 与 Kafka 摄取路径共享同一套解码规则。

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;
use validator::ValidateEmail;

use crate::error::{OrderError, Result};
use crate::models::{Delivery, Item, Order, Payment};

/// 2000-01-01T00:00:00Z
const MIN_CREATED_AT_UNIX: i64 = 946_684_800;

/// 订单校验能力
pub trait OrderValidator: Send + Sync {
    fn validate(&self, order: &Order) -> Result<()>;
}

/// 默认校验规则：核心字段 → 支付 → 配送 → 商品，遇到第一处错误即返回
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOrderValidator;

impl DefaultOrderValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_core(order: &Order) -> Result<()> {
        if order.order_uid.is_empty() {
            return Err(invalid("order_uid 不能为空"));
        }
        if order.track_number.is_empty() {
            return Err(invalid("track_number 不能为空"));
        }
        if order.entry.is_empty() {
            return Err(invalid("entry 不能为空"));
        }
        if order.date_created.timestamp() < MIN_CREATED_AT_UNIX {
            return Err(invalid("date_created 不合法"));
        }
        Ok(())
    }

    fn validate_payment(payment: &Payment) -> Result<()> {
        if payment.transaction.is_empty() {
            return Err(invalid("payment.transaction 不能为空"));
        }
        if payment.currency.is_empty() {
            return Err(invalid("payment.currency 不能为空"));
        }
        if payment.amount < 0 {
            return Err(invalid("payment.amount 不能为负数"));
        }
        Ok(())
    }

    fn validate_delivery(delivery: &Delivery) -> Result<()> {
        if delivery.email.is_empty() {
            return Err(invalid("delivery.email 不能为空"));
        }
        if !delivery.email.validate_email() {
            return Err(invalid("delivery.email 格式不合法"));
        }
        Ok(())
    }

    fn validate_items(items: &[Item]) -> Result<()> {
        if items.is_empty() {
            return Err(invalid("items 不能为空"));
        }
        for (idx, item) in items.iter().enumerate() {
            if item.name.is_empty() {
                return Err(invalid(format!("items[{idx}].name 不能为空")));
            }
            if item.price < 0 {
                return Err(invalid(format!("items[{idx}].price 不能为负数")));
            }
            if item.total_price < 0 {
                return Err(invalid(format!("items[{idx}].total_price 不能为负数")));
            }
        }
        Ok(())
    }
}

impl OrderValidator for DefaultOrderValidator {
    fn validate(&self, order: &Order) -> Result<()> {
        Self::validate_core(order)?;
        Self::validate_payment(&order.payment)?;
        Self::validate_delivery(&order.delivery)?;
        Self::validate_items(&order.items)
    }
}

fn invalid(reason: impl Into<String>) -> OrderError {
    OrderError::InvalidOrder(reason.into())
}

// ---------------------------------------------------------------------------
// 严格解码
// ---------------------------------------------------------------------------

/// 严格解码单个订单文档
///
/// 未知字段与对象之后的任何非空白内容都视为解码错误。
pub fn decode_order(raw: &[u8]) -> Result<Order> {
    let mut de = serde_json::Deserializer::from_slice(raw);
    let order = Order::deserialize(&mut de)?;
    de.end()
        .map_err(|_| OrderError::InvalidJson("trailing data".to_string()))?;
    Ok(order)
}

/// 解码并校验单个订单文档
pub fn validate_order_from_json(validator: &dyn OrderValidator, raw: &[u8]) -> Result<Order> {
    let order = decode_order(raw)?;
    validator.validate(&order)?;
    Ok(order)
}

// ---------------------------------------------------------------------------
// 离线校验
// ---------------------------------------------------------------------------

/// 输入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// 按扩展名判断：`.jsonl` 为 JSONL，其余为 JSON；标准输入按 JSONL 处理
    #[default]
    Auto,
    Json,
    Jsonl,
}

impl InputFormat {
    /// 将 `Auto` 落到具体格式，`path` 为 `None` 表示标准输入
    pub fn resolve(self, path: Option<&Path>) -> Self {
        match (self, path) {
            (Self::Auto, None) => Self::Jsonl,
            (Self::Auto, Some(path)) => {
                let is_jsonl = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));
                if is_jsonl { Self::Jsonl } else { Self::Json }
            }
            (explicit, _) => explicit,
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(format!("不支持的格式: {other}（可选 auto|json|jsonl）")),
        }
    }
}

/// 离线校验结果
///
/// `rejected` 只在单文档模式下文档未通过时出现；JSONL 模式中无效行只计数。
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub valid: usize,
    pub invalid: usize,
    pub rejected: Option<OrderError>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.rejected.is_none()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} valid / {} invalid", self.valid, self.invalid)
    }
}

/// 逐行校验 JSONL 流，合法行以紧凑 JSON 写出
///
/// 空行跳过，无效行计数后跳过；只有读写失败才返回错误。
pub fn validate_jsonl_stream<R: BufRead, W: Write>(
    validator: &dyn OrderValidator,
    reader: R,
    out: &mut W,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match validate_order_from_json(validator, line) {
            Ok(order) => {
                write_canonical(out, &order)?;
                report.valid += 1;
            }
            Err(e) => {
                warn!(line = index + 1, error = %e, "跳过无效行");
                report.invalid += 1;
            }
        }
    }

    Ok(report)
}

/// 按给定格式校验任意输入，`format` 不应为 `Auto`（调用方先 `resolve`）
pub fn validate_reader<R: Read, W: Write>(
    validator: &dyn OrderValidator,
    reader: R,
    format: InputFormat,
    out: &mut W,
) -> Result<ValidationReport> {
    match format {
        InputFormat::Jsonl | InputFormat::Auto => {
            validate_jsonl_stream(validator, BufReader::new(reader), out)
        }
        InputFormat::Json => {
            let mut raw = Vec::new();
            let mut reader = reader;
            reader.read_to_end(&mut raw)?;

            match validate_order_from_json(validator, &raw) {
                Ok(order) => {
                    write_canonical(out, &order)?;
                    Ok(ValidationReport {
                        valid: 1,
                        ..Default::default()
                    })
                }
                Err(e) => Ok(ValidationReport {
                    valid: 0,
                    invalid: 1,
                    rejected: Some(e),
                }),
            }
        }
    }
}

/// 校验文件，`Auto` 按扩展名选择格式
pub fn validate_file<W: Write>(
    validator: &dyn OrderValidator,
    path: &Path,
    format: InputFormat,
    out: &mut W,
) -> Result<ValidationReport> {
    let file = File::open(path)?;
    validate_reader(validator, file, format.resolve(Some(path)), out)
}

fn write_canonical<W: Write>(out: &mut W, order: &Order) -> Result<()> {
    let encoded = serde_json::to_vec(order).map_err(|e| OrderError::Internal(e.to_string()))?;
    out.write_all(&encoded)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_order;
    use chrono::{TimeZone, Utc};

    fn valid() -> Order {
        sample_order("order-1", "customer-1")
    }

    fn reason(order: &Order) -> String {
        match DefaultOrderValidator::new().validate(order) {
            Err(OrderError::InvalidOrder(reason)) => reason,
            other => panic!("期望 InvalidOrder，实际 {other:?}"),
        }
    }

    #[test]
    fn test_valid_order_passes() {
        assert!(DefaultOrderValidator::new().validate(&valid()).is_ok());
    }

    #[test]
    fn test_core_field_rules() {
        let cases: [(fn(&mut Order), &str); 5] = [
            (|o: &mut Order| o.order_uid.clear(), "order_uid"),
            (|o: &mut Order| o.track_number.clear(), "track_number"),
            (|o: &mut Order| o.entry.clear(), "entry"),
            (|o: &mut Order| o.date_created = Default::default(), "date_created"),
            (
                |o: &mut Order| o.date_created = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap(),
                "date_created",
            ),
        ];

        for (mutate, field) in cases {
            let mut order = valid();
            mutate(&mut order);
            assert!(reason(&order).contains(field), "字段 {field}");
        }
    }

    #[test]
    fn test_payment_delivery_item_rules() {
        let cases: [(fn(&mut Order), &str); 9] = [
            (|o: &mut Order| o.payment.transaction.clear(), "payment.transaction"),
            (|o: &mut Order| o.payment.currency.clear(), "payment.currency"),
            (|o: &mut Order| o.payment.amount = -1, "payment.amount"),
            (|o: &mut Order| o.delivery.email.clear(), "delivery.email 不能为空"),
            (|o: &mut Order| o.delivery.email = "not-an-email".to_string(), "delivery.email 格式"),
            (|o: &mut Order| o.items.clear(), "items 不能为空"),
            (|o: &mut Order| o.items[0].name.clear(), "items[0].name"),
            (|o: &mut Order| o.items[0].price = -1, "items[0].price"),
            (|o: &mut Order| o.items[0].total_price = -1, "items[0].total_price"),
        ];

        for (mutate, expected) in cases {
            let mut order = valid();
            mutate(&mut order);
            assert!(reason(&order).contains(expected), "期望包含 {expected}");
        }
    }

    #[test]
    fn test_rules_apply_in_fixed_order() {
        let mut order = valid();
        order.track_number.clear();
        order.payment.currency.clear();
        order.items.clear();
        assert!(reason(&order).contains("track_number"));

        let mut order = valid();
        order.payment.amount = -5;
        order.delivery.email.clear();
        assert!(reason(&order).contains("payment.amount"));
    }

    #[test]
    fn test_decode_rejects_trailing_data() {
        let mut raw = serde_json::to_vec(&valid()).unwrap();
        raw.extend_from_slice(b" {}");

        let err = decode_order(&raw).unwrap_err();
        assert!(matches!(err, OrderError::InvalidJson(ref msg) if msg == "trailing data"));
    }

    #[test]
    fn test_decode_allows_trailing_whitespace() {
        let mut raw = serde_json::to_vec(&valid()).unwrap();
        raw.extend_from_slice(b"\n\t ");
        assert_eq!(decode_order(&raw).unwrap(), valid());
    }

    #[test]
    fn test_decode_error_is_distinct_from_validation_error() {
        let validator = DefaultOrderValidator::new();

        let decode = validate_order_from_json(&validator, br#"{"order_uid":"1","x":1}"#);
        assert!(matches!(decode, Err(OrderError::InvalidJson(_))));

        let invalid = validate_order_from_json(&validator, br#"{"order_uid":"1"}"#);
        assert!(matches!(invalid, Err(OrderError::InvalidOrder(_))));
    }

    #[test]
    fn test_jsonl_stream_counts_and_emits_valid_lines() {
        let good = serde_json::to_string(&valid()).unwrap();
        let input = format!("{good}\n\n   \nnot json\n{{\"order_uid\":\"x\"}}\n{good}\n");
        let mut out = Vec::new();

        let report =
            validate_jsonl_stream(&DefaultOrderValidator::new(), input.as_bytes(), &mut out)
                .unwrap();

        assert_eq!(report.valid, 2);
        assert_eq!(report.invalid, 2);
        assert!(report.is_ok());
        assert_eq!(report.to_string(), "2 valid / 2 invalid");
        assert_eq!(String::from_utf8(out).unwrap(), format!("{good}\n{good}\n"));
    }

    #[test]
    fn test_single_document_rejected() {
        let mut out = Vec::new();
        let report = validate_reader(
            &DefaultOrderValidator::new(),
            &b"{\"order_uid\":\"1\"}"[..],
            InputFormat::Json,
            &mut out,
        )
        .unwrap();

        assert!(!report.is_ok());
        assert_eq!(report.to_string(), "0 valid / 1 invalid");
        assert!(out.is_empty());
    }

    #[test]
    fn test_validate_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let pretty = serde_json::to_string_pretty(&valid()).unwrap();
        let json_path = dir.path().join("order.json");
        std::fs::write(&json_path, &pretty).unwrap();

        let mut out = Vec::new();
        let report = validate_file(
            &DefaultOrderValidator::new(),
            &json_path,
            InputFormat::Auto,
            &mut out,
        )
        .unwrap();
        assert_eq!(report.to_string(), "1 valid / 0 invalid");
        let canonical = serde_json::to_string(&valid()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{canonical}\n"));

        let jsonl_path = dir.path().join("orders.jsonl");
        std::fs::write(&jsonl_path, format!("{canonical}\nbroken\n")).unwrap();
        let mut out = Vec::new();
        let report = validate_file(
            &DefaultOrderValidator::new(),
            &jsonl_path,
            InputFormat::Auto,
            &mut out,
        )
        .unwrap();
        assert_eq!(report.to_string(), "1 valid / 1 invalid");
    }

    #[test]
    fn test_validate_file_missing_path_is_io_error() {
        let result = validate_file(
            &DefaultOrderValidator::new(),
            Path::new("/definitely/not/here.json"),
            InputFormat::Auto,
            &mut Vec::new(),
        );
        assert!(matches!(result, Err(OrderError::Io(_))));
    }

    #[test]
    fn test_input_format_parsing_and_resolution() {
        assert_eq!("JSONL".parse::<InputFormat>(), Ok(InputFormat::Jsonl));
        assert!("xml".parse::<InputFormat>().is_err());
        assert_eq!(InputFormat::Auto.resolve(None), InputFormat::Jsonl);
        assert_eq!(
            InputFormat::Auto.resolve(Some(Path::new("a.txt"))),
            InputFormat::Json
        );
        assert_eq!(
            InputFormat::Json.resolve(Some(Path::new("a.jsonl"))),
            InputFormat::Json
        );
    }
}
