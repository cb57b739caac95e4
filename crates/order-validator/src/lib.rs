//! 离线订单校验
//!
//! 读取单个 JSON 文档或 JSONL 流，按摄取路径相同的严格规则解码并校验，
//! 合法订单以紧凑 JSON 写到标准输出，汇总写到标准错误。
//!
//! ```bash
//! validate-orders --in orders.jsonl > clean.jsonl
//! cat order.json | validate-orders --format json
//! ```

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;

use order_shared::error::Result;
use order_shared::validate::{
    DefaultOrderValidator, InputFormat, ValidationReport, validate_file, validate_reader,
};

/// 订单校验命令行工具
#[derive(Parser, Debug)]
#[command(name = "validate-orders")]
#[command(version, about = "按摄取规则离线校验订单 JSON / JSONL")]
pub struct Cli {
    /// 输入文件，缺省读取标准输入
    #[arg(long = "in", value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// 输入格式：auto | json | jsonl
    #[arg(long, default_value = "auto")]
    pub format: InputFormat,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// 执行校验并写出汇总，返回是否成功
    pub fn run<R, W, E>(&self, stdin: R, out: &mut W, summary: &mut E) -> bool
    where
        R: Read,
        W: Write,
        E: Write,
    {
        let outcome = self.validate(stdin, out).and_then(|report| {
            out.flush()?;
            Ok(report)
        });

        match &outcome {
            Ok(report) => match &report.rejected {
                None => writeln!(summary, "validation ok ({report})").is_ok(),
                Some(e) => {
                    let _ = writeln!(summary, "validation: {e} ({report})");
                    false
                }
            },
            Err(e) => {
                let _ = writeln!(summary, "validation: {e}");
                false
            }
        }
    }

    fn validate<R: Read, W: Write>(&self, stdin: R, out: &mut W) -> Result<ValidationReport> {
        let validator = DefaultOrderValidator::new();
        match &self.input {
            Some(path) => validate_file(&validator, path, self.format, out),
            None => validate_reader(&validator, stdin, self.format.resolve(None), out),
        }
    }
}
