//! validate-orders 命令行入口

use std::io::{self, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use order_shared::observability::tracing::env_filter;
use order_validator::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // 日志与汇总都走标准错误，标准输出只留给校验通过的订单
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cli.log_level))
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin().lock();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut summary = io::stderr().lock();

    if cli.run(stdin, &mut out, &mut summary) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
