//! RS Agent - 遥感知识问答系统
//!
//! 入口：初始化日志与配置，构建 Agent，单次查询或进入交互式读入循环。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rs_agent::agent::{Agent, QueryStatus};
use rs_agent::clarify::{is_abort, StdinPrompt};
use rs_agent::config::load_config;

/// RS Agent - 遥感知识问答系统
#[derive(Parser, Debug)]
#[command(name = "rs-agent", version, about)]
struct Cli {
    /// 要查询的问题；缺省时进入交互模式
    #[arg(long)]
    query: Option<String>,

    /// 输出目录路径（结果写入 <输出目录>/query_result.txt）
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// 附加的上下文文件，可重复指定
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// 额外配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("配置加载失败")?;

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| cfg.app.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("output"));

    let agent = Agent::from_config(&cfg);
    let mut prompter = StdinPrompt;

    println!("{}", "=".repeat(50));
    println!("RS Agent - 遥感知识问答系统");
    println!("{}", "=".repeat(50));

    if let Some(query) = cli.query {
        process_query(&agent, &query, &cli.files, &output_dir, &mut prompter).await;
    } else {
        loop {
            println!("\n请输入您的问题（输入'退出'结束）: ");
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_abort(query) {
                println!("\n[系统] 感谢使用，再见！");
                break;
            }
            process_query(&agent, query, &cli.files, &output_dir, &mut prompter).await;
        }
    }

    Ok(())
}

/// 处理单个查询并按结果打印报告
async fn process_query(
    agent: &Agent,
    query: &str,
    files: &[PathBuf],
    output_dir: &std::path::Path,
    prompter: &mut StdinPrompt,
) {
    let output_file = output_dir.join("query_result.txt");
    println!("\n[系统] 正在处理查询: {}", query);

    let status = agent
        .process_query(query, files, Some(&output_file), prompter)
        .await;

    match status {
        QueryStatus::Completed => {
            println!("\n[成功] 查询处理完成！");
            dump_result(&output_file);
        }
        QueryStatus::Clarified => {
            println!("\n[成功] 模糊查询已通过交互式澄清完成！");
            dump_result(&output_file);
        }
        QueryStatus::Irrelevant => {
            println!("\n[失败] 查询与系统功能无关，无法处理。");
        }
        QueryStatus::Failed(code) => {
            println!("\n[失败] 查询处理失败，错误代码: {}", code);
        }
    }
}

fn dump_result(output_file: &std::path::Path) {
    match std::fs::read_to_string(output_file) {
        Ok(content) => {
            println!("\n--- 查询结果 ---");
            println!("{}", content);
            println!("--- 结果结束 ---");
        }
        Err(_) => println!("[错误] 未找到输出文件: {}", output_file.display()),
    }
}
