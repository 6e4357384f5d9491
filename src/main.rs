//! Chips Updater 命令行入口
//!
//! 薯片应用更新器的命令行工具，提供配置检查和批次规划调试功能。
//!
//! # 命令概览
//!
//! - `version` - 显示版本信息
//! - `check-config` - 验证配置文件
//! - `plan` - 根据清单和目录展开一个请求，显示将要执行的子动作
//!
//! # 使用示例
//!
//! ```bash
//! # 检查配置文件
//! chips-updater -c updater.yaml check-config
//!
//! # 查看安装 audio 需要的步骤
//! chips-updater plan --action install --module audio \
//!     --inventory installed.yaml --catalog modules.json
//!
//! # 查看版本
//! chips-updater version
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use chips_updater::module::{Inventory, ManifestCatalog, MemoryInventory};
use chips_updater::scheduler::progress_step;
use chips_updater::{
    ActionExtra, ActionKind, BatchPlanner, Logger, LoggerConfig, UpdaterConfig,
};

/// Chips Updater - 薯片应用更新器
///
/// 按依赖关系调度薯片应用的安装、更新和卸载。
#[derive(Parser)]
#[command(name = "chips-updater")]
#[command(version, about = "薯片生态的应用更新器", long_about = None)]
#[command(author = "Chips Team")]
#[command(propagate_version = true)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "updater.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// 开发模式（显示文件名和行号）
    #[arg(long, global = true)]
    dev: bool,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 查看版本信息
    Version,

    /// 验证配置文件
    ///
    /// 检查配置文件是否有效，并显示解析后的配置内容。
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// 规划批次
    ///
    /// 用已安装模块清单和模块目录展开一个请求，只显示结果不执行。
    Plan {
        /// 动作类型 (install, update, uninstall)
        #[arg(short, long)]
        action: ActionKind,

        /// 目标模块
        #[arg(short, long)]
        module: String,

        /// 已安装模块清单（YAML）
        #[arg(short, long)]
        inventory: PathBuf,

        /// 模块目录（modules.json）
        #[arg(long)]
        catalog: PathBuf,

        /// 强制卸载
        #[arg(long)]
        force: bool,
    },
}

/// 初始化日志系统
fn init_logging(level: &str, dev_mode: bool) -> chips_updater::LogGuard {
    let config = LoggerConfig::builder()
        .level(level)
        .show_file_line(dev_mode)
        .build();
    Logger::try_init(config)
}

/// 检查配置文件
async fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("检查配置文件: {}", path.display());
    println!();

    if !path.exists() {
        println!("⚠️  警告: 配置文件不存在，将使用默认配置");
        println!();
        print_config(&UpdaterConfig::default());
        return Ok(());
    }

    match UpdaterConfig::from_file(path).await {
        Ok(config) => {
            println!("✅ 配置文件有效！");
            println!();
            print_config(&config);
            Ok(())
        }
        Err(e) => {
            println!("❌ 配置文件无效: {} ({})", e, e.error_code());
            Err(Box::new(e))
        }
    }
}

fn print_config(config: &UpdaterConfig) {
    let yes_no = |flag: bool| if flag { "是" } else { "否" };

    println!("配置内容:");
    println!("────────────────────────────────────────");
    println!("  [调度器]");
    println!("    主动作间隔:     {} 秒", config.scheduler.main_actions_interval_secs);
    println!("    子动作间隔:     {} 秒", config.scheduler.sub_actions_interval_secs);
    println!("    重启延迟:       {} 秒", config.scheduler.restart_delay_secs);
    println!();
    println!("  [日志]");
    println!("    日志级别:       {}", config.logging.level);
    println!("    文件输出:       {}", yes_no(config.logging.file_output));
    println!("    JSON 格式:      {}", yes_no(config.logging.json_format));
    println!();
    println!("  [路径]");
    println!("    安装目录:       {}", config.paths.install_dir.display());
    println!("    设置文件:       {}", config.paths.settings_file.display());
    println!("    模块目录文件:   {}", config.paths.catalog_file.display());
    println!();
    println!("  [内核]");
    println!("    当前版本:       {}", config.core.current_version);
    println!("    安装包前缀:     {}", config.core.package_prefix);
    println!("────────────────────────────────────────");
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("Chips Updater - 薯片应用更新器");
    println!("═══════════════════════════════════════");
    println!("  版本:             {}", chips_updater::VERSION);
    println!();
    println!("构建信息:");
    println!("  目标平台:         {}", std::env::consts::ARCH);
    println!("  操作系统:         {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}

/// 展开请求并打印子动作
async fn run_plan(
    kind: ActionKind,
    module: &str,
    inventory_path: &Path,
    catalog_path: &Path,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let inventory = Arc::new(MemoryInventory::from_file(inventory_path).await?);
    let catalog = Arc::new(ManifestCatalog::load(catalog_path).await?);
    let installed: HashSet<String> = inventory.installed_modules().await?.into_keys().collect();
    debug!(installed = ?installed, "已加载清单和目录");

    let extra = (kind == ActionKind::Uninstall).then_some(ActionExtra { force });
    let planner = BatchPlanner::new(inventory, catalog);
    let batch = planner.plan(kind, module, extra, &installed).await?;
    info!(module = %module, kind = %kind, steps = batch.len(), "规划完成");

    println!();
    println!("{} {}: {} 个步骤", kind, module, batch.len());
    println!("────────────────────────────────────────");
    let step = progress_step(batch.len());
    for (index, action) in batch.iter().enumerate() {
        let force_mark = if action.force() { " (force)" } else { "" };
        println!(
            "  {:>2}. {:<10} {:<20} v{}{}",
            index + 1,
            action.kind,
            action.module,
            action.module_infos.version,
            force_mark
        );
    }
    if batch.is_empty() {
        println!("  无需处理");
    }
    println!("────────────────────────────────────────");
    println!("  每步进度: {}%", step);
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            print_version();
        }

        Commands::CheckConfig { file } => {
            let config_path = file.unwrap_or(cli.config);
            check_config(&config_path).await?;
        }

        Commands::Plan {
            action,
            module,
            inventory,
            catalog,
            force,
        } => {
            let _guard = init_logging(&cli.log_level, cli.dev);
            run_plan(action, &module, &inventory, &catalog, force).await?;
        }
    }

    Ok(())
}
