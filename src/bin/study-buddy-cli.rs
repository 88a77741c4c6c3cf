//! Study Buddy CLI 客户端（测试版）
//!
//! 非交互式 CLI，用于测试和展示 SDK 功能
//! 启动时通过命令行参数（或环境变量）指定账号，自动登录后执行一个子命令，最后输出仓库状态

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use study_buddy_sdk_core::im::auth::listener::{AuthEvent, AuthStateListener};
use study_buddy_sdk_core::{
    Attachment, ClientConfig, Credentials, GoTrueAuthProvider, LlmProvider, SendOptions,
    StudyBuddyClient,
};
use tracing::{error, info, warn};

/// Study Buddy CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "study-buddy-cli")]
#[command(about = "Study Buddy CLI 客户端 - 用于测试和展示 SDK 功能", long_about = None)]
struct Args {
    /// 业务 API 地址
    #[arg(long, env = "STUDY_BUDDY_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// 认证服务地址
    #[arg(long, env = "SUPABASE_URL", default_value = "http://localhost:54321")]
    auth_url: String,

    /// 认证服务匿名 key
    #[arg(long, env = "SUPABASE_ANON_KEY", default_value = "", hide_env_values = true)]
    anon_key: String,

    /// 登录邮箱
    #[arg(short, long, env = "STUDY_BUDDY_EMAIL")]
    email: String,

    /// 登录密码
    #[arg(short, long, env = "STUDY_BUDDY_PASSWORD", hide_env_values = true)]
    password: String,

    /// 使用注册代替登录
    #[arg(long)]
    signup: bool,

    /// 请求超时（秒）
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// 日志级别（默认: info,study_buddy_sdk_core=debug）
    #[arg(long, default_value = "info,study_buddy_sdk_core=debug")]
    log_level: String,

    /// 额外写入的日志文件（不指定则只输出到控制台）
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出全部会话
    Chats,
    /// 列出某个会话的消息
    Messages {
        chat_id: String,
    },
    /// 创建新会话
    NewChat {
        title: String,
    },
    /// 发送一条用户消息
    Send {
        text: String,
        /// 目标会话，不指定时由服务器新建会话
        #[arg(long)]
        chat: Option<String>,
        /// 大模型提供方：openai / anthropic / ollama / huggingface
        #[arg(long)]
        provider: Option<LlmProvider>,
        /// 启用检索增强
        #[arg(long)]
        rag: bool,
        /// 附件文件名（可重复）
        #[arg(long = "file")]
        files: Vec<String>,
    },
    /// 列出服务端可用的大模型提供方
    Providers,
}

/// 初始化日志（输出到 stdout，可选同时输出到文件）
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow!("无法创建日志文件 {}: {}", path.display(), e))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("[CLI] 📝 日志已同时输出到控制台和文件: {}", path.display());
    }
    Ok(())
}

/// 输出认证事件
struct CliAuthListener;

#[async_trait::async_trait]
impl AuthStateListener for CliAuthListener {
    async fn on_auth_state_changed(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                info!("[CLI/Auth] 🔓 已登录: {}", session.user.id)
            }
            AuthEvent::SignedOut => info!("[CLI/Auth] 🔒 已登出"),
        }
    }
}

async fn run(client: &StudyBuddyClient, command: Command) -> Result<()> {
    match command {
        Command::Chats => {
            let result = client.chats().fetch_chats().await;
            if let Some(err) = result.error {
                return Err(anyhow!("获取会话列表失败: {}", err));
            }
        }
        Command::Messages { chat_id } => {
            let result = client.messages().fetch_messages_by_chat(&chat_id).await?;
            if let Some(err) = result.error {
                return Err(anyhow!("获取消息失败: {}", err));
            }
        }
        Command::NewChat { title } => {
            let result = client.chats().create_chat(&title).await?;
            if let Some(err) = result.error {
                return Err(anyhow!("创建会话失败: {}", err));
            }
        }
        Command::Send {
            text,
            chat,
            provider,
            rag,
            files,
        } => {
            if let Some(chat_id) = &chat {
                client.chats().fetch_chats().await;
                if client.select_chat_by_id(chat_id).await?.error.is_some() {
                    warn!("[CLI] 拉取会话 {} 的历史消息失败", chat_id);
                }
            }
            let options = SendOptions {
                attachments: files.into_iter().map(Attachment::new).collect(),
                llm_provider: provider,
                use_rag: rag,
            };
            let result = client.send_message(&text, &options).await?;
            match (result.data, result.error) {
                (Some(sent), _) => {
                    if let Some(reply) = sent.ai_reply {
                        info!("[CLI] 🤖 助手回复: {}", reply.content);
                    }
                }
                (None, Some(err)) => return Err(anyhow!("发送消息失败: {}", err)),
                (None, None) => {}
            }
        }
        Command::Providers => {
            let result = client.messages().available_llm_providers().await;
            match result.data {
                Some(providers) => info!("[CLI] 🧠 可用模型提供方: {}", providers.join(", ")),
                None => {
                    return Err(anyhow!(
                        "获取模型提供方失败: {}",
                        result.error.unwrap_or_default()
                    ))
                }
            }
        }
    }
    Ok(())
}

/// 输出仓库当前状态
fn print_state(client: &StudyBuddyClient) {
    let snapshot = client.snapshot();
    info!(
        "[CLI] 📋 会话列表（共 {} 个），当前会话: {}",
        snapshot.chat.chats().len(),
        snapshot.chat.current_chat_id().unwrap_or("<无>")
    );
    for chat in snapshot.chat.chats() {
        info!(
            "[CLI]   - {} | {} | 消息数: {}",
            chat.id, chat.title, chat.message_count
        );
    }
    if let Some(chat_id) = snapshot.message.current_chat_id() {
        info!(
            "[CLI] 💬 会话 {} 的消息（共 {} 条）",
            chat_id,
            snapshot.message.messages().len()
        );
        for message in snapshot.message.messages() {
            let preview: String = message.content.chars().take(60).collect();
            info!("[CLI]   [{}] {}", message.role, preview);
        }
    }
    for err in [snapshot.chat.error, snapshot.message.error].into_iter().flatten() {
        error!("[CLI] ⚠️ {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level, args.log_file.as_ref())?;

    info!("[CLI] 🚀 Study Buddy CLI 客户端（测试模式）");
    info!("[CLI] 🌐 API地址: {}", args.api_url);

    let config = ClientConfig {
        api_base_url: args.api_url,
        auth_url: args.auth_url,
        auth_anon_key: args.anon_key,
        request_timeout: Duration::from_secs(args.timeout),
    };

    let provider = GoTrueAuthProvider::new(
        config.auth_url.clone(),
        config.auth_anon_key.clone(),
        config.request_timeout,
    )?
    .into_shared();
    let _auth_log = provider.subscribe(Arc::new(CliAuthListener));
    let client = StudyBuddyClient::new(config, provider)?;
    let _auth_sync = client.auth().watch_auth_state();

    let credentials = Credentials::new(args.email, args.password);
    let result = if args.signup {
        client.auth().signup(&credentials).await?
    } else {
        client.auth().login(&credentials).await?
    };
    let session = result
        .data
        .ok_or_else(|| anyhow!("登录失败: {}", result.error.unwrap_or_default()))?;
    info!("[CLI] ✅ 登录成功！用户ID: {}", session.user_id);

    let outcome = run(&client, args.command).await;
    print_state(&client);

    client.auth().logout().await;
    outcome
}
