mod api;
mod config;
mod error;
mod script;
mod tts;
mod video;

use anyhow::Context;
use api::{HuggingFaceClient, QwenClient};
use clap::{Args, Parser, Subcommand};
use config::{env_override, require_key, OutputLayout};
use error::Result;
use script::{build_script_prompt, validate, Script};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tts::EdgeTts;
use video::Composer;

#[derive(Parser, Debug)]
#[command(name = "auto-reel")]
#[command(about = "Generate a five-scene Hindi village drama reel using AI", long_about = None)]
struct Cli {
    /// Working directory for stage outputs
    #[arg(short = 'w', long, default_value = "outputs", global = true)]
    work_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the script generation prompt
    Prompt,
    /// Check a script JSON file against the authoring rules
    Validate {
        /// Script JSON file
        file: PathBuf,
    },
    /// Generate the script with Qwen and save it
    Script(ScriptArgs),
    /// Generate one video per scene
    Videos(VideoArgs),
    /// Generate Hindi speech for every dialogue
    Tts(TtsArgs),
    /// Compose scenes with their audio and merge the final reel
    Compose,
    /// Run every stage in order, reusing existing outputs
    Run {
        #[command(flatten)]
        script: ScriptArgs,
        #[command(flatten)]
        video: VideoArgs,
        #[command(flatten)]
        tts: TtsArgs,
    },
}

#[derive(Args, Debug)]
struct ScriptArgs {
    /// DashScope API key
    #[arg(long)]
    api_key: Option<String>,

    /// Qwen model name
    #[arg(long)]
    model: Option<String>,

    /// How many times to ask the model for a valid script
    #[arg(long, default_value_t = api::DEFAULT_MAX_ATTEMPTS)]
    attempts: u32,
}

#[derive(Args, Debug)]
struct VideoArgs {
    /// HuggingFace token
    #[arg(long)]
    hf_token: Option<String>,
}

#[derive(Args, Debug)]
struct TtsArgs {
    /// Path to the edge-tts executable
    #[arg(long)]
    edge_tts: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    // 加载环境变量
    dotenvy::dotenv().ok();

    let layout = OutputLayout::new(&cli.work_dir);

    match cli.command {
        Command::Prompt => {
            println!("{}", build_script_prompt());
        }
        Command::Validate { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .context(format!("Failed to read file: {}", file.display()))?;
            let script = Script::from_json(&raw)?;
            let violations = validate(&script);
            if violations.is_empty() {
                println!("{}: ok", file.display());
            } else {
                for violation in &violations {
                    println!("{}: {}", file.display(), violation);
                }
                std::process::exit(1);
            }
        }
        Command::Script(args) => {
            layout_dirs(&layout).await?;
            let script = generate_script(&args).await?;
            script.save(layout.script_path()).await?;
            info!("Saved script to {}", layout.script_path().display());
        }
        Command::Videos(args) => {
            layout_dirs(&layout).await?;
            let script = load_script(&layout).await?;
            run_videos(&args, &script, &layout).await?;
        }
        Command::Tts(args) => {
            layout_dirs(&layout).await?;
            let script = load_script(&layout).await?;
            tts_engine(&args).process_script(&script, &layout).await?;
        }
        Command::Compose => {
            layout_dirs(&layout).await?;
            run_compose(&layout).await?;
        }
        Command::Run { script, video, tts } => {
            layout_dirs(&layout).await?;
            if let Err(e) = run_pipeline(&script, &video, &tts, &layout).await {
                error!("Reel generation failed: {}", e);
                std::process::exit(1);
            }
            info!("Reel generation completed successfully!");
        }
    }

    Ok(())
}

async fn layout_dirs(layout: &OutputLayout) -> anyhow::Result<()> {
    layout
        .create_dirs()
        .await
        .context("Failed to create work directory")
}

async fn generate_script(args: &ScriptArgs) -> Result<Script> {
    let api_key = require_key(args.api_key.clone(), "DASHSCOPE_API_KEY")?;
    let model = args
        .model
        .clone()
        .or_else(|| env_override("QWEN_MODEL"))
        .unwrap_or_else(|| api::DEFAULT_MODEL.to_string());

    let mut client = QwenClient::new(api_key)?
        .with_model(model)
        .with_max_attempts(args.attempts);
    if let Some(base_url) = env_override("DASHSCOPE_BASE_URL") {
        client = client.with_base_url(base_url);
    }

    client.generate_script().await
}

/// 读取剧本：优先使用 SCRIPT_JSON 环境变量
async fn load_script(layout: &OutputLayout) -> Result<Script> {
    let script = match env_override("SCRIPT_JSON") {
        Some(raw) => Script::from_json(&raw)?,
        None => Script::load(layout.script_path()).await?,
    };
    script.validated()
}

async fn run_videos(args: &VideoArgs, script: &Script, layout: &OutputLayout) -> Result<Vec<PathBuf>> {
    let client = match require_key(args.hf_token.clone(), "HF_TOKEN") {
        Ok(token) => {
            let mut client = HuggingFaceClient::new(token)?;
            if let Some(url) = env_override("HF_VIDEO_MODEL_URL") {
                client = client.with_model_url(url);
            }
            Some(client)
        }
        Err(e) => {
            warn!("{}; scenes will get placeholder videos", e);
            None
        }
    };

    video::generate_scene_videos(client.as_ref(), script, layout, video::REQUEST_DELAY).await
}

fn tts_engine(args: &TtsArgs) -> EdgeTts {
    args.edge_tts
        .clone()
        .or_else(|| env_override("EDGE_TTS_BIN"))
        .map(EdgeTts::new)
        .unwrap_or_default()
}

async fn run_compose(layout: &OutputLayout) -> Result<PathBuf> {
    let video_paths = video::load_video_paths(layout).await?;
    let audio = tts::load_audio_manifest(layout).await?;
    let final_reel = Composer::new(layout.clone())
        .compose_reel(&video_paths, &audio)
        .await?;
    info!("Final reel: {}", final_reel.display());
    Ok(final_reel)
}

async fn run_pipeline(
    script_args: &ScriptArgs,
    video_args: &VideoArgs,
    tts_args: &TtsArgs,
    layout: &OutputLayout,
) -> Result<()> {
    // 1. 生成剧本（已存在则复用）
    info!("Step 1/4: Generating script...");
    let script = if env_override("SCRIPT_JSON").is_some()
        || tokio::fs::metadata(layout.script_path()).await.is_ok()
    {
        info!("Script already exists, skipping generation...");
        load_script(layout).await?
    } else {
        let script = generate_script(script_args).await?;
        script.save(layout.script_path()).await?;
        script
    };

    // 2. 为每个场景生成视频
    info!("Step 2/4: Generating scene videos...");
    run_videos(video_args, &script, layout).await?;

    // 3. 生成语音
    info!("Step 3/4: Generating speech...");
    tts_engine(tts_args).process_script(&script, layout).await?;

    // 4. 合成视频
    info!("Step 4/4: Composing final reel...");
    run_compose(layout).await?;

    Ok(())
}
