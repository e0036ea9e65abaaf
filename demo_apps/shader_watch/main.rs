//! Shader watcher.
//!
//! ```text
//! shader_watch [--config forge.json] [--set NAME=VALUE]... FILE:STAGE[:ENTRY]...
//! ```
//!
//! Compiles every listed shader once, then ticks the registry at roughly
//! 60 Hz and reports each hot swap. Lines typed on stdin as `NAME=VALUE`
//! update the shared compile options at runtime.
//!
//! Example: `shader_watch Shaders/Mesh.hlsl:vertex:VSMain Shaders/RT.hlsl:lib`

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use log::{error, info};
use shader_forge::{
    DefinitionSet, DxcToolchain, ErrorAction, ShaderConfig, ShaderDesc, ShaderRegistry,
    ShaderStage, SharedOptions,
};

const FRAME: Duration = Duration::from_millis(16);

struct Request {
    path: String,
    stage: ShaderStage,
    entry_point: Option<String>,
}

struct Args {
    config: Option<String>,
    options: Vec<(String, String)>,
    requests: Vec<Request>,
}

fn parse_stage(name: &str) -> anyhow::Result<ShaderStage> {
    ShaderStage::ALL
        .into_iter()
        .find(|stage| stage.type_name() == name || stage.profile_prefix() == name)
        .with_context(|| format!("unknown shader stage `{name}`"))
}

fn parse_assignment(text: &str) -> anyhow::Result<(String, String)> {
    let (name, value) = text
        .split_once('=')
        .with_context(|| format!("expected NAME=VALUE, got `{text}`"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        options: Vec::new(),
        requests: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(iter.next().context("--config needs a path")?),
            "--set" => {
                let assignment = iter.next().context("--set needs NAME=VALUE")?;
                args.options.push(parse_assignment(&assignment)?);
            }
            _ => {
                let mut parts = arg.splitn(3, ':');
                let path = parts.next().unwrap_or_default().to_string();
                let stage = parse_stage(parts.next().context("missing :STAGE")?)?;
                let entry_point = parts.next().map(str::to_string);
                args.requests.push(Request {
                    path,
                    stage,
                    entry_point,
                });
            }
        }
    }

    if args.requests.is_empty() {
        bail!("usage: shader_watch [--config FILE] [--set NAME=VALUE]... FILE:STAGE[:ENTRY]...");
    }
    Ok(args)
}

/// Blocks on stdin until the user decides what to do with a failed shader.
fn prompt_retry(shader: &ShaderDesc, diagnostic: &str) -> ErrorAction {
    eprintln!("\n{shader} failed to compile:\n{diagnostic}");
    eprint!("Fix the file and press Enter to retry, or type `q` to give up: ");
    let _ = io::stderr().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => ErrorAction::Abort,
        Ok(_) if line.trim().eq_ignore_ascii_case("q") => ErrorAction::Abort,
        Ok(_) => ErrorAction::Retry,
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => ShaderConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => ShaderConfig::default(),
    };

    let options = Arc::new(SharedOptions::new());
    for (name, value) in &args.options {
        options.set(name, value)?;
    }

    let toolchain = Arc::new(DxcToolchain::new(&config.compiler)?);
    let registry =
        ShaderRegistry::new(config, toolchain, options.clone())?.with_error_handler(prompt_retry);

    for request in &args.requests {
        let shader = registry.compile_from_file(
            &request.path,
            request.entry_point.as_deref(),
            request.stage,
            &DefinitionSet::new(),
        )?;
        info!("{} ready: {} bytes", shader.desc(), shader.bytecode().len());
    }

    info!(
        "Watching {} source files for {} shaders",
        registry.source_file_count(),
        registry.shader_count()
    );

    // The initial compiles own stdin for prompts; option edits start afterwards.
    let commands = spawn_stdin_reader();
    loop {
        if let Ok(line) = commands.try_recv()
            && !line.trim().is_empty()
        {
            match parse_assignment(&line) {
                Ok((name, value)) => options.set(&name, &value)?,
                Err(err) => error!("{err}"),
            }
        }

        match registry.tick() {
            Ok(true) => {
                for shader in registry.shaders() {
                    let snapshot = shader.snapshot();
                    info!(
                        "{} revision {} ({:032x})",
                        shader.desc(),
                        snapshot.revision,
                        snapshot.bytecode_hash
                    );
                }
            }
            Ok(false) => {}
            Err(err) => {
                registry.shutdown();
                return Err(anyhow::Error::new(err).context("shader hot reload failed"));
            }
        }

        thread::sleep(FRAME);
    }
}
