use crate::bundle::ApiBundle;
use crate::config::{self, CliConfig};
use crate::history_file::JsonlHistory;
use crate::output::{self, Style};
use crate::{Cli, Command, ConfigCommand, CurlCommand, TestArgs};
use anyhow::Context as _;
use apidesk_registry::executor::TestExecutor;
use apidesk_registry::harness::TestHarness;
use apidesk_registry::history::{HistoryRecorder, InMemoryHistory};
use apidesk_registry::model::{ApiDefinition, EndpointDefinition, RequestOverride, ResolvedRequest};
use apidesk_registry::safety::{ExecutionLimits, RedirectPolicy};
use apidesk_registry::{curl, export, import, mcp};
use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use std::io::{IsTerminal as _, Read as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let style = Style {
        color: !cli.no_color && std::io::stdout().is_terminal(),
    };
    let config_path = match cli.config {
        Some(p) => p,
        None => config::default_config_path()?,
    };

    match cli.command {
        Command::Curl(CurlCommand::Parse {
            input,
            definitions,
            api_name,
        }) => {
            let text = read_input(input.as_deref())?;
            let request = curl::parse(&text).context("parse cURL command")?;
            if definitions {
                let (api, endpoint) = curl::to_definitions(&request, &api_name)?;
                print_json(&ApiBundle {
                    api,
                    endpoints: vec![endpoint],
                })?;
            } else {
                print_json(&request)?;
            }
        }
        Command::Curl(CurlCommand::Render { input }) => {
            let text = read_input(input.as_deref())?;
            let request: ResolvedRequest =
                serde_json::from_str(&text).context("parse request JSON")?;
            println!("{}", curl::to_curl(&request));
        }
        Command::Import { input, out } => {
            let text = read_input(Some(&input))?;
            let imported = import::parse(&text).context("import")?;
            let (api, endpoints) = imported.into_definitions();
            info!(api = %api.id, endpoints = endpoints.len(), "imported API definition");
            write_json(out.as_deref(), &ApiBundle { api, endpoints })?;
        }
        Command::Export { bundles, out } => {
            let apis = bundles
                .iter()
                .map(|p| ApiBundle::load(p).map(|b| b.api))
                .collect::<anyhow::Result<Vec<_>>>()?;
            write_json(out.as_deref(), &export::export_registry(&apis, Utc::now()))?;
        }
        Command::Test(args) => {
            let cfg = config::load_config(&config_path)?;
            return run_test(&cfg, &args, style).await;
        }
        Command::History {
            api_id,
            limit,
            json,
        } => {
            let cfg = config::load_config(&config_path)?;
            let history = JsonlHistory::open(history_path(&cfg, None)?)?;
            let mut entries = history.entries_by_api(&api_id).await?;
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            if json {
                print_json(&entries)?;
            } else {
                print!("{}", output::render_history(&entries, style));
            }
        }
        Command::Tools { bundle } => {
            let bundle = ApiBundle::load(&bundle)?;
            if !bundle.api.is_mcp_server {
                debug!(api = %bundle.api.id, "API is not flagged as an MCP server");
            }
            print_json(&mcp::tool_catalog(&bundle.api, &bundle.endpoints)?)?;
        }
        Command::Config(ConfigCommand::Show) => {
            let cfg = config::load_config(&config_path)?;
            eprintln!("# {}", config_path.display());
            print_json(&cfg)?;
        }
        Command::Config(ConfigCommand::Set { key, value }) => {
            let mut cfg = config::load_config(&config_path)?;
            cfg.set(&key, &value)?;
            config::save_config(&config_path, &cfg)?;
            print_json(&cfg)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Exit status is failure only when no HTTP response was received.
async fn run_test(cfg: &CliConfig, args: &TestArgs, style: Style) -> anyhow::Result<ExitCode> {
    let settings = ExecutionSettings::resolve(cfg, args)?;
    let (api, endpoint, base) = test_target(args)?;
    let overrides = build_override(args, base)?;

    let recorder: Arc<dyn HistoryRecorder> = match &settings.history_path {
        Some(path) => Arc::new(JsonlHistory::open(path.clone())?),
        None => Arc::new(InMemoryHistory::new()),
    };
    let executor = TestExecutor::with_limits(settings.limits.clone())?;
    let harness = TestHarness::new(executor, recorder).with_timeout(settings.timeout);

    let (request, result) = harness
        .run(&api, endpoint.as_ref(), &overrides)
        .await
        .context("resolve request")?;

    if let Some(path) = &args.report {
        let report = export::test_report(&api, &request, &result, Utc::now());
        write_json(Some(path), &report)?;
    }

    if args.json {
        print_json(&result)?;
    } else {
        print!("{}", output::render_result(&result, style));
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

type TestTarget = (ApiDefinition, Option<EndpointDefinition>, RequestOverride);

/// An ad-hoc `--curl` command runs as written: it becomes the base override of a bare API.
fn test_target(args: &TestArgs) -> anyhow::Result<TestTarget> {
    if let Some(text) = &args.curl {
        let request = curl::parse(text).context("parse --curl")?;
        let (api, overrides) = curl::to_ad_hoc(&request, "ad-hoc")?;
        return Ok((api, None, overrides));
    }
    let path = args
        .bundle
        .as_deref()
        .context("either --bundle or --curl is required")?;
    let bundle = ApiBundle::load(path)?;
    let endpoint = match &args.endpoint {
        Some(key) => Some(bundle.endpoint(key)?.clone()),
        None => None,
    };
    Ok((bundle.api, endpoint, RequestOverride::default()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExecutionSettings {
    timeout: Duration,
    limits: ExecutionLimits,
    /// `None` records in memory only.
    history_path: Option<PathBuf>,
}

impl ExecutionSettings {
    /// Flags win over the config file, which wins over built-in defaults.
    fn resolve(cfg: &CliConfig, args: &TestArgs) -> anyhow::Result<Self> {
        let timeout_ms = args.timeout_ms.unwrap_or_else(|| cfg.timeout_ms());

        let mut limits = ExecutionLimits::default();
        if let Some(max) = args.max_response_bytes.or(cfg.max_response_bytes) {
            limits.max_response_bytes = (max > 0).then_some(max);
        }
        let follow = !args.no_follow_redirects && cfg.follow_redirects.unwrap_or(true);
        limits.redirects = if follow {
            RedirectPolicy::Follow
        } else {
            RedirectPolicy::None
        };

        let history_path = if args.no_history {
            None
        } else {
            Some(history_path(cfg, args.history_path.as_deref())?)
        };

        Ok(Self {
            timeout: Duration::from_millis(timeout_ms),
            limits,
            history_path,
        })
    }
}

fn history_path(cfg: &CliConfig, flag: Option<&Path>) -> anyhow::Result<PathBuf> {
    match flag.map(Path::to_path_buf).or_else(|| cfg.history_path.clone()) {
        Some(p) => Ok(p),
        None => config::default_history_path(),
    }
}

/// Override flags layered over `base`.
fn build_override(args: &TestArgs, base: RequestOverride) -> anyhow::Result<RequestOverride> {
    let mut overrides = base;
    if let Some(url) = &args.url {
        overrides = overrides.with_url(url);
    }
    if let Some(m) = &args.method {
        let method = Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid method '{m}'"))?;
        overrides = overrides.with_method(method);
    }
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .filter(|(n, _)| !n.trim().is_empty())
            .with_context(|| format!("header must look like 'Name: value', got '{raw}'"))?;
        overrides = overrides.with_header(name.trim(), value.trim());
    }
    if let Some(body) = &args.body {
        overrides = overrides.with_body(body);
    }
    Ok(overrides)
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))
        }
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("read stdin")?;
            Ok(text)
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize output")?
    );
    Ok(())
}

fn write_json(out: Option<&Path>, value: &impl Serialize) -> anyhow::Result<()> {
    let Some(path) = out else {
        return print_json(value);
    };
    let bytes = serde_json::to_vec_pretty(value).context("serialize output")?;
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
