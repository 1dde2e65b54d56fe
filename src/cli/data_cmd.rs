use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::backend::http::HttpBackend;
use crate::core::backend::Backend;
use crate::core::config::AppConfig;
use crate::core::formatter::{default_range, parse_date, Granularity};
use crate::core::sequences::costs::CostQuery;
use crate::core::sequences::differentiator::VariationQuery;
use crate::core::sequences::login::Credentials;
use crate::core::sequences::resources::ResourceReport;
use crate::core::sequences::tags::TagCosts;
use crate::core::sequences::{accounts, costs, differentiator, login, resources, s3, tags, Period};
use crate::core::session::{session_path, SessionFile};
use crate::core::state::{AppState, Applied, Emission, Interval, Payload, SliceStatus};
use crate::core::transform::{pie_from_series, to_bar_series, to_pie_slices, to_total, ALL_DIMENSION};

const ACCOUNTS_KEY: &str = "accounts";
const COSTS_KEY: &str = "costs";
const DIFF_KEY: &str = "differentiator";
const S3_KEY: &str = "s3";
const RESOURCES_KEY: &str = "resources";
const TAGS_KEY: &str = "tags";
const SESSION_KEY: &str = "session";

/// Date range flags shared by most commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub begin: Option<String>,

    /// Last day of the range (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub end: Option<String>,

    /// Range length in days when --begin is not given
    #[arg(long)]
    pub days: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CostArgs {
    pub range: RangeArgs,
    pub dimension: Option<String>,
    pub granularity: Option<String>,
    pub pie: bool,
}

pub struct Runtime<B> {
    config: AppConfig,
    backend: B,
    session_path: PathBuf,
    session: SessionFile,
    state: AppState,
}

/// What a command has to show for one widget after its sequence settled.
enum Widget<'a> {
    Ready(&'a Payload, Option<&'a Interval>),
    Failed(&'a str),
}

impl Runtime<HttpBackend> {
    pub fn new(config: AppConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config.backend.base_url, config.backend.timeout())
            .context("Invalid backend configuration")?;
        Ok(Self::with_backend(config, backend, session_path()))
    }
}

impl<B: Backend> Runtime<B> {
    pub fn with_backend(config: AppConfig, backend: B, session_path: PathBuf) -> Self {
        let session = SessionFile::load_from(&session_path);
        let state = session.clone().into_state();
        Self {
            config,
            backend,
            session_path,
            session,
            state,
        }
    }

    fn save_session(&self) -> Result<()> {
        self.session.save_to(&self.session_path)
    }

    /// Apply a terminal emission to the store. An expired session clears the
    /// persisted login and aborts the command.
    fn settle(&mut self, emission: Emission) -> Result<()> {
        match self.state.apply(emission) {
            Applied::LoggedOut => {
                self.session.clear_login();
                self.save_session()?;
                anyhow::bail!("Session expired. Run `ccost login` to sign in again.");
            }
            Applied::Stale | Applied::Updated => Ok(()),
        }
    }
    fn widget(&self, key: &str) -> Result<Widget<'_>> {
        let slice = self
            .state
            .slice(key)
            .with_context(|| format!("No result for '{}'", key))?;
        match (&slice.status, &slice.payload) {
            (SliceStatus::Failed(message), _) => Ok(Widget::Failed(message)),
            (SliceStatus::Ready, Some(payload)) => Ok(Widget::Ready(payload, slice.interval.as_ref())),
            _ => anyhow::bail!("'{}' did not finish loading", key),
        }
    }

    fn period(&self, range: &RangeArgs) -> Result<Period> {
        let days = range.days.unwrap_or(self.config.defaults.days);
        let (default_begin, default_end) = default_range(Local::now().date_naive(), days)?;
        let begin = match &range.begin {
            Some(b) => parse_date(b)?,
            None => default_begin,
        };
        let end = match &range.end {
            Some(e) => parse_date(e)?,
            None => default_end,
        };
        if begin > end {
            anyhow::bail!("Begin date {} is after end date {}", begin, end);
        }
        Ok(Period { begin, end })
    }

    fn granularity(&self, flag: Option<&str>) -> Result<Granularity> {
        let id = flag.unwrap_or(self.config.defaults.granularity.as_str());
        Granularity::from_id(id)
            .with_context(|| format!("Unknown granularity '{}' (expected day|week|month|year)", id))
    }

    fn cost_query(&self, args: &CostArgs) -> Result<(CostQuery, String)> {
        let dimension = args
            .dimension
            .clone()
            .unwrap_or_else(|| self.config.defaults.dimension.clone());
        let dimensions = if dimension == ALL_DIMENSION {
            Vec::new()
        } else {
            vec![dimension.clone()]
        };
        let query = CostQuery {
            period: self.period(&args.range)?,
            granularity: self.granularity(args.granularity.as_deref())?,
            dimensions,
        };
        Ok((query, dimension))
    }
}

fn print_failure(opts: &OutputOptions, key: &str, title: &str, message: &str) -> Result<()> {
    match opts.format {
        OutputFormat::Text => println!("{}", renderer::render_warning(title, message, opts.use_color)),
        OutputFormat::Json => opts.print_json(&json!({ "widget": key, "error": message }))?,
    }
    Ok(())
}

fn show_costs<B: Backend>(rt: &Runtime<B>, opts: &OutputOptions, dimension: &str, pie: bool) -> Result<()> {
    let title = format!("Costs by {}", dimension);
    let (tree, interval) = match rt.widget(COSTS_KEY)? {
        Widget::Failed(message) => return print_failure(opts, COSTS_KEY, &title, message),
        Widget::Ready(Payload::Costs(tree), interval) => (tree, interval),
        Widget::Ready(..) => anyhow::bail!("Unexpected payload for costs"),
    };
    let granularity = interval.map(|i| i.granularity).unwrap_or(Granularity::Day);
    let shaped = to_bar_series(tree, dimension, granularity);

    match opts.format {
        OutputFormat::Text => {
            let text = match shaped.reason() {
                Some(reason) => renderer::render_empty(&title, reason, opts.use_color),
                None if pie => renderer::render_pie(&title, &pie_from_series(shaped.items()), opts.use_color),
                None => renderer::render_series(&title, shaped.items(), interval, opts.detailed, opts.use_color),
            };
            println!("{}", text);
        }
        OutputFormat::Json => {
            let empty = shaped.reason().map(|r| r.to_string());
            let series = shaped.into_items();
            let slices = pie_from_series(&series);
            opts.print_json(&json!({
                "widget": COSTS_KEY,
                "dimension": dimension,
                "interval": interval,
                "series": series,
                "pie": slices,
                "total": to_total(&slices),
                "empty": empty,
            }))?;
        }
    }
    Ok(())
}

fn show_differentiator<B: Backend>(rt: &Runtime<B>, opts: &OutputOptions) -> Result<()> {
    let title = "Cost variation";
    match rt.widget(DIFF_KEY)? {
        Widget::Failed(message) => print_failure(opts, DIFF_KEY, title, message),
        Widget::Ready(Payload::Differentiator(table), interval) => {
            match opts.format {
                OutputFormat::Text => println!(
                    "{}",
                    renderer::render_differentiator(table, interval, opts.use_color)
                ),
                OutputFormat::Json => opts.print_json(&json!({
                    "widget": DIFF_KEY,
                    "interval": interval,
                    "table": table,
                }))?,
            }
            Ok(())
        }
        Widget::Ready(..) => anyhow::bail!("Unexpected payload for differentiator"),
    }
}

fn show_accounts<B: Backend>(rt: &Runtime<B>, opts: &OutputOptions) -> Result<()> {
    match rt.widget(ACCOUNTS_KEY)? {
        Widget::Failed(message) => print_failure(opts, ACCOUNTS_KEY, "Accounts", message),
        Widget::Ready(Payload::Accounts(accounts), _) => {
            match opts.format {
                OutputFormat::Text => println!(
                    "{}",
                    renderer::render_accounts(accounts, &rt.state.selected_accounts, opts.use_color)
                ),
                OutputFormat::Json => opts.print_json(&json!({
                    "widget": ACCOUNTS_KEY,
                    "accounts": accounts,
                    "selected": rt.state.selected_accounts,
                }))?,
            }
            Ok(())
        }
        Widget::Ready(..) => anyhow::bail!("Unexpected payload for accounts"),
    }
}

pub async fn run_accounts(config: AppConfig, opts: &OutputOptions, select: Option<Vec<String>>) -> Result<()> {
    list_accounts(&mut Runtime::new(config)?, opts, select).await
}

async fn list_accounts<B: Backend>(
    rt: &mut Runtime<B>,
    opts: &OutputOptions,
    select: Option<Vec<String>>,
) -> Result<()> {
    let ctx = rt.state.begin(ACCOUNTS_KEY);
    let emission = accounts::run(&rt.backend, ctx).await;
    rt.settle(emission)?;

    if let Some(selection) = select {
        if let Ok(Widget::Ready(Payload::Accounts(known), _)) = rt.widget(ACCOUNTS_KEY) {
            for id in &selection {
                if !known.iter().any(|a| &a.id == id) {
                    eprintln!("Warning: unknown account '{}'", id);
                }
            }
        }
        rt.session.selected_accounts = selection.clone();
        rt.save_session()?;
        rt.state.selected_accounts = selection;
    }
    show_accounts(rt, opts)
}

pub async fn run_costs(config: AppConfig, opts: &OutputOptions, args: CostArgs) -> Result<()> {
    cost_breakdown(&mut Runtime::new(config)?, opts, args).await
}

async fn cost_breakdown<B: Backend>(rt: &mut Runtime<B>, opts: &OutputOptions, args: CostArgs) -> Result<()> {
    let (query, dimension) = rt.cost_query(&args)?;
    let ctx = rt.state.begin(COSTS_KEY);
    let emission = costs::run(&rt.backend, ctx, query).await;
    rt.settle(emission)?;
    show_costs(rt, opts, &dimension, args.pie)
}

pub async fn run_diff(
    config: AppConfig,
    opts: &OutputOptions,
    range: RangeArgs,
    by: Option<String>,
    granularity: Option<String>,
) -> Result<()> {
    let mut rt = Runtime::new(config)?;
    let query = VariationQuery {
        period: rt.period(&range)?,
        granularity: rt.granularity(Some(granularity.as_deref().unwrap_or("month")))?,
        by: by.unwrap_or_else(|| rt.config.defaults.dimension.clone()),
    };
    let ctx = rt.state.begin(DIFF_KEY);
    let emission = differentiator::run(&rt.backend, ctx, query).await;
    rt.settle(emission)?;
    show_differentiator(&rt, opts)
}

pub async fn run_s3(config: AppConfig, opts: &OutputOptions) -> Result<()> {
    let mut rt = Runtime::new(config)?;
    let ctx = rt.state.begin(S3_KEY);
    let emission = s3::run(&rt.backend, ctx).await;
    rt.settle(emission)?;

    match rt.widget(S3_KEY)? {
        Widget::Failed(message) => print_failure(opts, S3_KEY, "S3 buckets", message),
        Widget::Ready(Payload::Buckets(buckets), _) => {
            match opts.format {
                OutputFormat::Text => println!("{}", renderer::render_buckets(buckets, opts.use_color)),
                OutputFormat::Json => opts.print_json(&json!({ "widget": S3_KEY, "buckets": buckets }))?,
            }
            Ok(())
        }
        Widget::Ready(..) => anyhow::bail!("Unexpected payload for s3"),
    }
}

pub async fn run_resources(config: AppConfig, opts: &OutputOptions, range: RangeArgs) -> Result<()> {
    let mut rt = Runtime::new(config)?;
    let report = ResourceReport {
        period: rt.period(&range)?,
    };
    let ctx = rt.state.begin(RESOURCES_KEY);
    let emission = resources::run(&rt.backend, ctx, report).await;
    rt.settle(emission)?;

    match rt.widget(RESOURCES_KEY)? {
        Widget::Failed(message) => print_failure(opts, RESOURCES_KEY, "Instances", message),
        Widget::Ready(Payload::Instances(instances), interval) => {
            match opts.format {
                OutputFormat::Text => println!(
                    "{}",
                    renderer::render_instances(instances, interval, opts.use_color)
                ),
                OutputFormat::Json => opts.print_json(&json!({
                    "widget": RESOURCES_KEY,
                    "instances": instances,
                }))?,
            }
            Ok(())
        }
        Widget::Ready(..) => anyhow::bail!("Unexpected payload for resources"),
    }
}

pub async fn run_tags(config: AppConfig, opts: &OutputOptions, range: RangeArgs, key: String) -> Result<()> {
    let mut rt = Runtime::new(config)?;
    let request = TagCosts {
        period: rt.period(&range)?,
        key: key.clone(),
    };
    let ctx = rt.state.begin(TAGS_KEY);
    let emission = tags::run(&rt.backend, ctx, request).await;
    rt.settle(emission)?;

    let title = format!("Costs by tag '{}'", key);
    match rt.widget(TAGS_KEY)? {
        Widget::Failed(message) => print_failure(opts, TAGS_KEY, &title, message),
        Widget::Ready(Payload::Costs(tree), _) => {
            let shaped = to_pie_slices(tree, &key);
            match opts.format {
                OutputFormat::Text => {
                    let text = match shaped.reason() {
                        Some(reason) => renderer::render_empty(&title, reason, opts.use_color),
                        None => renderer::render_pie(&title, shaped.items(), opts.use_color),
                    };
                    println!("{}", text);
                }
                OutputFormat::Json => {
                    let slices = shaped.into_items();
                    opts.print_json(&json!({
                        "widget": TAGS_KEY,
                        "key": key,
                        "pie": slices,
                        "total": to_total(&slices),
                    }))?;
                }
            }
            Ok(())
        }
        Widget::Ready(..) => anyhow::bail!("Unexpected payload for tags"),
    }
}

/// Accounts, cost breakdown and variation fetched concurrently.
pub async fn run_dashboard(config: AppConfig, opts: &OutputOptions, args: CostArgs) -> Result<()> {
    dashboard(&mut Runtime::new(config)?, opts, args).await
}

async fn dashboard<B: Backend>(rt: &mut Runtime<B>, opts: &OutputOptions, args: CostArgs) -> Result<()> {
    let (query, dimension) = rt.cost_query(&args)?;
    let variation = VariationQuery {
        period: query.period,
        granularity: Granularity::Month,
        by: if dimension == ALL_DIMENSION {
            rt.config.defaults.dimension.clone()
        } else {
            dimension.clone()
        },
    };

    let accounts_ctx = rt.state.begin(ACCOUNTS_KEY);
    let costs_ctx = rt.state.begin(COSTS_KEY);
    let diff_ctx = rt.state.begin(DIFF_KEY);

    let (accounts_done, costs_done, diff_done) = tokio::join!(
        accounts::run(&rt.backend, accounts_ctx),
        costs::run(&rt.backend, costs_ctx, query),
        differentiator::run(&rt.backend, diff_ctx, variation),
    );
    for emission in [accounts_done, costs_done, diff_done] {
        rt.settle(emission)?;
    }

    show_accounts(rt, opts)?;
    if opts.format == OutputFormat::Text {
        println!();
    }
    show_costs(rt, opts, &dimension, args.pie)?;
    if opts.format == OutputFormat::Text {
        println!();
    }
    show_differentiator(rt, opts)
}

pub async fn sign_in(config: AppConfig, opts: &OutputOptions, mail: String, password: String) -> Result<()> {
    login_with(&mut Runtime::new(config)?, opts, Credentials { mail, password }).await
}

async fn login_with<B: Backend>(
    rt: &mut Runtime<B>,
    opts: &OutputOptions,
    credentials: Credentials,
) -> Result<()> {
    let ctx = rt.state.begin(SESSION_KEY);
    let emission = login::run(&rt.backend, ctx, credentials).await;
    match &emission {
        Emission::Failed { message, .. } => anyhow::bail!("Login failed: {}", message),
        Emission::Logout => anyhow::bail!("Login failed: credentials were rejected"),
        Emission::Success { .. } => {}
    }
    rt.settle(emission)?;
    rt.session.sync_from(&rt.state);
    rt.save_session()?;

    let mail = rt.state.session.mail.clone().unwrap_or_default();
    match opts.format {
        OutputFormat::Text => println!("Logged in as {}", mail),
        OutputFormat::Json => opts.print_json(&json!({ "logged_in": true, "mail": mail }))?,
    }
    Ok(())
}

pub fn sign_out(opts: &OutputOptions) -> Result<()> {
    let mut session = SessionFile::load();
    session.clear_login();
    session.save()?;
    match opts.format {
        OutputFormat::Text => println!("Logged out"),
        OutputFormat::Json => opts.print_json(&json!({ "logged_in": false }))?,
    }
    Ok(())
}
