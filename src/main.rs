mod cli;
mod core;

use clap::{Parser, Subcommand};

use cli::data_cmd::{CostArgs, RangeArgs};

#[derive(Parser)]
#[command(name = "ccost", about = "Cloud cost breakdown and variation CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(long, env = "CCOST_MAIL")]
        mail: String,

        #[arg(long, env = "CCOST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// List linked accounts, optionally selecting the ones to scope queries to
    Accounts {
        /// Comma-separated account ids (empty string clears the selection)
        #[arg(long, value_delimiter = ',')]
        select: Option<Vec<String>>,
    },
    /// Cost breakdown grouped by a dimension
    Costs {
        #[command(flatten)]
        range: RangeArgs,

        /// Grouping dimension (product, region, account, ... or "all")
        #[arg(short, long)]
        dimension: Option<String>,

        /// Bucket size (day|week|month|year)
        #[arg(short, long)]
        granularity: Option<String>,

        /// Show per-category totals as shares of the whole
        #[arg(long)]
        pie: bool,

        /// Show every bucket under each category
        #[arg(short, long)]
        all: bool,
    },
    /// Period-over-period cost variation
    Diff {
        #[command(flatten)]
        range: RangeArgs,

        /// Dimension whose categories are compared
        #[arg(long)]
        by: Option<String>,

        /// Period size (default: month)
        #[arg(short, long)]
        granularity: Option<String>,
    },
    /// S3 bucket analytics
    S3,
    /// Compute instance utilization report
    Resources {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Costs grouped by the values of a tag key
    Tags {
        /// Tag key
        key: String,

        #[command(flatten)]
        range: RangeArgs,
    },
    /// Accounts, cost breakdown and variation at once
    Dashboard {
        #[command(flatten)]
        range: RangeArgs,

        #[arg(short, long)]
        dimension: Option<String>,

        #[arg(short, long)]
        granularity: Option<String>,

        #[arg(long)]
        pie: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    crate::core::logging::init_tracing(cli.verbose);

    let config = crate::core::config::AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: {} (using defaults)", e);
        crate::core::config::AppConfig::default()
    });

    let mut output_opts = cli::output::OutputOptions::resolve(
        cli.format.as_deref(),
        cli.json,
        cli.pretty,
        cli.no_color,
        &config.settings,
    );

    match cli.command {
        Some(Commands::Login { mail, password }) => {
            cli::data_cmd::sign_in(config, &output_opts, mail, password).await?
        }
        Some(Commands::Logout) => cli::data_cmd::sign_out(&output_opts)?,
        Some(Commands::Accounts { select }) => {
            let select = select.map(|ids| ids.into_iter().filter(|id| !id.is_empty()).collect());
            cli::data_cmd::run_accounts(config, &output_opts, select).await?
        }
        Some(Commands::Costs {
            range,
            dimension,
            granularity,
            pie,
            all,
        }) => {
            output_opts.detailed = all;
            let args = CostArgs {
                range,
                dimension,
                granularity,
                pie,
            };
            cli::data_cmd::run_costs(config, &output_opts, args).await?
        }
        Some(Commands::Diff {
            range,
            by,
            granularity,
        }) => cli::data_cmd::run_diff(config, &output_opts, range, by, granularity).await?,
        Some(Commands::S3) => cli::data_cmd::run_s3(config, &output_opts).await?,
        Some(Commands::Resources { range }) => {
            cli::data_cmd::run_resources(config, &output_opts, range).await?
        }
        Some(Commands::Tags { key, range }) => {
            cli::data_cmd::run_tags(config, &output_opts, range, key).await?
        }
        None => {
            let args = CostArgs {
                range: RangeArgs::default(),
                dimension: None,
                granularity: None,
                pie: false,
            };
            cli::data_cmd::run_dashboard(config, &output_opts, args).await?
        }
        Some(Commands::Dashboard {
            range,
            dimension,
            granularity,
            pie,
        }) => {
            let args = CostArgs {
                range,
                dimension,
                granularity,
                pie,
            };
            cli::data_cmd::run_dashboard(config, &output_opts, args).await?
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
        },
    }

    Ok(())
}
