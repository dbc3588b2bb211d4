use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use convostats::analysis::ConversationAnalysis;
use convostats::config::{self, Config};
use convostats::pricing::PricingTable;
use convostats::usage::{CostReport, MonthlyUsage};
use convostats::utils::{self, NumberFormatOptions, format_cost, format_number};
use convostats::{archive, logging, prompts};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "convostats")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// IANA time zone for calendar bucketing (defaults to config, then the system zone)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use comma-separated number formatting
    #[arg(long, global = true)]
    number_comma: bool,

    /// Use human-readable number formatting (k, m, b, t)
    #[arg(short = 'H', long, global = true)]
    number_human: bool,

    /// Locale for number formatting (en, de, fr, es, it, ja, ko, sv, zh)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Number of decimal places for human-readable formatting
    #[arg(long, global = true)]
    decimal_places: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a readable overview of one or more export archives
    Summary(ArchiveArgs),
    /// Output every statistic as JSON
    Stats(JsonArchiveArgs),
    /// Output estimated monthly token usage and cost as JSON
    Tokens(JsonArchiveArgs),
    /// Rank recurring phrases in a prompt collection
    Prompts(PromptsArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct ArchiveArgs {
    /// Export files (conversations.json)
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct JsonArchiveArgs {
    /// Export files (conversations.json)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Pretty-print JSON instead of a single line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct PromptsArgs {
    /// Prompt file: JSON or one prompt per line
    file: PathBuf,

    /// Smallest phrase length in words
    #[arg(long, value_parser = ngram_order_parser())]
    min_n: Option<usize>,

    /// Largest phrase length in words (at most 10)
    #[arg(long, value_parser = ngram_order_parser())]
    max_n: Option<usize>,

    /// Minimum occurrences for a phrase to be reported
    #[arg(long)]
    min_count: Option<u64>,

    /// Maximum phrases per ranking
    #[arg(long)]
    limit: Option<usize>,

    /// Ignore phrases made only of stop words
    #[arg(long, default_value_t = false)]
    remove_stopwords: bool,

    /// Pretty-print JSON instead of a single line
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (timezone, min-n, max-n, min-count, limit, remove-stopwords,
        /// stopword-language, extra-stopwords, number-comma, number-human, locale,
        /// decimal-places, log-level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn ngram_order_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..=prompts::MAX_NGRAM as u64)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenReport {
    usage: MonthlyUsage,
    costs: CostReport,
}

/// Config formatting defaults with CLI overrides applied on top.
fn format_options(cli: &Cli, config: &Config) -> NumberFormatOptions {
    let mut options = config.formatting.number_format();
    options.use_comma |= cli.number_comma;
    options.use_human |= cli.number_human;
    if let Some(locale) = &cli.locale {
        options.locale = locale.clone();
    }
    if let Some(decimal_places) = cli.decimal_places {
        options.decimal_places = decimal_places;
    }
    options
}

fn main() {
    let cli = Cli::parse();

    // Load config file to get defaults
    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Warning: ignoring config file: {e:#}");
            Config::default()
        }
    };

    logging::init(cli.verbose, &config.logging.level);

    let format_options = format_options(&cli, &config);
    let timezone = cli.timezone.as_deref().or(config.timezone());
    let tz = utils::resolve_timezone(timezone);

    match cli.command {
        Commands::Summary(args) => {
            if let Err(e) = run_summary(args, tz, &config, &format_options) {
                eprintln!("Error generating summary: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Stats(args) => {
            if let Err(e) = run_stats(args, tz) {
                eprintln!("Error generating JSON stats: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Tokens(args) => {
            if let Err(e) = run_tokens(args, tz, &config.pricing.table()) {
                eprintln!("Error generating token report: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Prompts(args) => {
            if let Err(e) = run_prompts(args, &config) {
                eprintln!("Error analyzing prompts: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Config(config_args) => handle_config_subcommand(config_args),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        simd_json::to_string_pretty(value)?
    } else {
        simd_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn load_analysis(files: &[PathBuf], tz: chrono_tz::Tz) -> Result<ConversationAnalysis> {
    let records = archive::load_archives(files)?;
    tracing::info!(
        files = files.len(),
        conversations = records.len(),
        %tz,
        "Loaded archives"
    );
    Ok(ConversationAnalysis::new(records, tz))
}

fn run_summary(
    args: ArchiveArgs,
    tz: chrono_tz::Tz,
    config: &Config,
    format_options: &NumberFormatOptions,
) -> Result<()> {
    let analysis = load_analysis(&args.files, tz)?;
    let fmt = |n: u64| format_number(n, format_options);

    let roles = analysis.role_based_message_count();
    let chatty = analysis.most_chatty_day();
    let shifts = analysis.shift_wise_message_count().shifts;
    let time_spent = analysis.time_spent();
    let used = analysis.first_and_last_used();
    let tokens = analysis
        .monthly_model_token_usage()
        .totals(&config.pricing.table());

    println!("📊 Conversation archive summary ({tz})");
    println!(
        "   Conversations: {} ({} with GPTs, {} archived)",
        fmt(analysis.total_conversations()),
        fmt(analysis.total_gpts_conversations()),
        fmt(analysis.total_archived_conversations())
    );
    println!(
        "   Messages: {} ({} with GPTs, {} voice)",
        fmt(analysis.total_messages()),
        fmt(analysis.total_gpts_messages()),
        fmt(analysis.total_voice_messages())
    );
    for (role, count) in &roles {
        println!("     {role}: {}", fmt(*count));
    }
    println!(
        "   Active: {} to {}",
        used.first_used.with_timezone(&tz).format("%Y-%m-%d"),
        used.last_used.with_timezone(&tz).format("%Y-%m-%d")
    );
    match chatty.date {
        Some(date) => println!(
            "   Most chatty day: {} ({} messages)",
            utils::format_date_for_display(&date.to_string()),
            fmt(chatty.count)
        ),
        None => println!("   Most chatty day: Unknown"),
    }
    println!(
        "   Average messages per active day: {:.2}",
        analysis.average_daily_message_count()
    );
    println!(
        "   Shifts: morning {}, afternoon {}, evening {}, night {}",
        fmt(shifts.morning),
        fmt(shifts.afternoon),
        fmt(shifts.evening),
        fmt(shifts.night)
    );
    println!("   Time spent: {:.2} hours", time_spent.hours);
    println!(
        "   Images generated: {}",
        fmt(analysis.total_images_generated())
    );
    if let Some(longest) = analysis.longest_conversation() {
        println!(
            "   Longest conversation: \"{}\" ({} messages)",
            longest.title,
            fmt(longest.message_count)
        );
    }
    println!(
        "   Estimated tokens: {} user, {} assistant",
        fmt(tokens.user_tokens),
        fmt(tokens.assistant_tokens)
    );
    println!(
        "   Estimated API cost: {} (input {}, output {})",
        format_cost(tokens.total_cost),
        format_cost(tokens.input_cost),
        format_cost(tokens.output_cost)
    );

    Ok(())
}

fn run_stats(args: JsonArchiveArgs, tz: chrono_tz::Tz) -> Result<()> {
    let analysis = load_analysis(&args.files, tz)?;
    print_json(&analysis.summary(), args.pretty)
}

fn run_tokens(args: JsonArchiveArgs, tz: chrono_tz::Tz, pricing: &PricingTable) -> Result<()> {
    let analysis = load_analysis(&args.files, tz)?;
    let usage = analysis.monthly_model_token_usage();
    let costs = usage.costs(pricing);
    print_json(&TokenReport { usage, costs }, args.pretty)
}

fn run_prompts(args: PromptsArgs, config: &Config) -> Result<()> {
    let input = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read prompts from {}", args.file.display()))?;
    let corpus = prompts::parse_prompts(&input);

    let mut options = config.prompts.analyze_options();
    if let Some(min_n) = args.min_n {
        options.min_n = min_n;
    }
    if let Some(max_n) = args.max_n {
        options.max_n = max_n;
    }
    if let Some(min_count) = args.min_count {
        options.min_count = min_count;
    }
    if let Some(limit) = args.limit {
        options.limit = limit;
    }
    options.remove_stopwords |= args.remove_stopwords;
    config::check_ngram_range(options.min_n, options.max_n)?;

    let result = prompts::analyze(&corpus, &options);
    print_json(&result, args.pretty)
}

fn handle_config_subcommand(config_args: ConfigArgs) {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            if let Err(e) = config::create_default_config(overwrite) {
                eprintln!("Error creating config: {e:#}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Show => {
            if let Err(e) = config::show_config() {
                eprintln!("Error showing config: {e:#}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Set { key, value } => {
            if let Err(e) = config::set_config_value(&key, &value) {
                eprintln!("Error setting config: {e:#}");
                std::process::exit(1);
            }
        }
    }
}
