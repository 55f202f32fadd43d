pub mod report;
pub mod watch;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{level_filters::LevelFilter, warn};
use watch::{process_watch_command, WatchCommand};

use crate::{
    categorizer::{Categorizer, RuleCategorizer},
    config::TrackerConfig,
    tracker::{sampler::WindowSampler, ActivityTracker},
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
    window_api::{ActiveWindowData, GenericWindowManager},
};

#[derive(Parser, Debug)]
#[command(name = "Screenlog", version, long_about = None)]
#[command(about = "Passive screen-time tracker", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Print logs to the console")]
    log: bool,
    #[arg(long = "log-filter", help = "Log level, defaults to $RUST_LOG or info")]
    log_filter: Option<LevelFilter>,
    #[arg(
        long,
        global = true,
        help = "Config file. By default <app dir>/config.json is used when it exists"
    )]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Track the foreground window until Ctrl-C and print today's usage")]
    Watch {
        #[command(flatten)]
        command: WatchCommand,
    },
    #[command(about = "Show how a window would be categorized")]
    Categorize {
        #[arg(long, help = "Process name, e.g. chrome")]
        process: String,
        #[arg(long, default_value = "", help = "Window title")]
        title: String,
    },
    #[command(about = "Sample the foreground window once")]
    Sample {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = create_application_default_path()
        .inspect_err(|e| eprintln!("No application directory, logging disabled: {e:?}"))
        .ok();

    if let Some(dir) = &app_dir {
        let level = if args.log && args.log_filter.is_none() {
            Some(LevelFilter::TRACE)
        } else {
            args.log_filter
        };
        enable_logging(CLI_PREFIX, &dir.join("logs"), level, args.log)?;
    }

    let config = TrackerConfig::load(args.config.as_deref(), app_dir.as_deref())?;

    match args.commands {
        Commands::Watch { command } => {
            let tracker = ActivityTracker::from_config(
                GenericWindowManager::new()?,
                Arc::new(DefaultClock),
                &config,
            );
            process_watch_command(command, tracker).await
        }
        Commands::Categorize { process, title } => {
            print_categorization(&RuleCategorizer::new(config.rules), &process, &title);
            Ok(())
        }
        Commands::Sample {} => {
            let mut sampler = WindowSampler::new(Box::new(GenericWindowManager::new()?));
            let window = sampler.sample();
            if window == ActiveWindowData::unknown() {
                warn!("Foreground window could not be read");
            }
            print_categorization(
                &RuleCategorizer::new(config.rules),
                &window.process_name,
                &window.window_title,
            );
            println!("pid\t{}", window.process_id);
            Ok(())
        }
    }
}

fn print_categorization(categorizer: &dyn Categorizer, process: &str, title: &str) {
    println!("process\t{process}");
    println!("title\t{title}");
    println!("app\t{}", categorizer.display_name(process));
    println!("category\t{}", categorizer.categorize_app(process, title));
    if categorizer.is_browser(process) {
        let website = categorizer.extract_website(title);
        println!("website\t{website}");
        println!("website category\t{}", categorizer.categorize_website(&website));
    }
}
