use clap::Parser;

use parcel_scan::cli::{
    self, Args, CaptureOptions, Command, CommandError, ConfigAction, PincodeAction,
};
use parcel_scan::config::Config;

fn load_env() {
    // Load .env file, don't override existing env vars
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_module("parcel_scan", log::LevelFilter::Debug);
    }
    builder.init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file before anything else
    load_env();

    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CommandError> {
    // `config init` must work before any config file exists
    if let Command::Config {
        action: ConfigAction::Init,
    } = args.command
    {
        return cli::handle_config_action(
            ConfigAction::Init,
            &Config::default(),
            args.config.as_deref(),
        );
    }

    let config = cli::load_config(&args)?;

    match args.command {
        Command::ListCameras { simulated } => cli::list_cameras(simulated),
        Command::Capture {
            batch,
            device,
            simulated,
            quality,
            mirror,
        } => {
            cli::setup_ctrlc_handler()?;
            let options = CaptureOptions {
                batch,
                device,
                simulated,
                quality,
                mirror,
            };
            cli::capture(&config, options).await
        }
        Command::Dashboard { watch, interval } => {
            if watch {
                cli::setup_ctrlc_handler()?;
            }
            cli::dashboard(&config, watch, interval).await
        }
        Command::Status { id, status } => cli::update_status(&config, id, status).await,
        Command::Pincodes {
            action: Some(PincodeAction::Search { query }),
            ..
        } => cli::search_pincodes(&config, &query).await,
        Command::Pincodes {
            action: None,
            page,
            per_page,
        } => cli::list_pincodes(&config, page, per_page).await,
        Command::Config { action } => {
            cli::handle_config_action(action, &config, args.config.as_deref())
        }
    }
}
