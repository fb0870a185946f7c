use std::sync::Arc;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    author,
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = VERSION.as_str(),
)]
struct Args {
    /// Address and port for the REST API server
    #[arg(long, value_name = "IP:PORT", default_value = "0.0.0.0:9150", env = "KHA_REST_SERVER")]
    rest_server: String,

    /// Settings file name, or an absolute path to it
    #[arg(long, value_name = "FILE", env = "KHA_SETTINGS_FILE")]
    settings_file: Option<String>,

    /// Delete the current settings file and start from the default configuration
    #[arg(long)]
    reset: bool,

    /// Turn all log categories up to Debug on the console
    #[arg(short, long)]
    verbose: bool,

    /// Turn all log categories up to Trace in the log file
    #[arg(long)]
    enable_tracing_level_log_file: bool,

    /// Directory for the rolling log files
    #[arg(long, value_name = "PATH", env = "KHA_LOG_PATH")]
    log_path: Option<String>,
}

#[derive(Debug)]
struct Manager {
    args: Args,
}

lazy_static! {
    static ref MANAGER: Arc<Manager> = Arc::new(Manager {
        args: Args::parse(),
    });
    static ref VERSION: String = format!(
        "{}-{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_SHA_SHORT"),
        env!("VERGEN_BUILD_DATE")
    );
}

// Construct our manager, should be done inside main
pub fn init() {
    MANAGER.as_ref();
}

pub fn is_verbose() -> bool {
    MANAGER.args.verbose
}

pub fn is_tracing() -> bool {
    MANAGER.args.enable_tracing_level_log_file
}

pub fn is_reset() -> bool {
    MANAGER.args.reset
}

// Return the desired address for the REST API
pub fn server_address() -> &'static str {
    &MANAGER.args.rest_server
}

pub fn settings_file() -> Option<&'static str> {
    MANAGER.args.settings_file.as_deref()
}

pub fn log_path() -> String {
    let default_path = match directories::ProjectDirs::from("dev", "kiosk", env!("CARGO_PKG_NAME"))
    {
        Some(project) => project.data_dir().join("logs").to_string_lossy().to_string(),
        None => "./logs".to_string(),
    };

    MANAGER
        .args
        .log_path
        .as_ref()
        .map(|path| shellexpand::full(path).map(|v| v.to_string()).unwrap_or_else(|_| path.clone()))
        .unwrap_or(default_path)
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}

// Return the parsed command line arguments
pub fn command_line() -> String {
    format!("{:?}", MANAGER.args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_version_string() {
        assert!(VERSION.starts_with(env!("CARGO_PKG_VERSION")));
    }
}
