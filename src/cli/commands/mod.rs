use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        PossibleValuesParser, ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pordisto")
        .about("Account gatekeeper: per-request trust scoring and three-factor credential verification")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("5000")
                .env("PORDISTO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .default_value("sqlite://database.sqlite?mode=rwc")
                .env("PORDISTO_DSN"),
        )
        .arg(
            Arg::new("env")
                .long("env")
                .help("Deployment environment, prod enables __Host- cookies")
                .default_value("prod")
                .env("PORDISTO_ENV")
                .value_parser(PossibleValuesParser::new(["dev", "prod"])),
        )
        .arg(
            Arg::new("key-file")
                .long("key-file")
                .help("Path to the 64-byte session signing key, created on first boot")
                .default_value("resources/key.bin")
                .env("PORDISTO_KEY_FILE"),
        )
        .arg(
            Arg::new("frontend-dir")
                .long("frontend-dir")
                .help("Directory with the compiled frontend, served as a fallback")
                .default_value("build")
                .env("PORDISTO_FRONTEND_DIR"),
        )
        .arg(
            Arg::new("frontend-dev-url")
                .long("frontend-dev-url")
                .help("Frontend dev server, proxied to when running with --env dev")
                .default_value("http://localhost:4200")
                .env("PORDISTO_FRONTEND_DEV_URL"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PORDISTO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
