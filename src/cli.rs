// Command line interface parsing
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use anyhow::{
    anyhow,
    Result,
};
use clap::builder::PossibleValuesParser;
use clap::{
    crate_description,
    crate_name,
    crate_version,
    value_parser,
    Arg,
    ArgAction,
    ArgMatches,
    Command,
};
use crate::common::{
    clamp_concurrency,
    ClientConfig,
    DEFAULT_MAX_CONCURRENCY,
    Provider,
    SizeUnit,
};
use std::str::FromStr;
use tracing::debug;

// Default provider that bucketdu talks to
#[cfg(feature = "s3")]
const DEFAULT_PROVIDER: &str = "s3";

#[cfg(all(feature = "gcs", not(feature = "s3")))]
const DEFAULT_PROVIDER: &str = "gcs";

// Default number of concurrent listing operations
const DEFAULT_MAX_CONCURRENCY_ARG: &str = "100";

// Default unit for displaying sizes
const DEFAULT_UNIT: &str = "scaled";

// This should match the string values in the SizeUnit FromStr impl
const SIZE_UNITS: &[&str] = &[
    "binary",
    "bytes",
    "decimal",
    "scaled",
];

// This should match the string values in the Provider FromStr impl
fn valid_providers() -> Vec<&'static str> {
    let mut providers = Vec::new();

    #[cfg(feature = "gcs")]
    providers.push("gcs");

    #[cfg(feature = "s3")]
    providers.push("s3");

    providers
}

// Create clap app
fn create_app() -> Command {
    debug!("Creating CLI app");

    let app = Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("BUCKET")
                .help("Size only this bucket")
                .index(1)
        )
        .arg(
            Arg::new("MAX_CONCURRENCY")
                .env("BUCKETDU_MAX_CONCURRENCY")
                .long("max-concurrency")
                .short('m')
                .value_name("COUNT")
                .help("Number of listing operations to run in parallel (1 to 1000)")
                .allow_negative_numbers(true)
                .default_value(DEFAULT_MAX_CONCURRENCY_ARG)
                .value_parser(value_parser!(i64))
        )
        .arg(
            Arg::new("PROJECT")
                .env("BUCKETDU_PROJECT")
                .long("project")
                .short('p')
                .value_name("PROJECT")
                .help("GCS project whose buckets should be sized")
        )
        .arg(
            Arg::new("PROVIDER")
                .env("BUCKETDU_PROVIDER")
                .long("provider")
                .short('s')
                .value_name("PROVIDER")
                .help("Storage provider that owns the buckets")
                .default_value(DEFAULT_PROVIDER)
                .value_parser(PossibleValuesParser::new(valid_providers()))
        )
        .arg(
            Arg::new("QUIET")
                .long("quiet")
                .short('q')
                .help("Only display the final summary")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("UNIT")
                .env("BUCKETDU_UNIT")
                .long("unit")
                .short('u')
                .value_name("UNIT")
                .help("Unit to display progress sizes in, bytes disables human readable output")
                .default_value(DEFAULT_UNIT)
                .value_parser(PossibleValuesParser::new(SIZE_UNITS))
        )
        .arg(
            Arg::new("ENDPOINT")
                .env("BUCKETDU_ENDPOINT")
                .long("endpoint")
                .short('e')
                .value_name("URL")
                .help("Custom endpoint for S3 compatible stores or a GCS emulator")
        );

    #[cfg(feature = "s3")]
    let app = app.arg(
        Arg::new("REGION")
            .env("AWS_REGION")
            .hide_env_values(true)
            .long("region")
            .short('r')
            .value_name("REGION")
            .help("Set the AWS region to create the S3 client in")
    );

    #[cfg(feature = "gcs")]
    let app = app.arg(
        Arg::new("ACCESS_TOKEN")
            .env("GOOGLE_OAUTH_ACCESS_TOKEN")
            .hide_env_values(true)
            .long("access-token")
            .short('t')
            .value_name("TOKEN")
            .help("OAuth2 access token used to authenticate against GCS")
    );

    app
}

// Turn parsed arguments into a ClientConfig.
fn client_config(matches: &ArgMatches) -> Result<ClientConfig> {
    // PROVIDER always has a value thanks to its default.
    let provider = matches.get_one::<String>("PROVIDER")
        .ok_or_else(|| anyhow!("no provider given"))?;

    let provider = Provider::from_str(provider)
        .map_err(|e| anyhow!("invalid provider: {}", e))?;

    let size_unit = matches.get_one::<String>("UNIT")
        .map(|u| SizeUnit::from_str(u))
        .transpose()
        .map_err(|e| anyhow!("invalid unit: {}", e))?
        .unwrap_or_default();

    let max_concurrency = matches.get_one::<i64>("MAX_CONCURRENCY")
        .copied()
        .map_or(DEFAULT_MAX_CONCURRENCY, clamp_concurrency);

    let config = ClientConfig {
        bucket_name:  matches.get_one::<String>("BUCKET").cloned(),
        endpoint:     matches.get_one::<String>("ENDPOINT").cloned(),
        max_concurrency,
        project:      matches.get_one::<String>("PROJECT").cloned(),
        provider,
        quiet:        matches.get_flag("QUIET"),
        size_unit,
        #[cfg(feature = "s3")]
        region:       matches.get_one::<String>("REGION").cloned(),
        #[cfg(feature = "gcs")]
        access_token: matches.get_one::<String>("ACCESS_TOKEN").cloned(),
    };

    // GCS can only enumerate buckets within a project.
    #[cfg(feature = "gcs")]
    if config.provider == Provider::Gcs
        && config.bucket_name.is_none()
        && config.project.is_none()
    {
        return Err(anyhow!("--project is required to size all GCS buckets"));
    }

    debug!("client_config: {:?}", config);

    Ok(config)
}

/// Parse the command line into a `ClientConfig`.
pub fn parse_args() -> Result<ClientConfig> {
    debug!("Parsing command line arguments");

    let matches = create_app().get_matches();

    client_config(&matches)
}
