use clap::{App, AppSettings, Arg, SubCommand};
use tracing_subscriber::EnvFilter;

mod command_credgen;
mod command_decrypt;
mod command_result;
mod command_shuffle;
mod command_tally;
mod command_trustee;
mod command_verify;
mod command_vote;
mod config;
mod loader;

use config::Config;

fn main() {
    let config = Config::from_env();

    let dir_arg = || {
        Arg::with_name("DIR")
            .index(1)
            .required(false)
            .help("Election directory - defaults to BELENIOS_DIR or the current directory")
    };
    let owner_arg = || {
        Arg::with_name("owner")
            .long("owner")
            .takes_value(true)
            .required(true)
            .help("Decryption owner index, starting at 1")
    };

    let matches = App::new("Belenios tool")
        .version("0.1")
        .about("Generates and verifies Belenios election data")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Log at debug level instead of BELENIOS_LOG"),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Verify every record of an election directory")
                .arg(dir_arg())
                .arg(
                    Arg::with_name("revote")
                        .long("revote")
                        .takes_value(true)
                        .possible_values(&["last", "reject"])
                        .default_value("last")
                        .help("What to do with a second ballot cast with the same credential"),
                )
                .arg(
                    Arg::with_name("json")
                        .long("json")
                        .help("Print the report as JSON"),
                ),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Create a ballot from a credential seed and a choice vector")
                .arg(dir_arg())
                .arg(
                    Arg::with_name("seed")
                        .long("seed")
                        .takes_value(true)
                        .required(true)
                        .help("File holding the private credential seed"),
                )
                .arg(
                    Arg::with_name("CHOICES")
                        .long("choices")
                        .takes_value(true)
                        .required(true)
                        .help("JSON array with one entry per question, e.g. [[1,0,0]]"),
                ),
        )
        .subcommand(
            SubCommand::with_name("trustee-keygen")
                .about("Generate a trustee key, or a threshold trustee with --threshold")
                .arg(
                    Arg::with_name("secret")
                        .long("secret")
                        .takes_value(true)
                        .required(true)
                        .help("Where to write the secret key (shares get a -<n> suffix)"),
                )
                .arg(
                    Arg::with_name("threshold")
                        .long("threshold")
                        .takes_value(true)
                        .requires("count")
                        .help("Number of shares needed to decrypt"),
                )
                .arg(
                    Arg::with_name("count")
                        .long("count")
                        .takes_value(true)
                        .requires("threshold")
                        .help("Number of shares to generate"),
                ),
        )
        .subcommand(
            SubCommand::with_name("credgen")
                .about("Generate voter credentials")
                .arg(
                    Arg::with_name("uuid")
                        .long("uuid")
                        .takes_value(true)
                        .required(true)
                        .help("Election uuid"),
                )
                .arg(
                    Arg::with_name("count")
                        .long("count")
                        .takes_value(true)
                        .required(true)
                        .help("Number of credentials"),
                )
                .arg(
                    Arg::with_name("weight")
                        .long("weight")
                        .takes_value(true)
                        .default_value("1")
                        .help("Weight of every credential"),
                )
                .arg(
                    Arg::with_name("private")
                        .long("private")
                        .takes_value(true)
                        .required(true)
                        .help("Where to write the private seeds, one per line"),
                ),
        )
        .subcommand(
            SubCommand::with_name("tally")
                .about("Compute the encrypted tally from the valid ballots")
                .arg(dir_arg()),
        )
        .subcommand(
            SubCommand::with_name("shuffle")
                .about("Mix the non-homomorphic answers, after the last published shuffle")
                .arg(dir_arg())
                .arg(owner_arg()),
        )
        .subcommand(
            SubCommand::with_name("decrypt")
                .about("Compute a partial decryption of the tally")
                .arg(dir_arg())
                .arg(owner_arg())
                .arg(
                    Arg::with_name("secret")
                        .long("secret")
                        .takes_value(true)
                        .required(true)
                        .help("File holding the owner's secret key or share"),
                ),
        )
        .subcommand(
            SubCommand::with_name("result")
                .about("Combine the valid partial decryptions into the election result")
                .arg(dir_arg()),
        )
        .get_matches();

    let filter = if matches.occurrences_of("v") > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Subcommands
    match matches.subcommand() {
        ("verify", Some(matches)) => command_verify::command_verify(matches, &config),
        ("vote", Some(matches)) => command_vote::command_vote(matches, &config),
        ("trustee-keygen", Some(matches)) => command_trustee::command_trustee_keygen(matches),
        ("credgen", Some(matches)) => command_credgen::command_credgen(matches),
        ("tally", Some(matches)) => command_tally::command_tally(matches, &config),
        ("shuffle", Some(matches)) => command_shuffle::command_shuffle(matches, &config),
        ("decrypt", Some(matches)) => command_decrypt::command_decrypt(matches, &config),
        ("result", Some(matches)) => command_result::command_result(matches, &config),
        _ => unreachable!(),
    }
}

pub fn expand(input: &str) -> String {
    shellexpand::tilde(input).into_owned()
}

/// Print `message` prefixed by the command name and exit with status 1.
pub fn fail<D: std::fmt::Display>(command: &str, message: D) -> ! {
    eprintln!("belenios-tool {}: {}", command, message);
    std::process::exit(1);
}

/// The election directory: the DIR argument, else BELENIOS_DIR.
pub fn election_dir(matches: &clap::ArgMatches, config: &Config) -> String {
    match matches.value_of("DIR") {
        Some(dir) => expand(dir),
        None => expand(&config.dir),
    }
}

/// Parse a required numeric argument.
pub fn number_arg(command: &str, matches: &clap::ArgMatches, name: &str) -> usize {
    // clap enforces presence for required args
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .unwrap_or_else(|_| fail(command, format!("invalid --{}: {}", name, value)))
}
