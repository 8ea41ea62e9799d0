use belenios::{RevotePolicy, VerifyConfig};
use std::env::var;

pub struct Config {
    /// Election directory used when none is given on the command line.
    pub dir: String,
    pub log: String,
    pub sequential: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let dir = match var("BELENIOS_DIR") {
            Ok(val) => val,
            Err(_e) => ".".to_owned(),
        };

        let log = match var("BELENIOS_LOG") {
            Ok(val) => val,
            Err(_e) => "info".to_owned(),
        };

        let sequential = match var("BELENIOS_SEQUENTIAL") {
            Ok(val) => !matches!(val.as_str(), "" | "0" | "false"),
            Err(_e) => false,
        };

        Config {
            dir,
            log,
            sequential,
        }
    }

    pub fn verify_config(&self, revote_policy: RevotePolicy) -> VerifyConfig {
        VerifyConfig {
            revote_policy,
            parallel: !self.sequential,
        }
    }
}
