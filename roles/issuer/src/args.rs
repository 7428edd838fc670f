use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
pub struct Args {
    pub config_path: PathBuf,
    /// `-h/--help` was given; nothing else should run.
    pub help: bool,
}

enum ArgsState {
    Next,
    ExpectConfigPath,
}

enum ArgsResult {
    Config(PathBuf),
    None,
    Help,
    Invalid(String),
}

impl Args {
    pub const DEFAULT_CONFIG_PATH: &'static str = "issuer-config.toml";
    pub const HELP_MSG: &'static str =
        "Usage: -h/--help, -c/--config <path|default issuer-config.toml>";

    pub fn from_args() -> Result<Self, String> {
        Self::parse(std::env::args().skip(1))
    }

    fn parse(cli_args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut pending = ArgsState::Next;
        let results: Vec<_> = cli_args
            .into_iter()
            .map(|item| match pending {
                ArgsState::Next => match item.as_str() {
                    "-c" | "--config" => {
                        pending = ArgsState::ExpectConfigPath;
                        ArgsResult::None
                    }
                    "-h" | "--help" => ArgsResult::Help,
                    _ => ArgsResult::None,
                },
                ArgsState::ExpectConfigPath => {
                    pending = ArgsState::Next;
                    let path = PathBuf::from(item);
                    if !path.exists() {
                        return ArgsResult::Invalid(format!(
                            "Error: File '{}' does not exist!",
                            path.display()
                        ));
                    }
                    ArgsResult::Config(path)
                }
            })
            .collect();

        if matches!(pending, ArgsState::ExpectConfigPath) {
            return Err(format!("Missing value for -c/--config\n{}", Self::HELP_MSG));
        }

        let mut config_path = None;
        let mut help = false;
        for res in results {
            match res {
                ArgsResult::Config(p) => config_path = Some(p),
                ArgsResult::Help => help = true,
                ArgsResult::Invalid(e) => return Err(format!("{}\n{}", e, Self::HELP_MSG)),
                ArgsResult::None => {}
            }
        }

        let config_path = config_path.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_PATH));
        Ok(Self { config_path, help })
    }

    pub fn uses_default_config(&self) -> bool {
        self.config_path == PathBuf::from(Self::DEFAULT_CONFIG_PATH)
    }
}
