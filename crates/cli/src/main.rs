use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use params::ProfileName;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Random image generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve random images over HTTP.
    Serve(SettingsArgs),
    /// Write a settings file with the defaults and any overrides given.
    InitConfig(InitConfigArgs),
    /// Generate one image and write it to a file or print it as a data URI.
    Generate(GenerateArgs),
    /// List the built-in configuration profiles.
    Profiles,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Settings file (default: server.json in the platform config dir).
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[arg(short = 'b', long)]
    bind: Option<String>,

    #[arg(short = 'p', long)]
    port: Option<u16>,

    #[arg(long)]
    profile: Option<ProfileName>,
}

impl SettingsArgs {
    fn apply(&self, settings: &mut settings::ServerSettings) {
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(profile) = self.profile {
            settings.profile = profile;
        }
    }
}

#[derive(Args, Debug)]
struct InitConfigArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Replace an existing file.
    #[arg(long)]
    force: bool,
}

/// Values are passed through the same lenient normalization as query parameters.
#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    width: Option<String>,

    #[arg(long)]
    height: Option<String>,

    /// jpg, jpeg, png or webp.
    #[arg(long = "type")]
    format: Option<String>,

    /// Palette size (palette profile only).
    #[arg(long)]
    num_colors: Option<String>,

    #[arg(long, default_value_t = ProfileName::default())]
    profile: ProfileName,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Log the configuration and every generated color.
    #[arg(long)]
    debug: bool,

    /// Write encoded bytes here instead of printing a data URI.
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,
}

impl GenerateArgs {
    fn raw_params(&self) -> HashMap<String, String> {
        let mut raw = HashMap::new();
        let pairs = [
            ("width", &self.width),
            ("height", &self.height),
            ("type", &self.format),
            ("numColors", &self.num_colors),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                raw.insert(key.to_string(), v.clone());
            }
        }
        if self.debug {
            raw.insert("debug".to_string(), "1".to_string());
        }
        raw
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::InitConfig(args) => {
            let path = cmd_init_config(&args)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Generate(args) => cmd_generate(args),
        Command::Profiles => {
            cmd_profiles();
            Ok(())
        }
    }
}

async fn cmd_serve(args: SettingsArgs) -> anyhow::Result<()> {
    let mut settings = settings::load_or_default(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;

    server::serve(&settings).await
}

fn cmd_init_config(args: &InitConfigArgs) -> anyhow::Result<PathBuf> {
    let path = match &args.settings.config {
        Some(path) => path.clone(),
        None => settings::paths::default_settings_path()?,
    };

    let mut settings = settings::ServerSettings::default();
    args.settings.apply(&mut settings);
    settings::write_settings(&settings, &path, args.force)?;
    Ok(path)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let profile = args.profile.profile();
    let config = params::normalize(&args.raw_params(), &profile);

    let mut rng: Box<dyn RngCore> = match args.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(rand::thread_rng()),
    };
    let buffer = render::synthesize(&config, &mut *rng);
    let quality = render::QualityPreset::default();

    match args.out {
        Some(path) => {
            let bytes = render::encode(&buffer, config.format, &quality)?;
            std::fs::write(&path, &bytes)?;
            info!(
                path = %path.display(),
                width = config.width,
                height = config.height,
                format = %config.format,
                bytes = bytes.len(),
                "wrote image"
            );
        }
        None => {
            println!("{}", render::data_uri(&buffer, config.format, &quality)?);
        }
    }
    Ok(())
}

fn cmd_profiles() {
    for name in ProfileName::ALL {
        let p = name.profile();
        let palette = if p.palette_support { "numColors" } else { "-" };
        println!("{:<8}  default={:<5}  {}", name, p.default_format, palette);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_flags_map_to_query_keys() {
        let cli = Cli::parse_from([
            "prig", "generate", "--width", "4", "--type", "jpg", "--num-colors", "2", "--debug",
        ]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let raw = args.raw_params();
        assert_eq!(raw.get("width").map(String::as_str), Some("4"));
        assert_eq!(raw.get("type").map(String::as_str), Some("jpg"));
        assert_eq!(raw.get("numColors").map(String::as_str), Some("2"));
        assert_eq!(raw.get("debug").map(String::as_str), Some("1"));
        assert!(!raw.contains_key("height"));
        assert_eq!(args.profile, ProfileName::Palette);
    }

    #[test]
    fn init_config_writes_overridden_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        let path_arg = path.to_str().unwrap();

        let cli = Cli::parse_from([
            "prig", "init-config", "--config", path_arg, "--port", "9001", "--profile", "classic",
        ]);
        let Command::InitConfig(args) = cli.command else {
            panic!("expected init-config");
        };
        assert_eq!(cmd_init_config(&args).unwrap(), path);

        let written = settings::load_settings(&path).unwrap();
        assert_eq!(written.port, 9001);
        assert_eq!(written.profile, ProfileName::Classic);
        assert_eq!(written.bind_address, "0.0.0.0");

        // A second run refuses to clobber the file unless forced.
        assert!(cmd_init_config(&args).is_err());
        let cli = Cli::parse_from(["prig", "init-config", "--config", path_arg, "--force"]);
        let Command::InitConfig(args) = cli.command else {
            panic!("expected init-config");
        };
        cmd_init_config(&args).unwrap();
        assert_eq!(settings::load_settings(&path).unwrap().port, 8080);
    }

    #[test]
    fn serve_accepts_profile_names() {
        let cli = Cli::parse_from(["prig", "serve", "--profile", "classic", "-p", "9000"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.profile, Some(ProfileName::Classic));
        assert_eq!(args.port, Some(9000));
    }
}
