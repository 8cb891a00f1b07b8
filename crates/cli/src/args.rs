use std::path::PathBuf;

use clap::Parser;
use url::Url;

use jingui::runtime::appkeys::DEFAULT_APPKEYS_PATH;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "jingui",
    version,
    about = "Jingui (金匮) - secure secret injection for TEE environments"
)]
pub struct Args {
    /// Jingui server URL (or set JINGUI_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<Url>,

    /// Path to the appkeys file holding the instance private key
    #[arg(long, global = true, default_value = DEFAULT_APPKEYS_PATH)]
    pub appkeys: PathBuf,

    /// Allow plaintext HTTP connections to the server
    #[arg(long, global = true)]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: crate::Command,
}
