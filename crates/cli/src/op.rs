use std::error::Error;
use std::path::PathBuf;

use url::Url;

use jingui_server::http_server::api::client::{ApiClient, ApiError};

const SERVER_URL_ENV: &str = "JINGUI_SERVER_URL";

/// What a finished op hands back to main.
#[derive(Debug)]
pub enum OpOutcome {
    /// Print to stdout and exit 0.
    Render(String),
    /// Output already streamed; exit with this code.
    Exit(i32),
}

#[derive(Clone)]
pub struct OpContext {
    /// API client bound to the resolved server URL.
    pub client: ApiClient,
    pub server_url: Url,
    pub appkeys_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum OpContextError {
    #[error("server URL required: use --server or set JINGUI_SERVER_URL")]
    MissingServerUrl,
    #[error("invalid server URL: {0}")]
    InvalidServerUrl(#[from] url::ParseError),
    #[error("server URL {0} is not HTTPS; use --insecure to allow plaintext HTTP")]
    InsecureServerUrl(Url),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OpContext {
    pub fn new(
        server: Option<Url>,
        appkeys_path: PathBuf,
        insecure: bool,
    ) -> Result<Self, OpContextError> {
        let server_url = resolve_server_url(server)?;

        if server_url.scheme() != "https" {
            if !insecure {
                return Err(OpContextError::InsecureServerUrl(server_url));
            }
            eprintln!(
                "jingui: WARNING: communicating over plaintext HTTP ({})",
                server_url
            );
        }

        let client = ApiClient::new(&server_url)?;
        Ok(OpContext {
            client,
            server_url,
            appkeys_path,
        })
    }
}

fn resolve_server_url(explicit: Option<Url>) -> Result<Url, OpContextError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    if let Ok(value) = std::env::var(SERVER_URL_ENV) {
        let value = value.trim().trim_end_matches('/');
        if !value.is_empty() {
            eprintln!("jingui: WARNING: using server URL from {} environment variable", SERVER_URL_ENV);
            return Ok(Url::parse(value)?);
        }
    }
    Err(OpContextError::MissingServerUrl)
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    async fn execute(&self, ctx: &OpContext) -> Result<OpOutcome, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Error = OpError;

            async fn execute(
                &self,
                ctx: &$crate::op::OpContext,
            ) -> Result<$crate::op::OpOutcome, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await.map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }
    };
}
