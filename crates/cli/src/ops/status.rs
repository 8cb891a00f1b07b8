//! `jingui status` — local identity plus server registration check.

use clap::Args;

use jingui::runtime::appkeys::{self, AppKeysError};
use jingui::runtime::fetch::{self, FetchError};
use jingui_common::crypto;

use crate::op::{Op, OpContext, OpOutcome};

#[derive(Args, Debug, Clone)]
pub struct Status {}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("load private key: {0}")]
    AppKeys(#[from] AppKeysError),
    #[error("check instance: {0}")]
    Fetch(#[from] FetchError),
}

#[async_trait::async_trait]
impl Op for Status {
    type Error = StatusError;

    async fn execute(&self, ctx: &OpContext) -> Result<OpOutcome, Self::Error> {
        let private_key = appkeys::load_private_key(&ctx.appkeys_path)?;
        let public_key = crypto::derive_public_key(&private_key);
        let fid = crypto::fid(&public_key);

        let strict = fetch::ratls_strict_enabled();
        let mode = if strict { "strict" } else { "permissive" };

        match fetch::check_instance(&ctx.client, &fid).await {
            Ok(()) => Ok(OpOutcome::Render(format!(
                "fid: {}\nserver: {}\nattestation: {}\nregistered: yes",
                fid, ctx.server_url, mode
            ))),
            Err(FetchError::Api(api_err)) if api_err.status().map(|s| s.as_u16()) == Some(404) => {
                Ok(OpOutcome::Render(format!(
                    "fid: {}\nserver: {}\nattestation: {}\nregistered: no (instance not found)",
                    fid, ctx.server_url, mode
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
