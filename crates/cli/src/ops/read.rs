//! `jingui read <secret_ref>` — fetch and print a single reference.
//!
//! Sent with the "read" command header, so the server's debug policy can
//! refuse it independently of normal runs.

use clap::Args;

use jingui::runtime::appkeys::{self, AppKeysError};
use jingui::runtime::fetch::{self, FetchError};
use jingui_common::crypto;
use jingui_common::refs::{RefError, SecretRef};

use crate::op::{Op, OpContext, OpOutcome};

#[derive(Args, Debug, Clone)]
pub struct Read {
    /// Secret reference (jingui://<vault>/<item>/<field>)
    pub reference: String,

    /// Print FID and public key to stderr for debugging
    #[arg(long)]
    pub show_meta: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("load private key: {0}")]
    AppKeys(#[from] AppKeysError),
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error("fetch secret: {0}")]
    Fetch(#[from] FetchError),
    #[error("server response did not include the requested reference")]
    MissingValue,
}

#[async_trait::async_trait]
impl Op for Read {
    type Error = ReadError;

    async fn execute(&self, ctx: &OpContext) -> Result<OpOutcome, Self::Error> {
        SecretRef::parse(&self.reference)?;

        let private_key = appkeys::load_private_key(&ctx.appkeys_path)?;
        let public_key = crypto::derive_public_key(&private_key);
        let fid = crypto::fid(&public_key);

        if self.show_meta {
            eprintln!("fid: {}", fid);
            eprintln!("public_key: {}", hex::encode(public_key));
        }

        let resolved = fetch::fetch_secrets(
            &ctx.client,
            &private_key,
            &fid,
            vec![self.reference.clone()],
            "read",
        )
        .await?;

        let value = resolved
            .get(&self.reference)
            .ok_or(ReadError::MissingValue)?;
        Ok(OpOutcome::Render(
            String::from_utf8_lossy(value).into_owned(),
        ))
    }
}
