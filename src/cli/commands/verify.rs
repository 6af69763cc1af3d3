//! `envault verify`

use anyhow::Result;

use super::{build_store, runtime};
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::constants::{CIPHER_EXT, HEAD_OBJECT};
use crate::crypto::{AgeEncrypter, CryptoError, Encrypter, PassphraseResolver};
use crate::sync::SyncError;

pub fn verify(ctx: &Context) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(verify_async(ctx))
}

async fn verify_async(ctx: &Context) -> Result<()> {
    let out = &ctx.out;
    let config = Config::load(ctx.config_path.as_deref())?;
    let store = build_store(&config).await?;

    let resolver = PassphraseResolver::new(&config, ctx.interactive);
    let encrypter = AgeEncrypter::new(resolver.resolve().await?);

    let keys = store.list("").await?;
    let cipher_keys: Vec<&String> = keys
        .iter()
        .filter(|k| k.ends_with(CIPHER_EXT) && !k.ends_with(&format!("/{HEAD_OBJECT}")))
        .collect();

    if cipher_keys.is_empty() {
        out.println("No encrypted files found");
        return Ok(());
    }

    let mut failures = 0;
    for key in &cipher_keys {
        match store.download(key).await {
            Ok(blob) => match encrypter.verify(&blob) {
                Ok(()) => out.println(format!("  OK    {key}")),
                Err(_) => {
                    failures += 1;
                    out.println(format!("  FAIL  {key}"));
                }
            },
            Err(e) => {
                failures += 1;
                out.println(format!("  FAIL  {key} (download: {e})"));
            }
        }
    }

    out.blank();
    if failures > 0 {
        out.println(format!(
            "{failures} of {} file(s) failed to decrypt",
            cipher_keys.len()
        ));
        return Err(SyncError::Crypto(CryptoError::Decrypt(format!(
            "{failures} file(s) failed verification"
        )))
        .into());
    }

    out.println(format!("All {} file(s) decrypt correctly", cipher_keys.len()));
    Ok(())
}
