//! `envault doctor`

use anyhow::Result;

use super::{build_store, runtime};
use crate::cli::Context;
use crate::core::config::{resolve_config_path, Config};
use crate::crypto::PassphraseResolver;
use crate::project::Discovery;
use crate::ui::output::Output;

struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

pub fn doctor(ctx: &Context, fix: bool) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(doctor_async(ctx, fix))
}

async fn doctor_async(ctx: &Context, fix: bool) -> Result<()> {
    let out = &ctx.out;
    let mut checks: Vec<Check> = Vec::new();

    // Config
    let config_path = resolve_config_path(ctx.config_path.as_deref());
    let config = match Config::load(ctx.config_path.as_deref()) {
        Ok(cfg) => {
            checks.push(Check {
                name: "config",
                ok: true,
                detail: config_path.display().to_string(),
            });
            Some(cfg)
        }
        Err(e) => {
            checks.push(Check {
                name: "config",
                ok: false,
                detail: e.to_string(),
            });
            None
        }
    };

    // Bucket reachability
    if let Some(cfg) = &config {
        match build_store(cfg).await {
            Ok(store) => match store.list("").await {
                Ok(_) => checks.push(Check {
                    name: "bucket",
                    ok: true,
                    detail: cfg.bucket.clone(),
                }),
                Err(e) => checks.push(Check {
                    name: "bucket",
                    ok: false,
                    detail: e.to_string(),
                }),
            },
            Err(e) => checks.push(Check {
                name: "bucket",
                ok: false,
                detail: e.to_string(),
            }),
        }

        // Passphrase (non-interactive sources only; the prompt always
        // "works")
        if cfg.has_passphrase_config() {
            let resolver = PassphraseResolver::new(cfg, false);
            match resolver.resolve().await {
                Ok(_) => checks.push(Check {
                    name: "passphrase",
                    ok: true,
                    detail: "resolved from configured source".to_string(),
                }),
                Err(e) => checks.push(Check {
                    name: "passphrase",
                    ok: false,
                    detail: e.to_string(),
                }),
            }
        } else {
            checks.push(Check {
                name: "passphrase",
                ok: true,
                detail: "interactive prompt (no source configured)".to_string(),
            });
        }
    }

    // Project
    let discovery = match Discovery::discover(None) {
        Ok(d) => {
            checks.push(Check {
                name: "project",
                ok: true,
                detail: d.repo_id().to_string(),
            });
            Some(d)
        }
        Err(e) => {
            checks.push(Check {
                name: "project",
                ok: false,
                detail: e.to_string(),
            });
            None
        }
    };

    // Manifest
    if let Some(d) = &discovery {
        match d.tracked_files() {
            Ok(files) => checks.push(Check {
                name: "manifest",
                ok: true,
                detail: format!("{} file(s) tracked", files.len()),
            }),
            Err(e) => checks.push(Check {
                name: "manifest",
                ok: false,
                detail: e.to_string(),
            }),
        }
    }

    // Cache health
    if let (Some(cfg), Some(d)) = (&config, &discovery) {
        if let Ok(store) = build_store(cfg).await {
            if let Ok(mut cache) =
                crate::cache::Cache::new(&cfg.cache_base()?, d.repo_id().clone(), store)
            {
                let health = cache.validate();
                let mut ok = health.error.is_none();
                let mut detail = match &health.error {
                    Some(e) => e.clone(),
                    None if !health.exists => "not created yet (first push creates it)".to_string(),
                    None => {
                        let dirty = matches!(cache.has_changes(), Ok(true));
                        format!(
                            "{} file(s), head {}{}",
                            health.file_count,
                            if health.head_valid { "valid" } else { "empty" },
                            if dirty { ", uncommitted changes" } else { "" }
                        )
                    }
                };

                if !ok && fix {
                    out.println("Attempting to reset cache...");
                    match cache.reset().await {
                        Ok(()) => {
                            ok = true;
                            detail = "reset from remote".to_string();
                        }
                        Err(e) => detail = format!("reset failed: {e}"),
                    }
                }

                checks.push(Check {
                    name: "cache",
                    ok,
                    detail,
                });
            }
        }
    }

    report(out, &checks);

    if checks.iter().any(|c| !c.ok) {
        if !fix {
            out.blank();
            out.println("Run 'envault doctor --fix' to reset a broken cache");
        }
        anyhow::bail!("doctor found problems");
    }
    Ok(())
}

fn report(out: &Output, checks: &[Check]) {
    for check in checks {
        let mark = if check.ok { "ok  " } else { "FAIL" };
        out.println(format!("{mark}  {:<12}{}", check.name, check.detail));
    }
}
