//! `envault diff`

use std::collections::HashSet;

use anyhow::Result;

use super::{project_context, runtime};
use crate::cli::Context;
use crate::core::types::TrackedPath;
use crate::sync::Syncer;
use crate::ui::output::Output;

pub fn diff(ctx: &Context, refs: Vec<String>) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(diff_async(ctx, refs))
}

async fn diff_async(ctx: &Context, refs: Vec<String>) -> Result<()> {
    let out = &ctx.out;
    let mut pc = project_context(ctx).await?;

    if let Err(e) = pc.syncer.cache_mut().sync_from_storage().await {
        out.verbose(format!("could not sync from remote: {e}"));
    }

    // No refs: local against HEAD. One ref: local against it. Two refs:
    // the first against the second.
    let (left_ref, base_ref): (Option<&str>, &str) = match refs.len() {
        0 => (None, "HEAD"),
        1 => (None, refs[0].as_str()),
        _ => (Some(refs[0].as_str()), refs[1].as_str()),
    };

    let files = pc.syncer.discovery().tracked_files()?;
    let mut has_changes = false;

    for file in files {
        let left = match left_ref {
            None => pc.syncer.discovery().read_file(&file).ok(),
            Some(r) => read_at_ref(&mut pc.syncer, &file, r, out).await,
        };
        let base = read_at_ref(&mut pc.syncer, &file, base_ref, out).await;

        if left == base {
            continue;
        }
        has_changes = true;

        out.println(format!("--- {file}"));
        match left_ref {
            None => out.println("+++ (local)"),
            Some(r) => out.println(format!("+++ {file} ({r})")),
        }
        print_simple_diff(
            out,
            &String::from_utf8_lossy(&base.unwrap_or_default()),
            &String::from_utf8_lossy(&left.unwrap_or_default()),
        );
        out.blank();
    }

    if !has_changes {
        out.println("No changes");
    }

    Ok(())
}

async fn read_at_ref(
    syncer: &mut Syncer,
    file: &TrackedPath,
    reference: &str,
    out: &Output,
) -> Option<Vec<u8>> {
    let reference = if reference == "HEAD" { "" } else { reference };
    match syncer.pull_file(file, reference).await {
        Ok(content) => Some(content),
        Err(e) => {
            out.verbose(format!("could not read {file}: {e}"));
            None
        }
    }
}

/// Set-based line diff: removed lines first, then added ones.
fn print_simple_diff(out: &Output, old: &str, new: &str) {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let old_set: HashSet<&str> = old_lines.iter().copied().collect();
    let new_set: HashSet<&str> = new_lines.iter().copied().collect();

    for line in &old_lines {
        if !new_set.contains(line) && !line.is_empty() {
            out.println(format!("- {line}"));
        }
    }
    for line in &new_lines {
        if !old_set.contains(line) && !line.is_empty() {
            out.println(format!("+ {line}"));
        }
    }
}
