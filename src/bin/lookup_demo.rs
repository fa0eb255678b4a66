//! Runs one lookup from the command line and prints the normalized text.
//!
//! ```text
//! cargo run --bin lookup_demo -- Jisoo --hint BLACKPINK
//! cargo run --bin lookup_demo -- TWICE --category group
//! ```

use anyhow::{bail, Result};
use kpop_lookup::bootstrap::LookupRuntime;
use kpop_lookup::summarize::summarize_or_not_found;
use kpop_lookup::Category;

struct Args {
    subject: String,
    hint: Option<String>,
    category: Category,
    summarize: bool,
}

fn parse_args() -> Result<Args> {
    let mut subject = Vec::new();
    let mut hint = None;
    let mut category = Category::Individual;
    let mut summarize = false;

    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--hint" | "--group" => hint = it.next(),
            "--category" => match it.next() {
                Some(c) => category = c.parse()?,
                None => bail!("--category needs a value"),
            },
            "--summarize" => summarize = true,
            _ => subject.push(a),
        }
    }
    if subject.is_empty() {
        bail!("usage: lookup_demo <subject> [--hint GROUP] [--category individual|group] [--summarize]");
    }
    Ok(Args {
        subject: subject.join(" "),
        hint,
        category,
        summarize,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    kpop_lookup::logging::init_tracing();

    let args = parse_args()?;
    let rt = LookupRuntime::from_env().await?;

    let out = rt
        .service
        .lookup(&args.subject, args.hint.as_deref(), args.category)
        .await;

    println!(
        "cache={} found={} stages={:?}",
        if out.cache_hit { "HIT" } else { "MISS" },
        out.found(),
        out.stages
    );
    println!("{}", out.text);

    if args.summarize {
        if let Some(s) = summarize_or_not_found(rt.summarizer.as_ref(), &args.subject, &out.text).await {
            println!("\n[{}] {}", s.provider, s.text);
        }
    }
    Ok(())
}
