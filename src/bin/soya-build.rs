use std::path::PathBuf;

use clap::Parser;

use soya::compiler::{save_manifest, ManifestBuilder};

#[derive(Parser)]
#[command(name = "soya-build")]
#[command(about = "Write the page dependency manifest for precompiled assets", long_about = None)]
struct Cli {
    /// Directory holding the compiled `.js`/`.css` files.
    #[arg(short, long)]
    assets: PathBuf,

    /// Where to write the JSON manifest.
    #[arg(short, long)]
    out: PathBuf,

    /// URL prefix the assets are served under.
    #[arg(short, long, default_value = "/assets")]
    prefix: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let result = ManifestBuilder::new(&cli.assets, &cli.prefix).scan()?;
    save_manifest(&cli.out, &result)?;

    println!("Wrote {} pages to {}", result.pages.len(), cli.out.display());
    for (page, deps) in &result.pages {
        println!("  {:<20} js: {:<3} css: {}", page, deps.js.len(), deps.css.len());
    }
    Ok(())
}
